//! CLI argument parsing for eoskit.

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// ABI codec, transaction builder and signer for EOSIO-style chains.
#[derive(Parser, Debug)]
#[command(
    name = "eoskit",
    version,
    about = "ABI codec, transaction builder and signer for EOSIO-style chains",
    after_help = r#"EXAMPLES:
    eoskit name eosio                          Name to its u64 form
    eoskit name 6138663577826885632            And back
    eoskit symbol 4,EOS                        Symbol layout
    eoskit abi pack token.abi.json             JSON ABI to hex
    eoskit abi unpack token.abi                Binary ABI to JSON
    eoskit args pack --abi token.abi.json eosio.token transfer '{"from":"alice",...}'
    eoskit tx build --ref-block 0000d1a4... --abi token.abi.json \
        --account eosio.token --action transfer --auth alice@active '{...}'
    eoskit tx unpack packed.hex --query transaction.actions.*.name
    eoskit key create                          New keypair
    eoskit key sign <DIGEST>                   Uses EOSKIT_PRIVATE_KEY

INPUTS:
    Arguments named INPUT accept a file path, '-' for stdin, or literal
    text. Binary inputs may be given as hex."#
)]
pub struct Args {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Output as JSON.
    #[arg(long, short = 'j', global = true)]
    pub json: bool,

    /// Disable colored output.
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Log debug events to stderr.
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convert between an account name and its u64 form.
    Name {
        /// A name such as `eosio.token`, or its decimal value.
        value: String,
    },

    /// Show the packed form of a symbol (`4,EOS`) or an asset (`1.0000 EOS`).
    Symbol {
        /// Symbol or asset text.
        value: String,
    },

    /// Convert ABI documents between JSON and binary.
    #[command(subcommand)]
    Abi(AbiCommand),

    /// Pack or unpack action arguments with a contract ABI.
    #[command(subcommand)]
    Args(ArgsCommand),

    /// Build, sign and decode transactions.
    #[command(subcommand)]
    Tx(TxCommand),

    /// Generate keys, sign digests, recover signers.
    #[command(subcommand)]
    Key(KeyCommand),
}

#[derive(Subcommand, Debug)]
pub enum AbiCommand {
    /// Serialize a JSON ABI to its binary form.
    Pack {
        /// JSON ABI document.
        input: String,
    },
    /// Decode a binary ABI to JSON.
    Unpack {
        /// Binary ABI (raw or hex).
        input: String,
    },
}

/// Contract ABI and action selection shared by `args` subcommands.
#[derive(ClapArgs, Debug)]
pub struct ActionTarget {
    /// ABI file for the contract (JSON or binary).
    #[arg(long)]
    pub abi: PathBuf,

    /// Contract account.
    pub account: String,

    /// Action name.
    pub action: String,
}

#[derive(Subcommand, Debug)]
pub enum ArgsCommand {
    /// JSON arguments to hex.
    Pack {
        #[command(flatten)]
        target: ActionTarget,

        /// JSON arguments.
        input: String,
    },
    /// Hex arguments to JSON.
    Unpack {
        #[command(flatten)]
        target: ActionTarget,

        /// Packed arguments (hex).
        input: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum TxCommand {
    /// Build a single-action transaction, optionally signed.
    Build(BuildArgs),

    /// Decode a packed or raw serialized transaction.
    Unpack {
        /// Transaction bytes (raw or hex).
        input: String,

        /// Dotted path to select, e.g. `transaction.actions.0.name`.
        #[arg(long, short = 'q')]
        query: Option<String>,
    },
}

#[derive(ClapArgs, Debug)]
pub struct BuildArgs {
    /// Chain id (64 hex digits).
    #[arg(long, env = "EOSKIT_CHAIN_ID")]
    pub chain_id: String,

    /// Id of a recent block to reference.
    #[arg(long)]
    pub ref_block: String,

    /// Seconds until the transaction expires.
    #[arg(long, default_value_t = 60)]
    pub expiration: u32,

    /// Contract account.
    #[arg(long)]
    pub account: String,

    /// Action name.
    #[arg(long)]
    pub action: String,

    /// Authorization as `actor@permission`. Repeatable.
    #[arg(long = "auth", value_name = "ACTOR@PERMISSION")]
    pub authorization: Vec<String>,

    /// ABI used to pack JSON action data.
    #[arg(long)]
    pub abi: Option<PathBuf>,

    /// Private key to sign with.
    #[arg(long, env = "EOSKIT_PRIVATE_KEY", hide_env_values = true)]
    pub key: Option<String>,

    /// Zlib-compress the packed payload.
    #[arg(long)]
    pub compress: bool,

    /// Action data: hex, or JSON packed with `--abi`.
    #[arg(default_value = "")]
    pub data: String,
}

#[derive(Subcommand, Debug)]
pub enum KeyCommand {
    /// Generate a new keypair.
    Create,
    /// Derive the public key of a private key.
    Public {
        /// WIF or PVT_K1 private key.
        #[arg(env = "EOSKIT_PRIVATE_KEY", hide_env_values = true)]
        private_key: String,

        /// Render in the legacy `EOS...` form.
        #[arg(long)]
        legacy: bool,
    },
    /// Sign a 32-byte digest.
    Sign {
        /// Digest as 64 hex digits.
        digest: String,

        /// WIF or PVT_K1 private key.
        #[arg(long, env = "EOSKIT_PRIVATE_KEY", hide_env_values = true)]
        key: String,
    },
    /// Recover the public key that produced a signature.
    Recover {
        /// Digest as 64 hex digits.
        digest: String,

        /// SIG_K1 signature.
        signature: String,
    },
}

/// Specifies how to obtain input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSpec {
    /// Read from stdin.
    Stdin,
    /// Read from a file path.
    File(PathBuf),
    /// Use the argument itself.
    Literal(String),
}

impl InputSpec {
    /// `-` means stdin; an existing path is a file; anything else is taken
    /// literally.
    pub fn detect(s: &str) -> Self {
        if s == "-" {
            return InputSpec::Stdin;
        }
        let path = PathBuf::from(s);
        if path.is_file() {
            return InputSpec::File(path);
        }
        InputSpec::Literal(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_input_spec_detect() {
        assert_eq!(InputSpec::detect("-"), InputSpec::Stdin);
        assert_eq!(
            InputSpec::detect("deadbeef"),
            InputSpec::Literal("deadbeef".to_string())
        );
        assert_eq!(
            InputSpec::detect("Cargo.toml"),
            InputSpec::File(PathBuf::from("Cargo.toml"))
        );
    }

    #[test]
    fn test_parse_build() {
        let args = Args::try_parse_from([
            "eoskit",
            "tx",
            "build",
            "--chain-id",
            "00",
            "--ref-block",
            "11",
            "--account",
            "eosio.token",
            "--action",
            "transfer",
            "--auth",
            "alice@active",
            "--auth",
            "bob@owner",
            "--json",
        ])
        .unwrap();
        assert!(args.json);
        let Command::Tx(TxCommand::Build(build)) = args.command else {
            panic!("expected tx build");
        };
        assert_eq!(build.authorization, vec!["alice@active", "bob@owner"]);
        assert_eq!(build.expiration, 60);
        assert_eq!(build.data, "");
    }
}
