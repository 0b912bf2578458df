//! eoskit - ABI codec, transaction builder and signer for EOSIO-style chains.
//!
//! Converts contract action arguments between JSON and the chain's binary
//! encoding using a contract's ABI, assembles them into transactions, and
//! produces the chain-bound digest and recoverable secp256k1 signatures.
//!
//! # Features
//!
//! - Schema-directed pack/unpack for every ABI built-in, structs with
//!   bases, arrays, fixed arrays, optionals, binary extensions and variants
//! - A process-wide ABI cache keyed by contract account
//! - Transactions with reference-block binding, zlib compression and
//!   signatures that freeze the body once attached
//! - Integer handles and JSON-envelope calls for embedding hosts ([`api`])
//! - A CLI with pretty tables or JSON output

pub mod abi;
pub mod api;
pub mod chain;
pub mod cli;
pub mod codec;
pub mod commands;
pub mod crypto;
pub mod error;
pub mod format;
pub mod handles;
pub mod input;
pub mod name;
pub mod symbol;
pub mod value;

pub use cli::Args;
pub use error::{Error, ErrorKind, Result};

use format::format_output;

/// Run eoskit with the given arguments.
pub fn run(args: &Args) -> Result<()> {
    let report = commands::execute(&args.command)?;
    let output = format_output(&report, args)?;
    println!("{}", output);
    Ok(())
}
