//! eoskit - ABI codec, transaction builder and signer.

use clap::Parser;
use colored::Colorize;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    let default = if verbose { "eoskit=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let args = eoskit::Args::parse();

    if args.no_color {
        colored::control::set_override(false);
    }
    init_logging(args.verbose);

    match eoskit::run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let err = anyhow::Error::new(e);
            eprintln!("{}: {:#}", "error".red(), err);

            let code = err
                .downcast_ref::<eoskit::Error>()
                .map_or(1, eoskit::Error::exit_code);
            ExitCode::from(code as u8)
        }
    }
}
