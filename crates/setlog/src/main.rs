//! Setlog CLI - workout log with set-level reconciliation
//!
//! Binary name: `setlog`

use std::process;

use clap::Parser;

mod cli;
mod commands;

#[tokio::main]
async fn main() {
    let args = cli::Cli::parse();

    if let Err(err) = commands::run(args).await {
        #[allow(clippy::print_stderr)]
        {
            eprintln!("Error: {err:#}");
        }

        let code = err
            .downcast_ref::<setlog_core::Error>()
            .map_or(1, setlog_core::Error::exit_code);

        #[allow(clippy::exit)]
        process::exit(code);
    }
}
