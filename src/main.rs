//! Constellation resolver CLI entry point
//!
//! Parses arguments, runs the selected command and maps failures to exit
//! codes: 2 when the repository has validation errors, 1 for every other
//! failure.

use anyhow::Result;
use clap::Parser;
use constellation_resolver::cli;
use constellation_resolver::core::{exit_code_for, user_friendly_error};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let code = exit_code_for(&e);
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(code);
        }
    }
}
