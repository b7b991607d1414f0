use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

use crate::{
    cli::{Cli, Command},
    runner::Variant,
};

mod cli;
mod fetcher;
mod page;
mod patch;
mod provider;
mod record;
mod runner;
mod script;
mod template;

fn main() -> ExitCode {
    let args = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let variant = Variant::from(args.command.unwrap_or(Command::Data));
    let provider = args.settings.provider();

    match runner::run(provider.as_ref(), &args.settings, variant) {
        Ok(report) => report.exit_code(),
        Err(err) => {
            error!("{err}");
            println!("Failed to fetch data");
            ExitCode::FAILURE
        }
    }
}
