use std::process::ExitCode;

use clap::Parser;
use email_notifier::{logging::init_logging, run, Cli};

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let _handle = init_logging(cli.log_level.into(), cli.log_dir.as_deref())?;
    run(cli)
}
