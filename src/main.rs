use anyhow::Result;
use log::LevelFilter;
use mdup::{cli::parse_args, cli::usage, run_mdup};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let config = parse_args()?;
    init_logger(config.log_level);

    if config.target.is_none() {
        eprintln!("{}", usage());
        return Ok(ExitCode::from(1));
    }

    let rollback = config.rollback;
    let summary = run_mdup(config).await?;

    // Rollback failures are reported but do not fail the run.
    if !rollback && !summary.failed.is_empty() {
        return Ok(ExitCode::from(1));
    }
    Ok(ExitCode::SUCCESS)
}

fn init_logger(level: LevelFilter) {
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_secs()
        .init();
}
