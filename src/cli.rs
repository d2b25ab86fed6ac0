use anyhow::{Context, Result, anyhow};
use clap::{Arg, ArgAction, ArgMatches, Command};
use log::LevelFilter;
use std::ffi::OsString;
use std::path::PathBuf;

/// Name of the tool home directory created under the user's home.
pub const DEFAULT_HOME_DIR: &str = ".mdup";

/// Run configuration handed to every step of a run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Markdown file or directory to process. `None` means usage text.
    pub target: Option<PathBuf>,
    /// Tool home: holds `config.json` and the backups.
    pub home: PathBuf,
    pub log_level: LevelFilter,
    /// Overwrite an existing backup copy before mutating a document.
    pub force_backup: bool,
    /// Restore documents from their backups instead of uploading.
    pub rollback: bool,
    /// Contain upload-mode failures per file instead of aborting the run.
    pub keep_going: bool,
}

impl Config {
    pub fn new(target: impl Into<PathBuf>, home: impl Into<PathBuf>) -> Self {
        Self {
            target: Some(target.into()),
            home: home.into(),
            log_level: LevelFilter::Info,
            force_backup: false,
            rollback: false,
            keep_going: false,
        }
    }
}

pub fn command() -> Command {
    Command::new("mdup")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Uploads images referenced by Markdown files and rewrites the links")
        .override_usage("mdup [flags] markdown_file_path")
        .arg(
            Arg::new("log")
                .long("log")
                .value_name("LEVEL")
                .help("Logging level: debug, info, warn, error, panic, fatal")
                .default_value("info")
                .num_args(1),
        )
        .arg(
            Arg::new("home")
                .long("home")
                .value_name("DIR")
                .help("mdup home directory (default $HOME/.mdup)")
                .num_args(1),
        )
        .arg(
            Arg::new("backup")
                .long("backup")
                .help("Always back up markdown files before uploading, replacing older backups")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("rollback")
                .long("rollback")
                .help("Restore markdown files from their backups")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("keep-going")
                .long("keep-going")
                .help("Report failed files at the end instead of stopping at the first one")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("path")
                .value_name("PATH")
                .help("Markdown file or directory")
                .num_args(1),
        )
}

/// Parses the process arguments; `--help`, `--version` and bad flags exit
/// the way clap does.
pub fn parse_args() -> Result<Config> {
    config_from_matches(&command().get_matches())
}

pub fn parse_from<I, T>(args: I) -> Result<Config>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = command().try_get_matches_from(args)?;
    config_from_matches(&matches)
}

/// Rendered usage text, printed when no path is given.
pub fn usage() -> String {
    command().render_help().to_string()
}

fn config_from_matches(matches: &ArgMatches) -> Result<Config> {
    let log_level = matches
        .get_one::<String>("log")
        .map(|s| parse_log_level(s))
        .transpose()?
        .unwrap_or(LevelFilter::Info);

    let home = match matches.get_one::<String>("home") {
        Some(dir) => PathBuf::from(dir),
        None => dirs::home_dir()
            .context("Could not determine home directory, pass --home")?
            .join(DEFAULT_HOME_DIR),
    };

    Ok(Config {
        target: matches.get_one::<String>("path").map(PathBuf::from),
        home,
        log_level,
        force_backup: matches.get_flag("backup"),
        rollback: matches.get_flag("rollback"),
        keep_going: matches.get_flag("keep-going"),
    })
}

/// Maps the six level names onto the `log` filters. `log` has nothing above
/// `error`, so `panic` and `fatal` collapse onto it.
pub fn parse_log_level(name: &str) -> Result<LevelFilter> {
    match name.to_ascii_lowercase().as_str() {
        "debug" => Ok(LevelFilter::Debug),
        "info" => Ok(LevelFilter::Info),
        "warn" => Ok(LevelFilter::Warn),
        "error" | "panic" | "fatal" => Ok(LevelFilter::Error),
        other => Err(anyhow!(
            "unknown log level {other:?}, expected debug, info, warn, error, panic or fatal"
        )),
    }
}
