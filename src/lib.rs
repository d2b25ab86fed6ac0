//! # mdup Library
//!
//! This crate can be used to:
//!
//! - Find the images referenced by Markdown documents
//! - Upload local and externally hosted images to an object-storage bucket
//!   and point the documents at the bucket's public URLs
//! - Back documents up before rewriting them and roll them back later
//!
//! ## Usage
//!
//! ```rust,no_run
//! use mdup::{Config, run_mdup};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let home = dirs::home_dir().unwrap().join(".mdup");
//!     let summary = run_mdup(Config::new("notes/", home)).await?;
//!     println!("{} images uploaded", summary.uploaded);
//!     Ok(())
//! }
//! ```
//!
//! Any [`ObjectStore`] can stand in for the bucket through [`run_with_store`].

pub mod backup;
pub mod classify;
pub mod cli;
pub mod error;
pub mod extractor;
pub mod filewalker;
pub mod gateway;
pub mod processor;
#[cfg(feature = "qiniu")]
pub mod qiniu;
pub mod rewriter;
pub mod settings;
pub mod storage;

pub use backup::BackupStore;
pub use classify::{Origin, classify};
pub use cli::Config;
pub use error::MdupError;
pub use extractor::find_image_refs;
pub use filewalker::collect_markdown_files;
pub use processor::{Processor, RunSummary, rollback_all};
pub use rewriter::rewrite;
pub use settings::Settings;
pub use storage::{ObjectStore, public_url};

use anyhow::{Context, Result, bail};
use log::info;
use settings::{MARKDOWN_SUFFIXES, ensure_home};

/// Loads `<home>/config.json` and runs the pass selected by `config`
/// against the configured bucket.
pub async fn run_mdup(config: Config) -> Result<RunSummary> {
    ensure_home(&config.home)?;
    let settings = Settings::load(&config.home)?;

    #[cfg(feature = "qiniu")]
    let store = qiniu::QiniuStore::new(&settings)?;
    #[cfg(not(feature = "qiniu"))]
    let store = storage::Unavailable;

    run_with_store(&config, &settings, &store).await
}

/// Runs the rollback or upload pass over `config.target` using `store`.
pub async fn run_with_store<S: ObjectStore>(
    config: &Config,
    settings: &Settings,
    store: &S,
) -> Result<RunSummary> {
    let Some(target) = config.target.as_ref() else {
        bail!("no markdown file or directory given");
    };

    let files = collect_markdown_files(target, MARKDOWN_SUFFIXES)?;
    let backups = BackupStore::new(&config.home);

    let summary = if config.rollback {
        rollback_all(&backups, &files).await
    } else {
        let domain = settings.domain_url().context("Invalid bucket domain")?;
        Processor::new(store, domain, &settings.image_suffixes, &backups)
            .force_backup(config.force_backup)
            .keep_going(config.keep_going)
            .upload_all(&files)
            .await?
    };

    info!(
        "done: {} files, {} rewritten, {} uploaded, {} already hosted, {} skipped, {} restored, {} failed",
        summary.files,
        summary.rewritten,
        summary.uploaded,
        summary.hosted,
        summary.skipped,
        summary.restored,
        summary.failed.len()
    );
    Ok(summary)
}
