//! Per-document upload and rollback passes.

use crate::backup::BackupStore;
use crate::classify::{Origin, classify};
use crate::error::MdupError;
use crate::extractor::find_image_refs;
use crate::gateway::UploadGateway;
use crate::rewriter::{rewrite, write_atomic_async};
use crate::storage::{ObjectStore, public_url};
use anyhow::{Context, Result};
use log::{error, info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use url::Url;

/// What happened to one document during an upload pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DocumentReport {
    pub uploaded: usize,
    pub hosted: usize,
    pub skipped: usize,
    pub changed: bool,
}

/// Totals over a whole run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub files: usize,
    pub rewritten: usize,
    pub uploaded: usize,
    /// References already served from the bucket.
    pub hosted: usize,
    pub skipped: usize,
    pub restored: usize,
    pub failed: Vec<(PathBuf, String)>,
}

impl RunSummary {
    fn add(&mut self, report: &DocumentReport) {
        self.uploaded += report.uploaded;
        self.hosted += report.hosted;
        self.skipped += report.skipped;
        if report.changed {
            self.rewritten += 1;
        }
    }
}

pub struct Processor<'a, S> {
    gateway: UploadGateway<'a, S>,
    domain: Url,
    backups: &'a BackupStore,
    force_backup: bool,
    keep_going: bool,
}

impl<'a, S: ObjectStore> Processor<'a, S> {
    pub fn new(
        store: &'a S,
        domain: Url,
        image_suffixes: &[String],
        backups: &'a BackupStore,
    ) -> Self {
        Self {
            gateway: UploadGateway::new(store, image_suffixes),
            domain,
            backups,
            force_backup: false,
            keep_going: false,
        }
    }

    pub fn force_backup(mut self, yes: bool) -> Self {
        self.force_backup = yes;
        self
    }

    pub fn keep_going(mut self, yes: bool) -> Self {
        self.keep_going = yes;
        self
    }

    /// Runs the upload pass over `files`, in order.
    ///
    /// The first failing document aborts the run unless `keep_going` is set,
    /// in which case the failure is recorded and the next document starts.
    pub async fn upload_all(&self, files: &[PathBuf]) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        for file in files {
            info!("file: {}", file.display());
            summary.files += 1;
            match self.process_document(file).await {
                Ok(report) => summary.add(&report),
                Err(err) if self.keep_going => {
                    error!("{}: {err}", file.display());
                    summary.failed.push((file.clone(), err.to_string()));
                }
                Err(err) => {
                    return Err(err).with_context(|| format!("Failed to process {}", file.display()));
                }
            }
        }
        Ok(summary)
    }

    /// Backs up, uploads and rewrites one document.
    ///
    /// Nothing is written back unless every upload of the document succeeded.
    pub async fn process_document(&self, path: &Path) -> Result<DocumentReport, MdupError> {
        let text = fs::read_to_string(path)
            .await
            .map_err(|e| MdupError::path(path, e))?;
        self.backups.backup(path, self.force_backup).await?;

        let base_dir = path.parent().unwrap_or(Path::new("."));
        let mut report = DocumentReport::default();
        let mut mapping = HashMap::new();

        for reference in find_image_refs(&text) {
            let origin = match classify(&reference, &self.domain) {
                Ok(origin) => origin,
                Err(err) => {
                    warn!("{err}, left unchanged");
                    report.skipped += 1;
                    continue;
                }
            };
            if origin == Origin::RemoteHosted {
                report.hosted += 1;
                continue;
            }

            match self.gateway.upload(&reference, origin, base_dir).await? {
                Some(key) => {
                    info!("[uploaded] from: {reference} to: {key}");
                    mapping.insert(reference, public_url(&self.domain, &key));
                    report.uploaded += 1;
                }
                None => report.skipped += 1,
            }
        }

        let rewritten = rewrite(&text, &mapping);
        if rewritten != text {
            report.changed = true;
            write_atomic_async(path, rewritten).await?;
        }
        Ok(report)
    }
}

/// Restores every file in `files` from its backup.
///
/// Failures are logged and counted; the pass always visits every file.
pub async fn rollback_all(backups: &BackupStore, files: &[PathBuf]) -> RunSummary {
    let mut summary = RunSummary::default();
    for file in files {
        info!("roll back file: {}", file.display());
        summary.files += 1;
        match backups.restore(file).await {
            Ok(()) => summary.restored += 1,
            Err(err) => {
                error!("{err}");
                summary.failed.push((file.clone(), err.to_string()));
            }
        }
    }
    summary
}
