//! Parallel application of a document pass over many files.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;

use crate::app::pass::DocumentPass;
use crate::infra::fs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Changed,
    Unchanged,
    /// Not started because the batch was cancelled.
    Skipped,
    Failed,
}

/// Outcome for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentReport {
    pub path: PathBuf,
    pub status: DocumentStatus,
    pub rewrites: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DocumentReport {
    fn new(path: &Path, status: DocumentStatus) -> Self {
        Self {
            path: path.to_path_buf(),
            status,
            rewrites: 0,
            diagnostics: Vec::new(),
            error: None,
        }
    }
}

/// Outcome of a whole batch, sorted by path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub pass: String,
    pub dry_run: bool,
    pub documents: Vec<DocumentReport>,
}

impl BatchReport {
    pub fn changed(&self) -> impl Iterator<Item = &DocumentReport> {
        self.with_status(DocumentStatus::Changed)
    }

    pub fn failed(&self) -> impl Iterator<Item = &DocumentReport> {
        self.with_status(DocumentStatus::Failed)
    }

    pub fn skipped(&self) -> impl Iterator<Item = &DocumentReport> {
        self.with_status(DocumentStatus::Skipped)
    }

    fn with_status(&self, status: DocumentStatus) -> impl Iterator<Item = &DocumentReport> {
        self.documents.iter().filter(move |doc| doc.status == status)
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    pub dry_run: bool,
    /// Worker threads; 0 uses the global pool.
    pub jobs: usize,
}

/// Runs a pass over every document and persists the changed ones.
#[derive(Debug, Clone, Default)]
pub struct BatchRunner {
    options: BatchOptions,
    cancel: Arc<AtomicBool>,
}

impl BatchRunner {
    pub fn new(options: BatchOptions) -> Self {
        Self {
            options,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Once `cancel` is raised no further documents are started.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn run(&self, pass: &dyn DocumentPass, paths: &[PathBuf]) -> Result<BatchReport> {
        let process = || -> Vec<DocumentReport> {
            paths.par_iter().map(|path| self.process(pass, path)).collect()
        };

        let mut documents = if self.options.jobs > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.options.jobs)
                .build()
                .context("failed to build worker pool")?;
            pool.install(process)
        } else {
            process()
        };
        documents.sort_by(|a, b| a.path.cmp(&b.path));

        Ok(BatchReport {
            pass: pass.name().to_owned(),
            dry_run: self.options.dry_run,
            documents,
        })
    }

    fn process(&self, pass: &dyn DocumentPass, path: &Path) -> DocumentReport {
        if self.cancel.load(Ordering::Relaxed) {
            return DocumentReport::new(path, DocumentStatus::Skipped);
        }

        let document = match fs::read_document(path) {
            Ok(document) => document,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to read document");
                let mut report = DocumentReport::new(path, DocumentStatus::Failed);
                report.error = Some(err.to_string());
                return report;
            }
        };

        let outcome = pass.apply(&document.text);
        for diagnostic in &outcome.diagnostics {
            tracing::warn!(path = %path.display(), "{diagnostic}");
        }

        let mut report = DocumentReport::new(path, DocumentStatus::Unchanged);
        report.rewrites = outcome.rewrites;
        report.diagnostics = outcome.diagnostics.iter().map(ToString::to_string).collect();
        if !document.differs_from(&outcome.text) {
            return report;
        }

        if !self.options.dry_run
            && let Err(err) = fs::write_atomic(path, &outcome.text)
        {
            tracing::warn!(path = %path.display(), error = %err, "failed to write document");
            report.status = DocumentStatus::Failed;
            report.error = Some(err.to_string());
            return report;
        }

        tracing::debug!(path = %path.display(), rewrites = outcome.rewrites, "document changed");
        report.status = DocumentStatus::Changed;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pass::PassOutcome;
    use std::fs as stdfs;

    struct Upper;

    impl DocumentPass for Upper {
        fn name(&self) -> &'static str {
            "upper"
        }

        fn apply(&self, text: &str) -> PassOutcome {
            PassOutcome {
                text: text.to_uppercase(),
                rewrites: usize::from(text != text.to_uppercase()),
                diagnostics: Vec::new(),
            }
        }
    }

    fn fixture(dir: &Path) -> Result<Vec<PathBuf>> {
        let paths = vec![dir.join("b.vue"), dir.join("a.vue"), dir.join("c.vue")];
        stdfs::write(&paths[0], "lower")?;
        stdfs::write(&paths[1], "UPPER")?;
        stdfs::write(&paths[2], "mixed Case")?;
        Ok(paths)
    }

    #[test]
    fn persists_changed_documents_sorted() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let paths = fixture(temp.path())?;

        let report = BatchRunner::new(BatchOptions { dry_run: false, jobs: 2 }).run(&Upper, &paths)?;

        let statuses: Vec<_> = report.documents.iter().map(|d| d.status).collect();
        assert_eq!(
            statuses,
            [
                DocumentStatus::Unchanged,
                DocumentStatus::Changed,
                DocumentStatus::Changed
            ]
        );
        assert_eq!(report.changed().count(), 2);
        assert_eq!(stdfs::read_to_string(temp.path().join("b.vue"))?, "LOWER");
        Ok(())
    }

    #[test]
    fn dry_run_leaves_files_alone() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let paths = fixture(temp.path())?;

        let report = BatchRunner::new(BatchOptions { dry_run: true, jobs: 0 }).run(&Upper, &paths)?;

        assert_eq!(report.changed().count(), 2);
        assert_eq!(stdfs::read_to_string(temp.path().join("b.vue"))?, "lower");
        Ok(())
    }

    #[test]
    fn unreadable_documents_do_not_abort_the_batch() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let mut paths = fixture(temp.path())?;
        paths.push(temp.path().join("missing.vue"));

        let report = BatchRunner::default().run(&Upper, &paths)?;

        assert_eq!(report.failed().count(), 1);
        assert_eq!(report.changed().count(), 2);
        let failed = report.failed().next().expect("failed document");
        assert!(failed.error.as_deref().is_some_and(|e| e.contains("missing.vue")));
        Ok(())
    }

    #[test]
    fn cancelled_batches_skip_remaining_documents() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let paths = fixture(temp.path())?;

        let cancel = Arc::new(AtomicBool::new(false));
        let runner = BatchRunner::default().with_cancel_flag(cancel.clone());
        cancel.store(true, Ordering::Relaxed);
        let report = runner.run(&Upper, &paths)?;

        assert!(report.documents.iter().all(|d| d.status == DocumentStatus::Skipped));
        assert_eq!(stdfs::read_to_string(temp.path().join("b.vue"))?, "lower");
        Ok(())
    }

    #[test]
    fn report_serializes_to_json() -> Result<()> {
        let report = BatchReport {
            pass: "convert".into(),
            dry_run: false,
            documents: vec![DocumentReport::new(Path::new("a.vue"), DocumentStatus::Changed)],
        };
        let json = serde_json::to_value(&report)?;
        assert_eq!(json["documents"][0]["status"], "changed");
        assert!(json["documents"][0].get("error").is_none());
        Ok(())
    }
}
