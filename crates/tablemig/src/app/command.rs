//! Command wiring: config, discovery, pass construction, batch.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use anyhow::{Context, Result};

use crate::app::batch::{BatchOptions, BatchReport, BatchRunner};
use crate::app::imports::ImportCleaner;
use crate::app::pass::DocumentPass;
use crate::app::scan::{Scanner, ScannerConfig};
use crate::app::transform::{DocumentTransformer, TransformOptions};
use crate::infra::config::Config;
use crate::infra::tables::MigrationTables;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    Convert,
    CleanImports,
}

/// Flags given on the command line; they win over every config layer.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub dry_run: bool,
    pub pattern: Option<String>,
    pub jobs: Option<usize>,
}

fn build_pass(kind: PassKind, config: &Config, tables: MigrationTables) -> Box<dyn DocumentPass> {
    match kind {
        PassKind::Convert => Box::new(DocumentTransformer::new(
            TransformOptions::from_config(config),
            tables.slot_names,
        )),
        PassKind::CleanImports => Box::new(ImportCleaner::new(tables.icons)),
    }
}

/// Run one pass over every document under `root`.
pub fn execute(kind: PassKind, root: &Path, overrides: RunOverrides) -> Result<BatchReport> {
    execute_with_cancel(kind, root, overrides, Arc::new(AtomicBool::new(false)))
}

/// Like [`execute`], but stops starting new documents once `cancel` is raised.
pub fn execute_with_cancel(
    kind: PassKind,
    root: &Path,
    overrides: RunOverrides,
    cancel: Arc<AtomicBool>,
) -> Result<BatchReport> {
    let config = Config::load(root).context("failed to load configuration")?;
    let tables = MigrationTables::bundled()?;

    let mut scan = ScannerConfig::from_root(root.to_path_buf(), config.clone());
    if let Some(pattern) = overrides.pattern {
        scan = scan.with_pattern(pattern);
    }
    let paths = Scanner::new()
        .scan(&scan)
        .with_context(|| format!("failed to list documents under {}", root.display()))?;
    tracing::info!(documents = paths.len(), root = %root.display(), "discovered documents");

    let pass = build_pass(kind, &config, tables);
    let runner = BatchRunner::new(BatchOptions {
        dry_run: overrides.dry_run,
        jobs: overrides.jobs.unwrap_or(config.defaults.jobs),
    })
    .with_cancel_flag(cancel);
    runner.run(pass.as_ref(), &paths)
}
