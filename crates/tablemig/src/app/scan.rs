//! Document discovery under a root directory.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, bail};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::{DirEntry, WalkBuilder, WalkState};

use crate::infra::config::Config;

const TABLEMIG_IGNORE: &str = ".tablemigignore";

/// Configuration inputs for the scanner.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub root: PathBuf,
    pub pattern: String,
    pub config: Config,
}

impl ScannerConfig {
    pub fn from_root(root: PathBuf, config: Config) -> Self {
        Self {
            root,
            pattern: config.defaults.pattern.clone(),
            config,
        }
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }
}

/// Scanner walking the root, respecting ignore rules, and collecting the
/// documents matching the configured pattern.
#[derive(Debug, Default)]
pub struct Scanner;

impl Scanner {
    pub fn new() -> Self {
        Self
    }

    /// Paths of all matching documents, sorted.
    pub fn scan(&self, cfg: &ScannerConfig) -> Result<Vec<PathBuf>> {
        if !cfg.root.is_dir() {
            bail!("document root {} is not a directory", cfg.root.display());
        }

        let matcher = Arc::new(build_ignore_matcher(&cfg.root, cfg)?);
        let documents = Arc::new(
            Glob::new(&cfg.pattern)
                .with_context(|| format!("invalid document pattern: {}", cfg.pattern))?
                .compile_matcher(),
        );

        let mut builder = WalkBuilder::new(&cfg.root);
        builder.git_ignore(true).require_git(false).hidden(true);

        let root = cfg.root.clone();
        builder.filter_entry({
            let matcher = matcher.clone();
            move |entry| {
                if entry.depth() == 0 {
                    return true;
                }
                let rel = entry.path().strip_prefix(&root).unwrap_or(entry.path());
                !matcher.should_skip(rel)
            }
        });

        let files = Mutex::new(Vec::new());
        let root = Arc::new(cfg.root.clone());

        builder.build_parallel().run(|| {
            let files = &files;
            let root = root.clone();
            let documents = documents.clone();
            Box::new(move |result| match result {
                Ok(entry) => {
                    if is_document(&entry, &root, &documents)
                        && let Ok(mut guard) = files.lock()
                    {
                        guard.push(entry.into_path());
                    }
                    WalkState::Continue
                }
                Err(err) => {
                    tracing::warn!(error = %err, "scanner error");
                    WalkState::Continue
                }
            })
        });

        let mut files = files.into_inner().unwrap_or_default();
        files.sort();
        tracing::debug!(root = %cfg.root.display(), documents = files.len(), "scan complete");
        Ok(files)
    }
}

fn is_document(entry: &DirEntry, root: &Path, documents: &globset::GlobMatcher) -> bool {
    if !entry.file_type().is_some_and(|kind| kind.is_file()) {
        return false;
    }
    let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
    documents.is_match(rel)
}

#[derive(Debug, Clone)]
struct IgnoreMatcher {
    globs: Option<GlobSet>,
}

impl IgnoreMatcher {
    fn should_skip(&self, rel: &Path) -> bool {
        self.globs.as_ref().is_some_and(|set| set.is_match(rel))
    }
}

fn build_ignore_matcher(root: &Path, cfg: &ScannerConfig) -> Result<IgnoreMatcher> {
    let mut builder = GlobSetBuilder::new();

    for pattern in &cfg.config.ignore.paths {
        for expanded in expand_dir_pattern(pattern) {
            let glob = Glob::new(&expanded).context("invalid ignore path pattern")?;
            builder.add(glob);
        }
    }

    for glob in &cfg.config.ignore.globs {
        let glob = Glob::new(glob).context("invalid ignore glob")?;
        builder.add(glob);
    }

    for pattern in load_tablemigignore(root)? {
        for expanded in expand_dir_pattern(&pattern) {
            let glob = Glob::new(&expanded).context("invalid .tablemigignore pattern")?;
            builder.add(glob);
        }
    }

    let globs = builder.build().context("failed to build ignore matcher")?;

    Ok(IgnoreMatcher { globs: Some(globs) })
}

fn expand_dir_pattern(raw: &str) -> Vec<String> {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Vec::new();
    }
    vec![
        trimmed.to_owned(),
        format!("{trimmed}/**"),
        format!("**/{trimmed}"),
        format!("**/{trimmed}/**"),
    ]
}

fn load_tablemigignore(root: &Path) -> Result<Vec<String>> {
    let path = root.join(TABLEMIG_IGNORE);
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(&path).with_context(|| format!("failed to open {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut patterns = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        patterns.push(trimmed.to_owned());
    }
    Ok(patterns)
}
