//! Whole-document rewrite passes run by the batch runner.

use crate::domain::errors::DomainError;

/// Result of running a pass over one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassOutcome {
    pub text: String,
    /// Number of constructs rewritten or removed.
    pub rewrites: usize,
    pub diagnostics: Vec<DomainError>,
}

impl PassOutcome {
    pub fn unchanged(text: &str, diagnostics: Vec<DomainError>) -> Self {
        Self {
            text: text.to_owned(),
            rewrites: 0,
            diagnostics,
        }
    }
}

/// A pure text-to-text rewrite of a single document.
///
/// Passes hold only read-only tables, so one instance is shared by all workers.
pub trait DocumentPass: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, text: &str) -> PassOutcome;
}
