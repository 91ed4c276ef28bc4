//! Domain-specific errors.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Recoverable problems found while transforming a document.
///
/// None of these abort a document; they are reported alongside the result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("column at offset {offset} has no recognized attributes")]
    UnparseableColumn { offset: usize },
    #[error("<{element}> at offset {offset} has no closing tag")]
    UnterminatedBlock { element: String, offset: usize },
    #[error("import block at line {line} has no closing brace")]
    UnterminatedImport { line: usize },
    #[error("table at offset {offset} already binds :columns, left untouched")]
    ColumnsAlreadyBound { offset: usize },
    #[error("column at offset {offset} declares slot scope `{scope}` that cannot be rebound, table left untouched")]
    UnsupportedSlotScope { offset: usize, scope: String },
}

/// I/O failure while reading or persisting a single document.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
