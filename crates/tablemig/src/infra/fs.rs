//! Document IO.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::domain::errors::PersistError;
use crate::domain::model::Document;

pub fn read_document(path: &Path) -> Result<Document, PersistError> {
    let text = fs::read_to_string(path).map_err(|source| PersistError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Document::new(path, text))
}

/// Replace the file at `path` with `contents` atomically.
///
/// The new contents are written to a temporary file in the same directory and
/// renamed over the original, so readers see either the old or the new text.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), PersistError> {
    let write_err = |source| PersistError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    let mut file = NamedTempFile::new_in(dir).map_err(write_err)?;
    file.write_all(contents.as_bytes()).map_err(write_err)?;
    file.as_file().sync_all().map_err(write_err)?;
    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(file.path(), metadata.permissions()).map_err(write_err)?;
    }
    file.persist(path).map_err(|err| write_err(err.error))?;
    Ok(())
}
