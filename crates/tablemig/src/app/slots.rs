//! Slot name resolution for columns carrying custom content.

use std::collections::HashSet;

use crate::domain::model::ColumnSpec;
use crate::infra::tables::SlotNameTable;

const FALLBACK_PREFIX: &str = "col_";

/// Assigns document-unique slot names.
///
/// Resolution order is the column's field key, then the label lookup table, then
/// a slug of the title, then the column's ordinal position. Names never depend
/// on hashing, so repeated runs over the same input agree.
#[derive(Debug)]
pub struct SlotNameResolver<'t> {
    table: &'t SlotNameTable,
    used: HashSet<String>,
}

impl<'t> SlotNameResolver<'t> {
    pub fn new(table: &'t SlotNameTable) -> Self {
        Self {
            table,
            used: HashSet::new(),
        }
    }

    /// Mark a name as taken, e.g. a slot already declared in the document.
    pub fn reserve(&mut self, name: impl Into<String>) {
        self.used.insert(name.into());
    }

    /// Resolve the slot name for `spec`, the column at 1-based `position` in its table.
    pub fn resolve(&mut self, spec: &ColumnSpec, position: usize) -> String {
        let candidate = self.candidate(spec, position);
        let mut name = candidate.clone();
        let mut n = 2;
        while self.used.contains(&name) {
            name = format!("{candidate}_{n}");
            n += 1;
        }
        self.used.insert(name.clone());
        name
    }

    fn candidate(&self, spec: &ColumnSpec, position: usize) -> String {
        if let Some(key) = spec.field_key.as_deref().filter(|key| !key.is_empty()) {
            return sanitize_key(key);
        }

        let title = spec.title.as_deref().map(str::trim).unwrap_or_default();
        if let Some(known) = self.table.lookup(title) {
            return known.to_owned();
        }

        match slug(title) {
            Some(slug) => format!("{FALLBACK_PREFIX}{slug}"),
            None => format!("{FALLBACK_PREFIX}{position}"),
        }
    }
}

fn is_slot_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Field keys are kept verbatim unless they contain characters a slot directive
/// name cannot carry (`metadata.name` would read as modifiers).
fn sanitize_key(key: &str) -> String {
    if key.chars().all(is_slot_char) {
        return key.to_owned();
    }
    key.chars()
        .map(|c| if is_slot_char(c) { c } else { '_' })
        .collect()
}

/// Identifier slug of an ASCII title; `None` when the title cannot be rendered
/// into a stable identifier.
fn slug(title: &str) -> Option<String> {
    if title.is_empty() || !title.is_ascii() {
        return None;
    }
    let joined = title.split_whitespace().collect::<Vec<_>>().join("_");
    let slug: String = joined.chars().filter(|c| is_slot_char(*c)).collect();
    let slug = slug.trim_matches('_');
    (!slug.is_empty()).then(|| slug.to_owned())
}
