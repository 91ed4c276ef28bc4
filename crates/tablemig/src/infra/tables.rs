//! Bundled, read-only lookup tables for the migration passes.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::Deserialize;

static BUNDLED_TABLES: Lazy<&'static str> =
    Lazy::new(|| include_str!("../../assets/tables.toml"));

/// Known column labels mapped to canonical slot identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct SlotNameTable(BTreeMap<String, String>);

impl SlotNameTable {
    pub fn lookup(&self, label: &str) -> Option<&str> {
        self.0.get(label).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SlotNameTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(label, slot)| (label.into(), slot.into()))
                .collect(),
        )
    }
}

/// Icon identifiers and the import sources they come from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IconTable {
    #[serde(default)]
    pub identifiers: BTreeSet<String>,
    #[serde(default)]
    pub sources: Vec<String>,
}

impl IconTable {
    pub fn new<I, S>(identifiers: I, sources: &[&str]) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            identifiers: identifiers.into_iter().map(Into::into).collect(),
            sources: sources.iter().map(|s| (*s).to_owned()).collect(),
        }
    }

    pub fn is_icon(&self, name: &str) -> bool {
        self.identifiers.contains(name)
    }

    /// Whether `line` mentions one of the icon library sources.
    pub fn references_source(&self, line: &str) -> bool {
        self.sources.iter().any(|source| line.contains(source.as_str()))
    }
}

/// All static tables, loaded once and handed to the passes at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MigrationTables {
    #[serde(default)]
    pub icons: IconTable,
    #[serde(default)]
    pub slot_names: SlotNameTable,
}

impl MigrationTables {
    /// Tables shipped with the binary.
    pub fn bundled() -> Result<Self> {
        Self::from_str(&BUNDLED_TABLES).context("failed to parse bundled migration tables")
    }

    fn from_str(contents: &str) -> Result<Self> {
        let tables: MigrationTables = toml::from_str(contents)?;
        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_tables_parse() -> Result<()> {
        let tables = MigrationTables::bundled()?;
        assert_eq!(tables.slot_names.lookup("操作"), Some("actions"));
        assert_eq!(tables.slot_names.lookup("状态"), Some("status"));
        assert!(tables.icons.is_icon("Search"));
        assert!(tables.icons.is_icon("ElLoading"));
        assert!(tables.icons.references_source("} from '@element-plus/icons-vue'"));
        assert!(!tables.icons.references_source("} from 'lodash'"));
        Ok(())
    }

    #[test]
    fn tables_can_be_substituted() -> Result<()> {
        let tables = MigrationTables::from_str(
            r#"
[icons]
identifiers = ["Star"]
sources = ["my-icons"]

[slot_names]
"Owner" = "owner"
"#,
        )?;
        assert!(tables.icons.is_icon("Star"));
        assert!(!tables.icons.is_icon("Search"));
        assert_eq!(tables.slot_names.lookup("Owner"), Some("owner"));
        assert_eq!(tables.slot_names.len(), 1);
        Ok(())
    }
}
