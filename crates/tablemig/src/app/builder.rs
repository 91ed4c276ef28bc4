//! Column model construction for one table region.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::app::attributes;
use crate::app::region;
use crate::app::slots::SlotNameResolver;
use crate::app::template::{self, TemplateRewriter};
use crate::domain::errors::DomainError;
use crate::domain::model::{ColumnArray, ColumnDeclaration, ColumnSpec};

static DECLARED_SLOT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"slotName:\s*['"]([^'"]+)['"]"#).expect("valid slot pattern"));

/// A custom-content column awaiting its template rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotColumn {
    /// Index of the declaration within the table.
    pub declaration: usize,
    pub slot_name: String,
}

/// Column model of a single table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableModel {
    pub columns: Vec<ColumnSpec>,
    pub has_selection: bool,
    pub slots: Vec<SlotColumn>,
    pub diagnostics: Vec<DomainError>,
}

impl TableModel {
    pub fn into_array(self, variable: String) -> ColumnArray {
        ColumnArray {
            variable,
            columns: self.columns,
        }
    }
}

/// Builds column models for every table of one document.
///
/// Slot names are unique across the whole document, so one builder must be used
/// for all tables of a document, in region order.
#[derive(Debug)]
pub struct ColumnModelBuilder<'t> {
    slots: SlotNameResolver<'t>,
    rewriter: &'t TemplateRewriter,
}

impl<'t> ColumnModelBuilder<'t> {
    pub fn new(slots: SlotNameResolver<'t>, rewriter: &'t TemplateRewriter) -> Self {
        Self { slots, rewriter }
    }

    /// Reserve slot names the document already declares.
    pub fn reserve_declared_slots(&mut self, document: &str) {
        for caps in DECLARED_SLOT.captures_iter(document) {
            self.slots.reserve(&caps[1]);
        }
    }

    /// Reserve the names of table-level slots kept from a table body, such as
    /// `#empty`.
    pub fn reserve_table_slots(&mut self, body: &str, declarations: &[ColumnDeclaration<'_>]) {
        for range in region::residue(body, declarations) {
            for name in template::slot_names(&body[range]) {
                self.slots.reserve(name);
            }
        }
    }

    /// Build the model for one table from its declarations.
    ///
    /// `body_offset` is the document offset of the table body and only feeds
    /// diagnostics. Fails without resolving any slot name when a column's cell
    /// scope cannot be rebound.
    pub fn build(
        &mut self,
        declarations: &[ColumnDeclaration<'_>],
        body_offset: usize,
        column_element: &str,
    ) -> Result<TableModel, DomainError> {
        for declaration in declarations {
            let Some(content) = declaration.content else {
                continue;
            };
            if let Err(scope) = self.rewriter.check_scopes(content) {
                return Err(DomainError::UnsupportedSlotScope {
                    offset: body_offset + declaration.span.start,
                    scope: scope.to_owned(),
                });
            }
        }

        let mut columns = Vec::with_capacity(declarations.len());
        let mut slots = Vec::new();
        let mut diagnostics = Vec::new();
        let mut has_selection = false;

        for (index, declaration) in declarations.iter().enumerate() {
            let offset = body_offset + declaration.span.start;
            if declaration.inferred_end {
                diagnostics.push(DomainError::UnterminatedBlock {
                    element: column_element.to_owned(),
                    offset,
                });
            }

            let mut spec = attributes::extract(declaration.attrs);
            if spec.is_empty() {
                diagnostics.push(DomainError::UnparseableColumn { offset });
            }
            if spec.is_selection {
                has_selection = true;
                continue;
            }

            let custom = declaration
                .content
                .is_some_and(|content| self.rewriter.has_custom_content(content));
            if custom {
                let slot_name = self.slots.resolve(&spec, index + 1);
                slots.push(SlotColumn {
                    declaration: index,
                    slot_name: slot_name.clone(),
                });
                spec.slot_name = Some(slot_name);
            }
            columns.push(spec);
        }

        Ok(TableModel {
            columns,
            has_selection,
            slots,
            diagnostics,
        })
    }
}

/// Allocates column-array variable names unique within a document.
#[derive(Debug, Clone)]
pub struct VariableNames {
    base: String,
    taken: HashSet<String>,
    next: usize,
}

impl VariableNames {
    /// Names already appearing in `document` as identifiers are skipped.
    pub fn new(base: impl Into<String>, document: &str) -> Self {
        let base = base.into();
        let pattern = Regex::new(&format!(r"\b{}\d*\b", regex::escape(&base)));
        let taken = match pattern {
            Ok(pattern) => pattern
                .find_iter(document)
                .map(|m| m.as_str().to_owned())
                .collect(),
            Err(err) => {
                tracing::warn!(error = %err, base = %base, "invalid columns variable name");
                HashSet::new()
            }
        };
        Self {
            base,
            taken,
            next: 1,
        }
    }

    /// `base`, then `base2`, `base3`, … skipping taken names.
    pub fn allocate(&mut self) -> String {
        loop {
            let name = if self.next == 1 {
                self.base.clone()
            } else {
                format!("{}{}", self.base, self.next)
            };
            self.next += 1;
            if self.taken.insert(name.clone()) {
                return name;
            }
        }
    }
}
