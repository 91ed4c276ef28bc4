//! Per-document conversion of legacy column markup into column arrays.

use std::ops::Range;

use crate::app::builder::{ColumnModelBuilder, VariableNames};
use crate::app::columns::ColumnScanner;
use crate::app::markup::{self, OpenTag};
use crate::app::pass::{DocumentPass, PassOutcome};
use crate::app::region::{self, RegionRewriter};
use crate::app::slots::SlotNameResolver;
use crate::app::template::TemplateRewriter;
use crate::domain::errors::DomainError;
use crate::infra::config::Config;
use crate::infra::tables::SlotNameTable;

const SCRIPT: &str = "script";

/// Markup vocabulary the transformer operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOptions {
    pub table_element: String,
    pub column_element: String,
    pub columns_variable: String,
    pub drop_header_templates: bool,
}

impl TransformOptions {
    pub fn from_config(config: &Config) -> Self {
        let markup = &config.markup;
        Self {
            table_element: markup.table_element.clone(),
            column_element: markup.column_element.clone(),
            columns_variable: markup.columns_variable.clone(),
            drop_header_templates: markup.drop_header_templates(),
        }
    }
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Converts every legacy table of a document and declares the resulting column
/// arrays in the document's `<script setup>` block.
#[derive(Debug, Clone)]
pub struct DocumentTransformer {
    options: TransformOptions,
    slot_names: SlotNameTable,
    scanner: ColumnScanner,
    templates: TemplateRewriter,
}

impl DocumentTransformer {
    pub fn new(options: TransformOptions, slot_names: SlotNameTable) -> Self {
        Self {
            scanner: ColumnScanner::new(options.column_element.clone()),
            templates: TemplateRewriter::new(options.drop_header_templates),
            options,
            slot_names,
        }
    }

    pub fn transform(&self, text: &str) -> PassOutcome {
        let table_element = self.options.table_element.as_str();
        let (regions, mut diagnostics) = region::find_regions(text, table_element);

        let mut builder =
            ColumnModelBuilder::new(SlotNameResolver::new(&self.slot_names), &self.templates);
        builder.reserve_declared_slots(text);
        let mut names = VariableNames::new(self.options.columns_variable.as_str(), text);
        let rewriter = RegionRewriter::new(table_element, &self.templates);

        let mut edits: Vec<(Range<usize>, String)> = Vec::new();
        let mut arrays = Vec::new();
        for region in &regions {
            let declarations = self.scanner.scan(region.body);
            if declarations.is_empty() {
                continue;
            }
            if region::binds_columns(region, table_element) {
                tracing::debug!(offset = region.start, "table already binds :columns");
                diagnostics.push(DomainError::ColumnsAlreadyBound {
                    offset: region.start,
                });
                continue;
            }

            builder.reserve_table_slots(region.body, &declarations);
            let built = builder.build(&declarations, region.body_offset(), self.scanner.element());
            let mut model = match built {
                Ok(model) => model,
                Err(err) => {
                    tracing::debug!(offset = region.start, error = %err, "table left untouched");
                    diagnostics.push(err);
                    continue;
                }
            };
            let variable = names.allocate();
            let replacement = rewriter.render(text, region, &declarations, &model, &variable);
            diagnostics.append(&mut model.diagnostics);
            edits.push((region.span(), replacement));
            arrays.push(model.into_array(variable));
        }

        if arrays.is_empty() {
            return PassOutcome::unchanged(text, diagnostics);
        }

        let declarations = arrays
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n\n");
        edits.push(declaration_edit(text, &declarations));

        PassOutcome {
            text: apply_edits(text, edits),
            rewrites: arrays.len(),
            diagnostics,
        }
    }
}

impl DocumentPass for DocumentTransformer {
    fn name(&self) -> &'static str {
        "convert"
    }

    fn apply(&self, text: &str) -> PassOutcome {
        self.transform(text)
    }
}

fn script_tags(text: &str) -> Vec<OpenTag> {
    let mut tags = Vec::new();
    let mut cursor = 0;
    while let Some(tag) = markup::find_open_tag(text, SCRIPT, cursor) {
        cursor = tag.span.end;
        tags.push(tag);
    }
    tags
}

/// Insert declarations right after `<script setup …>`, or append a new setup
/// block carrying the `lang` of any existing script.
fn declaration_edit(text: &str, declarations: &str) -> (Range<usize>, String) {
    let tags = script_tags(text);
    let setup = tags.iter().find(|tag| {
        markup::attributes(&text[tag.attrs.clone()])
            .iter()
            .any(|attr| attr.name == "setup")
    });
    if let Some(tag) = setup {
        let at = tag.span.end;
        return (at..at, format!("\n{declarations}\n"));
    }

    let lang = tags.iter().find_map(|tag| {
        markup::attributes(&text[tag.attrs.clone()])
            .into_iter()
            .find(|attr| attr.name == "lang")
            .and_then(|attr| attr.value)
    });
    let open = match lang {
        Some(lang) => format!("<{SCRIPT} setup lang=\"{lang}\">"),
        None => format!("<{SCRIPT} setup>"),
    };
    let separator = if text.ends_with('\n') { "\n" } else { "\n\n" };
    (
        text.len()..text.len(),
        format!("{separator}{open}\n{declarations}\n</{SCRIPT}>\n"),
    )
}

/// Apply non-overlapping edits last-first so earlier offsets stay valid.
fn apply_edits(text: &str, mut edits: Vec<(Range<usize>, String)>) -> String {
    edits.sort_by_key(|(range, _)| range.start);
    let mut out = text.to_owned();
    for (range, replacement) in edits.into_iter().rev() {
        out.replace_range(range, &replacement);
    }
    out
}
