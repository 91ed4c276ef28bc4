//! Table region location and rewriting.

use std::ops::Range;

use crate::app::builder::TableModel;
use crate::app::markup::{self, find_matching_close, find_open_tag};
use crate::app::template::TemplateRewriter;
use crate::domain::errors::DomainError;
use crate::domain::model::{ColumnDeclaration, TableRegion};

const COLUMNS_ATTRS: [&str; 3] = [":columns", "v-bind:columns", "columns"];
const ROW_SELECTION_ATTRS: [&str; 3] = [":row-selection", "v-bind:row-selection", "row-selection"];
const ROW_SELECTION: &str = r#":row-selection="{ type: 'checkbox', showCheckedAll: true }""#;

/// Locate every table region in `text`, in document order.
///
/// Nested tables stay inside their outer region. A table without a closing tag
/// ends the search.
pub fn find_regions<'a>(text: &'a str, element: &str) -> (Vec<TableRegion<'a>>, Vec<DomainError>) {
    let mut regions = Vec::new();
    let mut diagnostics = Vec::new();
    let mut cursor = 0;

    while let Some(open) = find_open_tag(text, element, cursor) {
        if open.self_closing {
            cursor = open.span.end;
            continue;
        }
        let Some(close) = find_matching_close(text, element, open.span.end) else {
            diagnostics.push(DomainError::UnterminatedBlock {
                element: element.to_owned(),
                offset: open.span.start,
            });
            break;
        };

        regions.push(TableRegion {
            open_tag: &text[open.span.clone()],
            body: &text[open.span.end..close.start],
            close_tag: &text[close.clone()],
            start: open.span.start,
            end: close.end,
        });
        cursor = close.end;
    }

    (regions, diagnostics)
}

/// Attribute text of an opening tag of `element`.
fn tag_attrs<'a>(open_tag: &'a str, element: &str) -> &'a str {
    let inner = open_tag
        .strip_prefix('<')
        .and_then(|tag| tag.strip_prefix(element))
        .unwrap_or(open_tag);
    let inner = inner.strip_suffix('>').unwrap_or(inner);
    inner.strip_suffix('/').unwrap_or(inner)
}

fn has_attr(attrs: &str, names: &[&str]) -> bool {
    markup::attributes(attrs)
        .iter()
        .any(|attr| names.contains(&attr.name))
}

/// Whether the table already binds a column array.
pub fn binds_columns(region: &TableRegion<'_>, element: &str) -> bool {
    has_attr(tag_attrs(region.open_tag, element), &COLUMNS_ATTRS)
}

/// Renders replacement text for table regions.
#[derive(Debug)]
pub struct RegionRewriter<'r> {
    element: &'r str,
    templates: &'r TemplateRewriter,
}

impl<'r> RegionRewriter<'r> {
    pub fn new(element: &'r str, templates: &'r TemplateRewriter) -> Self {
        Self { element, templates }
    }

    /// Replacement for the whole region: new opening tag, new body, original
    /// closing tag.
    pub fn render(
        &self,
        document: &str,
        region: &TableRegion<'_>,
        declarations: &[ColumnDeclaration<'_>],
        model: &TableModel,
        variable: &str,
    ) -> String {
        let close_indent = markup::indent_of_line(document, region.start);
        let mut out = self.open_tag(region, model.has_selection, variable);
        out.push_str(&self.body(region.body, declarations, model, close_indent));
        out.push_str(region.close_tag);
        out
    }

    fn open_tag(&self, region: &TableRegion<'_>, has_selection: bool, variable: &str) -> String {
        let tag = region.open_tag;
        let head = tag.strip_suffix('>').unwrap_or(tag).trim_end();
        let mut out = format!("{head} :columns=\"{variable}\"");
        if has_selection && !has_attr(tag_attrs(tag, self.element), &ROW_SELECTION_ATTRS) {
            out.push(' ');
            out.push_str(ROW_SELECTION);
        }
        out.push('>');
        out
    }

    fn body(
        &self,
        body: &str,
        declarations: &[ColumnDeclaration<'_>],
        model: &TableModel,
        close_indent: &str,
    ) -> String {
        let indent = declarations
            .first()
            .filter(|first| body[..first.span.start].contains('\n'))
            .and_then(|first| markup::line_indent(body, first.span.start))
            .map_or_else(|| format!("{close_indent}  "), str::to_owned);

        let mut blocks = Vec::new();
        for slot in &model.slots {
            let content = declarations
                .get(slot.declaration)
                .and_then(|declaration| declaration.content)
                .unwrap_or_default();
            let block = self.templates.rewrite(content, &slot.slot_name, &indent);
            if !block.is_empty() {
                blocks.push(block);
            }
        }

        for range in residue(body, declarations) {
            let piece = &body[range.clone()];
            let trimmed = piece.trim();
            if trimmed.is_empty() {
                continue;
            }
            let offset = range.start + (piece.len() - piece.trim_start().len());
            let old = markup::indent_of_line(body, offset);
            blocks.push(markup::reindent(trimmed, old, &indent));
        }

        if blocks.is_empty() {
            return String::new();
        }
        let mut out = String::new();
        for block in blocks {
            out.push('\n');
            out.push_str(&indent);
            out.push_str(&block);
        }
        out.push('\n');
        out.push_str(close_indent);
        out
    }
}

/// Body ranges not covered by any column declaration.
pub fn residue(body: &str, declarations: &[ColumnDeclaration<'_>]) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut cursor = 0;
    for declaration in declarations {
        if declaration.span.start > cursor {
            ranges.push(cursor..declaration.span.start);
        }
        cursor = cursor.max(declaration.span.end);
    }
    if cursor < body.len() {
        ranges.push(cursor..body.len());
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::builder::ColumnModelBuilder;
    use crate::app::columns::ColumnScanner;
    use crate::app::slots::SlotNameResolver;
    use crate::infra::tables::SlotNameTable;

    fn convert(document: &str) -> String {
        let (regions, diagnostics) = find_regions(document, "a-table");
        assert!(diagnostics.is_empty());
        let region = &regions[0];

        let table = SlotNameTable::default();
        let templates = TemplateRewriter::new(true);
        let mut builder = ColumnModelBuilder::new(SlotNameResolver::new(&table), &templates);
        let declarations = ColumnScanner::new("a-table-column").scan(region.body);
        builder.reserve_table_slots(region.body, &declarations);
        let model = builder
            .build(&declarations, region.body_offset(), "a-table-column")
            .expect("rebindable scopes");

        RegionRewriter::new("a-table", &templates).render(
            document,
            region,
            &declarations,
            &model,
            "tableColumns",
        )
    }

    #[test]
    fn finds_regions_in_order() {
        let text = "<a-table a>x</a-table>\n<a-table b />\n<a-table c>y</a-table>";
        let (regions, diagnostics) = find_regions(text, "a-table");
        assert!(diagnostics.is_empty());
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].body, "x");
        assert_eq!(regions[1].open_tag, "<a-table c>");
        assert_eq!(&text[regions[1].span()], "<a-table c>y</a-table>");
    }

    #[test]
    fn reports_unterminated_table() {
        let (regions, diagnostics) = find_regions("<a-table>\n<a-table-column />", "a-table");
        assert!(regions.is_empty());
        assert_eq!(
            diagnostics,
            vec![DomainError::UnterminatedBlock {
                element: "a-table".into(),
                offset: 0
            }]
        );
    }

    #[test]
    fn detects_bound_columns() {
        let text = "<a-table :columns=\"cols\"></a-table><a-table :data=\"rows\"></a-table>";
        let (regions, _) = find_regions(text, "a-table");
        assert!(binds_columns(&regions[0], "a-table"));
        assert!(!binds_columns(&regions[1], "a-table"));
    }

    #[test]
    fn rewrites_plain_table_to_empty_body() {
        let document = "  <a-table :data=\"rows\">\n    <a-table-column label=\"Name\" prop=\"name\" />\n  </a-table>";
        assert_eq!(
            convert(document),
            "<a-table :data=\"rows\" :columns=\"tableColumns\"></a-table>"
        );
    }

    #[test]
    fn adds_row_selection_once() {
        let document = "<a-table>\n  <a-table-column type=\"selection\" />\n  <a-table-column type=\"selection\" />\n</a-table>";
        let rendered = convert(document);
        assert_eq!(rendered.matches(":row-selection").count(), 1);
        assert!(rendered.starts_with(&format!("<a-table :columns=\"tableColumns\" {ROW_SELECTION}>")));

        let document = "<a-table :row-selection=\"sel\">\n  <a-table-column type=\"selection\" />\n</a-table>";
        assert_eq!(convert(document).matches(":row-selection").count(), 1);
    }

    #[test]
    fn emits_slot_templates_then_residue() {
        let document = concat!(
            "  <a-table :data=\"rows\">\n",
            "    <a-table-column label=\"Name\" prop=\"name\">\n",
            "      <template #default=\"{ row }\">\n",
            "        <b>{{ row.name }}</b>\n",
            "      </template>\n",
            "    </a-table-column>\n",
            "    <template #empty>\n",
            "      <span>none</span>\n",
            "    </template>\n",
            "  </a-table>",
        );
        assert_eq!(
            convert(document),
            concat!(
                "<a-table :data=\"rows\" :columns=\"tableColumns\">\n",
                "    <template #name=\"{ record }\">\n",
                "      <b>{{ record.name }}</b>\n",
                "    </template>\n",
                "    <template #empty>\n",
                "      <span>none</span>\n",
                "    </template>\n",
                "  </a-table>",
            )
        );
    }
}
