//! Domain models for documents, table regions, and column arrays.

use std::fmt;
use std::ops::Range;
use std::path::PathBuf;

/// A template document read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub path: PathBuf,
    pub text: String,
}

impl Document {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    /// Whether `text` differs from the version held by this document.
    pub fn differs_from(&self, text: &str) -> bool {
        self.text != text
    }
}

/// A table element located inside a document, borrowed from the document text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRegion<'a> {
    pub open_tag: &'a str,
    pub body: &'a str,
    pub close_tag: &'a str,
    /// Offset of the opening `<` in the document.
    pub start: usize,
    /// Offset just past the closing tag's `>`.
    pub end: usize,
}

impl TableRegion<'_> {
    pub fn span(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Document offset at which the body starts.
    pub fn body_offset(&self) -> usize {
        self.start + self.open_tag.len()
    }
}

/// One legacy column element found in a table body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDeclaration<'a> {
    /// Attribute text between the element name and `>` or `/>`.
    pub attrs: &'a str,
    /// Text between the opening and closing tag, absent for self-closing columns.
    pub content: Option<&'a str>,
    /// Span of the whole declaration relative to the table body.
    pub span: Range<usize>,
    /// Set when the closing tag was missing and the extent had to be inferred.
    pub inferred_end: bool,
}

/// Side a column is pinned to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixedSide {
    Left,
    Right,
    /// Unrecognized value, passed through unchanged.
    Other(String),
}

impl FixedSide {
    pub fn parse(value: &str) -> Self {
        match value {
            "left" => FixedSide::Left,
            "right" => FixedSide::Right,
            other => FixedSide::Other(other.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FixedSide::Left => "left",
            FixedSide::Right => "right",
            FixedSide::Other(value) => value,
        }
    }
}

/// Horizontal alignment of a column's cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
    Right,
    Other(String),
}

impl Alignment {
    pub fn parse(value: &str) -> Self {
        match value {
            "left" => Alignment::Left,
            "center" => Alignment::Center,
            "right" => Alignment::Right,
            other => Alignment::Other(other.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Other(value) => value,
        }
    }
}

/// Normalized description of a single column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSpec {
    pub title: Option<String>,
    pub field_key: Option<String>,
    pub width: Option<u32>,
    pub fixed: Option<FixedSide>,
    pub align: Option<Alignment>,
    pub ellipsis: bool,
    pub tooltip: bool,
    pub is_selection: bool,
    /// Present iff the column carries custom cell content.
    pub slot_name: Option<String>,
}

impl ColumnSpec {
    /// True when no recognized attribute was found.
    pub fn is_empty(&self) -> bool {
        *self == ColumnSpec::default()
    }
}

impl fmt::Display for ColumnSpec {
    /// Renders the column as a JavaScript object literal.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(title) = &self.title {
            parts.push(format!("title: {}", js_string(title)));
        }
        if let Some(key) = &self.field_key {
            parts.push(format!("dataIndex: {}", js_string(key)));
        }
        if let Some(slot) = &self.slot_name {
            parts.push(format!("slotName: {}", js_string(slot)));
        }
        if let Some(width) = self.width {
            parts.push(format!("width: {width}"));
        }
        if let Some(fixed) = &self.fixed {
            parts.push(format!("fixed: {}", js_string(fixed.as_str())));
        }
        if self.ellipsis {
            parts.push("ellipsis: true".to_owned());
        }
        if self.tooltip {
            parts.push("tooltip: true".to_owned());
        }
        if let Some(align) = &self.align {
            parts.push(format!("align: {}", js_string(align.as_str())));
        }

        if parts.is_empty() {
            f.write_str("{}")
        } else {
            write!(f, "{{ {} }}", parts.join(", "))
        }
    }
}

/// Ordered column configuration bound to a script variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnArray {
    pub variable: String,
    pub columns: Vec<ColumnSpec>,
}

impl fmt::Display for ColumnArray {
    /// Renders the `const` declaration injected into the logic section.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.columns.is_empty() {
            return write!(f, "const {} = []", self.variable);
        }
        writeln!(f, "const {} = [", self.variable)?;
        let rendered: Vec<String> = self
            .columns
            .iter()
            .map(|column| format!("  {column}"))
            .collect();
        writeln!(f, "{}", rendered.join(",\n"))?;
        f.write_str("]")
    }
}

fn js_string(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_fields_in_canonical_order() {
        let spec = ColumnSpec {
            title: Some("Name".into()),
            field_key: Some("name".into()),
            width: Some(120),
            fixed: Some(FixedSide::Left),
            align: Some(Alignment::Center),
            ellipsis: true,
            tooltip: true,
            slot_name: Some("name".into()),
            ..ColumnSpec::default()
        };
        assert_eq!(
            spec.to_string(),
            "{ title: 'Name', dataIndex: 'name', slotName: 'name', width: 120, fixed: 'left', ellipsis: true, tooltip: true, align: 'center' }"
        );
    }

    #[test]
    fn empty_spec_renders_as_empty_object() {
        assert_eq!(ColumnSpec::default().to_string(), "{}");
        assert!(ColumnSpec::default().is_empty());
    }

    #[test]
    fn escapes_quotes_in_titles() {
        let spec = ColumnSpec {
            title: Some("It's".into()),
            ..ColumnSpec::default()
        };
        assert_eq!(spec.to_string(), r"{ title: 'It\'s' }");
    }

    #[test]
    fn unknown_fixed_side_passes_through() {
        assert_eq!(FixedSide::parse("top").as_str(), "top");
        assert_eq!(FixedSide::parse("right"), FixedSide::Right);
    }

    #[test]
    fn renders_array_declaration() {
        let array = ColumnArray {
            variable: "tableColumns".into(),
            columns: vec![
                ColumnSpec {
                    title: Some("A".into()),
                    ..ColumnSpec::default()
                },
                ColumnSpec::default(),
            ],
        };
        assert_eq!(
            array.to_string(),
            "const tableColumns = [\n  { title: 'A' },\n  {}\n]"
        );

        let empty = ColumnArray {
            variable: "tableColumns2".into(),
            columns: Vec::new(),
        };
        assert_eq!(empty.to_string(), "const tableColumns2 = []");
    }
}
