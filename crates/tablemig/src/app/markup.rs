//! Minimal tag tokenizer for template markup.
//!
//! This is not a parser: it only answers "where is the next element of kind K
//! after offset O", where that element's tag ends, and which attributes the tag
//! carries. Attribute values are honoured when looking for the closing `>`, so
//! expressions such as `:data="rows.filter(r => r.ok)"` do not end a tag early.

use std::ops::Range;

/// An opening (or self-closing) tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenTag {
    /// `<` through `>`.
    pub span: Range<usize>,
    /// Attribute text between the element name and `>` / `/>`.
    pub attrs: Range<usize>,
    pub self_closing: bool,
}

/// A single attribute inside a tag's attribute text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute<'a> {
    pub name: &'a str,
    pub value: Option<&'a str>,
    /// Span of the whole attribute, relative to the attribute text.
    pub span: Range<usize>,
    /// Span of the unquoted value, relative to the attribute text.
    pub value_span: Option<Range<usize>>,
}

impl Attribute<'_> {
    /// Bound attributes hold expressions: `:prop`, `@event`, `#slot`, `v-*`.
    pub fn is_bound(&self) -> bool {
        self.name.starts_with([':', '@', '#']) || self.name.starts_with("v-")
    }
}

/// Find the next opening tag of element `name` at or after `from`.
///
/// The element name must be followed by whitespace, `>` or `/`, so searching for
/// `a-table` never matches `<a-table-column`.
pub fn find_open_tag(text: &str, name: &str, from: usize) -> Option<OpenTag> {
    let needle = format!("<{name}");
    let mut cursor = from;
    while let Some(found) = text.get(cursor..)?.find(&needle) {
        let start = cursor + found;
        let name_end = start + needle.len();
        match text.as_bytes().get(name_end) {
            Some(b) if b.is_ascii_whitespace() || *b == b'>' || *b == b'/' => {
                let gt = tag_end(text, name_end)?;
                let inner = &text[name_end..gt];
                let trimmed = inner.trim_end();
                let self_closing = trimmed.ends_with('/');
                let attrs_end = if self_closing {
                    name_end + trimmed.len() - 1
                } else {
                    gt
                };
                return Some(OpenTag {
                    span: start..gt + 1,
                    attrs: name_end..attrs_end,
                    self_closing,
                });
            }
            Some(_) => cursor = name_end,
            None => return None,
        }
    }
    None
}

/// Find the next closing tag `</name>` at or after `from`.
pub fn find_close_tag(text: &str, name: &str, from: usize) -> Option<Range<usize>> {
    let needle = format!("</{name}");
    let mut cursor = from;
    while let Some(found) = text.get(cursor..)?.find(&needle) {
        let start = cursor + found;
        let after = start + needle.len();
        let rest = &text[after..];
        let trimmed = rest.trim_start();
        if trimmed.starts_with('>') {
            let gt = after + (rest.len() - trimmed.len());
            return Some(start..gt + 1);
        }
        cursor = after;
    }
    None
}

/// Find the closing tag matching an element opened just before `from`,
/// skipping over nested elements of the same kind.
pub fn find_matching_close(text: &str, name: &str, from: usize) -> Option<Range<usize>> {
    let mut depth = 0usize;
    let mut cursor = from;
    loop {
        let close = find_close_tag(text, name, cursor)?;
        match find_open_tag(text, name, cursor) {
            Some(open) if open.span.start < close.start => {
                if !open.self_closing {
                    depth += 1;
                }
                cursor = open.span.end;
            }
            _ => {
                if depth == 0 {
                    return Some(close);
                }
                depth -= 1;
                cursor = close.end;
            }
        }
    }
}

/// Offset of the `>` ending a tag whose name ends at `from`.
pub fn tag_end(text: &str, from: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut quote = None;
    for (offset, &b) in bytes.iter().enumerate().skip(from) {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => return Some(offset),
            None => {}
        }
    }
    None
}

/// Split attribute text into attributes.
pub fn attributes(attrs: &str) -> Vec<Attribute<'_>> {
    let bytes = attrs.as_bytes();
    let mut result = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_whitespace() || bytes[i] == b'/' {
            i += 1;
            continue;
        }

        let start = i;
        while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'=' {
            i += 1;
        }
        let name = &attrs[start..i];

        let mut lookahead = i;
        while lookahead < bytes.len() && bytes[lookahead].is_ascii_whitespace() {
            lookahead += 1;
        }
        if lookahead >= bytes.len() || bytes[lookahead] != b'=' {
            result.push(Attribute {
                name,
                value: None,
                span: start..i,
                value_span: None,
            });
            continue;
        }

        i = lookahead + 1;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let value_span = match bytes.get(i) {
            Some(&q) if q == b'"' || q == b'\'' => {
                let value_start = i + 1;
                let value_end = attrs[value_start..]
                    .find(q as char)
                    .map_or(attrs.len(), |pos| value_start + pos);
                i = (value_end + 1).min(attrs.len());
                value_start..value_end
            }
            _ => {
                let value_start = i;
                while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                value_start..i
            }
        };

        result.push(Attribute {
            name,
            value: Some(&attrs[value_span.clone()]),
            span: start..i,
            value_span: Some(value_span),
        });
    }
    result
}

/// Leading whitespace of the line containing `offset`, if only whitespace
/// precedes `offset` on that line.
pub fn line_indent(text: &str, offset: usize) -> Option<&str> {
    let line_start = text[..offset].rfind('\n').map_or(0, |pos| pos + 1);
    let prefix = &text[line_start..offset];
    prefix
        .chars()
        .all(|c| c == ' ' || c == '\t')
        .then_some(prefix)
}

/// Leading whitespace of the line containing `offset`.
pub fn indent_of_line(text: &str, offset: usize) -> &str {
    let line_start = text[..offset].rfind('\n').map_or(0, |pos| pos + 1);
    let line = &text[line_start..];
    let width = line.len() - line.trim_start_matches([' ', '\t']).len();
    &line[..width]
}

/// Replace the `old` indentation prefix of every line after the first with `new`.
pub fn reindent(block: &str, old: &str, new: &str) -> String {
    let mut lines = block.split('\n');
    let mut out = String::with_capacity(block.len());
    if let Some(first) = lines.next() {
        out.push_str(first);
    }
    for line in lines {
        out.push('\n');
        if line.trim().is_empty() {
            continue;
        }
        match line.strip_prefix(old) {
            Some(rest) => {
                out.push_str(new);
                out.push_str(rest);
            }
            None => out.push_str(line),
        }
    }
    out
}
