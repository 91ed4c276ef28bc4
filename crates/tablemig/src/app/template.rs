//! Rebinding of column content onto the column-array slot contract.
//!
//! Legacy columns render cells through `<template #default="{ row, $index }">`.
//! In the column-array model every custom cell is a named table slot receiving
//! `{ record, rowIndex, column }`. The rewriter renames the slot, rewrites the
//! declared parameters and renames every reference in expression contexts
//! (bound attributes and `{{ }}` interpolations) so no stale binding survives.

use std::ops::Range;

use crate::app::markup::{self, OpenTag};

pub const RECORD: &str = "record";
pub const ROW_INDEX: &str = "rowIndex";
pub const COLUMN: &str = "column";

const TEMPLATE: &str = "template";
const SCOPE_OBJECT: &str = "({ row: record, $index: rowIndex, column })";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotKind {
    Cell,
    Header,
    Other,
}

/// A top-level `<template>` carrying a slot directive.
#[derive(Debug)]
struct SlotTemplate {
    open: OpenTag,
    span: Range<usize>,
    inner: Range<usize>,
    kind: SlotKind,
}

/// Content split into slot templates and loose markup.
#[derive(Debug)]
struct ContentParts<'a> {
    templates: Vec<SlotTemplate>,
    /// Non-blank loose pieces with the offset of their first character.
    loose: Vec<(usize, &'a str)>,
}

impl ContentParts<'_> {
    fn has_cell(&self) -> bool {
        self.templates.iter().any(|t| t.kind == SlotKind::Cell)
    }
}

/// Rewrites column content into named slot templates.
#[derive(Debug, Clone)]
pub struct TemplateRewriter {
    drop_header_templates: bool,
}

impl TemplateRewriter {
    pub fn new(drop_header_templates: bool) -> Self {
        Self {
            drop_header_templates,
        }
    }

    /// Whether the content renders cells: a default-slot template or loose markup.
    pub fn has_custom_content(&self, content: &str) -> bool {
        let parts = split(content);
        parts.has_cell() || !parts.loose.is_empty()
    }

    /// Check that every default-slot scope in `content` can be rebound onto the
    /// column-array slot contract. Returns the offending scope otherwise.
    pub fn check_scopes<'c>(&self, content: &'c str) -> Result<(), &'c str> {
        for template in split(content).templates {
            if template.kind != SlotKind::Cell {
                continue;
            }
            let value = slot_directive(&content[template.open.attrs.clone()])
                .and_then(|directive| directive.value);
            if Bindings::parse(value).is_none() {
                return Err(value.unwrap_or_default());
            }
        }
        Ok(())
    }

    /// Rewrite `content` into slot template(s) named `slot`.
    ///
    /// The first line of the result carries no indentation; continuation lines are
    /// re-indented so the block sits at `indent`. Scopes rejected by
    /// [`Self::check_scopes`] lose their bindings.
    pub fn rewrite(&self, content: &str, slot: &str, indent: &str) -> String {
        let parts = split(content);
        let mut blocks = Vec::new();

        if !parts.has_cell() && !parts.loose.is_empty() {
            blocks.push(wrap_loose(content, &parts.loose, slot, indent));
        }

        for template in &parts.templates {
            let rendered = match template.kind {
                SlotKind::Cell => rewrite_cell(content, template, slot),
                SlotKind::Header if self.drop_header_templates => {
                    tracing::debug!(slot, "dropping column header template");
                    continue;
                }
                SlotKind::Header | SlotKind::Other => content[template.span.clone()].to_owned(),
            };
            let block = match own_line_indent(content, template.span.start) {
                Some(old) => markup::reindent(&rendered, old, indent),
                None => rendered,
            };
            blocks.push(block);
        }

        blocks.join(&format!("\n{indent}"))
    }
}

/// Indentation of a template that starts its own line within the content.
fn own_line_indent(content: &str, offset: usize) -> Option<&str> {
    if !content[..offset].contains('\n') {
        return None;
    }
    markup::line_indent(content, offset)
}

fn split(content: &str) -> ContentParts<'_> {
    let mut templates = Vec::new();
    let mut loose = Vec::new();
    let mut cursor = 0;

    while let Some(open) = markup::find_open_tag(content, TEMPLATE, cursor) {
        let (inner_end, end) = if open.self_closing {
            (open.span.end, open.span.end)
        } else {
            markup::find_matching_close(content, TEMPLATE, open.span.end)
                .map_or((content.len(), content.len()), |close| (close.start, close.end))
        };

        match slot_kind(&content[open.attrs.clone()]) {
            Some(kind) => {
                push_loose(content, cursor..open.span.start, &mut loose);
                templates.push(SlotTemplate {
                    inner: open.span.end..inner_end,
                    span: open.span.start..end,
                    open,
                    kind,
                });
            }
            // A template without a slot directive is plain markup.
            None => push_loose(content, cursor..end, &mut loose),
        }
        cursor = end;
    }
    push_loose(content, cursor..content.len(), &mut loose);

    ContentParts { templates, loose }
}

fn push_loose<'a>(content: &'a str, range: Range<usize>, loose: &mut Vec<(usize, &'a str)>) {
    let piece = &content[range.clone()];
    let trimmed = piece.trim();
    if trimmed.is_empty() || (trimmed.starts_with("<!--") && trimmed.ends_with("-->")) {
        return;
    }
    let leading = piece.len() - piece.trim_start().len();
    loose.push((range.start + leading, trimmed));
}

fn is_slot_directive(name: &str) -> bool {
    name.starts_with('#') || name == "v-slot" || name.starts_with("v-slot:")
}

fn slot_directive(attrs: &str) -> Option<markup::Attribute<'_>> {
    markup::attributes(attrs)
        .into_iter()
        .find(|attr| is_slot_directive(attr.name))
}

fn slot_name(attrs: &str) -> Option<&str> {
    let directive = slot_directive(attrs)?;
    Some(
        directive
            .name
            .strip_prefix('#')
            .or_else(|| directive.name.strip_prefix("v-slot:"))
            .unwrap_or("default"),
    )
}

fn slot_kind(attrs: &str) -> Option<SlotKind> {
    Some(match slot_name(attrs)? {
        "default" => SlotKind::Cell,
        "header" => SlotKind::Header,
        _ => SlotKind::Other,
    })
}

/// Names of the slot templates at the top level of `content`.
pub fn slot_names(content: &str) -> Vec<&str> {
    split(content)
        .templates
        .iter()
        .filter_map(|template| slot_name(&content[template.open.attrs.clone()]))
        .collect()
}

fn rewrite_cell(content: &str, template: &SlotTemplate, slot: &str) -> String {
    let attrs_text = &content[template.open.attrs.clone()];
    let attrs = markup::attributes(attrs_text);
    let directive = attrs.iter().find(|attr| is_slot_directive(attr.name));
    let bindings = Bindings::parse(directive.and_then(|attr| attr.value)).unwrap_or_default();

    let mut renamer = Renamer::new(&bindings);
    let inner = renamer.rename_markup(&content[template.inner.clone()]);

    let mut extra = String::new();
    for attr in attrs.iter().filter(|attr| !is_slot_directive(attr.name)) {
        extra.push(' ');
        extra.push_str(&renamer.rename_attrs(&attrs_text[attr.span.clone()]));
    }

    let params = renamer.params();
    let mut rendered = format!("<{TEMPLATE} #{slot}");
    if !params.is_empty() {
        rendered.push_str(&format!("=\"{{ {} }}\"", params.join(", ")));
    }
    rendered.push_str(&extra);
    rendered.push('>');

    let close = &content[template.inner.end..template.span.end];
    if close.is_empty() {
        rendered.push_str(inner.trim_end());
        rendered.push_str(&format!("</{TEMPLATE}>"));
    } else {
        rendered.push_str(&inner);
        rendered.push_str(close);
    }
    rendered
}

fn wrap_loose(content: &str, loose: &[(usize, &str)], slot: &str, indent: &str) -> String {
    let (first_offset, _) = loose[0];
    let old = markup::indent_of_line(content, first_offset);
    let inner_indent = format!("{indent}  ");
    let joined = loose
        .iter()
        .map(|(_, piece)| *piece)
        .collect::<Vec<_>>()
        .join(&format!("\n{old}"));
    let body = markup::reindent(&joined, old, &inner_indent);
    format!("<{TEMPLATE} #{slot}>\n{inner_indent}{body}\n{indent}</{TEMPLATE}>")
}

/// Local side of a destructured slot property.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Local {
    Name(String),
    /// Nested destructuring pattern, kept verbatim.
    Pattern(String),
}

impl Local {
    fn parse(text: &str) -> Option<Self> {
        if is_identifier(text) {
            Some(Local::Name(text.to_owned()))
        } else if text.starts_with(['{', '[']) {
            Some(Local::Pattern(text.to_owned()))
        } else {
            None
        }
    }

    fn name(&self) -> Option<&str> {
        match self {
            Local::Name(name) => Some(name),
            Local::Pattern(_) => None,
        }
    }

    /// Parameter declaration for the new slot scope.
    fn param(&self, name: &str) -> String {
        match self {
            Local::Name(_) => name.to_owned(),
            Local::Pattern(pattern) => format!("{name}: {pattern}"),
        }
    }
}

/// Binding names declared by a legacy default slot.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct Bindings {
    row: Option<Local>,
    index: Option<String>,
    column: Option<Local>,
    scope: Option<String>,
}

impl Bindings {
    /// Parse a slot directive value: `{ row, $index }`, `{ row: item }`,
    /// `{ row: { name } }` or `scope`.
    ///
    /// `None` when the scope binds something the new slot cannot provide, such as
    /// a rest element or a property other than `row`, `$index` and `column`.
    fn parse(value: Option<&str>) -> Option<Self> {
        let mut bindings = Bindings::default();
        let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) else {
            return Some(bindings);
        };

        let Some(inner) = value.strip_prefix('{').and_then(|v| v.strip_suffix('}')) else {
            if !is_identifier(value) {
                return None;
            }
            bindings.scope = Some(value.to_owned());
            return Some(bindings);
        };

        for entry in split_top_level(inner, b',') {
            let target = split_top_level(entry, b'=')
                .into_iter()
                .next()
                .unwrap_or_default()
                .trim();
            if target.is_empty() {
                continue;
            }
            let (key, local) = match split_top_level(target, b':').as_slice() {
                [key] => (key.trim(), key.trim()),
                [key, local] => (key.trim(), local.trim()),
                _ => return None,
            };
            let local = Local::parse(local)?;
            match key {
                "row" => bindings.row = Some(local),
                "column" => bindings.column = Some(local),
                "$index" => bindings.index = Some(local.name()?.to_owned()),
                _ => return None,
            }
        }
        Some(bindings)
    }
}

/// Split `text` on `sep` outside brackets and string literals.
fn split_top_level(text: &str, sep: u8) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' | b'`' => {
                i = string_end(bytes, i);
                continue;
            }
            b'{' | b'[' | b'(' => depth += 1,
            b'}' | b']' | b')' => depth = depth.saturating_sub(1),
            b if b == sep && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    parts.push(&text[start..]);
    parts
}

fn is_identifier(text: &str) -> bool {
    text.bytes().next().is_some_and(is_ident_start) && text.bytes().all(is_ident_char)
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$'
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// `.name` property access, as opposed to a `...name` spread.
fn is_member_access(bytes: &[u8], start: usize) -> bool {
    let mut k = start;
    while k > 0 && bytes[k - 1].is_ascii_whitespace() {
        k -= 1;
    }
    if k == 0 || bytes[k - 1] != b'.' {
        return false;
    }
    !(k >= 3 && bytes[k - 2] == b'.' && bytes[k - 3] == b'.')
}

fn string_end(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            i += 2;
            continue;
        }
        if bytes[i] == quote {
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

/// Identifier-aware renaming of the legacy bindings.
struct Renamer<'b> {
    bindings: &'b Bindings,
    record: bool,
    row_index: bool,
    column: bool,
}

impl<'b> Renamer<'b> {
    fn new(bindings: &'b Bindings) -> Self {
        Self {
            bindings,
            record: bindings.row.is_some(),
            row_index: bindings.index.is_some(),
            column: bindings.column.is_some(),
        }
    }

    /// Parameters the new slot has to declare.
    fn params(&self) -> Vec<String> {
        let declare = |local: &Option<Local>, name: &str| {
            local
                .as_ref()
                .map_or_else(|| name.to_owned(), |local| local.param(name))
        };
        let mut params = Vec::new();
        if self.record {
            params.push(declare(&self.bindings.row, RECORD));
        }
        if self.row_index {
            params.push(ROW_INDEX.to_owned());
        }
        if self.column {
            params.push(declare(&self.bindings.column, COLUMN));
        }
        params
    }

    fn mark(&mut self, param: &str) {
        match param {
            RECORD => self.record = true,
            ROW_INDEX => self.row_index = true,
            _ => self.column = true,
        }
    }

    fn replacement_for(&self, ident: &str) -> Option<&'static str> {
        let is = |local: &Option<Local>| local.as_ref().and_then(Local::name) == Some(ident);
        if is(&self.bindings.row) {
            Some(RECORD)
        } else if self.bindings.index.as_deref() == Some(ident) {
            Some(ROW_INDEX)
        } else if is(&self.bindings.column) {
            Some(COLUMN)
        } else {
            None
        }
    }

    fn rename_markup(&mut self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;

        while let Some(found) = text[cursor..].find(['<', '{']) {
            let at = cursor + found;
            out.push_str(&text[cursor..at]);
            let tail = &text[at..];

            if let Some(expr) = tail.strip_prefix("{{") {
                let Some(end) = expr.find("}}") else {
                    out.push_str(tail);
                    return out;
                };
                out.push_str("{{");
                out.push_str(&self.rename_expr(&expr[..end]));
                out.push_str("}}");
                cursor = at + 2 + end + 2;
            } else if tail.starts_with("<!--") {
                let end = tail.find("-->").map_or(tail.len(), |pos| pos + 3);
                out.push_str(&tail[..end]);
                cursor = at + end;
            } else if tail.starts_with('<') && tail[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
                let name_len = tail[1..]
                    .find(|c: char| c.is_ascii_whitespace() || c == '>' || c == '/')
                    .unwrap_or(tail.len() - 1);
                let name_end = at + 1 + name_len;
                let Some(gt) = markup::tag_end(text, name_end) else {
                    out.push_str(tail);
                    return out;
                };
                out.push_str(&text[at..name_end]);
                out.push_str(&self.rename_attrs(&text[name_end..gt]));
                out.push('>');
                cursor = gt + 1;
            } else {
                out.push_str(&tail[..1]);
                cursor = at + 1;
            }
        }

        out.push_str(&text[cursor..]);
        out
    }

    fn rename_attrs(&mut self, attrs: &str) -> String {
        let mut out = String::with_capacity(attrs.len());
        let mut last = 0;
        for attr in markup::attributes(attrs) {
            let Some(span) = attr.value_span.clone().filter(|_| attr.is_bound()) else {
                continue;
            };
            out.push_str(&attrs[last..span.start]);
            out.push_str(&self.rename_expr(&attrs[span.clone()]));
            last = span.end;
        }
        out.push_str(&attrs[last..]);
        out
    }

    fn rename_expr(&mut self, expr: &str) -> String {
        let mut out = String::with_capacity(expr.len());
        let mut pos = 0;
        self.rename_expr_into(expr, &mut pos, &mut out, false);
        out
    }

    /// Copy `src` from `pos`, renaming identifiers. When `nested`, stops after the
    /// `}` closing a `${` substitution.
    fn rename_expr_into(&mut self, src: &str, pos: &mut usize, out: &mut String, nested: bool) {
        let bytes = src.as_bytes();
        let mut brackets: Vec<u8> = Vec::new();

        while *pos < bytes.len() {
            let b = bytes[*pos];
            match b {
                b'\'' | b'"' => {
                    let end = string_end(bytes, *pos);
                    out.push_str(&src[*pos..end]);
                    *pos = end;
                }
                b'`' => self.template_literal(src, pos, out),
                b'{' | b'(' | b'[' => {
                    brackets.push(b);
                    out.push(char::from(b));
                    *pos += 1;
                }
                b'}' | b')' | b']' => {
                    out.push(char::from(b));
                    *pos += 1;
                    if brackets.pop().is_none() && nested && b == b'}' {
                        return;
                    }
                }
                b if is_ident_start(b) => {
                    let start = *pos;
                    while *pos < bytes.len() && is_ident_char(bytes[*pos]) {
                        *pos += 1;
                    }
                    let role = if brackets.last() == Some(&b'{') {
                        property_role(bytes, start, *pos)
                    } else {
                        Role::Value
                    };
                    self.emit_identifier(src, start, pos, out, role);
                }
                b if b.is_ascii_digit() => {
                    let start = *pos;
                    while *pos < bytes.len() && is_ident_char(bytes[*pos]) {
                        *pos += 1;
                    }
                    out.push_str(&src[start..*pos]);
                }
                _ => {
                    let Some(ch) = src[*pos..].chars().next() else {
                        break;
                    };
                    out.push(ch);
                    *pos += ch.len_utf8();
                }
            }
        }
    }

    fn template_literal(&mut self, src: &str, pos: &mut usize, out: &mut String) {
        let bytes = src.as_bytes();
        let mut segment = *pos;
        *pos += 1;
        while *pos < bytes.len() {
            match bytes[*pos] {
                b'\\' => *pos = (*pos + 2).min(bytes.len()),
                b'`' => {
                    *pos += 1;
                    out.push_str(&src[segment..*pos]);
                    return;
                }
                b'$' if bytes.get(*pos + 1) == Some(&b'{') => {
                    *pos += 2;
                    out.push_str(&src[segment..*pos]);
                    self.rename_expr_into(src, pos, out, true);
                    segment = *pos;
                }
                _ => *pos += 1,
            }
        }
        out.push_str(&src[segment..]);
    }

    fn emit_identifier(
        &mut self,
        src: &str,
        start: usize,
        pos: &mut usize,
        out: &mut String,
        role: Role,
    ) {
        let bytes = src.as_bytes();
        let ident = &src[start..*pos];

        if role == Role::Key || is_member_access(bytes, start) {
            out.push_str(ident);
            return;
        }

        let replacement = if self.bindings.scope.as_deref() == Some(ident) {
            if bytes.get(*pos) == Some(&b'.') {
                let member_start = *pos + 1;
                let mut member_end = member_start;
                while member_end < bytes.len() && is_ident_char(bytes[member_end]) {
                    member_end += 1;
                }
                let flattened = match &src[member_start..member_end] {
                    "row" => Some(RECORD),
                    "$index" => Some(ROW_INDEX),
                    "column" => Some(COLUMN),
                    _ => None,
                };
                if let Some(param) = flattened {
                    self.mark(param);
                    out.push_str(param);
                    *pos = member_end;
                    return;
                }
            }
            self.record = true;
            self.row_index = true;
            self.column = true;
            Some(SCOPE_OBJECT)
        } else {
            self.replacement_for(ident)
        };

        match replacement {
            // `{ row }` keeps its property name: `{ row: record }`.
            Some(replacement) if role == Role::Shorthand => {
                out.push_str(ident);
                out.push_str(": ");
                out.push_str(replacement);
            }
            Some(replacement) => out.push_str(replacement),
            None => out.push_str(ident),
        }
    }
}

/// Position of an identifier directly inside an object literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    /// `{ row: … }`
    Key,
    /// `{ row }` or `{ a, row }`
    Shorthand,
    Value,
}

fn property_role(bytes: &[u8], start: usize, end: usize) -> Role {
    let before = bytes[..start]
        .iter()
        .rev()
        .find(|b| !b.is_ascii_whitespace());
    if !matches!(before, Some(b'{' | b',')) {
        return Role::Value;
    }
    match bytes[end..].iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b':') => Role::Key,
        Some(b',' | b'}') => Role::Shorthand,
        _ => Role::Value,
    }
}
