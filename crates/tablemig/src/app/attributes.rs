//! Typed field extraction from a column declaration's attribute text.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::model::{Alignment, ColumnSpec, FixedSide};

static LABEL: Lazy<Regex> = Lazy::new(|| quoted_attribute("label"));
static PROP: Lazy<Regex> = Lazy::new(|| quoted_attribute("prop"));
static FIXED: Lazy<Regex> = Lazy::new(|| quoted_attribute("fixed"));
static ALIGN: Lazy<Regex> = Lazy::new(|| quoted_attribute("align"));
static WIDTH: Lazy<Regex> = Lazy::new(|| numeric_attribute("width"));
static MIN_WIDTH: Lazy<Regex> = Lazy::new(|| numeric_attribute("min-width"));
static BARE_FIXED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\s)fixed(?:\s|$)").expect("valid bare fixed pattern"));
static SELECTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:^|\s)type\s*=\s*["']selection["']"#).expect("valid selection pattern")
});

const OVERFLOW_MARKERS: [&str; 2] = ["show-overflow-tooltip", "ellipsis"];

/// Static `name="value"` (or single-quoted) attribute starting at a token boundary.
fn quoted_attribute(name: &str) -> Regex {
    Regex::new(&format!(
        r#"(?:^|\s){}\s*=\s*(?:"([^"]*)"|'([^']*)')"#,
        regex::escape(name)
    ))
    .expect("valid attribute pattern")
}

/// Integer attribute, static or bound, with an optional `px` suffix.
fn numeric_attribute(name: &str) -> Regex {
    Regex::new(&format!(
        r#"(?:^|\s):?{}\s*=\s*["']\s*(\d+)(?:px)?\s*["']"#,
        regex::escape(name)
    ))
    .expect("valid numeric attribute pattern")
}

fn capture<'a>(pattern: &Regex, attrs: &'a str) -> Option<&'a str> {
    pattern
        .captures(attrs)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str())
}

fn integer(pattern: &Regex, attrs: &str) -> Option<u32> {
    capture(pattern, attrs).and_then(|value| value.parse().ok())
}

/// Extract the recognized fields of one column declaration.
///
/// Fields that are not present stay unset; a declaration without any recognized
/// attribute yields an empty [`ColumnSpec`].
pub fn extract(attrs: &str) -> ColumnSpec {
    let overflow = OVERFLOW_MARKERS.iter().any(|marker| attrs.contains(marker));

    let fixed = capture(&FIXED, attrs)
        .map(FixedSide::parse)
        .or_else(|| BARE_FIXED.is_match(attrs).then_some(FixedSide::Left));

    ColumnSpec {
        title: capture(&LABEL, attrs).map(str::to_owned),
        field_key: capture(&PROP, attrs).map(str::to_owned),
        width: integer(&WIDTH, attrs).or_else(|| integer(&MIN_WIDTH, attrs)),
        fixed,
        align: capture(&ALIGN, attrs).map(Alignment::parse),
        ellipsis: overflow,
        tooltip: overflow,
        is_selection: SELECTION.is_match(attrs),
        slot_name: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_all_fields() {
        let spec = extract(
            r#" label="Name" prop="name" width="180" fixed="right" align="center" show-overflow-tooltip"#,
        );
        assert_eq!(spec.title.as_deref(), Some("Name"));
        assert_eq!(spec.field_key.as_deref(), Some("name"));
        assert_eq!(spec.width, Some(180));
        assert_eq!(spec.fixed, Some(FixedSide::Right));
        assert_eq!(spec.align, Some(Alignment::Center));
        assert!(spec.ellipsis && spec.tooltip);
        assert!(!spec.is_selection);
    }

    #[test]
    fn width_takes_precedence_over_min_width() {
        assert_eq!(extract(r#" min-width="200" width="100""#).width, Some(100));
        assert_eq!(extract(r#" min-width="200""#).width, Some(200));
        assert_eq!(extract(r#" :width="90""#).width, Some(90));
        assert_eq!(extract(r#" width="120px""#).width, Some(120));
        assert_eq!(extract(r#" width="auto""#).width, None);
    }

    #[test]
    fn ignores_prefixed_attribute_names() {
        let spec = extract(r#" header-align="right" :label="t('name')" prop-key="x""#);
        assert_eq!(spec.align, None);
        assert_eq!(spec.title, None);
        assert_eq!(spec.field_key, None);
    }

    #[test]
    fn accepts_single_quoted_values() {
        let spec = extract(" label='Age' prop='age'");
        assert_eq!(spec.title.as_deref(), Some("Age"));
        assert_eq!(spec.field_key.as_deref(), Some("age"));
    }

    #[test]
    fn fixed_values_pass_through() {
        assert_eq!(
            extract(r#" fixed="sticky""#).fixed,
            Some(FixedSide::Other("sticky".into()))
        );
        assert_eq!(extract(" prop=\"a\" fixed").fixed, Some(FixedSide::Left));
    }

    #[test]
    fn detects_selection_columns() {
        let spec = extract(r#" type="selection" width="55""#);
        assert!(spec.is_selection);
        assert_eq!(spec.width, Some(55));
    }

    #[test]
    fn ellipsis_marker_sets_tooltip() {
        let spec = extract(r#" prop="desc" ellipsis"#);
        assert!(spec.ellipsis);
        assert!(spec.tooltip);
    }

    #[test]
    fn unrecognized_attributes_yield_empty_spec() {
        assert!(extract(r#" class="wide" sortable"#).is_empty());
        assert!(extract("").is_empty());
    }
}
