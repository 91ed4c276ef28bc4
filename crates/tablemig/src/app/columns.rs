//! Column block scanning inside a table body.

use crate::app::markup::{find_close_tag, find_open_tag};
use crate::domain::model::ColumnDeclaration;

/// Walks a table body and yields the legacy column declarations in order.
#[derive(Debug, Clone)]
pub struct ColumnScanner {
    element: String,
}

impl ColumnScanner {
    pub fn new(element: impl Into<String>) -> Self {
        Self {
            element: element.into(),
        }
    }

    pub fn element(&self) -> &str {
        &self.element
    }

    /// Scan `body` for column declarations.
    ///
    /// Column elements do not nest, so the first closing tag after an opening tag
    /// ends the declaration. When another column opens before any closing tag is
    /// seen, the declaration is taken to end where the next one starts (or at the
    /// end of the body) and is flagged with `inferred_end`.
    pub fn scan<'a>(&self, body: &'a str) -> Vec<ColumnDeclaration<'a>> {
        let mut declarations = Vec::new();
        let mut cursor = 0;

        while let Some(tag) = find_open_tag(body, &self.element, cursor) {
            let attrs = &body[tag.attrs.clone()];
            if tag.self_closing {
                declarations.push(ColumnDeclaration {
                    attrs,
                    content: None,
                    span: tag.span.clone(),
                    inferred_end: false,
                });
                cursor = tag.span.end;
                continue;
            }

            let next_open = find_open_tag(body, &self.element, tag.span.end);
            let close = find_close_tag(body, &self.element, tag.span.end)
                .filter(|close| next_open.as_ref().is_none_or(|next| close.start < next.span.start));

            let (content_end, end, inferred_end) = match close {
                Some(close) => (close.start, close.end, false),
                None => {
                    let end = next_open.map_or(body.len(), |next| next.span.start);
                    (end, end, true)
                }
            };

            declarations.push(ColumnDeclaration {
                attrs,
                content: Some(&body[tag.span.end..content_end]),
                span: tag.span.start..end,
                inferred_end,
            });
            cursor = end;
        }

        declarations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner() -> ColumnScanner {
        ColumnScanner::new("a-table-column")
    }

    #[test]
    fn yields_declarations_in_order() {
        let body = r#"
          <a-table-column type="selection" width="55" />
          <a-table-column label="Name" prop="name" />
          <a-table-column label="Status" prop="status">
            <template #default="{ row }">{{ row.status }}</template>
          </a-table-column>
        "#;
        let decls = scanner().scan(body);
        assert_eq!(decls.len(), 3);
        assert_eq!(decls[0].attrs, r#" type="selection" width="55" "#);
        assert!(decls[0].content.is_none());
        assert_eq!(decls[1].attrs, r#" label="Name" prop="name" "#);
        let content = decls[2].content.expect("content");
        assert!(content.contains("<template #default"));
        assert!(!content.contains("</a-table-column>"));
        assert!(decls.iter().all(|d| !d.inferred_end));
        assert!(body[decls[2].span.clone()].ends_with("</a-table-column>"));
    }

    #[test]
    fn infers_end_of_unterminated_declaration() {
        let body = concat!(
            "<a-table-column label=\"A\" prop=\"a\">\n",
            "  <template #default=\"{ row }\">{{ row.a }}</template>\n",
            "<a-table-column label=\"B\" prop=\"b\"></a-table-column>\n",
        );
        let decls = scanner().scan(body);
        assert_eq!(decls.len(), 2);
        assert!(decls[0].inferred_end);
        assert!(decls[0].content.expect("content").contains("row.a"));
        assert!(!decls[1].inferred_end);
        assert_eq!(decls[1].content, Some(""));
    }

    #[test]
    fn unterminated_last_declaration_runs_to_end() {
        let body = "<a-table-column prop=\"x\">\n  <template #default>x</template>\n";
        let decls = scanner().scan(body);
        assert_eq!(decls.len(), 1);
        assert!(decls[0].inferred_end);
        assert_eq!(decls[0].span.end, body.len());
    }

    #[test]
    fn empty_body_has_no_declarations() {
        assert!(scanner().scan("\n  <template #empty>none</template>\n").is_empty());
    }
}
