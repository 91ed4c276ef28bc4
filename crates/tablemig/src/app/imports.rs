//! Removal of dangling icon import blocks.
//!
//! Earlier migrations left behind multi-line `import {` blocks listing icons
//! that are no longer used, sometimes without their closing `} from '…'` line.
//! The cleaner works line by line and never touches an import it cannot prove
//! to consist solely of known icons.

use crate::app::pass::{DocumentPass, PassOutcome};
use crate::domain::errors::DomainError;
use crate::infra::tables::IconTable;

const IMPORT_OPEN: &str = "import {";

#[derive(Debug, Clone, PartialEq, Eq)]
enum BlockEnd {
    /// Index of the closing `} from '…'` line.
    Closed(usize),
    /// Index of the last icon line of a block that never closes.
    Orphaned(usize),
}

#[derive(Debug, Clone)]
pub struct ImportCleaner {
    icons: IconTable,
}

impl ImportCleaner {
    pub fn new(icons: IconTable) -> Self {
        Self { icons }
    }

    pub fn clean(&self, text: &str) -> PassOutcome {
        let lines: Vec<&str> = text.split_inclusive('\n').collect();
        let mut kept = String::with_capacity(text.len());
        let mut diagnostics = Vec::new();
        let mut removed = 0;
        // Inside an import block that is kept; its icon names are not stray.
        let mut in_kept_import = false;
        let mut i = 0;

        while i < lines.len() {
            let stripped = lines[i].trim();

            if in_kept_import {
                if stripped.is_empty() || stripped.starts_with("import ") {
                    in_kept_import = false;
                } else {
                    in_kept_import = !stripped.starts_with('}');
                    kept.push_str(lines[i]);
                    i += 1;
                    continue;
                }
            }

            if stripped == IMPORT_OPEN {
                let Some(end) = self.icon_block_end(&lines, i) else {
                    in_kept_import = true;
                    kept.push_str(lines[i]);
                    i += 1;
                    continue;
                };
                let last = match end {
                    BlockEnd::Closed(last) => last,
                    BlockEnd::Orphaned(last) => {
                        diagnostics.push(DomainError::UnterminatedImport { line: i + 1 });
                        last
                    }
                };
                tracing::trace!(line = i + 1, "removing icon import block");
                removed += 1;
                i = last + 1;
                continue;
            }

            if i > 0 && self.is_icon_line(stripped) {
                let prev = lines[i - 1].trim();
                if prev == IMPORT_OPEN || self.is_icon_line(prev) {
                    tracing::trace!(line = i + 1, "removing stray icon line");
                    removed += 1;
                    i += 1;
                    continue;
                }
            }

            kept.push_str(lines[i]);
            i += 1;
        }

        if removed == 0 {
            return PassOutcome::unchanged(text, diagnostics);
        }
        PassOutcome {
            text: kept,
            rewrites: removed,
            diagnostics,
        }
    }

    fn is_icon_line(&self, stripped: &str) -> bool {
        self.icons.is_icon(stripped.trim_end_matches(',').trim())
    }

    /// Where the icon-only import block opened at `open` ends, if it is one.
    fn icon_block_end(&self, lines: &[&str], open: usize) -> Option<BlockEnd> {
        let mut j = open + 1;
        while j < lines.len() {
            let stripped = lines[j].trim();
            if self.is_icon_line(stripped) {
                j += 1;
                continue;
            }
            if stripped.starts_with('}') {
                return self
                    .icons
                    .references_source(stripped)
                    .then_some(BlockEnd::Closed(j));
            }
            if stripped.is_empty() || stripped.starts_with("import ") {
                break;
            }
            return None;
        }
        Some(BlockEnd::Orphaned(j - 1))
    }
}

impl DocumentPass for ImportCleaner {
    fn name(&self) -> &'static str {
        "clean-imports"
    }

    fn apply(&self, text: &str) -> PassOutcome {
        self.clean(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cleaner() -> ImportCleaner {
        ImportCleaner::new(IconTable::new(
            ["Search", "Refresh", "Delete", "Plus"],
            &["element-plus", "icons-vue"],
        ))
    }

    #[test]
    fn removes_closed_icon_block() {
        let input = concat!(
            "import { ref } from 'vue'\n",
            "import {\n",
            "  Search,\n",
            "  Refresh,\n",
            "  Delete\n",
            "} from '@element-plus/icons-vue'\n",
            "const a = ref(1)\n",
        );
        let outcome = cleaner().clean(input);
        assert_eq!(
            outcome.text,
            "import { ref } from 'vue'\nconst a = ref(1)\n"
        );
        assert_eq!(outcome.rewrites, 1);
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn keeps_blocks_from_other_libraries() {
        let input = "import {\n  Search,\n  Refresh,\n  Delete\n} from './local-icons'\n";
        let outcome = cleaner().clean(input);
        assert_eq!(outcome.text, input);
        assert_eq!(outcome.rewrites, 0);
    }

    #[test]
    fn keeps_blocks_with_unknown_names() {
        let input = "import {\n  Search,\n  useRouter\n} from '@element-plus/icons-vue'\n";
        assert_eq!(cleaner().clean(input).text, input);
    }

    #[test]
    fn removes_unterminated_block_up_to_blank_line() {
        let input = "import {\n  Search,\n  Plus,\n\nconst x = 1\n";
        let outcome = cleaner().clean(input);
        assert_eq!(outcome.text, "\nconst x = 1\n");
        assert_eq!(
            outcome.diagnostics,
            vec![DomainError::UnterminatedImport { line: 1 }]
        );
    }

    #[test]
    fn removes_unterminated_block_before_next_import() {
        let input = "import {\n  Search,\nimport { ref } from 'vue'\n";
        let outcome = cleaner().clean(input);
        assert_eq!(outcome.text, "import { ref } from 'vue'\n");
    }

    #[test]
    fn removes_unterminated_block_at_end_of_content() {
        let outcome = cleaner().clean("const y = 2\nimport {\n  Search,\n  Plus");
        assert_eq!(outcome.text, "const y = 2\n");
    }

    #[test]
    fn removes_stray_icon_lines() {
        let input = "const a = 1\n  Search,\n  Plus,\nconst b = 2\n";
        let outcome = cleaner().clean(input);
        assert_eq!(outcome.text, "const a = 1\n  Search,\nconst b = 2\n");
        assert_eq!(outcome.rewrites, 1);
    }
}
