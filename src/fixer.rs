//! Applying diagnostic fixes to source text
//!
//! Each fix is first merged into a single replacement. Fixes are then applied
//! in source order; a fix that starts at or before the end of the previously
//! applied one is skipped and left for the next lint pass.

use crate::diagnostic::{Diagnostic, Edit};
use std::path::Path;

/// Result of one application pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixOutput {
    /// Fixed source text
    pub output: String,
    /// Number of fixes applied
    pub applied: usize,
    /// Number of fixes skipped because they conflicted with an earlier one
    pub skipped: usize,
}

impl FixOutput {
    pub fn changed(&self) -> bool {
        self.applied > 0
    }
}

/// Apply the fixes carried by `diagnostics` to `source`
pub fn apply_fixes(source: &str, diagnostics: &[Diagnostic]) -> FixOutput {
    let mut replacements: Vec<Edit> = diagnostics
        .iter()
        .filter_map(|d| d.fix.as_ref())
        .map(|fix| fix.merged(source))
        .collect();
    // stable: ties keep report order
    replacements.sort_by_key(|edit| edit.start);

    let mut result = FixOutput {
        output: String::with_capacity(source.len()),
        ..Default::default()
    };
    let mut cursor = 0;
    let mut last_end: Option<usize> = None;

    for edit in replacements {
        if last_end.is_some_and(|end| edit.start <= end) {
            log::trace!("skipping conflicting fix at {}..{}", edit.start, edit.end);
            result.skipped += 1;
            continue;
        }
        result.output.push_str(&source[cursor..edit.start]);
        result.output.push_str(&edit.text);
        cursor = edit.end;
        last_end = Some(edit.end);
        result.applied += 1;
    }
    result.output.push_str(&source[cursor..]);

    result
}

/// Render a unified diff with a single hunk covering every changed line
pub fn unified_diff(file: &Path, original: &str, modified: &str) -> String {
    const CONTEXT: usize = 2;

    let original_lines: Vec<&str> = original.lines().collect();
    let modified_lines: Vec<&str> = modified.lines().collect();

    let prefix = original_lines
        .iter()
        .zip(&modified_lines)
        .take_while(|(o, m)| o == m)
        .count();
    if prefix == original_lines.len() && prefix == modified_lines.len() {
        return String::new();
    }
    let suffix = original_lines[prefix..]
        .iter()
        .rev()
        .zip(modified_lines[prefix..].iter().rev())
        .take_while(|(o, m)| o == m)
        .count();

    let start = prefix.saturating_sub(CONTEXT);
    let orig_end = (original_lines.len() - suffix + CONTEXT).min(original_lines.len());
    let mod_end = (modified_lines.len() - suffix + CONTEXT).min(modified_lines.len());

    let mut diff = String::new();
    diff.push_str(&format!("--- a/{}\n", file.display()));
    diff.push_str(&format!("+++ b/{}\n", file.display()));
    diff.push_str(&format!(
        "@@ -{},{} +{},{} @@\n",
        start + 1,
        orig_end - start,
        start + 1,
        mod_end - start
    ));

    for line in &original_lines[start..prefix] {
        diff.push_str(&format!(" {}\n", line));
    }
    for line in &original_lines[prefix..original_lines.len() - suffix] {
        diff.push_str(&format!("-{}\n", line));
    }
    for line in &modified_lines[prefix..modified_lines.len() - suffix] {
        diff.push_str(&format!("+{}\n", line));
    }
    for line in &original_lines[original_lines.len() - suffix..orig_end] {
        diff.push_str(&format!(" {}\n", line));
    }

    diff
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Span;
    use crate::diagnostic::{Fix, Location, Severity};
    use std::path::PathBuf;

    fn diag_with(edits: Vec<Edit>) -> Diagnostic {
        Diagnostic::new(
            "test",
            "TEST",
            Severity::Warning,
            "test",
            Location::new(PathBuf::from("t.html"), 1, 1),
        )
        .with_fix(Fix::new(edits))
    }

    #[test]
    fn test_apply_single_fix() {
        let diags = vec![diag_with(vec![Edit::replace_range(Span::new(4, 5), " />")])];
        let result = apply_fixes("<img>", &diags);
        assert_eq!(result.output, "<img />");
        assert_eq!(result.applied, 1);
        assert!(result.changed());
    }

    #[test]
    fn test_apply_multi_edit_fix() {
        let diags = vec![diag_with(vec![
            Edit::replace_range(Span::new(4, 5), " />"),
            Edit::remove_range(Span::new(5, 11)),
        ])];
        assert_eq!(apply_fixes("<img></img>", &diags).output, "<img />");
    }

    #[test]
    fn test_conflicting_fix_is_skipped() {
        let diags = vec![
            diag_with(vec![Edit::replace_range(Span::new(0, 4), "abcd")]),
            diag_with(vec![Edit::replace_range(Span::new(2, 6), "X")]),
            diag_with(vec![Edit::replace_range(Span::new(8, 8), "!")]),
        ];
        let result = apply_fixes("0123456789", &diags);
        assert_eq!(result.output, "abcd4567!89");
        assert_eq!(result.applied, 2);
        assert_eq!(result.skipped, 1);
    }

    #[test]
    fn test_insertions_at_same_point_apply_once() {
        let diags = vec![
            diag_with(vec![Edit::replace_range(Span::new(3, 3), "\n")]),
            diag_with(vec![Edit::replace_range(Span::new(3, 3), "\n")]),
        ];
        let result = apply_fixes("<a><b>", &diags);
        assert_eq!(result.output, "<a>\n<b>");
        assert_eq!(result.skipped, 1);
    }

    #[test]
    fn test_no_fixes() {
        let diags = vec![diag_with(Vec::new())];
        let result = apply_fixes("<foo>", &diags);
        assert_eq!(result.output, "<foo>");
        assert!(!result.changed());
    }

    #[test]
    fn test_unified_diff() {
        let diff = unified_diff(
            Path::new("index.html"),
            "<html>\n<p><b>x</b><div>y</div></p>\n</html>\n",
            "<html>\n<p>\n<b>x</b>\n<div>y</div>\n</p>\n</html>\n",
        );
        assert!(diff.starts_with("--- a/index.html\n+++ b/index.html\n"));
        assert!(diff.contains("@@ -1,3 +1,6 @@\n"));
        assert!(diff.contains("-<p><b>x</b><div>y</div></p>\n"));
        assert!(diff.contains("+<b>x</b>\n"));
        assert!(diff.contains(" </html>\n"));
    }

    #[test]
    fn test_unified_diff_identical() {
        assert!(unified_diff(Path::new("a.html"), "<a>\n", "<a>\n").is_empty());
    }
}
