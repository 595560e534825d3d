use console::style;
use similar::{DiffTag, TextDiff};

const CONTEXT_LINES: usize = 2;

/// Renders a colored, line-numbered diff of a patch for dry runs.
pub fn render_diff(old: &str, new: &str) -> String {
    if old == new {
        return "No changes detected.".to_string();
    }

    let old_lines: Vec<&str> = old.split('\n').collect();
    let new_lines: Vec<&str> = new.split('\n').collect();
    let diff = TextDiff::from_slices(&old_lines, &new_lines);

    let mut diff_lines = Vec::new();

    for (hunk_idx, group) in diff.grouped_ops(CONTEXT_LINES).iter().enumerate() {
        if hunk_idx > 0 {
            diff_lines.push("...".to_string());
        }

        for op in group {
            let (old_range, new_range) = (op.old_range(), op.new_range());
            match op.tag() {
                DiffTag::Equal => {
                    for i in new_range {
                        diff_lines.push(format!("  {:>5}: {}", i + 1, new_lines[i]));
                    }
                }
                DiffTag::Delete | DiffTag::Insert | DiffTag::Replace => {
                    // Removals first, then additions.
                    for i in old_range {
                        diff_lines.push(
                            style(format!("- {:>5}: {}", i + 1, old_lines[i]))
                                .red()
                                .to_string(),
                        );
                    }
                    for i in new_range {
                        diff_lines.push(
                            style(format!("+ {:>5}: {}", i + 1, new_lines[i]))
                                .green()
                                .to_string(),
                        );
                    }
                }
            }
        }
    }
    diff_lines.join("\n")
}
