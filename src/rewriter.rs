//! # Call-Site Rewriter
//!
//! Threads an extra argument through formatting calls. A call is rewritten only
//! when its template literal contains the pattern's guard and its trailing
//! arguments are exactly the pattern's `args`; the literal itself is re-emitted
//! verbatim.
//!
//! General patterns run before exception patterns. Since every pattern matches
//! one exact argument list, a call fixed by one pattern no longer has the shape
//! any pattern is looking for, which makes a second pass a no-op.

use crate::config::{CallPattern, PatternKind};
use crate::error::{PatchError, Result};
use log::{debug, info};
use regex::{Captures, Regex};

/// A compiled [`CallPattern`].
#[derive(Debug)]
struct Rule {
    name: String,
    kind: PatternKind,
    regex: Regex,
    args: String,
}

impl Rule {
    fn compile(pattern: &CallPattern) -> Result<Self> {
        pattern.validate()?;
        let args_after = pattern.rewritten_args()?.join(", ");

        let delimiter = regex::escape(&pattern.delimiter);
        // Raw (backtick) literals have no escapes; anything else may contain `\<delim>`.
        let body = if pattern.delimiter == "`" {
            format!("[^{delimiter}]")
        } else {
            format!(r"(?:[^{delimiter}\\]|\\.)")
        };
        let boundary = if pattern.callee.starts_with(|c: char| c.is_alphanumeric() || c == '_') {
            r"\b"
        } else {
            ""
        };
        let args = pattern
            .args
            .iter()
            .map(|arg| regex::escape(arg))
            .collect::<Vec<_>>()
            .join(r"\s*,\s*");

        let source = format!(
            r"(?s)(?P<head>{boundary}{callee}\(\s*)(?P<literal>{delimiter}{body}*?{guard}{body}*{delimiter})(?P<sep>\s*,\s*){args}(?P<tail>\s*,?\s*\))",
            callee = regex::escape(&pattern.callee),
            guard = regex::escape(&pattern.guard),
        );
        let regex = Regex::new(&source).map_err(|source| PatchError::Pattern {
            name: pattern.name.clone(),
            source,
        })?;

        Ok(Self {
            name: pattern.name.clone(),
            kind: pattern.kind,
            regex,
            args: args_after,
        })
    }
}

/// Number of call sites each pattern rewrote, in application order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RewriteReport {
    pub counts: Vec<(String, usize)>,
}

impl RewriteReport {
    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, count)| count).sum()
    }

    /// Patterns that rewrote nothing.
    pub fn unmatched(&self) -> Vec<&str> {
        self.counts
            .iter()
            .filter(|(_, count)| *count == 0)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

#[derive(Debug)]
pub struct Rewritten {
    pub text: String,
    pub report: RewriteReport,
}

#[derive(Debug)]
pub struct CallRewriter {
    rules: Vec<Rule>,
}

impl CallRewriter {
    /// Compiles the patterns, ordering general patterns before exceptions
    /// while keeping the configured order within each kind.
    pub fn new(patterns: &[CallPattern]) -> Result<Self> {
        let mut rules = patterns.iter().map(Rule::compile).collect::<Result<Vec<_>>>()?;
        rules.sort_by_key(|rule| rule.kind);
        Ok(Self { rules })
    }

    pub fn rewrite(&self, text: &str) -> Rewritten {
        let mut text = text.to_string();
        let mut report = RewriteReport::default();

        for rule in &self.rules {
            let mut count = 0;
            let next = rule
                .regex
                .replace_all(&text, |caps: &Captures| {
                    count += 1;
                    format!(
                        "{}{}{}{}{}",
                        &caps["head"], &caps["literal"], &caps["sep"], rule.args, &caps["tail"]
                    )
                })
                .into_owned();
            text = next;

            if count > 0 {
                info!("{}: rewrote {count} call(s)", rule.name);
            } else {
                debug!("{}: no matching calls", rule.name);
            }
            report.counts.push((rule.name.clone(), count));
        }

        Rewritten { text, report }
    }
}

/// Compiles `patterns` and applies them to `text` in priority order.
pub fn rewrite_calls(text: &str, patterns: &[CallPattern]) -> Result<Rewritten> {
    Ok(CallRewriter::new(patterns)?.rewrite(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(name: &str, kind: PatternKind, guard: &str, args: &[&str]) -> CallPattern {
        CallPattern {
            name: name.to_string(),
            kind,
            callee: "format".to_string(),
            delimiter: "`".to_string(),
            guard: guard.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            insert: "src".to_string(),
            before: None,
        }
    }

    fn general() -> CallPattern {
        pattern("general", PatternKind::General, "FROM %s", &["whereClause"])
    }

    fn timeline() -> CallPattern {
        CallPattern {
            before: Some("whereClause".to_string()),
            ..pattern(
                "timeline",
                PatternKind::Exception,
                "as date",
                &["selectClause", "whereClause"],
            )
        }
    }

    fn rewrite(text: &str, patterns: &[CallPattern]) -> Rewritten {
        rewrite_calls(text, patterns).unwrap()
    }

    #[test]
    fn test_prepends_argument() {
        let input = "q := format(`SELECT * FROM %s WHERE %s`, whereClause)";
        let result = rewrite(input, &[general()]);
        assert_eq!(
            result.text,
            "q := format(`SELECT * FROM %s WHERE %s`, src, whereClause)"
        );
        assert_eq!(result.report.counts, vec![("general".to_string(), 1)]);
    }

    #[test]
    fn test_calls_without_guard_are_untouched() {
        let input = "q := format(`SELECT COUNT(*) WHERE %s`, whereClause)";
        let result = rewrite(input, &[general()]);
        assert_eq!(result.text, input);
        assert_eq!(result.report.unmatched(), vec!["general"]);
    }

    #[test]
    fn test_multi_line_literal_passes_through_verbatim() {
        let input = "query = format(`\n\t\tSELECT path\n\t\tFROM %s \n\t\tWHERE %s\n\t`, whereClause)\n";
        let result = rewrite(input, &[general()]);
        assert_eq!(
            result.text,
            "query = format(`\n\t\tSELECT path\n\t\tFROM %s \n\t\tWHERE %s\n\t`, src, whereClause)\n"
        );
    }

    #[test]
    fn test_tolerates_whitespace_around_arguments() {
        let input = "format(\n\t`FROM %s WHERE %s`,\n\twhereClause\n)";
        let result = rewrite(input, &[general()]);
        assert_eq!(result.text, "format(\n\t`FROM %s WHERE %s`,\n\tsrc, whereClause\n)");
    }

    #[test]
    fn test_trailing_comma_layout_is_kept() {
        let input = "format(\n\t`FROM %s WHERE %s`,\n\twhereClause,\n)";
        let result = rewrite(input, &[general()]);
        assert_eq!(
            result.text,
            "format(\n\t`FROM %s WHERE %s`,\n\tsrc, whereClause,\n)"
        );
        assert_eq!(rewrite(&result.text, &[general()]).text, result.text);
    }

    #[test]
    fn test_extra_argument_after_trailing_comma_is_not_matched() {
        let input = "format(`FROM %s`, whereClause, limit)";
        assert_eq!(rewrite(input, &[general()]).text, input);
    }

    #[test]
    fn test_unknown_before_is_rejected() {
        let mut p = pattern("split", PatternKind::General, "G", &["a", "b"]);
        p.before = Some("zzz".to_string());
        let err = rewrite_calls("format(`G`, a, b)", &[p]).unwrap_err();
        assert!(matches!(err, PatchError::ConfigInvalid(_)));
    }

    #[test]
    fn test_empty_args_are_rejected() {
        let p = pattern("empty", PatternKind::General, "G", &[]);
        assert!(matches!(
            CallRewriter::new(&[p]),
            Err(PatchError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn test_multi_character_delimiter_is_rejected() {
        let mut p = general();
        p.delimiter = "'''".to_string();
        assert!(matches!(
            rewrite_calls("", &[p]),
            Err(PatchError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn test_two_argument_call_only_matches_exception() {
        let input = "t = format(`SELECT %s as date, %s FROM %s WHERE %s`, selectClause, whereClause)";
        let result = rewrite(input, &[general(), timeline()]);
        assert_eq!(
            result.text,
            "t = format(`SELECT %s as date, %s FROM %s WHERE %s`, selectClause, src, whereClause)"
        );
        assert_eq!(
            result.report.counts,
            vec![("general".to_string(), 0), ("timeline".to_string(), 1)]
        );
    }

    #[test]
    fn test_exceptions_run_after_general_patterns() {
        let rewriter = CallRewriter::new(&[timeline(), general()]).unwrap();
        let result = rewriter.rewrite("");
        let order: Vec<&str> = result.report.counts.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(order, vec!["general", "timeline"]);
    }

    #[test]
    fn test_second_pass_changes_nothing() {
        let input = "a := format(`FROM %s WHERE %s`, whereClause)\nb := format(`%s as date FROM %s WHERE %s`, selectClause, whereClause)\n";
        let patterns = [general(), timeline()];
        let once = rewrite(input, &patterns);
        let twice = rewrite(&once.text, &patterns);
        assert_eq!(once.report.total(), 2);
        assert_eq!(twice.text, once.text);
        assert_eq!(twice.report.total(), 0);
    }

    #[test]
    fn test_rewrites_every_occurrence_independently() {
        let input = "format(`FROM %s`, whereClause)\nformat(`WHERE %s`, whereClause)\nformat(`FROM %s`, whereClause)";
        let result = rewrite(input, &[general()]);
        assert_eq!(
            result.text,
            "format(`FROM %s`, src, whereClause)\nformat(`WHERE %s`, whereClause)\nformat(`FROM %s`, src, whereClause)"
        );
        assert_eq!(result.report.total(), 2);
    }

    #[test]
    fn test_literal_does_not_borrow_guard_from_next_call() {
        let input = "format(`SELECT 1`, whereClause)\nformat(`FROM %s`, other)";
        let result = rewrite(input, &[general()]);
        assert_eq!(result.text, input);
    }

    #[test]
    fn test_callee_must_start_at_identifier_boundary() {
        let input = "myformat(`FROM %s`, whereClause)";
        let result = rewrite(input, &[general()]);
        assert_eq!(result.text, input);
    }

    #[test]
    fn test_quoted_literal_with_escapes() {
        let mut p = general();
        p.delimiter = "\"".to_string();
        let input = r#"format("SELECT \"x\" FROM %s WHERE %s", whereClause)"#;
        let result = rewrite(input, &[p]);
        assert_eq!(
            result.text,
            r#"format("SELECT \"x\" FROM %s WHERE %s", src, whereClause)"#
        );
    }

    #[test]
    fn test_no_patterns_is_identity() {
        let result = rewrite("format(`FROM %s`, whereClause)", &[]);
        assert_eq!(result.text, "format(`FROM %s`, whereClause)");
        assert!(result.report.counts.is_empty());
    }
}
