//! The six rule passes that turn analyzed code into validation issues.

use crate::analysis::CodeAnalysis;
use crate::config::StructuralLimits;
use crate::error::Result;
use crate::issues::{IssueCategory, IssueKind, Severity, ValidationIssue};
use regex::Regex;
use std::collections::HashMap;

/// Compiled rule patterns. Building the set is the only fallible step;
/// running it never fails.
#[derive(Debug)]
pub struct RuleSet {
    constant_conditional: Regex,
    paren_condition: Regex,
    dom_lookup: Regex,
    dangerous_sink: Regex,
    sql_concat: Regex,
    hardcoded_secret: Regex,
}

impl RuleSet {
    pub fn new() -> Result<Self> {
        Ok(Self {
            constant_conditional: Regex::new(
                r"if\s*\(\s*(?:true|false)\s*\)|if\s+(?:true|false)\s*\{",
            )?,
            paren_condition: Regex::new(r"if\s*\(([^)]+)\)")?,
            dom_lookup: Regex::new(
                r"document\.querySelector|document\.getElementById|getElementsBy\w+",
            )?,
            dangerous_sink: Regex::new(
                r"\beval\s*\(|dangerouslySetInnerHTML|innerHTML\s*=|child_process|os\.system|subprocess\.(?:call|run|Popen)",
            )?,
            sql_concat: Regex::new(
                r#"(?i)(?:SELECT|INSERT|UPDATE|DELETE)[^;]*(?:\+\s*\w|\$\{|%s|format!)"#,
            )?,
            hardcoded_secret: Regex::new(
                r#"(?i)(?:api[_-]?key|password|secret|token)\s*[:=]\s*["'][^"']{4,}["']"#,
            )?,
        })
    }

    /// Run every pass over the code.
    pub fn check(
        &self,
        code: &str,
        analysis: &CodeAnalysis,
        limits: &StructuralLimits,
    ) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        self.check_syntax(code, &mut issues);
        self.check_logic(code, &mut issues);
        self.check_performance(code, &mut issues);
        self.check_security(code, &mut issues);
        self.check_best_practices(analysis, limits, &mut issues);
        self.check_style(code, limits, &mut issues);
        issues
    }

    fn check_syntax(&self, code: &str, issues: &mut Vec<ValidationIssue>) {
        for (open, close, name) in [
            ('{', '}', "braces"),
            ('(', ')', "parentheses"),
            ('[', ']', "brackets"),
        ] {
            let opens = code.matches(open).count();
            let closes = code.matches(close).count();
            if opens != closes {
                issues.push(
                    ValidationIssue::new(
                        IssueKind::Error,
                        Severity::Critical,
                        IssueCategory::Syntax,
                        format!("unbalanced {name}: {opens} opening vs {closes} closing"),
                    )
                    .with_suggestion(format!("check {name} pairing")),
                );
            }
        }
    }

    fn check_logic(&self, code: &str, issues: &mut Vec<ValidationIssue>) {
        let mut seen_conditions: HashMap<String, usize> = HashMap::new();
        for (idx, line) in code.lines().enumerate() {
            if self.constant_conditional.is_match(line) {
                issues.push(
                    ValidationIssue::new(
                        IssueKind::Warning,
                        Severity::High,
                        IssueCategory::Logic,
                        "conditional always evaluates the same way",
                    )
                    .with_line(idx + 1)
                    .with_suggestion("remove the constant conditional or restore the condition"),
                );
                continue;
            }
            if let Some(cap) = self.paren_condition.captures(line) {
                let condition = cap[1].trim().to_string();
                match seen_conditions.get(&condition) {
                    Some(first) => issues.push(
                        ValidationIssue::new(
                            IssueKind::Warning,
                            Severity::Medium,
                            IssueCategory::Logic,
                            format!("condition '{condition}' duplicates line {first}"),
                        )
                        .with_line(idx + 1)
                        .with_suggestion("merge branches that test the same condition"),
                    ),
                    None => {
                        seen_conditions.insert(condition, idx + 1);
                    }
                }
            }
        }
    }

    fn check_performance(&self, code: &str, issues: &mut Vec<ValidationIssue>) {
        const LOOPS: &[&str] = &["for ", "for(", "while ", "while(", ".forEach(", "loop {"];

        let mut loop_stack: Vec<u32> = Vec::new();
        let mut depth: u32 = 0;
        for (idx, line) in code.lines().enumerate() {
            if LOOPS.iter().any(|kw| line.contains(kw)) {
                if !loop_stack.is_empty() {
                    issues.push(
                        ValidationIssue::new(
                            IssueKind::Warning,
                            Severity::Medium,
                            IssueCategory::Performance,
                            "nested loops multiply iteration cost",
                        )
                        .with_line(idx + 1)
                        .with_suggestion("hoist work out of the inner loop or restructure"),
                    );
                }
                loop_stack.push(depth);
            }
            if !loop_stack.is_empty() && self.dom_lookup.is_match(line) {
                issues.push(
                    ValidationIssue::new(
                        IssueKind::Warning,
                        Severity::Medium,
                        IssueCategory::Performance,
                        "document lookup inside a loop",
                    )
                    .with_line(idx + 1)
                    .with_suggestion("cache the lookup result outside the loop"),
                );
            }
            for ch in line.chars() {
                match ch {
                    '{' => depth += 1,
                    '}' => {
                        depth = depth.saturating_sub(1);
                        while matches!(loop_stack.last(), Some(&d) if depth <= d) {
                            loop_stack.pop();
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    fn check_security(&self, code: &str, issues: &mut Vec<ValidationIssue>) {
        for (idx, line) in code.lines().enumerate() {
            if let Some(found) = self.dangerous_sink.find(line) {
                issues.push(
                    ValidationIssue::new(
                        IssueKind::Error,
                        Severity::Critical,
                        IssueCategory::Security,
                        format!("dangerous sink '{}'", found.as_str().trim()),
                    )
                    .with_line(idx + 1)
                    .with_suggestion("replace the dangerous call with a safe API"),
                );
            }
            if self.sql_concat.is_match(line) {
                issues.push(
                    ValidationIssue::new(
                        IssueKind::Error,
                        Severity::High,
                        IssueCategory::Security,
                        "SQL statement built from string concatenation",
                    )
                    .with_line(idx + 1)
                    .with_suggestion("use parameterized queries"),
                );
            }
            if self.hardcoded_secret.is_match(line) {
                issues.push(
                    ValidationIssue::new(
                        IssueKind::Error,
                        Severity::High,
                        IssueCategory::Security,
                        "hardcoded credential",
                    )
                    .with_line(idx + 1)
                    .with_suggestion("load secrets from the environment or a vault"),
                );
            }
        }
    }

    fn check_best_practices(
        &self,
        analysis: &CodeAnalysis,
        limits: &StructuralLimits,
        issues: &mut Vec<ValidationIssue>,
    ) {
        if analysis.complexity > limits.max_complexity {
            issues.push(
                ValidationIssue::new(
                    IssueKind::Warning,
                    Severity::High,
                    IssueCategory::BestPractices,
                    format!(
                        "complexity {} exceeds the limit of {}",
                        analysis.complexity, limits.max_complexity
                    ),
                )
                .with_suggestion("refactor high-complexity sections into smaller functions"),
            );
        }
        if analysis.line_count > limits.max_file_lines {
            issues.push(
                ValidationIssue::new(
                    IssueKind::Warning,
                    Severity::Medium,
                    IssueCategory::BestPractices,
                    format!(
                        "file has {} lines, over the {} line limit",
                        analysis.line_count, limits.max_file_lines
                    ),
                )
                .with_suggestion("split the file into smaller modules"),
            );
        }
        if analysis.function_count > 0
            && analysis.avg_function_length() > limits.max_function_lines as f64
        {
            issues.push(
                ValidationIssue::new(
                    IssueKind::Warning,
                    Severity::Medium,
                    IssueCategory::BestPractices,
                    format!(
                        "functions average {:.0} lines, over the {} line limit",
                        analysis.avg_function_length(),
                        limits.max_function_lines
                    ),
                )
                .with_suggestion("extract helpers to shorten long functions"),
            );
        }
    }

    fn check_style(
        &self,
        code: &str,
        limits: &StructuralLimits,
        issues: &mut Vec<ValidationIssue>,
    ) {
        for (idx, line) in code.lines().enumerate() {
            let length = line.chars().count();
            if length > limits.max_line_length {
                issues.push(
                    ValidationIssue::new(
                        IssueKind::Suggestion,
                        Severity::Low,
                        IssueCategory::Style,
                        format!(
                            "line is {} characters, over the {} character limit",
                            length, limits.max_line_length
                        ),
                    )
                    .with_line(idx + 1)
                    .with_suggestion("wrap long lines"),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis;

    fn run(code: &str) -> Vec<ValidationIssue> {
        let limits = StructuralLimits::default();
        let rules = RuleSet::new().unwrap();
        let analysis = analysis::analyze(code, &limits);
        rules.check(code, &analysis, &limits)
    }

    fn has(issues: &[ValidationIssue], category: IssueCategory, severity: Severity) -> bool {
        issues
            .iter()
            .any(|i| i.category == category && i.severity == severity)
    }

    #[test]
    fn test_unbalanced_braces_are_critical() {
        let issues = run("fn main() {\n    if x {\n");
        assert!(has(&issues, IssueCategory::Syntax, Severity::Critical));
    }

    #[test]
    fn test_constant_and_duplicated_conditionals() {
        let code = "if (true) {\n  go();\n}\nif (x > 1) {\n  a();\n}\nif (x > 1) {\n  b();\n}";
        let issues = run(code);

        assert!(has(&issues, IssueCategory::Logic, Severity::High));
        assert!(has(&issues, IssueCategory::Logic, Severity::Medium));
    }

    #[test]
    fn test_nested_loops_and_dom_lookups() {
        let code = "for (const row of rows) {\n  for (const cell of row) {\n    const el = document.getElementById(cell.id);\n  }\n}";
        let issues = run(code);

        let performance: Vec<_> = issues
            .iter()
            .filter(|i| i.category == IssueCategory::Performance)
            .collect();
        assert_eq!(performance.len(), 2);
        assert!(performance.iter().any(|i| i.message.contains("nested")));
        assert!(performance.iter().any(|i| i.message.contains("lookup")));
    }

    #[test]
    fn test_dangerous_sinks_are_critical() {
        let issues = run("function render(input) {\n  return eval(input);\n}");
        assert!(has(&issues, IssueCategory::Security, Severity::Critical));
    }

    #[test]
    fn test_sql_concatenation_and_secrets_are_high() {
        let code = "const q = \"SELECT * FROM users WHERE id = \" + userId;\nconst api_key = \"sk-1234567890\";";
        let issues = run(code);

        let security: Vec<_> = issues
            .iter()
            .filter(|i| i.category == IssueCategory::Security && i.severity == Severity::High)
            .collect();
        assert_eq!(security.len(), 2);
    }

    #[test]
    fn test_style_flags_long_lines() {
        let long_line = format!("let value = \"{}\";", "x".repeat(150));
        let issues = run(&long_line);
        assert!(has(&issues, IssueCategory::Style, Severity::Low));
    }

    #[test]
    fn test_clean_code_raises_nothing() {
        let code = "fn add(a: i32, b: i32) -> i32 {\n    a + b\n}";
        assert!(run(code).is_empty());
    }
}
