//! Validation issues raised by the rule passes.

use serde::{Deserialize, Serialize};

/// What kind of finding an issue is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// The artifact is wrong and should not ship as-is
    Error,
    /// The artifact works but has a real problem
    Warning,
    /// An improvement worth considering
    Suggestion,
}

/// How severe an issue is, driving score deductions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Which rule family raised the issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    Syntax,
    Logic,
    Performance,
    Security,
    BestPractices,
    Style,
}

/// One finding about an artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Finding kind
    pub kind: IssueKind,

    /// Severity for scoring
    pub severity: Severity,

    /// Rule family that raised it
    pub category: IssueCategory,

    /// What was found
    pub message: String,

    /// Line number in the analyzed code, when known
    #[serde(default)]
    pub line: Option<usize>,

    /// How to address the finding
    #[serde(default)]
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    pub fn new(
        kind: IssueKind,
        severity: Severity,
        category: IssueCategory,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            severity,
            category,
            message: message.into(),
            line: None,
            suggestion: None,
        }
    }

    /// Attach the line number the issue was found on.
    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// Attach a remediation suggestion.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Whether this issue alone makes the artifact invalid.
    pub fn is_blocking(&self) -> bool {
        self.kind == IssueKind::Error && self.severity == Severity::Critical
    }
}
