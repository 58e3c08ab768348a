//! Static code analysis: extraction, language detection, and structural
//! measurement.
//!
//! Everything here is a text heuristic, not a parser. Counts are raw and
//! string contents can fool them; the goal is a stable signal for scoring,
//! not exact program understanding.

use crate::config::StructuralLimits;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Nesting deeper than this reads as a smell.
const DEEP_NESTING: u32 = 5;

/// Languages the analyzer recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Rust,
    TypeScript,
    JavaScript,
    Python,
    Go,
    Unknown,
}

impl Language {
    /// Parse a caller-supplied language hint.
    pub fn from_hint(hint: &str) -> Option<Self> {
        match hint.to_lowercase().as_str() {
            "rust" | "rs" => Some(Language::Rust),
            "typescript" | "ts" => Some(Language::TypeScript),
            "javascript" | "js" => Some(Language::JavaScript),
            "python" | "py" => Some(Language::Python),
            "go" | "golang" => Some(Language::Go),
            _ => None,
        }
    }
}

/// Structural measurements of a piece of code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeAnalysis {
    /// Detected (or hinted) language
    pub language: Language,

    /// Total line count
    pub line_count: usize,

    /// Lines that are comments
    pub comment_line_count: usize,

    /// Function definitions found
    pub function_count: usize,

    /// Class-like definitions found (classes, structs, interfaces, traits)
    pub class_count: usize,

    /// Cyclomatic-style complexity: 1 + control structures + max nesting
    pub complexity: u32,

    /// Deepest brace nesting
    pub max_nesting: u32,

    /// Import/include lines
    pub imports: Vec<String>,

    /// Recognized design and concurrency patterns
    pub patterns: Vec<String>,

    /// Detected code smells
    pub smells: Vec<String>,
}

impl CodeAnalysis {
    /// Average function length in lines, assuming functions fill the file.
    pub fn avg_function_length(&self) -> f64 {
        self.line_count as f64 / self.function_count.max(1) as f64
    }

    /// Comment lines per total line.
    pub fn comment_density(&self) -> f64 {
        if self.line_count == 0 {
            return 0.0;
        }
        self.comment_line_count as f64 / self.line_count as f64
    }
}

/// Pull analyzable code out of an artifact's content.
///
/// Fenced blocks win; without fences, content that carries enough code
/// indicators is admitted whole. Prose yields `None`.
pub fn extract_code(content: &str) -> Option<String> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();
    let mut in_block = false;
    for line in content.lines() {
        if line.trim_start().starts_with("```") {
            if in_block {
                blocks.push(current.join("\n"));
                current = Vec::new();
            }
            in_block = !in_block;
            continue;
        }
        if in_block {
            current.push(line);
        }
    }

    if !blocks.is_empty() {
        return Some(blocks.join("\n"));
    }
    if looks_like_code(content) {
        return Some(content.to_string());
    }
    None
}

fn looks_like_code(content: &str) -> bool {
    const INDICATORS: &[&str] = &[
        "fn ",
        "function ",
        "def ",
        "class ",
        "impl ",
        "let ",
        "const ",
        "import ",
        "return ",
        "=> ",
        "};",
    ];
    let hits = INDICATORS
        .iter()
        .filter(|indicator| content.contains(*indicator))
        .count();
    hits >= 3
}

/// Guess the language from keyword profiles. Two marker hits are required;
/// anything weaker stays `Unknown`.
pub fn detect_language(code: &str) -> Language {
    let profiles: &[(Language, &[&str])] = &[
        (
            Language::Rust,
            &["fn ", "let mut ", "impl ", "pub fn", "match ", "::"],
        ),
        (
            Language::TypeScript,
            &["interface ", ": string", ": number", "export ", "import {"],
        ),
        (
            Language::JavaScript,
            &["function ", "const ", "=> {", "console.log", "require("],
        ),
        (
            Language::Python,
            &["def ", "elif ", "self.", "import ", "print("],
        ),
        (Language::Go, &["func ", "package ", ":= ", "fmt."]),
    ];

    let mut best = Language::Unknown;
    let mut best_hits = 0;
    for (language, markers) in profiles {
        let hits = markers.iter().filter(|m| code.contains(*m)).count();
        if hits > best_hits {
            best_hits = hits;
            best = *language;
        }
    }
    if best_hits >= 2 {
        best
    } else {
        Language::Unknown
    }
}

/// Measure a piece of code.
pub fn analyze(code: &str, limits: &StructuralLimits) -> CodeAnalysis {
    let lines: Vec<&str> = code.lines().collect();
    let line_count = lines.len();

    let comment_line_count = lines
        .iter()
        .filter(|line| {
            let t = line.trim_start();
            t.starts_with("//")
                || t.starts_with('#')
                || t.starts_with("/*")
                || t.starts_with('*')
                || t.starts_with("\"\"\"")
        })
        .count();

    let function_count = ["fn ", "function ", "def ", "func "]
        .iter()
        .map(|kw| code.matches(kw).count())
        .sum();
    let class_count = ["class ", "struct ", "interface ", "trait "]
        .iter()
        .map(|kw| code.matches(kw).count())
        .sum();

    let imports = collect_imports(&lines);
    let (control_count, max_nesting) = control_flow(code);
    let complexity = 1 + control_count + max_nesting;

    let smells = detect_smells(
        &lines,
        line_count,
        function_count,
        complexity,
        max_nesting,
        limits,
    );

    CodeAnalysis {
        language: detect_language(code),
        line_count,
        comment_line_count,
        function_count,
        class_count,
        complexity,
        max_nesting,
        imports,
        patterns: detect_patterns(code),
        smells,
    }
}

fn collect_imports(lines: &[&str]) -> Vec<String> {
    lines
        .iter()
        .filter_map(|line| {
            let t = line.trim();
            let is_import = t.starts_with("import ")
                || t.starts_with("use ")
                || t.starts_with("from ")
                || t.starts_with("#include")
                || t.contains("require(");
            if is_import {
                Some(t.to_string())
            } else {
                None
            }
        })
        .collect()
}

fn control_flow(code: &str) -> (u32, u32) {
    const CONTROL: &[&str] = &[
        "if ", "if(", "for ", "for(", "while ", "while(", "match ", "switch", "case ", "catch",
        "&&", "||",
    ];
    let mut count = 0u32;
    for keyword in CONTROL {
        count += code.matches(keyword).count() as u32;
    }

    let mut depth = 0u32;
    let mut max = 0u32;
    for ch in code.chars() {
        match ch {
            '{' => {
                depth += 1;
                max = max.max(depth);
            }
            '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    (count, max)
}

fn detect_patterns(code: &str) -> Vec<String> {
    let lower = code.to_lowercase();
    let table: &[(&str, &[&str])] = &[
        ("factory pattern", &["factory"]),
        ("observer pattern", &["observer", "subscribe("]),
        ("singleton pattern", &["singleton", "getinstance", "get_instance"]),
        ("async concurrency", &["async ", "await"]),
        ("caching", &["cache", "memoiz"]),
        ("resource pooling", &["pool"]),
    ];
    table
        .iter()
        .filter(|(_, markers)| markers.iter().any(|m| lower.contains(m)))
        .map(|(name, _)| name.to_string())
        .collect()
}

fn detect_smells(
    lines: &[&str],
    line_count: usize,
    function_count: usize,
    complexity: u32,
    max_nesting: u32,
    limits: &StructuralLimits,
) -> Vec<String> {
    let mut smells = Vec::new();

    if function_count > 0 && line_count / function_count > limits.max_function_lines {
        smells.push("long functions".to_string());
    }
    if line_count > limits.max_file_lines {
        smells.push("large file".to_string());
    }
    if complexity > limits.max_complexity {
        smells.push("high complexity".to_string());
    }
    if max_nesting > DEEP_NESTING {
        smells.push("deep nesting".to_string());
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for line in lines {
        let t = line.trim();
        if t.len() > 20 {
            *counts.entry(t).or_insert(0) += 1;
        }
    }
    if counts.values().any(|c| *c >= 3) {
        smells.push("duplicated code".to_string());
    }

    smells
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_fenced_blocks() {
        let content = "Here is the fix:\n```rust\nfn add(a: i32, b: i32) -> i32 {\n    a + b\n}\n```\nDone.";
        let code = extract_code(content).unwrap();
        assert!(code.contains("fn add"));
        assert!(!code.contains("Here is the fix"));
    }

    #[test]
    fn test_admits_bare_code_by_indicators() {
        let content = "function greet(name) {\n  const msg = `hi ${name}`;\n  return msg;\n}";
        assert!(extract_code(content).is_some());
    }

    #[test]
    fn test_rejects_prose() {
        let content = "The deployment finished without problems and the dashboard is green.";
        assert!(extract_code(content).is_none());
    }

    #[test]
    fn test_detects_rust_and_python() {
        let rust = "pub fn run() {\n    let mut total = 0;\n    match total {\n        _ => {}\n    }\n}";
        assert_eq!(detect_language(rust), Language::Rust);

        let python = "def run(self):\n    if self.done:\n        print(\"ok\")\n    elif self.retry:\n        pass";
        assert_eq!(detect_language(python), Language::Python);

        assert_eq!(detect_language("hello there"), Language::Unknown);
    }

    #[test]
    fn test_complexity_counts_control_flow_and_nesting() {
        let code = "fn f(x: i32) {\n    if x > 0 {\n        for i in 0..x {\n            if i % 2 == 0 && i > 2 {\n                work(i);\n            }\n        }\n    }\n}";
        let analysis = analyze(code, &StructuralLimits::default());

        // 2x "if ", 1x "for ", 1x "&&" plus nesting depth 4
        assert_eq!(analysis.complexity, 1 + 4 + 4);
        assert_eq!(analysis.max_nesting, 4);
        assert_eq!(analysis.function_count, 1);
    }

    #[test]
    fn test_smells_flag_structural_problems() {
        let mut code = String::from("fn main() {\n");
        for _ in 0..3 {
            code.push_str("    let total = compute_total_for_report(input);\n");
        }
        code.push('}');

        let limits = StructuralLimits {
            max_file_lines: 3,
            ..StructuralLimits::default()
        };
        let analysis = analyze(&code, &limits);

        assert!(analysis.smells.contains(&"large file".to_string()));
        assert!(analysis.smells.contains(&"duplicated code".to_string()));
    }

    #[test]
    fn test_collects_imports_and_patterns() {
        let code = "use std::collections::HashMap;\nasync fn load(cache: &Cache) {\n    cache.get(\"k\").await;\n}";
        let analysis = analyze(code, &StructuralLimits::default());

        assert_eq!(analysis.imports.len(), 1);
        assert!(analysis.patterns.contains(&"async concurrency".to_string()));
        assert!(analysis.patterns.contains(&"caching".to_string()));
    }
}
