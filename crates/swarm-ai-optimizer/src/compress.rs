//! Context compression: shrink oversized text to a unit budget.
//!
//! Four passes run in order, each cheaper information-wise than the next:
//! strip low-importance lines, de-duplicate repeats, summarize long
//! paragraphs, then extract key sentences. A hard character truncation
//! guarantees the budget regardless of content shape. Input that already
//! fits is returned unchanged, which makes the whole pipeline idempotent.

use std::collections::HashSet;

/// Approximate characters per unit of work.
pub const CHARS_PER_UNIT: usize = 4;

/// Lines scoring below this are candidates for removal.
const LOW_IMPORTANCE_CUTOFF: f64 = 2.0;

/// Paragraphs longer than this are summarized.
const PARAGRAPH_SUMMARY_CHARS: usize = 240;

const IMPORTANT_KEYWORDS: &[&str] = &[
    "error",
    "fail",
    "warning",
    "critical",
    "important",
    "must",
    "require",
    "result",
    "conclusion",
    "summary",
    "fix",
    "bug",
    "decision",
    "note",
];

/// Estimate the unit cost of a piece of text.
pub fn estimate_units(text: &str) -> u64 {
    ((text.chars().count() + CHARS_PER_UNIT - 1) / CHARS_PER_UNIT) as u64
}

/// Compress `text` to at most `max_units`, preserving the most important
/// content. Returns the input unchanged when it already fits.
pub fn compress_context(text: &str, max_units: u64) -> String {
    if estimate_units(text) <= max_units {
        return text.to_string();
    }

    let budget_chars = max_units as usize * CHARS_PER_UNIT;
    let tight_budget = budget_chars.saturating_mul(4) / 5;

    let mut result = strip_low_importance(text, tight_budget);
    result = dedupe_lines(&result);
    result = summarize_paragraphs(&result);

    if estimate_units(&result) > max_units {
        result = extract_key_sentences(&result, budget_chars);
    }
    if estimate_units(&result) > max_units {
        result = result.chars().take(budget_chars).collect();
    }
    result
}

fn line_importance(line: &str) -> f64 {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    let lower = trimmed.to_lowercase();
    let mut score = 1.0;
    for keyword in IMPORTANT_KEYWORDS {
        if lower.contains(keyword) {
            score += 1.0;
        }
    }
    // Headers and fence markers carry structure worth keeping.
    if trimmed.starts_with('#') || trimmed.starts_with("```") {
        score += 2.0;
    }
    if trimmed.chars().count() < 10 {
        score -= 0.5;
    }
    score
}

/// Remove the least important lines until the text is within budget or no
/// low-importance lines remain.
fn strip_low_importance(text: &str, budget_chars: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let mut keep = vec![true; lines.len()];
    let mut remaining = text.chars().count();

    let mut ranked: Vec<(usize, f64)> = lines
        .iter()
        .enumerate()
        .map(|(idx, line)| (idx, line_importance(line)))
        .collect();
    // Least important first; later lines go first on ties.
    ranked.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.0.cmp(&a.0))
    });

    for (idx, score) in ranked {
        if remaining <= budget_chars || score >= LOW_IMPORTANCE_CUTOFF {
            break;
        }
        keep[idx] = false;
        remaining = remaining.saturating_sub(lines[idx].chars().count() + 1);
    }

    lines
        .iter()
        .zip(keep.iter())
        .filter(|(_, kept)| **kept)
        .map(|(line, _)| *line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Drop exact repeats of non-empty lines, keeping the first occurrence.
fn dedupe_lines(text: &str) -> String {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || seen.insert(trimmed.to_string()) {
            out.push(line);
        }
    }
    out.join("\n")
}

/// Reduce long paragraphs to their three most keyword-dense sentences.
fn summarize_paragraphs(text: &str) -> String {
    text.split("\n\n")
        .map(|paragraph| {
            let sentences = split_sentences(paragraph);
            if sentences.len() <= 3 || paragraph.chars().count() <= PARAGRAPH_SUMMARY_CHARS {
                return paragraph.to_string();
            }

            let mut ranked: Vec<(usize, f64)> = sentences
                .iter()
                .enumerate()
                .map(|(idx, s)| (idx, keyword_density(s)))
                .collect();
            ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

            let mut chosen: Vec<usize> = ranked.into_iter().take(3).map(|(idx, _)| idx).collect();
            chosen.sort_unstable();
            chosen
                .into_iter()
                .map(|idx| sentences[idx].clone())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Keep the most keyword-dense sentences that fit the character budget,
/// preserving their original order.
fn extract_key_sentences(text: &str, budget_chars: usize) -> String {
    let sentences = split_sentences(text);
    let mut ranked: Vec<(usize, f64)> = sentences
        .iter()
        .enumerate()
        .map(|(idx, s)| (idx, keyword_density(s)))
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut keep = vec![false; sentences.len()];
    let mut used = 0usize;
    for (idx, _) in ranked {
        let length = sentences[idx].chars().count() + 1;
        if used + length > budget_chars {
            continue;
        }
        keep[idx] = true;
        used += length;
    }

    sentences
        .iter()
        .zip(keep.iter())
        .filter(|(_, kept)| **kept)
        .map(|(s, _)| s.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

fn keyword_density(sentence: &str) -> f64 {
    let lower = sentence.to_lowercase();
    let words = lower.split_whitespace().count().max(1);
    let hits = IMPORTANT_KEYWORDS
        .iter()
        .filter(|keyword| lower.contains(*keyword))
        .count();
    hits as f64 / words as f64
}

fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        current.push(ch);
        if matches!(ch, '.' | '!' | '?') {
            let sentence = current.trim().to_string();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            current.clear();
        }
    }
    let tail = current.trim().to_string();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}
