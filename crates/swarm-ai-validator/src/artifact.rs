//! Artifacts submitted for validation.

use serde::{Deserialize, Serialize};

/// Something an agent produced: code, prose, or a mix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    /// The produced content
    pub content: String,

    /// The producer's declared confidence in the content (0 to 1)
    #[serde(default = "default_confidence")]
    pub confidence: f64,

    /// Optional hint about the content's language
    #[serde(default)]
    pub language_hint: Option<String>,
}

fn default_confidence() -> f64 {
    0.5
}

impl Artifact {
    /// Create an artifact with neutral confidence.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            confidence: default_confidence(),
            language_hint: None,
        }
    }

    /// Set the declared confidence, clamped to 0 to 1.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Set the language hint.
    pub fn with_language_hint(mut self, hint: impl Into<String>) -> Self {
        self.language_hint = Some(hint.into());
        self
    }
}
