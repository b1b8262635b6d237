//! Shared data model returned by every backend
//!
//! Adapters translate their wire formats into these types; nothing above the
//! adapters ever sees backend-specific field names.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary classifier verdict
///
/// Encoded on the wire as an integer: `0` = safe, `1` = misuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Verdict {
    /// Appropriate content
    Safe,
    /// Content flagged by the guardrail
    Misuse,
}

impl Verdict {
    /// Uppercase label used in rendered messages
    pub fn label(&self) -> &'static str {
        match self {
            Self::Safe => "SAFE",
            Self::Misuse => "MISUSE",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl TryFrom<i64> for Verdict {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Safe),
            1 => Ok(Self::Misuse),
            other => Err(format!("Unknown predicted class: {}", other)),
        }
    }
}

impl From<Verdict> for i64 {
    fn from(value: Verdict) -> Self {
        match value {
            Verdict::Safe => 0,
            Verdict::Misuse => 1,
        }
    }
}

/// Result of one classification request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Identifier of the stored classification, used for flagging
    pub id: String,
    /// Predicted class
    pub predicted_class: Verdict,
    /// Confidence in `[0, 1]`
    pub confidence: f64,
    /// Server-side inference time in seconds
    pub processing_time_seconds: f64,
    /// Optional textual label echoed by the service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ClassificationResult {
    /// Creates a new classification result without a textual label
    pub fn new(
        id: impl Into<String>,
        predicted_class: Verdict,
        confidence: f64,
        processing_time_seconds: f64,
    ) -> Self {
        Self {
            id: id.into(),
            predicted_class,
            confidence,
            processing_time_seconds,
            label: None,
        }
    }

    /// Checks the numeric ranges a backend must respect
    ///
    /// Returns a description of the first violation, if any.
    pub fn range_violation(&self) -> Option<String> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Some(format!("confidence {} outside [0, 1]", self.confidence));
        }
        if self.processing_time_seconds.is_nan() || self.processing_time_seconds < 0.0 {
            return Some(format!(
                "processing time {} is negative",
                self.processing_time_seconds
            ));
        }
        None
    }
}

/// Usage statistics snapshot
///
/// Treated as opaque: `safe_count + misuse_count == total_prompts` is expected
/// from the backend but not enforced here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// Number of prompts collected
    pub total_prompts: u64,
    /// Prompts classified safe
    pub safe_count: u64,
    /// Prompts classified as misuse
    pub misuse_count: u64,
    /// Classifications flagged as incorrect by users
    pub flagged_count: u64,
}
