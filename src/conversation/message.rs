//! Chat messages and their rendered content

use crate::backends::{ClassificationResult, Verdict};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Content of the synthetic message every session starts with
pub const WELCOME_TEXT: &str = "### Welcome to the AI Guardrail Chatbot!

I analyze your messages in real time and classify them before they go anywhere.

**How it works:**
1. Type your message below
2. It is classified as SAFE or MISUSE
3. You get the confidence score and processing time

Use `/flag` to report a verdict you think is wrong.";

/// Content appended when a classification fails on every transport
pub const CLASSIFICATION_ERROR_TEXT: &str =
    "**Error:** Unable to classify message. Please try again.";

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person chatting
    User,
    /// The classifier's replies (and synthetic messages)
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// One entry of the conversation log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Author of the message
    pub role: Role,
    /// Markdown content
    pub content: String,
    /// Stored classification id, present only on verdict messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification_id: Option<String>,
    /// Verdict, present only on verdict messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicted_class: Option<Verdict>,
    /// Verdict confidence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Server-side processing time in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_seconds: Option<f64>,
    /// When the message was appended
    pub created_at: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            classification_id: None,
            predicted_class: None,
            confidence: None,
            processing_time_seconds: None,
            created_at: Utc::now(),
        }
    }

    /// Creates a new user message
    ///
    /// # Examples
    ///
    /// ```
    /// use guardchat::conversation::{Message, Role};
    ///
    /// let msg = Message::user("What are investment strategies?");
    /// assert_eq!(msg.role, Role::User);
    /// assert!(!msg.is_flaggable());
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates a new assistant message without a verdict
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// The synthetic welcome message
    pub fn welcome() -> Self {
        Self::assistant(WELCOME_TEXT)
    }

    /// The assistant message shown when classification failed
    pub fn classification_error() -> Self {
        Self::assistant(CLASSIFICATION_ERROR_TEXT)
    }

    /// Creates an assistant message carrying a verdict
    ///
    /// # Examples
    ///
    /// ```
    /// use guardchat::backends::{ClassificationResult, Verdict};
    /// use guardchat::conversation::Message;
    ///
    /// let result = ClassificationResult::new("x1", Verdict::Misuse, 0.87, 0.042);
    /// let msg = Message::verdict(&result);
    /// assert!(msg.content.contains("MISUSE"));
    /// assert!(msg.content.contains("87.00%"));
    /// assert!(msg.content.contains("0.042s"));
    /// assert_eq!(msg.classification_id.as_deref(), Some("x1"));
    /// ```
    pub fn verdict(result: &ClassificationResult) -> Self {
        Self {
            classification_id: Some(result.id.clone()),
            predicted_class: Some(result.predicted_class),
            confidence: Some(result.confidence),
            processing_time_seconds: Some(result.processing_time_seconds),
            ..Self::assistant(render_verdict(result))
        }
    }

    /// Whether this message can be flagged as an incorrect verdict
    pub fn is_flaggable(&self) -> bool {
        self.role == Role::Assistant && self.classification_id.is_some()
    }
}

/// Render a verdict as chat content
pub fn render_verdict(result: &ClassificationResult) -> String {
    let confidence = format!("{:.2}%", result.confidence * 100.0);
    let timing = format!("{:.3}s", result.processing_time_seconds);

    match result.predicted_class {
        Verdict::Misuse => format!(
            "### Content Flagged

Your message has been flagged by the guardrail for potential policy violations.

**Classification Details:**
- **Status:** MISUSE Detected
- **Confidence:** {}
- **Processing Time:** {}

**Recommendation:** Please rephrase your message to comply with safety guidelines.",
            confidence, timing
        ),
        Verdict::Safe => format!(
            "### Content Approved

Your message has been reviewed and approved!

**Classification Details:**
- **Status:** SAFE
- **Confidence:** {}
- **Processing Time:** {}

**Great!** Your message meets all safety standards.",
            confidence, timing
        ),
    }
}
