//! Shared types for the response pipeline.

use serde::{Deserialize, Serialize};

/// Mood label assigned when the client omits one.
pub const DEFAULT_MOOD: &str = "Neutral";

/// An inbound chat message. Immutable once received.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Free-text user message. May be empty.
    pub text: String,
    /// Self-declared mood label ("Sad", "Anxious", ...). Free-form.
    pub mood: String,
}

impl ChatMessage {
    pub fn new(text: impl Into<String>, mood: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mood: mood.into(),
        }
    }
}

/// Which stage produced the final reply.
///
/// Exactly one stage determines the reply for any input; the first stage
/// that matches wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplySource {
    /// Crisis-indicator short-circuit.
    Safety,
    /// Exact match in the scripted rule table.
    Rule,
    /// Text returned by the generation service.
    Generative,
    /// Synthesized fallback after a generation failure.
    Degraded,
}

impl ReplySource {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Safety => "safety",
            Self::Rule => "rule",
            Self::Generative => "generative",
            Self::Degraded => "degraded",
        }
    }
}

/// Result of running a message through the pipeline.
///
/// Produced fresh per invocation; the history sink stores only the text
/// fields, never this struct.
#[derive(Debug, Clone)]
pub struct PipelineReply {
    pub reply: String,
    pub source: ReplySource,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_source_labels() {
        assert_eq!(ReplySource::Safety.label(), "safety");
        assert_eq!(ReplySource::Rule.label(), "rule");
        assert_eq!(ReplySource::Generative.label(), "generative");
        assert_eq!(ReplySource::Degraded.label(), "degraded");
    }

    #[test]
    fn reply_source_serializes_snake_case() {
        let json = serde_json::to_value(ReplySource::Generative).unwrap();
        assert_eq!(json, "generative");
    }

    #[test]
    fn chat_message_construction() {
        let msg = ChatMessage::new("hello", DEFAULT_MOOD);
        assert_eq!(msg.text, "hello");
        assert_eq!(msg.mood, "Neutral");
    }
}
