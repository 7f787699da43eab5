use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".to_string(), content: content.into() }
    }
}

/// One ranked filler for a masked prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillMaskCandidate {
    pub token_str: String,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<String>,
}

/// A worked example for chat prompting, kept with its relation so examples
/// can be drawn per relation.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatExample {
    pub relation: String,
    pub question: ChatMessage,
    pub answer: ChatMessage,
}
