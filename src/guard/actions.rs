use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for MessageId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A bot answer awaiting review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotMessage {
    pub id: MessageId,
    /// User question, used as the retrieval query
    pub question: String,
    /// Prompt that produced `answer`; regenerated for the consistency check
    pub prompt: String,
    pub answer: String,
}

impl BotMessage {
    pub fn new(question: impl Into<String>, prompt: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            question: question.into(),
            prompt: prompt.into(),
            answer: answer.into(),
        }
    }
}

/// What the conversation layer should do after a review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RailAction {
    Speak { text: String },
    Retract { message_id: MessageId },
    Annotate { message_id: MessageId, note: String },
}
