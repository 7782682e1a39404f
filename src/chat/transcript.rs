//! Chat transcript
//!
//! Ordered, append-only sequence of turn messages. The trailing message
//! can be rewritten in place while a turn's stream is being consumed, so
//! progressive updates never add duplicate entries.

use serde::{Deserialize, Serialize};

/// Who authored a transcript message. Determines rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Human,
    Ai,
}

/// One message in the conversation transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: Role::Human,
            content: content.into(),
        }
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self {
            role: Role::Ai,
            content: content.into(),
        }
    }
}

/// The ordered message sequence for one session.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Replace the content of the trailing message.
    pub fn update_tail(&mut self, content: &str) {
        if let Some(last) = self.messages.last_mut() {
            last.content = content.to_string();
        }
    }

    /// Remove and return the trailing message.
    pub fn pop(&mut self) -> Option<ChatMessage> {
        self.messages.pop()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChatMessage> {
        self.messages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_update_tail() {
        let mut transcript = Transcript::new();
        transcript.push(ChatMessage::human("hi"));
        transcript.push(ChatMessage::ai(""));

        transcript.update_tail("Hel");
        transcript.update_tail("Hello");

        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.messages()[1], ChatMessage::ai("Hello"));
        assert_eq!(transcript.messages()[0], ChatMessage::human("hi"));
    }

    #[test]
    fn test_update_tail_on_empty_is_noop() {
        let mut transcript = Transcript::new();
        transcript.update_tail("nothing");
        assert!(transcript.is_empty());
    }

    #[test]
    fn test_pop_and_clear() {
        let mut transcript = Transcript::new();
        transcript.push(ChatMessage::human("hi"));
        transcript.push(ChatMessage::ai("there"));

        assert_eq!(transcript.pop(), Some(ChatMessage::ai("there")));
        assert_eq!(transcript.len(), 1);

        transcript.clear();
        assert!(transcript.is_empty());
        assert!(transcript.pop().is_none());
    }
}
