use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    User,
    Assistant,
}

impl Sender {
    /// Map the service's `is_user` flag to an author role
    pub fn from_is_user(is_user: bool) -> Self {
        if is_user {
            Sender::User
        } else {
            Sender::Assistant
        }
    }

    pub fn is_user(self) -> bool {
        matches!(self, Sender::User)
    }
}

/// A single entry in the chat log.
///
/// The timestamp is the local time at which the entry was created, never
/// the server's time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Local>,
    /// Audio rendition attached to an assistant reply
    pub audio_url: Option<String>,
}

impl Message {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            text: text.into(),
            timestamp: Local::now(),
            audio_url: None,
        }
    }

    pub fn with_audio(mut self, audio_url: Option<String>) -> Self {
        self.audio_url = audio_url;
        self
    }

    /// Wall clock time for display, e.g. `14:03:27`
    pub fn display_time(&self) -> String {
        self.timestamp.format("%H:%M:%S").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_from_flag() {
        assert_eq!(Sender::from_is_user(true), Sender::User);
        assert_eq!(Sender::from_is_user(false), Sender::Assistant);
        assert!(Sender::User.is_user());
    }

    #[test]
    fn test_display_time_format() {
        let message = Message::new(Sender::User, "hi");
        let time = message.display_time();
        assert_eq!(time.len(), 8);
        assert_eq!(time.matches(':').count(), 2);
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Message::new(Sender::User, "same");
        let b = Message::new(Sender::User, "same");
        assert_ne!(a.id, b.id);
    }
}
