use super::types::{Message, Sender};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Append-only chat log.
///
/// Entries keep the order in which they were appended until the log is
/// cleared. Every mutation bumps a revision counter so the view knows to
/// scroll the newest entry into sight.
#[derive(Debug, Clone)]
pub struct MessageLog {
    messages: Arc<RwLock<Vec<Message>>>,
    revision: Arc<AtomicU64>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self {
            messages: Arc::new(RwLock::new(Vec::new())),
            revision: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Append a new entry stamped with the current local time
    pub fn append(&self, sender: Sender, text: impl Into<String>) -> Message {
        self.push(Message::new(sender, text))
    }

    /// Append an already built entry
    pub fn push(&self, message: Message) -> Message {
        self.messages.write().push(message.clone());
        self.revision.fetch_add(1, Ordering::SeqCst);
        message
    }

    pub fn get_all(&self) -> Vec<Message> {
        self.messages.read().clone()
    }

    pub fn last(&self) -> Option<Message> {
        self.messages.read().last().cloned()
    }

    pub fn find(&self, id: uuid::Uuid) -> Option<Message> {
        self.messages.read().iter().find(|m| m.id == id).cloned()
    }

    /// `(sender, text)` pairs in log order
    pub fn transcript(&self) -> Vec<(Sender, String)> {
        self.messages
            .read()
            .iter()
            .map(|m| (m.sender, m.text.clone()))
            .collect()
    }

    pub fn clear(&self) {
        self.messages.write().clear();
        self.revision.fetch_add(1, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.read().is_empty()
    }

    /// Monotonic counter bumped by every append or clear
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_keeps_order() {
        let log = MessageLog::new();
        log.append(Sender::User, "one");
        log.append(Sender::Assistant, "two");
        log.append(Sender::User, "three");

        let texts: Vec<String> = log.get_all().into_iter().map(|m| m.text).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_no_deduplication() {
        let log = MessageLog::new();
        log.append(Sender::User, "again");
        log.append(Sender::User, "again");
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_revision_tracks_mutations() {
        let log = MessageLog::new();
        assert_eq!(log.revision(), 0);
        log.append(Sender::User, "a");
        assert_eq!(log.revision(), 1);
        log.clear();
        assert_eq!(log.revision(), 2);
        assert!(log.is_empty());
    }

    #[test]
    fn test_clones_share_entries() {
        let log = MessageLog::new();
        let view = log.clone();
        let message = log.append(Sender::Assistant, "shared");
        assert_eq!(view.len(), 1);
        assert_eq!(view.find(message.id).map(|m| m.text), Some("shared".to_string()));
    }
}
