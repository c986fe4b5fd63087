use crate::routes::chat::ChatMessage;

/// Client-side chat history with duplicate suppression.
///
/// A sent message comes back twice: once in the HTTP response and once as
/// the room broadcast echo. Whichever arrives second must be dropped, and
/// applying the same broadcast twice (e.g. replayed after a reconnect
/// refetch) must be a no-op.
#[derive(Debug, Default)]
pub struct ChatLog {
    messages: Vec<ChatMessage>,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole history from a fetch. Used on room entry and
    /// after reconnect.
    pub fn replace(&mut self, history: Vec<ChatMessage>) {
        self.messages = history;
    }

    /// Appends one incoming message unless it is already present. Returns
    /// whether anything changed, so callers only re-render on `true`.
    pub fn apply(&mut self, incoming: ChatMessage) -> bool {
        if self.contains(&incoming) {
            return false;
        }
        self.messages.push(incoming);
        true
    }

    fn contains(&self, candidate: &ChatMessage) -> bool {
        self.messages.iter().any(|m| {
            m.id == candidate.id
                || (m.timestamp == candidate.timestamp
                    && m.sender == candidate.sender
                    && m.message == candidate.message)
        })
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
