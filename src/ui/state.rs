use crate::common::ChatMessage;
use crate::common::types::{display_name, validate_content};
use crate::error::ChatError;

/// Ordered local cache of the messages on screen.
///
/// The store trusts its inputs: the bulk load decides the initial order and
/// inserts are appended as they arrive, without id checks.
#[derive(Debug, Default)]
pub struct MessageStore {
    messages: Vec<ChatMessage>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything with the result of the bulk load.
    pub fn initialize(&mut self, batch: Vec<ChatMessage>) {
        self.messages = batch;
    }

    pub fn apply_insert(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Remove the first message with `id`. Returns false if none matched.
    pub fn apply_delete(&mut self, id: &str) -> bool {
        match self.messages.iter().position(|message| message.id == id) {
            Some(index) => {
                self.messages.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }
}

/// What the page asks the gateway to store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequest {
    pub content: String,
    pub username: String,
}

/// The input form: username, message text and the in-flight flag.
#[derive(Debug, Default)]
pub struct ComposeState {
    pub input_text: String,
    pub username: String,
    sending: bool,
}

impl ComposeState {
    pub fn new(username: &str) -> Self {
        Self {
            username: username.to_string(),
            ..Self::default()
        }
    }

    pub fn is_sending(&self) -> bool {
        self.sending
    }

    /// Drives the send button's enabled state.
    pub fn can_send(&self) -> bool {
        !self.sending && !self.input_text.trim().is_empty()
    }

    /// Start a submit if the form allows one, marking it in flight.
    pub fn begin_submit(&mut self) -> Option<SubmitRequest> {
        if self.sending {
            log::debug!("Submit ignored, previous message still sending");
            return None;
        }
        if let Err(err) = validate_content(&self.input_text) {
            log::debug!("Submit ignored: {err}");
            return None;
        }

        self.sending = true;
        Some(SubmitRequest {
            content: self.input_text.clone(),
            username: display_name(&self.username),
        })
    }

    /// Submit could not be handed off; nothing is in flight any more.
    pub fn abort_submit(&mut self) {
        self.sending = false;
    }

    /// Settle the in-flight submit. The input is cleared only on success.
    pub fn finish_submit(&mut self, result: Result<&ChatMessage, &ChatError>) {
        self.sending = false;
        match result {
            Ok(message) => {
                log::debug!("Message {} sent", message.id);
                self.input_text.clear();
            }
            Err(err) => log::error!("Error sending message: {err}"),
        }
    }
}
