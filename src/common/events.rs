use super::types::ChatMessage;
use crate::error::Result;

/// Row change delivered by the change stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    Insert(ChatMessage),
    Delete { id: String },
}

/// Completion of a request the page handed to the chat service.
#[derive(Debug)]
pub enum ServiceEvent {
    Loaded(Result<Vec<ChatMessage>>),
    Submitted(Result<ChatMessage>),
    Removed { id: String, result: Result<bool> },
}
