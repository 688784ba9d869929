use crate::common::ChatMessage;
use crate::error::Result;

/// Durable message store the chat service talks to.
///
/// Calls block; the chat service runs them on the blocking pool. Writes
/// reach subscribers through the change log, not through the gateway.
pub trait PersistenceGateway: Send + Sync + 'static {
    /// The newest `limit` messages, ascending by `created_at`.
    fn fetch_recent(&self, limit: usize) -> Result<Vec<ChatMessage>>;

    fn insert(&self, content: &str, username: &str) -> Result<ChatMessage>;

    /// Returns whether a message with `id` existed.
    fn delete(&self, id: &str) -> Result<bool>;
}
