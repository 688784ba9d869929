use tokio::sync::mpsc;

use super::events::ServiceEvent;

/// Requests the UI sends to the chat service.
///
/// Every request carries the sender half of the requesting page's reply
/// channel; once the page is gone the reply is dropped on the floor.
#[derive(Debug, Clone)]
pub enum ChatCommand {
    LoadRecent {
        limit: usize,
        reply: mpsc::Sender<ServiceEvent>,
    },
    Submit {
        content: String,
        username: String,
        reply: mpsc::Sender<ServiceEvent>,
    },
    Remove {
        id: String,
        reply: mpsc::Sender<ServiceEvent>,
    },
}
