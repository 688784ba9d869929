pub mod commands;
pub mod events;
pub mod types;

pub use commands::ChatCommand;
pub use events::{FeedEvent, ServiceEvent};
pub use types::ChatMessage;
