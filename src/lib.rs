//! Public live chat.
//!
//! A desktop client that shows the most recent messages of a shared room
//! and keeps the list current from a change feed. Posting and deleting go
//! through a [`network::PersistenceGateway`]; the list only changes when
//! the matching insert/delete event arrives on a [`network::ChangeStream`].

pub mod common;
pub mod config;
pub mod error;
pub mod network;
pub mod storage;
pub mod ui;

pub use common::{ChatCommand, ChatMessage, FeedEvent, ServiceEvent};
pub use config::{AppConfig, PageSettings};
pub use error::{ChatError, ErrorCode, Result};
