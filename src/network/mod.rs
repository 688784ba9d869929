pub mod client;
pub mod feed;
pub mod gateway;
pub mod subscriber;
pub mod watcher;

pub use client::ChatService;
pub use feed::{ChangeFeed, ChangeStream, SubscriptionHandle};
pub use gateway::PersistenceGateway;
pub use subscriber::{LiveFeedSubscriber, SubscriptionState};
pub use watcher::{ChangeWatcher, WatcherSettings};
