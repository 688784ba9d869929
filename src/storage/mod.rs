pub mod database;
pub mod message_db;

pub use message_db::MessageDatabase;
