pub mod app;
pub mod boundary;
pub mod components;
pub mod page;
pub mod router;
pub mod state;

pub use app::ChatApp;
