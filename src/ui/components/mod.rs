pub mod chat_area;
pub mod error_view;
pub mod input_bar;
pub mod pages;
