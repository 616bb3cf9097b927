pub mod client;
pub mod logging;
pub mod tui;

pub use client::HttpBackend;
