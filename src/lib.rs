#![allow(clippy::uninlined_format_args)]

pub mod app;
pub mod catalog;
pub mod comments;
pub mod config;
pub mod data;
pub mod interactions;
pub mod persist;
pub mod render;
pub mod settings;
pub mod storage;
pub mod subscriptions;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::run;
