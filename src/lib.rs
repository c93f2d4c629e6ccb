pub mod cli;
pub mod client;
pub mod clock;
pub mod config;
pub mod core;
pub mod error;
pub mod messaging;
pub mod storage;
pub mod utils;
pub mod watcher;
