pub mod client;
pub mod sink;
