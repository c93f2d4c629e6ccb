pub mod events;
pub mod ranking;
pub mod templates;
