pub mod osu;
pub mod ranking;
pub mod token;
