pub mod commands;
pub mod config;
pub mod hub;
pub mod osc;

pub use config::Config;
pub use config::LogLevel;
