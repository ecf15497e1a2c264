//! Core configuration and shared constants for the Glimpse tracking proxy.

pub mod config;
pub mod constants;
pub mod error;

// Re-export commonly used types
pub use config::Settings;
pub use constants::*;
pub use error::ConfigError;
