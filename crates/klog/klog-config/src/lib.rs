mod config;

pub use config::{ConfigError, KlogConfig};
