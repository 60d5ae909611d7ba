use klog_ring::RingConfig;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct KlogConfig {
    /// Ring size in bytes. Power of two, at least one maximal record.
    #[serde(default = "defaults::capacity")]
    pub capacity: usize,
    /// Start with writes routed straight to serial.
    #[serde(default = "defaults::bypass")]
    pub bypass: bool,
    #[serde(default = "defaults::console")]
    pub console: bool,
    #[serde(default = "defaults::serial")]
    pub serial: bool,
    #[serde(default = "defaults::log_level")]
    pub log_level: String,
    #[serde(default = "defaults::shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),

    #[error("capacity {0} must be a power of two no smaller than one record")]
    InvalidCapacity(usize),
}

mod defaults {
    pub fn capacity() -> usize {
        1 << 17 // 128 KiB
    }

    pub fn bypass() -> bool {
        false
    }

    pub fn console() -> bool {
        true
    }

    pub fn serial() -> bool {
        true
    }

    pub fn log_level() -> String {
        "info".into()
    }

    pub fn shutdown_timeout_ms() -> u64 {
        1000
    }
}

impl Default for KlogConfig {
    fn default() -> Self {
        Self {
            capacity: defaults::capacity(),
            bypass: defaults::bypass(),
            console: defaults::console(),
            serial: defaults::serial(),
            log_level: defaults::log_level(),
            shutdown_timeout_ms: defaults::shutdown_timeout_ms(),
        }
    }
}

impl KlogConfig {
    pub fn load(path: impl AsRef<Path> + ToString) -> Result<Self, ConfigError> {
        let toml_to_str = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::parse(&toml_to_str)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: KlogConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !RingConfig::is_valid_capacity(self.capacity) {
            return Err(ConfigError::InvalidCapacity(self.capacity));
        }
        Ok(())
    }

    pub fn ring(&self) -> RingConfig {
        RingConfig::new(self.capacity)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Whether any output exists for the dumper to feed.
    pub fn wants_dumper(&self) -> bool {
        self.console || self.serial
    }
}
