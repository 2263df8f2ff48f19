//! Configuration file handling.
//!
//! The file is JSON; every section is optional:
//!
//! ```json
//! {
//!   "port": "/dev/ttyUSB0",
//!   "display": { "baud_rate": 9600, "lines": 2, "columns": 20 },
//!   "arbiter": { "min_spacing_ms": 200, "messages": { "currency": "EUR" } }
//! }
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use poskit_core::DisplayConfig;
use poskit_display::ArbiterConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Serial port of the display.
    pub port: Option<String>,

    pub display: DisplayConfig,
    pub arbiter: ArbiterConfig,
}

impl AppConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides on top of the file.
    pub fn with_overrides(mut self, port: Option<String>, baud_rate: Option<u32>) -> Self {
        if port.is_some() {
            self.port = port;
        }
        if let Some(baud_rate) = baud_rate {
            self.display.baud_rate = baud_rate;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.display
            .validate()
            .context("Invalid display section")?;
        self.arbiter
            .validate()
            .context("Invalid arbiter section")?;
        Ok(())
    }
}
