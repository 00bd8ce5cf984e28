//! Top-level configuration.
//!
//! Stored in `.tix/config.yaml`; every key is optional:
//!
//! ```yaml
//! default_type: bug
//! default_priority: 1
//! default_assignee: sam
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TixError};
use crate::types::{TicketPriority, TicketType};

/// Defaults applied by `tix create` when the flags are not given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_type: Option<TicketType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_priority: Option<TicketPriority>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_assignee: Option<String>,
}

impl Config {
    /// Load configuration from `path`, or return the default if not found
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Config::default()),
            Err(e) => return Err(TixError::storage("read config", path)(e)),
        };
        if content.trim().is_empty() {
            return Ok(Config::default());
        }

        let config: Config = serde_yaml_ng::from_str(&content)?;
        Ok(config)
    }

    pub fn ticket_type(&self) -> TicketType {
        self.default_type.unwrap_or_default()
    }

    pub fn priority(&self) -> TicketPriority {
        self.default_priority.unwrap_or_default()
    }
}
