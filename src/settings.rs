use crate::overlay::{BrushConfig, BrushSize, ResizePolicy, Rgb, Tool};
use crate::service::DEFAULT_SERVICE_URL;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    /// Base URL of the analysis/chat service.
    #[serde(default = "default_service_url")]
    pub service_url: String,
    /// When enabled the application initialises the logger at debug level.
    #[serde(default)]
    pub debug_logging: bool,
    /// Write logs to this file instead of stderr.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub default_tool: Tool,
    #[serde(default)]
    pub default_color: Rgb,
    /// Snapped to the nearest of 2/4/8/16 when read.
    #[serde(default)]
    pub default_size: BrushSize,
    /// Whether the ink layer follows container resizes after load.
    #[serde(default)]
    pub resize_policy: ResizePolicy,
}

fn default_service_url() -> String {
    DEFAULT_SERVICE_URL.to_string()
}

fn default_request_timeout() -> u64 {
    60
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service_url: default_service_url(),
            debug_logging: false,
            log_file: None,
            request_timeout_secs: default_request_timeout(),
            default_tool: Tool::default(),
            default_color: Rgb::default(),
            default_size: BrushSize::default(),
            resize_policy: ResizePolicy::default(),
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(&content).with_context(|| format!("parsing settings file {path}"))
    }

    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("writing settings file {path}"))?;
        Ok(())
    }

    pub fn brush(&self) -> BrushConfig {
        BrushConfig::new(self.default_tool, self.default_color, self.default_size)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}
