// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Photosort contributors

//! Configuration management for Photosort

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Inference server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Model to use for vision requests. When unset, the first model
    /// reported by the server is selected at startup.
    #[serde(default)]
    pub model: Option<String>,

    /// Run defaults, overridable per invocation
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_server_url")]
    pub url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DefaultsConfig {
    #[serde(default = "default_ambiguity_mode")]
    pub ambiguity_mode: String,
    #[serde(default = "default_output_mode")]
    pub output_mode: String,
    #[serde(default = "default_true")]
    pub scan_subfolders: bool,
    #[serde(default = "default_report_name")]
    pub report_name: String,
}

// Default value functions
fn default_server_url() -> String { "http://localhost:1234".to_string() }
fn default_timeout() -> u64 { 120 }
fn default_ambiguity_mode() -> String { "multi".to_string() }
fn default_output_mode() -> String { "report".to_string() }
fn default_true() -> bool { true }
fn default_report_name() -> String { "analysis_report.csv".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_server_url(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            ambiguity_mode: default_ambiguity_mode(),
            output_mode: default_output_mode(),
            scan_subfolders: true,
            report_name: default_report_name(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            model: None,
            defaults: DefaultsConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| crate::PhotosortError::Config(format!("Failed to parse config: {}", e)))?;
            Ok(config)
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
