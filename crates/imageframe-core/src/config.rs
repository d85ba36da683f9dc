//! Plugin configuration.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Settings the host passes when creating the plugin.
///
/// Every field has a default, so a host only needs to send what it changes:
///
/// ```
/// use imageframe_core::PluginConfig;
///
/// let config = PluginConfig::from_json(r#"{ "keep_aspect_ratio": true }"#).unwrap();
/// assert!(config.keep_aspect_ratio);
/// assert!(config.show_crop);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    /// Endpoint receiving dropped image files.
    pub upload_url: String,
    pub repository_id: Option<String>,
    pub context_id: Option<String>,
    /// Lock the width:height ratio on every resize handle.
    pub keep_aspect_ratio: bool,
    /// Distance between the top of the image and the rotate handle.
    pub rotate_handle_offset: f64,
    /// Edge length of handle nodes, also the hit-test radius.
    pub handle_size: f64,
    /// Smallest overlay dimension a drag can produce.
    pub min_size: f64,
    pub show_resize: bool,
    pub show_rotate: bool,
    pub show_crop: bool,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            upload_url: "/repository/upload.php".to_string(),
            repository_id: None,
            context_id: None,
            keep_aspect_ratio: false,
            rotate_handle_offset: 25.0,
            handle_size: 10.0,
            min_size: 10.0,
            show_resize: true,
            show_rotate: true,
            show_crop: true,
        }
    }
}

impl PluginConfig {
    /// Parse a JSON configuration and check it.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        let positive = |name: &str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(Error::Config(format!("{name} must be a positive number, got {value}")))
            }
        };
        positive("handle_size", self.handle_size)?;
        positive("min_size", self.min_size)?;
        if !self.rotate_handle_offset.is_finite() || self.rotate_handle_offset < 0.0 {
            return Err(Error::Config(format!(
                "rotate_handle_offset must not be negative, got {}",
                self.rotate_handle_offset
            )));
        }
        if self.upload_url.trim().is_empty() {
            return Err(Error::Config("upload_url is empty".to_string()));
        }
        Ok(())
    }
}
