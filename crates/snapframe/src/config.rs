//! Renderer configuration.
//!
//! Every field has a default, so an empty JSON object (or no file at all) is a
//! valid configuration. Values are checked once by [`RenderConfig::validate`]
//! before the render thread starts.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hard ceiling on the output width/height accepted per request.
pub const MAX_DIMENSION: u32 = 4096;

/// Which kind of GPU adapter to ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PowerPreference {
    #[default]
    HighPerformance,
    LowPower,
}

impl From<PowerPreference> for wgpu::PowerPreference {
    fn from(value: PowerPreference) -> Self {
        match value {
            PowerPreference::HighPerformance => wgpu::PowerPreference::HighPerformance,
            PowerPreference::LowPower => wgpu::PowerPreference::LowPower,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Vertical field of view in degrees.
    pub fov_y_degrees: f32,
    pub z_near: f32,
    pub z_far: f32,
    /// Largest width/height a request may ask for (at most [`MAX_DIMENSION`]).
    pub max_dimension: u32,
    /// Background color, linear RGBA in 0..1.
    pub clear_color: [f64; 4],
    pub power_preference: PowerPreference,
    /// Fall back to a software adapter when no hardware adapter exists.
    pub allow_fallback_adapter: bool,
    /// Number of requests that may wait for the render thread.
    pub queue_depth: usize,
    /// Request a device whose 2D texture limit is below what the adapter
    /// supports. Frames larger than this fail at render time.
    pub texture_size_limit: Option<u32>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fov_y_degrees: 80.0,
            z_near: 0.01,
            z_far: 50.0,
            max_dimension: MAX_DIMENSION,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            power_preference: PowerPreference::HighPerformance,
            allow_fallback_adapter: true,
            queue_depth: 16,
            texture_size_limit: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("field of view must be in (0, 180) degrees, got {0}")]
    FieldOfView(f32),
    #[error("clip planes must satisfy 0 < near < far, got near={near} far={far}")]
    ClipPlanes { near: f32, far: f32 },
    #[error("max_dimension must be in [1, {MAX_DIMENSION}], got {0}")]
    MaxDimension(u32),
    #[error("queue_depth must be at least 1")]
    QueueDepth,
    #[error("texture_size_limit must be at least 1")]
    TextureSizeLimit,
}

impl RenderConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fov_y_degrees > 0.0 && self.fov_y_degrees < 180.0) {
            return Err(ConfigError::FieldOfView(self.fov_y_degrees));
        }
        if !(self.z_near > 0.0 && self.z_far > self.z_near && self.z_far.is_finite()) {
            return Err(ConfigError::ClipPlanes {
                near: self.z_near,
                far: self.z_far,
            });
        }
        if self.max_dimension == 0 || self.max_dimension > MAX_DIMENSION {
            return Err(ConfigError::MaxDimension(self.max_dimension));
        }
        if self.queue_depth == 0 {
            return Err(ConfigError::QueueDepth);
        }
        if self.texture_size_limit == Some(0) {
            return Err(ConfigError::TextureSizeLimit);
        }
        Ok(())
    }
}
