//! Per-request render parameters and their validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("width {0} is outside the accepted range")]
    Width(u32),
    #[error("height {0} is outside the accepted range")]
    Height(u32),
    #[error("`{0}` must be a finite number")]
    NonFinite(&'static str),
}

/// Camera pose and output size for one frame.
///
/// Position is in world units, rotation in radians about the camera's own
/// X, Y and Z axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderRequest {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub rx: f32,
    pub ry: f32,
    pub rz: f32,
    pub width: u32,
    pub height: u32,
}

impl Default for RenderRequest {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            rx: 0.0,
            ry: 0.0,
            rz: 0.0,
            width: 800,
            height: 600,
        }
    }
}

/// Reject requests outside `1..=max_dimension` or with non-finite pose values.
/// Nothing is clamped.
pub fn validate(request: &RenderRequest, max_dimension: u32) -> Result<(), ValidationError> {
    let accepted = 1..=max_dimension;
    if !accepted.contains(&request.width) {
        return Err(ValidationError::Width(request.width));
    }
    if !accepted.contains(&request.height) {
        return Err(ValidationError::Height(request.height));
    }
    let fields = [
        ("x", request.x),
        ("y", request.y),
        ("z", request.z),
        ("rx", request.rx),
        ("ry", request.ry),
        ("rz", request.rz),
    ];
    if let Some((name, _)) = fields.into_iter().find(|(_, v)| !v.is_finite()) {
        return Err(ValidationError::NonFinite(name));
    }
    Ok(())
}
