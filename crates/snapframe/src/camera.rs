//! # Camera — Per-Request View and Projection
//!
//! Every request carries a camera pose. From it we build two matrices:
//!
//! ```text
//! view       = R(rx, ry, rz) · T(−x, −y, −z)
//! projection = perspective(fov_y, width / height, near, far)
//! ```
//!
//! In column-vector form the translation applies first: the world is moved
//! so the camera sits at the origin, then rotated about the camera's own
//! axes. Rotating first would swing the world around the world origin
//! instead.
//!
//! The projection is right-handed with wgpu's 0..1 depth range, so the
//! camera looks down −Z with +Y up. This module is pure math; nothing here
//! touches the GPU.

use glam::{EulerRot, Mat4, Quat, Vec2, Vec3, Vec4Swizzles};
use thiserror::Error;

use crate::config::RenderConfig;
use crate::request::RenderRequest;

#[derive(Debug, Error, PartialEq)]
pub enum CameraError {
    #[error("cannot build a projection for a {width}x{height} frame")]
    InvalidAspectRatio { width: u32, height: u32 },
}

/// Perspective parameters shared by every request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub fov_y_degrees: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Default for Projection {
    fn default() -> Self {
        Self::from(&RenderConfig::default())
    }
}

impl From<&RenderConfig> for Projection {
    fn from(config: &RenderConfig) -> Self {
        Self {
            fov_y_degrees: config.fov_y_degrees,
            z_near: config.z_near,
            z_far: config.z_far,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraMatrices {
    pub projection: Mat4,
    pub view: Mat4,
}

impl CameraMatrices {
    pub fn compute(request: &RenderRequest, projection: &Projection) -> Result<Self, CameraError> {
        if request.width == 0 || request.height == 0 {
            return Err(CameraError::InvalidAspectRatio {
                width: request.width,
                height: request.height,
            });
        }
        let aspect = request.width as f32 / request.height as f32;

        let rotation = Quat::from_euler(EulerRot::XYZ, request.rx, request.ry, request.rz);
        let view = Mat4::from_quat(rotation)
            * Mat4::from_translation(-Vec3::new(request.x, request.y, request.z));

        Ok(Self {
            projection: Mat4::perspective_rh(
                projection.fov_y_degrees.to_radians(),
                aspect,
                projection.z_near,
                projection.z_far,
            ),
            view,
        })
    }

    /// Pixel position (top-left origin) of `point` after `model`, or `None`
    /// if it falls outside the depth range.
    pub fn project(&self, point: Vec3, model: Mat4, width: u32, height: u32) -> Option<Vec2> {
        let clip = self.projection * self.view * model * point.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.xyz() / clip.w;
        if !(0.0..=1.0).contains(&ndc.z) {
            return None;
        }
        Some(Vec2::new(
            (ndc.x + 1.0) * 0.5 * width as f32,
            (1.0 - ndc.y) * 0.5 * height as f32,
        ))
    }
}
