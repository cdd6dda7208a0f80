//! Error taxonomy.
//!
//! Each component owns a narrow error enum next to its code. They are folded
//! into two aggregates that mirror how failures are handled:
//!
//! - [`StartupError`]: anything that goes wrong while building the context,
//!   program, meshes, textures or scene. The service refuses to start.
//! - [`RenderError`]: anything that goes wrong for a single request. Only that
//!   caller sees it; the render thread keeps serving.

use thiserror::Error;

use crate::camera::CameraError;
use crate::config::ConfigError;
use crate::encode::EncodeError;
use crate::render::frame::FrameError;
use crate::render::gpu::ContextError;
use crate::render3d::mesh::LayoutError;
use crate::render3d::scene::SceneError;
use crate::render3d::texture::TextureError;
use crate::request::ValidationError;
use crate::shader::ShaderError;

/// Fatal failure while bringing up the renderer.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("GPU context unavailable: {0}")]
    Context(#[from] ContextError),
    #[error("shader program: {0}")]
    Shader(#[from] ShaderError),
    #[error("vertex layout: {0}")]
    Layout(#[from] LayoutError),
    #[error("texture: {0}")]
    Texture(#[from] TextureError),
    #[error("scene: {0}")]
    Scene(#[from] SceneError),
    #[error("render thread could not be spawned: {0}")]
    Thread(#[from] std::io::Error),
    #[error("render thread exited during startup")]
    ThreadExited,
}

/// Failure of a single render request.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),
    #[error("camera: {0}")]
    Camera(#[from] CameraError),
    #[error("frame: {0}")]
    Frame(#[from] FrameError),
    #[error("encoding: {0}")]
    Encoding(#[from] EncodeError),
    #[error("render service is not running")]
    ServiceStopped,
}

/// Coarse classification of a [`RenderError`], for mapping onto responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller sent parameters outside the accepted domain.
    RequestValidation,
    /// The GPU could not produce the frame (allocation, device error).
    RenderFailure,
    /// The frame was rendered but could not be encoded.
    EncodingFailure,
    /// The render thread is gone; nothing further can be served.
    Unavailable,
}

impl RenderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RenderError::Validation(_) | RenderError::Camera(_) => ErrorKind::RequestValidation,
            RenderError::Frame(_) => ErrorKind::RenderFailure,
            RenderError::Encoding(_) => ErrorKind::EncodingFailure,
            RenderError::ServiceStopped => ErrorKind::Unavailable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_classify_as_request_validation() {
        let err = RenderError::from(ValidationError::Width(0));
        assert_eq!(err.kind(), ErrorKind::RequestValidation);
    }

    #[test]
    fn frame_errors_classify_as_render_failure() {
        let err = RenderError::from(FrameError::UnsupportedSize {
            width: 9000,
            height: 1,
            max: 8192,
        });
        assert_eq!(err.kind(), ErrorKind::RenderFailure);
    }

    #[test]
    fn encoding_errors_classify_as_encoding_failure() {
        let err = RenderError::from(EncodeError::Length {
            expected: 3,
            actual: 2,
        });
        assert_eq!(err.kind(), ErrorKind::EncodingFailure);
    }
}
