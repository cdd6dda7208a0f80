//! Common imports for snapframe users.

pub use crate::camera::{CameraMatrices, Projection};
pub use crate::config::{PowerPreference, RenderConfig};
pub use crate::encode::{encode_png, encode_rgb};
pub use crate::error::{ErrorKind, RenderError, StartupError};
pub use crate::render::{GpuContext, PixelOrigin, RawFrame, Renderer};
pub use crate::render3d::{DecodedImage, Scene, SceneAssets};
pub use crate::request::{RenderRequest, validate};
pub use crate::service::{RenderService, RenderStats};
pub use crate::shader::Program;
