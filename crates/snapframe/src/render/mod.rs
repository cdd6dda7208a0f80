//! Rendering subsystem — headless wgpu context, frame targets and the scene
//! renderer.

pub mod frame;
pub mod gpu;
pub mod renderer;

pub use frame::{FrameError, FrameTarget, PixelOrigin, RawFrame};
pub use gpu::{ContextError, GpuContext};
pub use renderer::Renderer;
