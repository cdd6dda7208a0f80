//! # Snapframe — Headless Scene Snapshots
//!
//! Renders a small fixed scene (a colored triangle in front of a textured
//! cube) off-screen with wgpu, from a camera pose given per request, and
//! returns the frame as PNG bytes.
//!
//! Start a [`RenderService`](service::RenderService) once and call
//! [`render`](service::RenderService::render) from as many threads as you
//! like:
//!
//! ```no_run
//! use snapframe::prelude::*;
//!
//! let service = RenderService::start(RenderConfig::default(), SceneAssets::builtin())?;
//! let png = service.render(RenderRequest { z: 0.5, ..Default::default() })?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! The lower-level pieces ([`GpuContext`](render::GpuContext),
//! [`Program`](shader::Program), [`Scene`](render3d::Scene),
//! [`Renderer`](render::Renderer)) are public for callers that want to drive
//! the GPU themselves.

pub mod camera;
pub mod config;
pub mod encode;
pub mod error;
pub mod prelude;
pub mod render;
pub mod render3d;
pub mod request;
pub mod service;
pub mod shader;
