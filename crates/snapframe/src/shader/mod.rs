//! # Shader — Program Compilation, Reflection and Uniforms
//!
//! A [`Program`] is a vertex stage plus a fragment stage, both written in WGSL.
//! Compilation happens in two steps:
//!
//! 1. **Front-end**: each stage is parsed and validated with naga on the CPU.
//!    Errors carry the rendered compiler diagnostic (source excerpt and all),
//!    so a broken shader is reported with the same detail a driver compiler
//!    would give.
//! 2. **Link**: the two reflected interfaces are checked against each other:
//!    every fragment input must be produced by the vertex stage, the uniform
//!    block must agree, and there may be at most one texture/sampler pair.
//!
//! The reflected [`ProgramInterface`] is what the rest of the crate binds
//! against: vertex buffer layouts are matched to its named inputs, and uniform
//! writes go through a byte-exact mirror of its uniform block.
//!
//! ```text
//! ┌────────────┐   naga parse    ┌─────────────────┐
//! │ vertex.wgsl│ ──────────────► │ StageInterface  │──┐
//! └────────────┘   + validate    └─────────────────┘  │  link   ┌──────────────────┐
//! ┌────────────┐                 ┌─────────────────┐  ├───────► │ ProgramInterface │
//! │ frag.wgsl  │ ──────────────► │ StageInterface  │──┘         └──────────────────┘
//! └────────────┘                 └─────────────────┘
//! ```

mod program;
mod reflect;
mod uniforms;

use std::fmt;

use thiserror::Error;

pub use program::Program;
pub use reflect::{
    ProgramInterface, TextureSlot, UniformBlockLayout, UniformKind, UniformMember, VertexInput,
};
pub use uniforms::UniformBlock;

/// Vertex stage of the built-in scene program.
pub const SCENE_VERTEX_SHADER: &str = include_str!("scene.vert.wgsl");
/// Fragment stage of the built-in scene program.
pub const SCENE_FRAGMENT_SHADER: &str = include_str!("scene.frag.wgsl");

/// Pipeline stage a shader source belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Vertex,
    Fragment,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Vertex => f.write_str("vertex"),
            Stage::Fragment => f.write_str("fragment"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("{stage} stage failed to compile:\n{diagnostic}")]
    Compilation { stage: Stage, diagnostic: String },
    #[error("program failed to link: {0}")]
    Link(String),
    #[error("no uniform named `{0}` in the program")]
    UnknownUniform(String),
    #[error("uniform `{name}` is {found:?}, cannot be written as {expected}")]
    UniformType {
        name: String,
        expected: &'static str,
        found: UniformKind,
    },
}
