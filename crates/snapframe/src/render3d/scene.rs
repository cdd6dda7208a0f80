//! # Scene — What Gets Drawn, in Order
//!
//! A [`Scene`] is an ordered list of named entries, each pairing a
//! [`Drawable`] with a model transform and a `textured` flag. Entries are
//! drawn in insertion order; the depth test sorts out visibility.
//!
//! The default scene has two entries:
//!
//! ```text
//!  name       drawable                 model                  textured
//!  ────────   ──────────────────────   ────────────────────   ────────
//!  triangle   RGB triangle             translate(0, 0, -1)    no
//!  cube       side-2 cube + checker    translate(0, 0, -3)    yes
//! ```
//!
//! Drawables are built once against a [`Program`] and never change. The only
//! mutable per-entry state is the `textured` flag, toggled through
//! [`Scene::set_textured`].

use glam::{Mat4, Vec3};
use thiserror::Error;
use wgpu::util::DeviceExt;

use super::mesh::{LayoutError, Mesh, VertexBinding, VertexLayout};
use super::shapes;
use super::texture::Texture;
use crate::error::StartupError;
use crate::render::GpuContext;
use crate::shader::Program;

/// Flat color the cube reads when drawn without its texture.
pub const CUBE_FLAT_COLOR: [f32; 3] = [1.0, 0.0, 1.0];

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("scene has no entry named `{0}`")]
    UnknownEntry(String),
    #[error("entry `{0}` has no texture to enable")]
    MissingTexture(String),
    #[error("scene already has an entry named `{0}`")]
    DuplicateEntry(String),
}

/// Already-decoded pixel data, as handed over by an image decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// 1 (grey) to 4 (RGBA).
    pub channels: u32,
}

/// Raw inputs for the default scene.
#[derive(Debug, Clone)]
pub struct SceneAssets {
    /// `position(3) + color(3)` records.
    pub triangle: Vec<f32>,
    /// `texcoord(2) + normal(3) + position(3)` records.
    pub cube: Vec<f32>,
    pub cube_texture: DecodedImage,
}

impl SceneAssets {
    /// Procedural stand-ins: the RGB triangle, a side-2 cube and a 64x64
    /// checkerboard.
    pub fn builtin() -> Self {
        const SIZE: u32 = 64;
        Self {
            triangle: shapes::triangle(),
            cube: shapes::cube(1.0),
            cube_texture: DecodedImage {
                pixels: shapes::checker(SIZE, 8, [255, 255, 255, 255], [64, 64, 64, 255]),
                width: SIZE,
                height: SIZE,
                channels: 4,
            },
        }
    }
}

/// A mesh bound to a program, plus what it samples.
pub struct Drawable {
    mesh: Mesh,
    binding: VertexBinding,
    texture: Option<Texture>,
    /// One-record buffer for inputs the mesh does not supply.
    constants: Option<wgpu::Buffer>,
}

impl Drawable {
    /// Bind `mesh` to `program`. `flat_color`, if given, is the value of
    /// `in_color` for meshes that carry no color column.
    pub fn new(
        gpu: &GpuContext,
        mesh: Mesh,
        program: &Program,
        texture: Option<Texture>,
        flat_color: Option<[f32; 3]>,
    ) -> Result<Self, LayoutError> {
        let mut binding = mesh.bind(program)?;
        if let Some(color) = flat_color {
            binding = binding.with_default("in_color", &color)?;
        }

        let constants = binding.has_constant_stream().then(|| {
            gpu.device()
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("constant attributes"),
                    contents: bytemuck::cast_slice(binding.constants()),
                    usage: wgpu::BufferUsages::VERTEX,
                })
        });

        let defaulted: Vec<_> = binding.defaulted_inputs().collect();
        if !defaulted.is_empty() {
            log::debug!("inputs fed from constants: {}", defaulted.join(", "));
        }

        Ok(Self {
            mesh,
            binding,
            texture,
            constants,
        })
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn binding(&self) -> &VertexBinding {
        &self.binding
    }

    pub fn texture(&self) -> Option<&Texture> {
        self.texture.as_ref()
    }

    pub(crate) fn constants(&self) -> Option<&wgpu::Buffer> {
        self.constants.as_ref()
    }
}

pub struct SceneEntry {
    pub name: String,
    pub drawable: Drawable,
    pub model: Mat4,
    pub textured: bool,
}

#[derive(Default)]
pub struct Scene {
    entries: Vec<SceneEntry>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// The triangle in front of the textured cube, built from `assets`.
    pub fn default_scene(
        gpu: &GpuContext,
        program: &Program,
        assets: &SceneAssets,
    ) -> Result<Self, StartupError> {
        let triangle = Mesh::upload(
            gpu,
            "triangle",
            &assets.triangle,
            VertexLayout::new(shapes::TRIANGLE_STRIDE)
                .attribute("in_position", 0, 3)
                .attribute("in_color", 3, 3),
        )?;
        let cube = Mesh::upload(
            gpu,
            "cube",
            &assets.cube,
            VertexLayout::new(shapes::CUBE_STRIDE)
                .attribute("in_texcoord", 0, 2)
                .attribute("in_position", 5, 3),
        )?;
        let image = &assets.cube_texture;
        let checker = Texture::upload(
            gpu,
            "cube texture",
            &image.pixels,
            image.width,
            image.height,
            image.channels,
        )?;

        let mut scene = Scene::new();
        scene.push(
            "triangle",
            Drawable::new(gpu, triangle, program, None, None)?,
            Mat4::from_translation(Vec3::new(0.0, 0.0, -1.0)),
            false,
        )?;
        scene.push(
            "cube",
            Drawable::new(gpu, cube, program, Some(checker), Some(CUBE_FLAT_COLOR))?,
            Mat4::from_translation(Vec3::new(0.0, 0.0, -3.0)),
            true,
        )?;
        Ok(scene)
    }

    /// Append an entry. It is drawn after every entry already present.
    pub fn push(
        &mut self,
        name: impl Into<String>,
        drawable: Drawable,
        model: Mat4,
        textured: bool,
    ) -> Result<(), SceneError> {
        let name = name.into();
        if self.entry(&name).is_some() {
            return Err(SceneError::DuplicateEntry(name));
        }
        if textured && drawable.texture.is_none() {
            return Err(SceneError::MissingTexture(name));
        }
        self.entries.push(SceneEntry {
            name,
            drawable,
            model,
            textured,
        });
        Ok(())
    }

    /// Turn texturing of one entry on or off.
    pub fn set_textured(&mut self, name: &str, textured: bool) -> Result<(), SceneError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.name == name)
            .ok_or_else(|| SceneError::UnknownEntry(name.to_owned()))?;
        if textured && entry.drawable.texture.is_none() {
            return Err(SceneError::MissingTexture(name.to_owned()));
        }
        entry.textured = textured;
        Ok(())
    }

    pub fn entry(&self, name: &str) -> Option<&SceneEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn entries(&self) -> &[SceneEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_assets_have_expected_shapes() {
        let assets = SceneAssets::builtin();
        assert_eq!(assets.triangle.len() / shapes::TRIANGLE_STRIDE, 3);
        assert_eq!(assets.cube.len() / shapes::CUBE_STRIDE, 36);
        let tex = &assets.cube_texture;
        assert_eq!((tex.width, tex.height, tex.channels), (64, 64, 4));
        assert_eq!(tex.pixels.len(), 64 * 64 * 4);
    }

    #[test]
    fn builtin_cube_has_side_two() {
        let assets = SceneAssets::builtin();
        let xs: Vec<f32> = assets
            .cube
            .chunks_exact(shapes::CUBE_STRIDE)
            .map(|r| r[5])
            .collect();
        let min = xs.iter().copied().fold(f32::INFINITY, f32::min);
        let max = xs.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        assert_eq!(max - min, 2.0);
    }

    #[test]
    fn flat_color_differs_from_checker_colors() {
        let assets = SceneAssets::builtin();
        let magenta = [255u8, 0, 255];
        assert!(
            assets
                .cube_texture
                .pixels
                .chunks_exact(4)
                .all(|px| px[..3] != magenta)
        );
    }
}
