//! # Texture — Decoded Pixels on the GPU
//!
//! Textures arrive already decoded: a byte buffer plus width, height and
//! channel count. Whatever the channel count, the GPU copy is RGBA8. wgpu has
//! no three-channel formats, so 1, 2 and 3 channel data is widened on upload:
//!
//! | channels | meaning          | stored as          |
//! |----------|------------------|--------------------|
//! | 1        | grey             | (g, g, g, 255)     |
//! | 2        | grey + alpha     | (g, g, g, a)       |
//! | 3        | RGB              | (r, g, b, 255)     |
//! | 4        | RGBA             | unchanged          |
//!
//! Filtering is nearest-neighbour for both minification and magnification,
//! with a single mip level. The first row of the buffer is sampled at `v = 0`;
//! any origin flip is the producer's job.
//!
//! ## The 1x1 White Default
//!
//! Every draw binds a texture, textured or not. Untextured drawables get
//! [`Texture::white`], and the fragment stage ignores it because
//! `is_textured` is zero.

use thiserror::Error;
use wgpu::util::DeviceExt;

use crate::render::GpuContext;

#[derive(Debug, Error)]
pub enum TextureError {
    #[error("texture must have 1 to 4 channels, got {0}")]
    Channels(u32),
    #[error("texture size {width}x{height} is outside 1..={max}")]
    Size { width: u32, height: u32, max: u32 },
    #[error("expected {expected} bytes of pixel data, got {actual}")]
    Length { expected: usize, actual: usize },
}

/// An immutable RGBA8 texture with its nearest-filtering sampler.
pub struct Texture {
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
}

impl Texture {
    pub fn upload(
        gpu: &GpuContext,
        label: &str,
        pixels: &[u8],
        width: u32,
        height: u32,
        channels: u32,
    ) -> Result<Self, TextureError> {
        let max = gpu.max_dimension();
        if width == 0 || height == 0 || width > max || height > max {
            return Err(TextureError::Size { width, height, max });
        }
        let rgba = expand_to_rgba(pixels, width, height, channels)?;

        let texture = gpu.device().create_texture_with_data(
            gpu.queue(),
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &rgba,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = gpu.device().create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        log::debug!("uploaded texture `{label}`: {width}x{height}, {channels} channels");

        Ok(Self { view, sampler })
    }

    /// The 1x1 opaque white texture bound for untextured draws.
    pub fn white(gpu: &GpuContext) -> Result<Self, TextureError> {
        Self::upload(gpu, "white 1x1", &[255, 255, 255, 255], 1, 1, 4)
    }

    pub(crate) fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub(crate) fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }
}

/// Widen `channels`-per-pixel data to RGBA8.
pub(crate) fn expand_to_rgba(
    pixels: &[u8],
    width: u32,
    height: u32,
    channels: u32,
) -> Result<Vec<u8>, TextureError> {
    if !(1..=4).contains(&channels) {
        return Err(TextureError::Channels(channels));
    }
    let count = width as usize * height as usize;
    let expected = count * channels as usize;
    if pixels.len() != expected {
        return Err(TextureError::Length {
            expected,
            actual: pixels.len(),
        });
    }

    if channels == 4 {
        return Ok(pixels.to_vec());
    }
    let mut rgba = Vec::with_capacity(count * 4);
    for px in pixels.chunks_exact(channels as usize) {
        let texel = match *px {
            [g] => [g, g, g, 255],
            [g, a] => [g, g, g, a],
            [r, g, b] => [r, g, b, 255],
            _ => unreachable!("chunks_exact yields {channels}-byte pixels"),
        };
        rgba.extend_from_slice(&texel);
    }
    Ok(rgba)
}
