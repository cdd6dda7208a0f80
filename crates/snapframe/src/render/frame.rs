//! # Frame — Off-Screen Targets and Pixel Readback
//!
//! Each request renders into its own [`FrameTarget`]: a color texture plus a
//! depth texture of exactly the requested size. Targets are created per
//! request and dropped after readback; nothing is pooled.
//!
//! ## Readback
//!
//! The GPU can only copy texture rows into buffers at 256-byte aligned
//! strides, so a staging buffer is usually wider than the image:
//!
//! ```text
//!  staging row:  │ RGBA RGBA … RGBA │ padding │
//!                 └── width * 4 ───┘
//!                 └──── padded_bytes_per_row ─┘
//! ```
//!
//! [`FrameTarget::read_pixels`] copies into such a buffer, maps it, and drops
//! both the padding and the alpha channel, leaving tightly packed RGB. wgpu
//! copies rows top to bottom, so the result is tagged
//! [`PixelOrigin::TopLeft`].

use thiserror::Error;

use super::GpuContext;
use crate::shader::ShaderError;

pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame size {width}x{height} is outside 1..={max}")]
    UnsupportedSize { width: u32, height: u32, max: u32 },
    #[error("out of GPU memory: {0}")]
    OutOfMemory(String),
    #[error("GPU device error: {0}")]
    Device(String),
    #[error("failed to map readback buffer: {0}")]
    Map(#[from] wgpu::BufferAsyncError),
    #[error("failed waiting for the GPU: {0}")]
    Poll(#[from] wgpu::PollError),
    #[error("readback buffer was dropped before it was mapped")]
    MapAborted,
    #[error("uniform update failed: {0}")]
    Uniform(#[from] ShaderError),
}

impl From<wgpu::Error> for FrameError {
    fn from(err: wgpu::Error) -> Self {
        match err {
            wgpu::Error::OutOfMemory { .. } => FrameError::OutOfMemory(err.to_string()),
            other => FrameError::Device(other.to_string()),
        }
    }
}

/// Which corner the first pixel of a buffer belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelOrigin {
    TopLeft,
    BottomLeft,
}

/// Tightly packed RGB8 pixels read back from a frame target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub origin: PixelOrigin,
    pub pixels: Vec<u8>,
}

impl RawFrame {
    /// RGB value at `(x, y)` counted from the top-left corner, or `None`
    /// outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let row = match self.origin {
            PixelOrigin::TopLeft => y,
            PixelOrigin::BottomLeft => self.height - 1 - y,
        };
        let i = (row as usize * self.width as usize + x as usize) * 3;
        let rgb = self.pixels.get(i..i + 3)?;
        Some([rgb[0], rgb[1], rgb[2]])
    }
}

/// Color and depth attachments for one request.
pub struct FrameTarget {
    color: wgpu::Texture,
    color_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl FrameTarget {
    pub fn create(gpu: &GpuContext, width: u32, height: u32) -> Result<Self, FrameError> {
        let max = gpu.max_dimension();
        if width == 0 || height == 0 || width > max || height > max {
            return Err(FrameError::UnsupportedSize { width, height, max });
        }
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let ((color, depth), error) = gpu.scoped(|| {
            let color = gpu.device().create_texture(&wgpu::TextureDescriptor {
                label: Some("frame color"),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: COLOR_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            });
            let depth = gpu.device().create_texture(&wgpu::TextureDescriptor {
                label: Some("frame depth"),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: DEPTH_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            });
            (color, depth)
        });
        if let Some(err) = error {
            return Err(err.into());
        }

        Ok(Self {
            color_view: color.create_view(&wgpu::TextureViewDescriptor::default()),
            depth_view: depth.create_view(&wgpu::TextureViewDescriptor::default()),
            color,
            width,
            height,
        })
    }

    pub(crate) fn color_view(&self) -> &wgpu::TextureView {
        &self.color_view
    }

    pub(crate) fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth_view
    }

    /// Copy the color attachment back to the CPU as RGB8.
    pub fn read_pixels(&self, gpu: &GpuContext) -> Result<RawFrame, FrameError> {
        let padded_bytes_per_row = padded_bytes_per_row(self.width);
        let buffer_size = u64::from(padded_bytes_per_row) * u64::from(self.height);

        let (staging, error) = gpu.scoped(|| {
            gpu.device().create_buffer(&wgpu::BufferDescriptor {
                label: Some("frame readback"),
                size: buffer_size,
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                mapped_at_creation: false,
            })
        });
        if let Some(err) = error {
            return Err(err.into());
        }

        let mut encoder = gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame readback encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.color,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        let submission = gpu.queue().submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            // Receiver outlives the poll below.
            let _ = sender.send(result);
        });
        gpu.device().poll(wgpu::PollType::Wait {
            submission_index: Some(submission),
            timeout: None,
        })?;
        receiver.recv().map_err(|_| FrameError::MapAborted)??;

        let pixels = {
            let mapped = slice.get_mapped_range();
            strip_row_padding(&mapped, self.width, self.height, padded_bytes_per_row)
        };
        staging.unmap();

        Ok(RawFrame {
            width: self.width,
            height: self.height,
            origin: PixelOrigin::TopLeft,
            pixels,
        })
    }
}

/// Row stride of a readback buffer for an RGBA8 image `width` pixels wide.
pub(crate) fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Turn padded RGBA rows into tightly packed RGB.
pub(crate) fn strip_row_padding(
    padded: &[u8],
    width: u32,
    height: u32,
    padded_bytes_per_row: u32,
) -> Vec<u8> {
    let row_bytes = width as usize * 4;
    let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
    for row in padded
        .chunks(padded_bytes_per_row as usize)
        .take(height as usize)
    {
        for px in row[..row_bytes].chunks_exact(4) {
            rgb.extend_from_slice(&px[..3]);
        }
    }
    rgb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_pad_to_256_bytes() {
        assert_eq!(padded_bytes_per_row(1), 256);
        assert_eq!(padded_bytes_per_row(64), 256);
        assert_eq!(padded_bytes_per_row(65), 512);
        assert_eq!(padded_bytes_per_row(800), 3200);
    }

    #[test]
    fn padding_and_alpha_are_stripped() {
        // 2x2 image, rows padded to 12 bytes.
        let padded = [
            1, 2, 3, 255, 4, 5, 6, 255, 0, 0, 0, 0, //
            7, 8, 9, 255, 10, 11, 12, 255, 0, 0, 0, 0,
        ];
        let rgb = strip_row_padding(&padded, 2, 2, 12);
        assert_eq!(rgb, [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
    }

    #[test]
    fn pixel_lookup_respects_origin() {
        let mut frame = RawFrame {
            width: 1,
            height: 2,
            origin: PixelOrigin::TopLeft,
            pixels: vec![1, 1, 1, 2, 2, 2],
        };
        assert_eq!(frame.pixel(0, 0), Some([1, 1, 1]));
        frame.origin = PixelOrigin::BottomLeft;
        assert_eq!(frame.pixel(0, 0), Some([2, 2, 2]));
    }

    #[test]
    fn pixel_outside_frame_is_none() {
        let frame = RawFrame {
            width: 2,
            height: 1,
            origin: PixelOrigin::BottomLeft,
            pixels: vec![0; 6],
        };
        assert_eq!(frame.pixel(2, 0), None);
        assert_eq!(frame.pixel(0, 1), None);

        let empty = RawFrame {
            width: 0,
            height: 0,
            origin: PixelOrigin::BottomLeft,
            pixels: Vec::new(),
        };
        assert_eq!(empty.pixel(0, 0), None);
    }
}
