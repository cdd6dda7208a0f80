//! PNG encoding of read-back frames.

use image::ImageEncoder;
use image::codecs::png::PngEncoder;
use thiserror::Error;

use crate::render::{PixelOrigin, RawFrame};

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("expected {expected} bytes of RGB data, got {actual}")]
    Length { expected: usize, actual: usize },
    #[error("PNG encoder failed: {0}")]
    Image(#[from] image::ImageError),
}

pub fn encode_png(frame: &RawFrame) -> Result<Vec<u8>, EncodeError> {
    encode_rgb(&frame.pixels, frame.width, frame.height, frame.origin)
}

/// Encode tightly packed RGB8 pixels as a PNG whose first row is the top of
/// the image. Rows starting at the bottom are flipped.
pub fn encode_rgb(
    pixels: &[u8],
    width: u32,
    height: u32,
    origin: PixelOrigin,
) -> Result<Vec<u8>, EncodeError> {
    let row_bytes = width as usize * 3;
    let expected = row_bytes * height as usize;
    if pixels.len() != expected {
        return Err(EncodeError::Length {
            expected,
            actual: pixels.len(),
        });
    }

    let flipped;
    let top_down = match origin {
        PixelOrigin::TopLeft => pixels,
        PixelOrigin::BottomLeft => {
            flipped = pixels
                .chunks_exact(row_bytes.max(1))
                .rev()
                .flatten()
                .copied()
                .collect::<Vec<u8>>();
            &flipped
        }
    };

    let mut png = Vec::new();
    PngEncoder::new(&mut png).write_image(top_down, width, height, image::ExtendedColorType::Rgb8)?;
    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1x2 image: red row, then blue row.
    const RED_OVER_BLUE: [u8; 6] = [255, 0, 0, 0, 0, 255];

    #[test]
    fn top_left_rows_are_kept() {
        let png = encode_rgb(&RED_OVER_BLUE, 1, 2, PixelOrigin::TopLeft).unwrap();
        let img = image::load_from_memory(&png).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (1, 2));
        assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0]);
        assert_eq!(img.get_pixel(0, 1).0, [0, 0, 255]);
    }

    #[test]
    fn bottom_left_rows_are_flipped() {
        let png = encode_rgb(&RED_OVER_BLUE, 1, 2, PixelOrigin::BottomLeft).unwrap();
        let img = image::load_from_memory(&png).unwrap().to_rgb8();
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 255]);
        assert_eq!(img.get_pixel(0, 1).0, [255, 0, 0]);
    }

    #[test]
    fn output_is_rgb_png() {
        let png = encode_rgb(&[0; 4 * 3 * 3], 4, 3, PixelOrigin::TopLeft).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
        let img = image::load_from_memory(&png).unwrap();
        assert_eq!(img.color(), image::ColorType::Rgb8);
    }

    #[test]
    fn short_buffer_is_rejected() {
        let err = encode_rgb(&[0; 5], 1, 2, PixelOrigin::TopLeft).unwrap_err();
        assert!(matches!(err, EncodeError::Length { expected: 6, actual: 5 }));
    }

    #[test]
    fn raw_frame_encodes_at_its_size() {
        let frame = RawFrame {
            width: 2,
            height: 2,
            origin: PixelOrigin::TopLeft,
            pixels: vec![10; 12],
        };
        let png = encode_png(&frame).unwrap();
        let img = image::load_from_memory(&png).unwrap();
        assert_eq!((img.width(), img.height()), (2, 2));
    }
}
