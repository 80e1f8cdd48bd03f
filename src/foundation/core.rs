use image::RgbaImage;

use crate::foundation::error::{SheetError, SheetResult};

/// One decoded animation frame: straight-alpha RGBA8 pixels plus its display delay.
///
/// Frames are never mutated once decoded; the effect pipeline always works on a copy.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    image: RgbaImage,
    delay_ms: u32,
}

impl Frame {
    /// Wrap an RGBA image as a frame with no delay information.
    pub fn new(image: RgbaImage) -> Self {
        Self { image, delay_ms: 0 }
    }

    /// Build a frame from raw RGBA8 bytes, validating the buffer length.
    pub fn from_raw(width: u32, height: u32, rgba: Vec<u8>) -> SheetResult<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(4))
            .ok_or_else(|| SheetError::validation("frame buffer size overflow"))?;
        if rgba.len() != expected {
            return Err(SheetError::validation(format!(
                "frame buffer has {} bytes, expected {expected} for {width}x{height}",
                rgba.len()
            )));
        }
        let image = RgbaImage::from_raw(width, height, rgba)
            .ok_or_else(|| SheetError::validation("frame buffer does not match dimensions"))?;
        Ok(Self::new(image))
    }

    /// A frame filled with one colour.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self::new(RgbaImage::from_pixel(width, height, image::Rgba(rgba)))
    }

    pub fn with_delay_ms(mut self, delay_ms: u32) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn delay_ms(&self) -> u32 {
        self.delay_ms
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// `true` when the frame has no pixels.
    pub fn is_empty(&self) -> bool {
        self.image.width() == 0 || self.image.height() == 0
    }

    /// Independent RGBA copy of the pixels, the starting point of every effect run.
    pub fn to_rgba(&self) -> SheetResult<RgbaImage> {
        if self.is_empty() {
            return Err(SheetError::decode(format!(
                "frame has empty dimensions {}x{}",
                self.width(),
                self.height()
            )));
        }
        Ok(self.image.clone())
    }
}

/// Pixel size of one grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct TileSize {
    pub width: u32,
    pub height: u32,
}

impl TileSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Requested output size of a sheet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TargetSize {
    /// Tiles keep the first frame's native size; no final rescale.
    #[default]
    Auto,
    /// The native-size sheet is rescaled once into this size.
    Fixed { width: u32, height: u32 },
}

impl TargetSize {
    /// Fixed size when both dimensions are non-zero, otherwise `Auto`.
    pub fn from_dims(width: u32, height: u32) -> Self {
        if width == 0 || height == 0 {
            Self::Auto
        } else {
            Self::Fixed { width, height }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_rejects_short_buffers() {
        assert!(Frame::from_raw(2, 2, vec![0u8; 15]).is_err());
        let f = Frame::from_raw(2, 2, vec![7u8; 16]).unwrap();
        assert_eq!((f.width(), f.height()), (2, 2));
        assert_eq!(f.delay_ms(), 0);
    }

    #[test]
    fn copies_are_independent() {
        let f = Frame::solid(3, 3, [1, 2, 3, 4]).with_delay_ms(40);
        let mut copy = f.to_rgba().unwrap();
        copy.put_pixel(0, 0, image::Rgba([9, 9, 9, 9]));
        assert_eq!(f.image().get_pixel(0, 0).0, [1, 2, 3, 4]);
        assert_eq!(f.delay_ms(), 40);
    }

    #[test]
    fn empty_frames_refuse_to_copy() {
        let f = Frame::new(RgbaImage::new(0, 4));
        assert!(f.is_empty());
        assert!(f.to_rgba().is_err());
    }

    #[test]
    fn zero_dims_mean_auto() {
        assert_eq!(TargetSize::from_dims(0, 512), TargetSize::Auto);
        assert_eq!(
            TargetSize::from_dims(256, 512),
            TargetSize::Fixed {
                width: 256,
                height: 512
            }
        );
    }
}
