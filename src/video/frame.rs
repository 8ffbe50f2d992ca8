//! Decoded frame type
//!
//! A single raster image in the decoder's native BGR byte order.

use image::RgbImage;

use crate::utils::color::{bgr_to_rgb, pack_rows};

/// One decoded video frame, tightly packed as 8-bit BGR
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Frame {
    /// Wrap a packed BGR buffer
    ///
    /// Returns None if `data` is not exactly `width * height * 3` bytes.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != width as usize * height as usize * 3 {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    /// Build a frame from a BGR plane whose rows are `stride` bytes apart
    pub fn from_strided(width: u32, height: u32, stride: usize, data: &[u8]) -> Option<Self> {
        let pixels = pack_rows(data, stride, width as usize * 3, height as usize)?;
        Self::new(width, height, pixels)
    }

    /// A frame filled with one BGR color
    pub fn filled_bgr(width: u32, height: u32, bgr: [u8; 3]) -> Self {
        let data = bgr.repeat(width as usize * height as usize);
        Self {
            width,
            height,
            data,
        }
    }

    /// Skips the length check, for exercising callers against a bad buffer
    #[cfg(test)]
    pub(crate) fn with_unchecked_data(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Packed RGB bytes
    pub fn rgb_bytes(&self) -> Vec<u8> {
        bgr_to_rgb(&self.data)
    }

    /// Convert to an RGB image at the frame's own resolution
    ///
    /// Returns None if the pixel buffer does not match the frame size.
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.rgb_bytes())
    }
}
