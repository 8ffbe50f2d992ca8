//! Color utilities
//!
//! Helper functions for converting between packed 8-bit pixel layouts.

/// Swap the first and third channel of every packed 3-byte pixel in place
///
/// Turns BGR into RGB and back. A trailing partial pixel is left untouched.
pub fn swap_red_blue(pixels: &mut [u8]) {
    for px in pixels.chunks_exact_mut(3) {
        px.swap(0, 2);
    }
}

/// Copy a BGR buffer into a new RGB buffer
pub fn bgr_to_rgb(bgr: &[u8]) -> Vec<u8> {
    let mut rgb = bgr.to_vec();
    swap_red_blue(&mut rgb);
    rgb
}

/// Copy `height` rows of `row_bytes` each out of a buffer whose rows are
/// `stride` bytes apart, dropping the padding
///
/// Returns None if the buffer is too short for the requested rows.
pub fn pack_rows(data: &[u8], stride: usize, row_bytes: usize, height: usize) -> Option<Vec<u8>> {
    if stride < row_bytes {
        return None;
    }
    if height == 0 {
        return Some(Vec::new());
    }
    let needed = stride * (height - 1) + row_bytes;
    if data.len() < needed {
        return None;
    }

    // If stride matches the row size, the data is already packed
    if stride == row_bytes {
        return Some(data[..row_bytes * height].to_vec());
    }

    let mut pixels = Vec::with_capacity(row_bytes * height);
    for y in 0..height {
        let row_start = y * stride;
        pixels.extend_from_slice(&data[row_start..row_start + row_bytes]);
    }
    Some(pixels)
}
