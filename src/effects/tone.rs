//! Per-pixel colour and alpha adjustments on straight-alpha RGBA8 images.

use image::RgbaImage;

use crate::{effects::blur::gaussian_blur, foundation::error::SheetResult};

/// Neutral colour-intensity level.
pub const NEUTRAL_INTENSITY: f32 = 0.5;

const SHARPEN_SIGMA: f32 = 1.0;

/// ITU-R 601-2 luma, rounded.
pub fn luminance(r: u8, g: u8, b: u8) -> u8 {
    ((u32::from(r) * 299 + u32::from(g) * 587 + u32::from(b) * 114 + 500) / 1000) as u8
}

/// Replace RGB with luminance; alpha is left byte-for-byte untouched.
pub fn grayscale(img: &mut RgbaImage) {
    for px in img.pixels_mut() {
        let [r, g, b, _] = px.0;
        let l = luminance(r, g, b);
        px.0[0] = l;
        px.0[1] = l;
        px.0[2] = l;
    }
}

/// Unsharp mask: `out = orig + amount * (orig - blurred)` on RGB.
pub fn sharpen(img: &mut RgbaImage, amount: f32) -> SheetResult<()> {
    if !amount.is_finite() || amount <= 0.0 {
        return Ok(());
    }
    let blurred = gaussian_blur(img, SHARPEN_SIGMA)?;
    for (px, soft) in img.pixels_mut().zip(blurred.pixels()) {
        for c in 0..3 {
            let orig = f32::from(px.0[c]);
            let detail = orig - f32::from(soft.0[c]);
            px.0[c] = to_u8(orig + amount * detail);
        }
    }
    Ok(())
}

/// Scale every alpha value by `factor` (clamped to `0..=1`).
pub fn multiply_alpha(img: &mut RgbaImage, factor: f32) {
    let factor = if factor.is_finite() {
        factor.clamp(0.0, 1.0)
    } else {
        1.0
    };
    if factor == 1.0 {
        return;
    }
    for px in img.pixels_mut() {
        px.0[3] = (f32::from(px.0[3]) * factor) as u8;
    }
}

/// Colour intensity around the neutral 0.5: lower levels fade toward white,
/// higher levels boost saturation up to a factor of 2 at level 1.0.
pub fn color_intensity(img: &mut RgbaImage, level: f32) {
    if !level.is_finite() {
        return;
    }
    let level = level.clamp(0.0, 1.0);
    if level == NEUTRAL_INTENSITY {
        return;
    }

    if level < NEUTRAL_INTENSITY {
        let keep = level * 2.0;
        let white = 255.0 * (1.0 - keep);
        for px in img.pixels_mut() {
            for c in 0..3 {
                px.0[c] = to_u8(f32::from(px.0[c]) * keep + white);
            }
        }
    } else {
        let factor = 1.0 + (level - NEUTRAL_INTENSITY) * 2.0;
        for px in img.pixels_mut() {
            let [r, g, b, _] = px.0;
            let gray = f32::from(luminance(r, g, b));
            for c in 0..3 {
                px.0[c] = to_u8(gray + factor * (f32::from(px.0[c]) - gray));
            }
        }
    }
}

fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}
