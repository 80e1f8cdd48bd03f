use image::RgbaImage;

use crate::foundation::error::{SheetError, SheetResult};

/// Premultiplied pixel, all channels on the 0..=255 scale.
type Premul = [f32; 4];

#[derive(Clone, Copy, Debug)]
enum Axis {
    Row,
    Column,
}

/// Gaussian blur of a straight-alpha tile.
///
/// `sigma` is the blur radius in pixels and the kernel reaches `ceil(3 * sigma)` pixels each way.
/// Edges repeat the border pixel. Colour is averaged premultiplied, so a sprite edge fading into
/// transparency keeps its hue instead of darkening.
pub fn gaussian_blur(img: &RgbaImage, sigma: f32) -> SheetResult<RgbaImage> {
    if !sigma.is_finite() || sigma < 0.0 {
        return Err(SheetError::effect(format!(
            "blur radius must be finite and >= 0, got {sigma}"
        )));
    }
    let (w, h) = img.dimensions();
    if sigma == 0.0 || w == 0 || h == 0 {
        return Ok(img.clone());
    }

    let kernel = kernel(sigma);
    let premul: Vec<Premul> = img.pixels().map(|p| premultiply(p.0)).collect();
    let rows = convolve(&premul, w as usize, h as usize, &kernel, Axis::Row);
    let both = convolve(&rows, w as usize, h as usize, &kernel, Axis::Column);

    let mut out = RgbaImage::new(w, h);
    for (dst, px) in out.pixels_mut().zip(both) {
        dst.0 = unpremultiply(px);
    }
    Ok(out)
}

/// Normalised one-dimensional Gaussian taps, `2 * ceil(3 * sigma) + 1` long.
fn kernel(sigma: f32) -> Vec<f32> {
    let reach = (3.0 * sigma).ceil().max(1.0) as i32;
    let two_sigma_sq = 2.0 * sigma * sigma;
    let taps: Vec<f32> = (-reach..=reach)
        .map(|d| {
            let d = d as f32;
            (-d * d / two_sigma_sq).exp()
        })
        .collect();
    let total: f32 = taps.iter().sum();
    taps.into_iter().map(|t| t / total).collect()
}

/// One separable pass along `axis`, clamping samples to the image.
fn convolve(src: &[Premul], w: usize, h: usize, kernel: &[f32], axis: Axis) -> Vec<Premul> {
    let reach = kernel.len() / 2;
    let (len, stride) = match axis {
        Axis::Row => (w, 1),
        Axis::Column => (h, w),
    };

    let mut out = vec![[0.0; 4]; src.len()];
    for (i, dst) in out.iter_mut().enumerate() {
        let pos = match axis {
            Axis::Row => i % w,
            Axis::Column => i / w,
        };
        let line = i - pos * stride;
        for (k, &weight) in kernel.iter().enumerate() {
            let at = (pos + k).saturating_sub(reach).min(len - 1);
            let s = src[line + at * stride];
            for c in 0..4 {
                dst[c] += weight * s[c];
            }
        }
    }
    out
}

fn premultiply([r, g, b, a]: [u8; 4]) -> Premul {
    let a = f32::from(a);
    let k = a / 255.0;
    [f32::from(r) * k, f32::from(g) * k, f32::from(b) * k, a]
}

fn unpremultiply([r, g, b, a]: Premul) -> [u8; 4] {
    let alpha = a.round().clamp(0.0, 255.0);
    if alpha == 0.0 {
        return [0; 4];
    }
    let scale = 255.0 / a;
    let ch = |v: f32| (v * scale).round().clamp(0.0, 255.0) as u8;
    [ch(r), ch(g), ch(b), alpha as u8]
}
