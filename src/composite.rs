use image::{GenericImage as _, RgbImage, RgbaImage, imageops::FilterType};

use crate::foundation::error::{SheetError, SheetResult};

/// Largest width or height accepted for a requested output (fixed sheets, GIFs, previews).
pub const MAX_SHEET_DIMENSION: u32 = 8192;

/// Straight (non-premultiplied) RGBA8 pixel.
pub type Rgba8 = [u8; 4];

/// Porter-Duff "over" for straight-alpha pixels: `src` on top of `dst`.
pub fn over(dst: Rgba8, src: Rgba8) -> Rgba8 {
    let sa = u32::from(src[3]);
    if sa == 0 {
        return dst;
    }
    if sa == 255 {
        return src;
    }

    let da = u32::from(dst[3]);
    let dst_weight = da * (255 - sa);
    // output alpha scaled by 255
    let out_a_255 = sa * 255 + dst_weight;
    if out_a_255 == 0 {
        return [0, 0, 0, 0];
    }

    let mut out = [0u8; 4];
    for i in 0..3 {
        let num = u32::from(src[i]) * sa * 255 + u32::from(dst[i]) * dst_weight;
        out[i] = ((num + out_a_255 / 2) / out_a_255).min(255) as u8;
    }
    out[3] = ((out_a_255 + 127) / 255).min(255) as u8;
    out
}

pub fn over_in_place(dst: &mut [u8], src: &[u8]) -> SheetResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(SheetError::composite(
            "over_in_place expects equal-length rgba8 buffers",
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]]);
        d.copy_from_slice(&out);
    }
    Ok(())
}

/// Blend `tile` over the canvas region at `(x, y)`.
///
/// The region is extracted, composited and written back, so partially transparent tiles blend
/// with the background instead of replacing it.
pub fn composite_tile(canvas: &mut RgbaImage, tile: &RgbaImage, x: u32, y: u32) -> SheetResult<()> {
    let (tw, th) = tile.dimensions();
    let fits_x = x.checked_add(tw).is_some_and(|r| r <= canvas.width());
    let fits_y = y.checked_add(th).is_some_and(|b| b <= canvas.height());
    if !fits_x || !fits_y {
        return Err(SheetError::composite(format!(
            "tile {tw}x{th} at ({x},{y}) exceeds canvas {}x{}",
            canvas.width(),
            canvas.height()
        )));
    }

    let mut region = image::imageops::crop_imm(canvas, x, y, tw, th).to_image();
    over_in_place(&mut region, tile.as_raw())?;
    canvas
        .copy_from(&region, x, y)
        .map_err(|e| SheetError::composite(format!("paste tile at ({x},{y}): {e}")))
}

/// Allocate a `width x height` canvas filled with `fill`.
///
/// Allocation failure is reported as an error instead of aborting the process.
pub fn alloc_canvas(width: u32, height: u32, fill: Rgba8) -> SheetResult<RgbaImage> {
    let len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| {
            SheetError::allocation(format!("canvas {width}x{height} overflows address space"))
        })?;

    let mut buf = Vec::<u8>::new();
    buf.try_reserve_exact(len).map_err(|e| {
        SheetError::allocation(format!("cannot allocate canvas {width}x{height}: {e}"))
    })?;
    for _ in 0..(len / 4) {
        buf.extend_from_slice(&fill);
    }

    RgbaImage::from_raw(width, height, buf)
        .ok_or_else(|| SheetError::allocation("canvas buffer does not match dimensions"))
}

/// Reject a requested output size outside `1..=MAX_SHEET_DIMENSION` on either axis.
pub fn check_output_size(width: u32, height: u32) -> SheetResult<()> {
    let limit = 1..=MAX_SHEET_DIMENSION;
    if limit.contains(&width) && limit.contains(&height) {
        return Ok(());
    }
    Err(SheetError::allocation(format!(
        "output size {width}x{height} is outside 1..={MAX_SHEET_DIMENSION}"
    )))
}

/// Lanczos3 resize that reports allocation failure instead of aborting.
///
/// The resampler keeps an `f32` intermediate of `src_width x height` pixels next to the output;
/// both are reserved up front.
pub fn resize_checked(src: &RgbaImage, width: u32, height: u32) -> SheetResult<RgbaImage> {
    if src.dimensions() == (width, height) {
        return Ok(src.clone());
    }
    if width == 0 || height == 0 {
        return Err(SheetError::allocation(format!(
            "cannot resize to empty size {width}x{height}"
        )));
    }

    let bytes = |w: u32, h: u32, per_px: usize| {
        (w as usize)
            .checked_mul(h as usize)
            .and_then(|v| v.checked_mul(per_px))
    };
    let (Some(out_len), Some(tmp_len)) = (bytes(width, height, 4), bytes(src.width(), height, 16))
    else {
        return Err(SheetError::allocation(format!(
            "resize to {width}x{height} overflows address space"
        )));
    };
    for len in [out_len, tmp_len] {
        Vec::<u8>::new().try_reserve_exact(len).map_err(|e| {
            SheetError::allocation(format!("cannot allocate resize to {width}x{height}: {e}"))
        })?;
    }

    Ok(image::imageops::resize(src, width, height, FilterType::Lanczos3))
}

/// Drop alpha by blending every pixel over an opaque `bg` colour.
pub fn flatten_over(src: &RgbaImage, bg: [u8; 3]) -> RgbImage {
    let (w, h) = src.dimensions();
    let mut out = RgbImage::new(w, h);
    for (d, s) in out.pixels_mut().zip(src.pixels()) {
        let flat = over([bg[0], bg[1], bg[2], 255], s.0);
        d.0 = [flat[0], flat[1], flat[2]];
    }
    out
}
