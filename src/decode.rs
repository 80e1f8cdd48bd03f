use std::{
    io::{BufRead, Cursor, Seek},
    path::Path,
};

use anyhow::Context;
use image::{AnimationDecoder as _, codecs::gif::GifDecoder};

use crate::foundation::{
    core::Frame,
    error::{SheetError, SheetResult},
};

/// Decode every frame of a GIF into full-canvas RGBA frames, in display order.
///
/// A GIF whose animation stream yields no frames falls back to a single still-image decode.
pub fn decode_gif_bytes(bytes: &[u8]) -> SheetResult<Vec<Frame>> {
    let frames = decode_gif_reader(Cursor::new(bytes))?;
    if !frames.is_empty() {
        return Ok(frames);
    }

    tracing::debug!("gif has no animation frames, decoding as still image");
    let still = image::load_from_memory(bytes).context("decode still image from memory")?;
    Ok(vec![Frame::new(still.to_rgba8())])
}

fn decode_gif_reader<R: BufRead + Seek>(reader: R) -> SheetResult<Vec<Frame>> {
    let decoder =
        GifDecoder::new(reader).map_err(|e| SheetError::decode(format!("read gif header: {e}")))?;
    let raw = decoder
        .into_frames()
        .collect_frames()
        .map_err(|e| SheetError::decode(format!("decode gif frames: {e}")))?;

    Ok(raw
        .into_iter()
        .map(|f| {
            let (num, den) = f.delay().numer_denom_ms();
            let delay_ms = if den == 0 { 0 } else { num / den };
            Frame::new(f.into_buffer()).with_delay_ms(delay_ms)
        })
        .collect())
}

/// Read and decode a GIF file.
pub fn load_gif(path: &Path) -> SheetResult<Vec<Frame>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("read gif '{}'", path.display()))?;
    let frames = decode_gif_bytes(&bytes)?;
    tracing::info!(path = %path.display(), frames = frames.len(), "loaded gif");
    Ok(frames)
}

/// Load any still image the `image` crate understands as a single frame.
pub fn load_image_frame(path: &Path) -> SheetResult<Frame> {
    let img = image::open(path).with_context(|| format!("open image '{}'", path.display()))?;
    Ok(Frame::new(img.to_rgba8()))
}

#[cfg(test)]
mod tests {
    use image::{Delay, RgbaImage, codecs::gif::GifEncoder};

    use super::*;

    fn encode_gif(colors: &[[u8; 4]], delay_ms: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut enc = GifEncoder::new(&mut buf);
            let frames = colors.iter().map(|c| {
                image::Frame::from_parts(
                    RgbaImage::from_pixel(4, 3, image::Rgba(*c)),
                    0,
                    0,
                    Delay::from_numer_denom_ms(delay_ms, 1),
                )
            });
            enc.encode_frames(frames).unwrap();
        }
        buf
    }

    #[test]
    fn decodes_frames_in_order_with_delays() {
        let bytes = encode_gif(&[[255, 0, 0, 255], [0, 0, 255, 255]], 100);
        let frames = decode_gif_bytes(&bytes).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!((frames[0].width(), frames[0].height()), (4, 3));
        assert_eq!(frames[0].image().get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(frames[1].image().get_pixel(3, 2).0, [0, 0, 255, 255]);
        assert_eq!(frames[0].delay_ms(), 100);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = decode_gif_bytes(b"definitely not a gif").unwrap_err();
        assert!(matches!(err, SheetError::Decode(_)));
    }

    #[test]
    fn still_image_loads_as_one_rgba_frame() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("target")
            .join("decode_tests");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("still.png");
        let img = RgbaImage::from_fn(3, 2, |x, y| image::Rgba([x as u8 * 100, y as u8 * 50, 9, 128]));
        img.save(&path).unwrap();

        let frame = load_image_frame(&path).unwrap();
        assert_eq!((frame.width(), frame.height()), (3, 2));
        assert_eq!(frame.image().get_pixel(2, 1).0, [200, 50, 9, 128]);
        assert!(load_image_frame(&dir.join("missing.png")).is_err());
    }
}
