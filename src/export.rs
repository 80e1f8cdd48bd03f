use std::{fs::File, io::BufWriter, path::Path};

use anyhow::Context;
use image::{
    Delay, DynamicImage, ImageFormat, RgbaImage,
    codecs::gif::{GifEncoder, Repeat},
};
use serde::{Deserialize, Serialize};

use crate::{
    color::BackgroundSpec,
    composite::{check_output_size, flatten_over, resize_checked},
    effects::{EffectSettings, apply_effects},
    foundation::{
        core::{Frame, TileSize},
        error::{SheetError, SheetResult},
    },
    grid::GridLayout,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Png,
    #[serde(alias = "jpg")]
    Jpeg,
    Bmp,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Bmp => "bmp",
        }
    }

    pub fn keeps_alpha(self) -> bool {
        matches!(self, Self::Png)
    }

    fn image_format(self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Bmp => ImageFormat::Bmp,
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = SheetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "bmp" => Ok(Self::Bmp),
            other => Err(SheetError::validation(format!(
                "unknown export format '{other}' (expected png, jpg or bmp)"
            ))),
        }
    }
}

/// File name carrying the animation metadata: `{stem};{cols};{rows};{framerate};0.{ext}`.
pub fn texture_file_name(
    stem: &str,
    grid: GridLayout,
    framerate: u32,
    format: ExportFormat,
) -> String {
    format!(
        "{stem};{};{};{framerate};0.{}",
        grid.columns,
        grid.rows,
        format.extension()
    )
}

/// Write a composited sheet.
///
/// PNG keeps the alpha channel. Formats without alpha are flattened over `background` when it
/// is opaque, and over white otherwise.
pub fn save_sheet(
    image: &RgbaImage,
    background: BackgroundSpec,
    path: &Path,
    format: ExportFormat,
) -> SheetResult<()> {
    if image.width() == 0 || image.height() == 0 {
        return Err(SheetError::export("cannot save an empty sheet"));
    }

    let encoded = if format.keeps_alpha() {
        DynamicImage::ImageRgba8(image.clone())
    } else {
        let bg = if background.is_opaque() {
            [background.r, background.g, background.b]
        } else {
            [255, 255, 255]
        };
        DynamicImage::ImageRgb8(flatten_over(image, bg))
    };

    encoded
        .save_with_format(path, format.image_format())
        .with_context(|| format!("write sheet '{}'", path.display()))?;
    tracing::info!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        ?format,
        "wrote sheet"
    );
    Ok(())
}

/// Write `frames` as an infinitely looping GIF, each frame resized to `size` and run through
/// `effects`.
pub fn save_animated_gif(
    frames: &[Frame],
    size: TileSize,
    effects: &EffectSettings,
    delay_ms: u32,
    path: &Path,
) -> SheetResult<()> {
    if frames.is_empty() {
        return Err(SheetError::export("no frames to write"));
    }
    check_output_size(size.width, size.height)?;

    let mut processed = Vec::with_capacity(frames.len());
    for (index, frame) in frames.iter().enumerate() {
        let img = frame
            .to_rgba()
            .map_err(|e| SheetError::export(format!("frame {index}: {e}")))?;
        let img = resize_checked(&img, size.width, size.height)?;
        let img = apply_effects(img, effects)?;
        processed.push(image::Frame::from_parts(
            img,
            0,
            0,
            Delay::from_numer_denom_ms(delay_ms, 1),
        ));
    }

    let file = File::create(path).with_context(|| format!("create gif '{}'", path.display()))?;
    let mut encoder = GifEncoder::new(BufWriter::new(file));
    encoder
        .set_repeat(Repeat::Infinite)
        .map_err(|e| SheetError::export(format!("gif repeat: {e}")))?;
    encoder
        .encode_frames(processed)
        .map_err(|e| SheetError::export(format!("encode gif: {e}")))?;

    tracing::info!(path = %path.display(), frames = frames.len(), "wrote gif");
    Ok(())
}
