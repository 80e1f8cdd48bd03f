use image::{RgbaImage, imageops::FilterType};
use rayon::prelude::*;

use crate::{
    color::BackgroundSpec,
    composite::{alloc_canvas, check_output_size, composite_tile, resize_checked},
    effects::{EffectSettings, apply_effects},
    foundation::{
        core::{Frame, TargetSize, TileSize},
        error::{SheetError, SheetResult},
    },
    grid::{GridLayout, plan},
};

/// Options for [`compose`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ComposeOpts {
    /// Native (auto) sizing or a fixed output size.
    pub target: TargetSize,
    /// Canvas fill applied before any tile is placed.
    pub background: BackgroundSpec,
    /// Crop the output to whole tiles ("borderless").
    pub crop_to_content: bool,
    /// Passed to [`plan`](crate::grid::plan).
    pub avoid_single_row_for_odd_counts: bool,
}

impl Default for ComposeOpts {
    fn default() -> Self {
        Self {
            target: TargetSize::Auto,
            background: BackgroundSpec::TRANSPARENT,
            crop_to_content: false,
            avoid_single_row_for_odd_counts: true,
        }
    }
}

/// A composited sprite sheet.
#[derive(Clone, Debug, PartialEq)]
pub struct Sheet {
    /// Straight-alpha RGBA8 pixels.
    pub image: RgbaImage,
    pub grid: GridLayout,
    /// Cell size in `image` pixels. In fixed mode without cropping the last column/row may
    /// carry a few extra pixels from integer division.
    pub tile: TileSize,
    /// Frame indices whose tile could not be produced; their cells keep the background.
    pub skipped: Vec<usize>,
}

impl Sheet {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Top-left pixel of the cell holding tile `index`.
    pub fn tile_origin(&self, index: usize) -> (u32, u32) {
        let (tx, ty) = self.grid.cell_of(index);
        (tx * self.tile.width, ty * self.tile.height)
    }

    /// A copy cropped to whole tiles. `self` keeps the uncropped pixels.
    pub fn borderless(&self) -> Sheet {
        Sheet {
            image: crop_to_tiles(&self.image, self.grid, self.tile),
            ..self.clone()
        }
    }
}

/// Compose `frames` into a tiled sheet.
///
/// Tiles are placed at the first frame's native size on an optimally sized canvas
/// (`columns * tile_w`, `rows * tile_h`). In fixed mode that canvas is rescaled exactly once
/// into the target size with Lanczos resampling. A frame that cannot be turned into a tile is
/// skipped and its cell keeps the background. Canvas or rescale allocation failures, and fixed
/// targets outside `1..=MAX_SHEET_DIMENSION`, are returned as [`SheetError::Allocation`].
///
/// With `crop_to_content` a fixed target shrinks to whole tiles before the rescale; the native
/// canvas never has a margin to crop.
#[tracing::instrument(skip(frames, opts, effects), fields(frame_count = frames.len()))]
pub fn compose(
    frames: &[Frame],
    opts: &ComposeOpts,
    effects: &EffectSettings,
) -> SheetResult<Sheet> {
    let grid = plan(frames.len(), opts.avoid_single_row_for_odd_counts);
    let background = opts.background.to_rgba8();
    if let TargetSize::Fixed { width, height } = opts.target {
        check_output_size(width, height)?;
    }

    if frames.is_empty() {
        let (w, h) = match opts.target {
            TargetSize::Auto => (1, 1),
            TargetSize::Fixed { width, height } => export_size(width, height, grid, opts),
        };
        return Ok(Sheet {
            image: alloc_canvas(w, h, background)?,
            grid,
            tile: TileSize::new(w, h),
            skipped: Vec::new(),
        });
    }

    let tile = native_tile_size(frames);
    let (sheet_w, sheet_h) = sheet_size(grid, tile)?;
    tracing::debug!(%grid, tile_w = tile.width, tile_h = tile.height, sheet_w, sheet_h, "planned sheet");

    let mut canvas = alloc_canvas(sheet_w, sheet_h, background)?;

    let tiles = frames
        .par_iter()
        .map(|frame| prepare_tile(frame, tile, effects))
        .collect::<Vec<_>>();

    let mut skipped = Vec::new();
    for (index, result) in tiles.into_iter().enumerate() {
        let placed = result.and_then(|img| {
            let (tx, ty) = grid.cell_of(index);
            composite_tile(&mut canvas, &img, tx * tile.width, ty * tile.height)
        });
        if let Err(err) = placed {
            tracing::warn!(index, error = %err, "skipping tile");
            skipped.push(index);
        }
    }

    // the native canvas is already whole tiles; borderless only shapes the fixed export size
    let (image, tile) = match opts.target {
        TargetSize::Auto => (canvas, tile),
        TargetSize::Fixed { width, height } => {
            let (out_w, out_h) = export_size(width, height, grid, opts);
            let out = if (out_w, out_h) == canvas.dimensions() {
                canvas
            } else {
                resize_checked(&canvas, out_w, out_h)?
            };
            let tile = TileSize::new(
                (out_w / grid.columns).max(1),
                (out_h / grid.rows).max(1),
            );
            (out, tile)
        }
    };

    Ok(Sheet {
        image,
        grid,
        tile,
        skipped,
    })
}

/// Result of [`compose_or_fallback`]: always carries a usable image.
#[derive(Debug)]
pub struct ComposeOutcome {
    pub sheet: Sheet,
    /// The failure that forced the fallback canvas, if any.
    pub error: Option<SheetError>,
}

impl ComposeOutcome {
    /// One-line message for a status bar, or `None` when everything went fine.
    pub fn status(&self) -> Option<String> {
        if let Some(err) = &self.error {
            return Some(format!("texture generation failed: {err}"));
        }
        match self.sheet.skipped.len() {
            0 => None,
            n => Some(format!("{n} frame(s) could not be processed and were left empty")),
        }
    }
}

/// Like [`compose`], but a failed run yields an empty background canvas of the intended size
/// (or 1x1 when even that cannot be allocated) instead of an error.
pub fn compose_or_fallback(
    frames: &[Frame],
    opts: &ComposeOpts,
    effects: &EffectSettings,
) -> ComposeOutcome {
    match compose(frames, opts, effects) {
        Ok(sheet) => ComposeOutcome { sheet, error: None },
        Err(err) => {
            tracing::warn!(error = %err, "compositing failed, using empty canvas");
            fallback(frames, opts, err)
        }
    }
}

fn fallback(frames: &[Frame], opts: &ComposeOpts, err: SheetError) -> ComposeOutcome {
    let grid = plan(frames.len(), opts.avoid_single_row_for_odd_counts);
    let (w, h) = intended_size(frames, opts, grid);
    let background = opts.background.to_rgba8();
    let image = check_output_size(w, h)
        .and_then(|()| alloc_canvas(w, h, background))
        .unwrap_or_else(|_| RgbaImage::from_pixel(1, 1, image::Rgba(background)));
    let tile = TileSize::new(
        (image.width() / grid.columns).max(1),
        (image.height() / grid.rows).max(1),
    );
    ComposeOutcome {
        sheet: Sheet {
            image,
            grid,
            tile,
            skipped: (0..frames.len()).collect(),
        },
        error: Some(err),
    }
}

/// Crop a sheet to the area covered by whole tiles. Returns a new image.
pub fn crop_to_tiles(img: &RgbaImage, grid: GridLayout, tile: TileSize) -> RgbaImage {
    let w = grid.columns.saturating_mul(tile.width).min(img.width());
    let h = grid.rows.saturating_mul(tile.height).min(img.height());
    image::imageops::crop_imm(img, 0, 0, w, h).to_image()
}

/// Downscale `img` to fit inside `max_w x max_h`, keeping its aspect ratio. Never upscales.
pub fn fit_preview(img: &RgbaImage, max_w: u32, max_h: u32) -> RgbaImage {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 || max_w == 0 || max_h == 0 || (w <= max_w && h <= max_h) {
        return img.clone();
    }
    let scale = (f64::from(max_w) / f64::from(w)).min(f64::from(max_h) / f64::from(h));
    let nw = ((f64::from(w) * scale).round() as u32).clamp(1, max_w);
    let nh = ((f64::from(h) * scale).round() as u32).clamp(1, max_h);
    image::imageops::resize(img, nw, nh, FilterType::Lanczos3)
}

/// Copy a frame, fit it to the cell and run the effect pipeline on it.
pub fn prepare_tile(
    frame: &Frame,
    tile: TileSize,
    effects: &EffectSettings,
) -> SheetResult<RgbaImage> {
    let mut img = frame.to_rgba()?;
    if img.dimensions() != (tile.width, tile.height) {
        img = resize_checked(&img, tile.width, tile.height)?;
    }
    apply_effects(img, effects)
}

/// Tile size from the first frame that has pixels.
fn native_tile_size(frames: &[Frame]) -> TileSize {
    frames
        .iter()
        .find(|f| !f.is_empty())
        .map(|f| TileSize::new(f.width(), f.height()))
        .unwrap_or(TileSize::new(1, 1))
}

fn sheet_size(grid: GridLayout, tile: TileSize) -> SheetResult<(u32, u32)> {
    let w = grid.columns.checked_mul(tile.width);
    let h = grid.rows.checked_mul(tile.height);
    match (w, h) {
        (Some(w), Some(h)) => Ok((w, h)),
        _ => Err(SheetError::allocation(format!(
            "sheet for grid {grid} with {}x{} tiles exceeds u32 pixels",
            tile.width, tile.height
        ))),
    }
}

/// Output size in fixed mode; borderless sheets shrink to whole tiles.
fn export_size(width: u32, height: u32, grid: GridLayout, opts: &ComposeOpts) -> (u32, u32) {
    if !opts.crop_to_content {
        return (width, height);
    }
    let tw = (width / grid.columns).max(1);
    let th = (height / grid.rows).max(1);
    (tw * grid.columns, th * grid.rows)
}

fn intended_size(frames: &[Frame], opts: &ComposeOpts, grid: GridLayout) -> (u32, u32) {
    match opts.target {
        TargetSize::Fixed { width, height } => export_size(width, height, grid, opts),
        TargetSize::Auto if frames.is_empty() => (1, 1),
        TargetSize::Auto => sheet_size(grid, native_tile_size(frames)).unwrap_or((1, 1)),
    }
}
