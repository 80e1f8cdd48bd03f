use std::path::Path;

use image::RgbaImage;

use crate::{
    compose::{ComposeOutcome, compose_or_fallback, fit_preview},
    composite::{check_output_size, resize_checked},
    config::{MAX_FRAMES_LIMIT, SheetConfig},
    decode::{load_gif, load_image_frame},
    effects::apply_effects,
    export::texture_file_name,
    foundation::{
        core::{Frame, TileSize},
        error::{SheetError, SheetResult},
    },
    grid::{GridLayout, plan},
};

const DEFAULT_STEM: &str = "texture";

/// A downscaled sheet for display plus the status line of the run that produced it.
#[derive(Clone, Debug)]
pub struct Preview {
    pub image: RgbaImage,
    pub status: Option<String>,
}

/// Loaded frames together with the settings used to turn them into a sheet.
#[derive(Clone, Debug, Default)]
pub struct Document {
    frames: Vec<Frame>,
    stem: Option<String>,
    pub config: SheetConfig,
}

impl Document {
    pub fn new(config: SheetConfig) -> Self {
        Self {
            frames: Vec::new(),
            stem: None,
            config,
        }
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Source file stem, used for texture file names.
    pub fn stem(&self) -> &str {
        self.stem.as_deref().unwrap_or(DEFAULT_STEM)
    }

    /// Replace the document's frames with the contents of a GIF file.
    pub fn load_gif(&mut self, path: &Path) -> SheetResult<()> {
        let frames = load_gif(path)?;
        self.stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty());
        let dropped = self.set_frames(frames);
        if dropped > 0 {
            tracing::warn!(dropped, max = self.config.max_frames, "gif exceeds frame limit");
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.frames.clear();
        self.stem = None;
    }

    /// Replace all frames, keeping at most `max_frames`. Returns the number of frames dropped.
    pub fn set_frames(&mut self, mut frames: Vec<Frame>) -> usize {
        let dropped = frames.len().saturating_sub(self.config.max_frames);
        frames.truncate(self.config.max_frames);
        self.frames = frames;
        dropped
    }

    /// Append a copy of frame `index`. Returns the index of the new frame.
    pub fn add_frame_copy(&mut self, index: usize) -> SheetResult<usize> {
        let frame = self
            .frames
            .get(index)
            .ok_or_else(|| {
                SheetError::validation(format!(
                    "frame {index} does not exist ({} frames)",
                    self.frames.len()
                ))
            })?
            .clone();
        if self.frames.len() >= self.config.max_frames {
            return Err(SheetError::validation(format!(
                "frame limit of {} reached",
                self.config.max_frames
            )));
        }
        self.frames.push(frame);
        Ok(self.frames.len() - 1)
    }

    /// Append a still image as a new frame. Returns the index of the new frame.
    pub fn add_image_frame(&mut self, path: &Path) -> SheetResult<usize> {
        if self.frames.len() >= self.config.max_frames {
            return Err(SheetError::validation(format!(
                "frame limit of {} reached",
                self.config.max_frames
            )));
        }
        let frame = load_image_frame(path)?;
        tracing::debug!(
            path = %path.display(),
            width = frame.width(),
            height = frame.height(),
            "added image frame"
        );
        self.frames.push(frame);
        Ok(self.frames.len() - 1)
    }

    pub fn remove_frame(&mut self, index: usize) -> SheetResult<Frame> {
        if index >= self.frames.len() {
            return Err(SheetError::validation(format!(
                "frame {index} does not exist ({} frames)",
                self.frames.len()
            )));
        }
        Ok(self.frames.remove(index))
    }

    /// Change the frame limit, dropping frames past it. Returns the number of frames removed.
    pub fn set_max_frames(&mut self, max_frames: usize) -> SheetResult<usize> {
        if !(1..=MAX_FRAMES_LIMIT).contains(&max_frames) {
            return Err(SheetError::validation(format!(
                "max_frames must be within 1..={MAX_FRAMES_LIMIT}, got {max_frames}"
            )));
        }
        self.config.max_frames = max_frames;
        let removed = self.frames.len().saturating_sub(max_frames);
        self.frames.truncate(max_frames);
        Ok(removed)
    }

    /// Restore default settings. Frames are kept, except those past the default frame limit.
    pub fn reset_settings(&mut self) {
        self.config = SheetConfig::default();
        self.frames.truncate(self.config.max_frames);
    }

    pub fn grid(&self) -> GridLayout {
        plan(
            self.frames.len(),
            self.config.avoid_single_row_for_odd_counts,
        )
    }

    /// Compose the sheet with the current settings. Never fails; see [`ComposeOutcome`].
    pub fn render_export(&self) -> ComposeOutcome {
        compose_or_fallback(
            &self.frames,
            &self.config.compose_opts(),
            &self.config.effects.tile,
        )
    }

    /// Compose the sheet and shrink it to fit a `max_w x max_h` pane.
    pub fn render_preview(&self, max_w: u32, max_h: u32) -> Preview {
        let outcome = self.render_export();
        Preview {
            image: fit_preview(&outcome.sheet.image, max_w, max_h),
            status: outcome.status(),
        }
    }

    /// Frame `index` resized to `size` with the frame effects applied.
    pub fn frame_preview(&self, index: usize, size: TileSize) -> SheetResult<RgbaImage> {
        let frame = self.frames.get(index).ok_or_else(|| {
            SheetError::validation(format!(
                "frame {index} does not exist ({} frames)",
                self.frames.len()
            ))
        })?;
        check_output_size(size.width, size.height)?;
        let img = resize_checked(&frame.to_rgba()?, size.width, size.height)?;
        apply_effects(img, &self.config.effects.frame)
    }

    pub fn texture_file_name(&self) -> String {
        texture_file_name(
            self.stem(),
            self.grid(),
            self.config.framerate,
            self.config.export_format,
        )
    }
}
