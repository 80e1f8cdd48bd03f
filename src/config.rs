use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{
    color::BackgroundSpec,
    compose::ComposeOpts,
    effects::EffectSet,
    export::ExportFormat,
    foundation::{
        core::TargetSize,
        error::{SheetError, SheetResult},
    },
};

pub use crate::composite::MAX_SHEET_DIMENSION;
pub const MAX_FRAMES_LIMIT: usize = 1024;

/// Job configuration read from JSON. Every key is optional.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetConfig {
    pub width: u32,
    pub height: u32,
    /// Ignore `width`/`height` and keep tiles at their native size.
    pub auto_size: bool,
    pub bg_color: BackgroundSpec,
    /// Animation speed written into texture file names, frames per second.
    pub framerate: u32,
    pub export_format: ExportFormat,
    pub max_frames: usize,
    pub borderless: bool,
    pub avoid_single_row_for_odd_counts: bool,
    pub effects: EffectSet,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            width: 2048,
            height: 2048,
            auto_size: false,
            bg_color: BackgroundSpec::TRANSPARENT,
            framerate: 10,
            export_format: ExportFormat::Png,
            max_frames: 64,
            borderless: false,
            avoid_single_row_for_odd_counts: true,
            effects: EffectSet::default(),
        }
    }
}

impl SheetConfig {
    pub fn from_json_str(s: &str) -> SheetResult<Self> {
        let cfg: Self =
            serde_json::from_str(s).map_err(|e| SheetError::config(format!("parse config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> SheetResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        let cfg = Self::from_json_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(cfg)
    }

    pub fn validate(&self) -> SheetResult<()> {
        if !self.auto_size {
            for (name, v) in [("width", self.width), ("height", self.height)] {
                if !(1..=MAX_SHEET_DIMENSION).contains(&v) {
                    return Err(SheetError::config(format!(
                        "{name} must be within 1..={MAX_SHEET_DIMENSION}, got {v}"
                    )));
                }
            }
        }
        if !(1..=60).contains(&self.framerate) {
            return Err(SheetError::config(format!(
                "framerate must be within 1..=60, got {}",
                self.framerate
            )));
        }
        if !(1..=MAX_FRAMES_LIMIT).contains(&self.max_frames) {
            return Err(SheetError::config(format!(
                "max_frames must be within 1..={MAX_FRAMES_LIMIT}, got {}",
                self.max_frames
            )));
        }
        self.effects
            .frame
            .validate()
            .and_then(|()| self.effects.tile.validate())
            .map_err(|e| SheetError::config(format!("effects: {e}")))
    }

    pub fn target(&self) -> TargetSize {
        if self.auto_size {
            TargetSize::Auto
        } else {
            TargetSize::from_dims(self.width, self.height)
        }
    }

    pub fn compose_opts(&self) -> ComposeOpts {
        ComposeOpts {
            target: self.target(),
            background: self.bg_color,
            crop_to_content: self.borderless,
            avoid_single_row_for_odd_counts: self.avoid_single_row_for_odd_counts,
        }
    }
}
