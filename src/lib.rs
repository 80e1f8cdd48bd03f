//! Gifsheet turns animated GIFs into tiled sprite sheets.
//!
//! The pipeline is:
//!
//! - Decode a GIF into [`Frame`]s ([`decode`])
//! - Pick a column/row layout for the frame count ([`plan`])
//! - Run each frame through the tile effects and composite it onto one canvas ([`compose`])
//! - Write the sheet, or the processed animation, to disk ([`export`])
//!
//! [`Document`] bundles frames with a [`SheetConfig`]; [`WorkerPool`] runs compositing jobs off the
//! caller's thread with latest-wins coalescing.
#![forbid(unsafe_code)]

mod foundation;

pub mod color;
pub mod compose;
pub mod composite;
pub mod config;
pub mod decode;
pub mod document;
pub mod effects;
pub mod export;
pub mod grid;
pub mod worker;

pub use crate::foundation::core::{Frame, TargetSize, TileSize};
pub use crate::foundation::error::{SheetError, SheetResult};

pub use crate::color::BackgroundSpec;
pub use crate::compose::{ComposeOpts, ComposeOutcome, Sheet, compose, compose_or_fallback};
pub use crate::config::SheetConfig;
pub use crate::document::{Document, Preview};
pub use crate::effects::{EffectSet, EffectSettings, EffectTarget, apply_effects};
pub use crate::export::{ExportFormat, save_animated_gif, save_sheet, texture_file_name};
pub use crate::grid::{GridLayout, plan};
pub use crate::worker::{CancelToken, TaskOutput, WorkerPool};
