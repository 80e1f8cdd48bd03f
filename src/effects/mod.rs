//! Cosmetic per-frame effects and the fixed-order pipeline that applies them.

pub mod blur;
pub mod tone;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::foundation::error::{SheetError, SheetResult};

/// Effect parameters for one target. Disabled effects keep their last value.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectSettings {
    pub grayscale: bool,
    pub sharpen: bool,
    pub sharpen_amount: f32,
    pub blur: bool,
    pub blur_radius: f32,
    pub transparency: bool,
    pub transparency_factor: f32,
    pub color_intensity: bool,
    pub color_intensity_level: f32,
}

impl Default for EffectSettings {
    fn default() -> Self {
        Self {
            grayscale: false,
            sharpen: false,
            sharpen_amount: 2.5,
            blur: false,
            blur_radius: 3.5,
            transparency: false,
            transparency_factor: 0.5,
            color_intensity: false,
            color_intensity_level: tone::NEUTRAL_INTENSITY,
        }
    }
}

impl EffectSettings {
    /// `true` when applying these settings cannot change any pixel.
    pub fn is_identity(&self) -> bool {
        !self.grayscale
            && !(self.sharpen && self.sharpen_amount > 0.0)
            && !(self.blur && self.blur_radius > 0.0)
            && !(self.transparency && self.transparency_factor < 1.0)
            && !(self.color_intensity && self.color_intensity_level != tone::NEUTRAL_INTENSITY)
    }

    pub fn validate(&self) -> SheetResult<()> {
        check_range("sharpen_amount", self.sharpen_amount, 0.0, 10.0)?;
        check_range("blur_radius", self.blur_radius, 0.0, 10.0)?;
        check_range("transparency_factor", self.transparency_factor, 0.0, 1.0)?;
        check_range("color_intensity_level", self.color_intensity_level, 0.0, 1.0)?;
        Ok(())
    }
}

fn check_range(name: &str, v: f32, min: f32, max: f32) -> SheetResult<()> {
    if !v.is_finite() || v < min || v > max {
        return Err(SheetError::validation(format!(
            "{name} must be within {min}..={max}, got {v}"
        )));
    }
    Ok(())
}

/// Which image an [`EffectSettings`] applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectTarget {
    /// The single-frame preview and the exported animated GIF.
    Frame,
    /// Every tile of the sprite sheet.
    Tile,
}

/// The two independent effect targets of a document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectSet {
    pub frame: EffectSettings,
    pub tile: EffectSettings,
}

impl EffectSet {
    pub fn get(&self, target: EffectTarget) -> &EffectSettings {
        match target {
            EffectTarget::Frame => &self.frame,
            EffectTarget::Tile => &self.tile,
        }
    }

    pub fn get_mut(&mut self, target: EffectTarget) -> &mut EffectSettings {
        match target {
            EffectTarget::Frame => &mut self.frame,
            EffectTarget::Tile => &mut self.tile,
        }
    }
}

/// Apply the enabled effects in their fixed order:
/// grayscale, sharpen, blur, transparency, colour intensity.
pub fn apply_effects(mut img: RgbaImage, settings: &EffectSettings) -> SheetResult<RgbaImage> {
    if settings.grayscale {
        tone::grayscale(&mut img);
    }
    if settings.sharpen {
        tone::sharpen(&mut img, settings.sharpen_amount)?;
    }
    if settings.blur && settings.blur_radius > 0.0 {
        img = blur::gaussian_blur(&img, settings.blur_radius)?;
    }
    if settings.transparency {
        tone::multiply_alpha(&mut img, settings.transparency_factor);
    }
    if settings.color_intensity {
        tone::color_intensity(&mut img, settings.color_intensity_level);
    }
    Ok(img)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red() -> RgbaImage {
        RgbaImage::from_pixel(8, 8, image::Rgba([255, 0, 0, 255]))
    }

    #[test]
    fn defaults_are_identity() {
        let s = EffectSettings::default();
        assert!(s.is_identity());
        assert_eq!(apply_effects(red(), &s).unwrap(), red());
        s.validate().unwrap();
    }

    #[test]
    fn grayscale_makes_channels_equal() {
        let s = EffectSettings {
            grayscale: true,
            ..EffectSettings::default()
        };
        let out = apply_effects(red(), &s).unwrap();
        assert!(out.pixels().all(|p| p.0[0] == p.0[1] && p.0[1] == p.0[2]));
    }

    #[test]
    fn transparency_runs_after_blur() {
        let s = EffectSettings {
            blur: true,
            blur_radius: 1.0,
            transparency: true,
            transparency_factor: 0.0,
            ..EffectSettings::default()
        };
        let out = apply_effects(red(), &s).unwrap();
        assert!(out.pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn targets_are_independent() {
        let mut set = EffectSet::default();
        set.get_mut(EffectTarget::Tile).grayscale = true;
        assert!(set.get(EffectTarget::Tile).grayscale);
        assert!(!set.get(EffectTarget::Frame).grayscale);
    }

    #[test]
    fn validate_rejects_out_of_range() {
        let s = EffectSettings {
            transparency_factor: 1.5,
            ..EffectSettings::default()
        };
        assert!(s.validate().is_err());
        let s = EffectSettings {
            blur_radius: f32::NAN,
            ..EffectSettings::default()
        };
        assert!(s.validate().is_err());
    }

    #[test]
    fn settings_deserialize_with_defaults() {
        let s: EffectSettings = serde_json::from_str(r#"{"blur": true}"#).unwrap();
        assert!(s.blur);
        assert_eq!(s.blur_radius, 3.5);
        assert_eq!(s.sharpen_amount, 2.5);
    }
}
