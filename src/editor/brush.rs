//! Brush configuration.

use bevy::color::LinearRgba;
use bevy::math::{IVec2, UVec2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::MapImage;

/// Rejected brush configuration values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BrushError {
    #[error("Brush opacity {0} is outside 0 - 1")]
    InvalidOpacity(f32),

    #[error("Brush gamma {0} must be positive")]
    InvalidGamma(f32),

    #[error("Brush height {0} is not finite")]
    InvalidHeight(f32),

    #[error("Brush jitter {0} is outside 0 - 1")]
    InvalidJitter(f32),
}

/// Plain brush parameters as sent by a tool UI or loaded from config.
///
/// Turned into a [`Brush`] with [`Brush::new`], which validates them once
/// so the stamp loop never has to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrushSettings {
    /// Footprint side in map pixels.
    ///
    /// Default: 50
    pub size: u32,

    /// Surface index painted by the texture tool.
    pub index: u8,

    /// Default: 1.0
    pub opacity: f32,

    /// Exponent applied to falloff alpha.
    ///
    /// Default: 1.0
    pub gamma: f32,

    /// Height delta in world units for the height tool.
    ///
    /// Default: 50.0
    pub height: f32,

    /// Random rotation per stamp, as a fraction of half a turn.
    pub jitter: f32,

    /// Tint used by the color tool.
    ///
    /// Default: white
    pub color: LinearRgba,

    /// Rotate the footprint with the camera heading.
    pub align_to_view: bool,

    /// Create missing regions under the footprint while painting.
    pub auto_regions: bool,
}

impl Default for BrushSettings {
    fn default() -> Self {
        Self {
            size: 50,
            index: 0,
            opacity: 1.0,
            gamma: 1.0,
            height: 50.0,
            jitter: 0.0,
            color: LinearRgba::WHITE,
            align_to_view: false,
            auto_regions: false,
        }
    }
}

impl BrushSettings {
    pub fn with_size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    pub fn with_index(mut self, index: u8) -> Self {
        self.index = index;
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_gamma(mut self, gamma: f32) -> Self {
        self.gamma = gamma;
        self
    }

    pub fn with_height(mut self, height: f32) -> Self {
        self.height = height;
        self
    }

    pub fn with_jitter(mut self, jitter: f32) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_color(mut self, color: LinearRgba) -> Self {
        self.color = color;
        self
    }

    pub fn with_align_to_view(mut self, align: bool) -> Self {
        self.align_to_view = align;
        self
    }

    pub fn with_auto_regions(mut self, enabled: bool) -> Self {
        self.auto_regions = enabled;
        self
    }
}

/// Validated, immutable brush used for the duration of a stroke.
///
/// The falloff image's red channel is the stamp alpha. An empty falloff or a
/// zero size is allowed and simply paints nothing.
#[derive(Clone, Debug, PartialEq)]
pub struct Brush {
    settings: BrushSettings,
    falloff: MapImage,
}

impl Brush {
    pub fn new(settings: BrushSettings, falloff: MapImage) -> Result<Self, BrushError> {
        if !(0.0..=1.0).contains(&settings.opacity) {
            return Err(BrushError::InvalidOpacity(settings.opacity));
        }
        if !(settings.gamma.is_finite() && settings.gamma > 0.0) {
            return Err(BrushError::InvalidGamma(settings.gamma));
        }
        if !settings.height.is_finite() {
            return Err(BrushError::InvalidHeight(settings.height));
        }
        if !(0.0..=1.0).contains(&settings.jitter) {
            return Err(BrushError::InvalidJitter(settings.jitter));
        }
        Ok(Self { settings, falloff })
    }

    pub fn settings(&self) -> &BrushSettings {
        &self.settings
    }

    #[inline]
    pub fn size(&self) -> u32 {
        self.settings.size
    }

    #[inline]
    pub fn index(&self) -> u8 {
        self.settings.index
    }

    #[inline]
    pub fn opacity(&self) -> f32 {
        self.settings.opacity
    }

    #[inline]
    pub fn gamma(&self) -> f32 {
        self.settings.gamma
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.settings.height
    }

    #[inline]
    pub fn jitter(&self) -> f32 {
        self.settings.jitter
    }

    #[inline]
    pub fn color(&self) -> LinearRgba {
        self.settings.color
    }

    pub fn is_aligned_to_view(&self) -> bool {
        self.settings.align_to_view
    }

    pub fn auto_regions_enabled(&self) -> bool {
        self.settings.auto_regions
    }

    pub fn falloff(&self) -> &MapImage {
        &self.falloff
    }

    pub fn falloff_size(&self) -> UVec2 {
        self.falloff.size()
    }

    /// Raw falloff alpha at a falloff pixel, `None` outside the image.
    #[inline]
    pub fn alpha(&self, pixel: IVec2) -> Option<f32> {
        self.falloff.get_pixelv(pixel).map(|c| c.red)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation() {
        let falloff = MapImage::new(4, 4);
        let check = |settings: BrushSettings| Brush::new(settings, falloff.clone()).err();

        assert_eq!(check(BrushSettings::default()), None);
        assert_eq!(
            check(BrushSettings::default().with_opacity(1.5)),
            Some(BrushError::InvalidOpacity(1.5))
        );
        assert_eq!(
            check(BrushSettings::default().with_gamma(0.0)),
            Some(BrushError::InvalidGamma(0.0))
        );
        assert!(matches!(
            check(BrushSettings::default().with_height(f32::NAN)),
            Some(BrushError::InvalidHeight(_))
        ));
        assert_eq!(
            check(BrushSettings::default().with_jitter(-0.1)),
            Some(BrushError::InvalidJitter(-0.1))
        );
    }

    #[test]
    fn test_alpha_reads_red() {
        let mut falloff = MapImage::filled(2, 2, LinearRgba::new(0.0, 1.0, 1.0, 1.0));
        falloff.set_pixel(1, 0, LinearRgba::new(0.25, 0.0, 0.0, 1.0));
        let brush = Brush::new(BrushSettings::default(), falloff).unwrap();
        assert_eq!(brush.alpha(IVec2::new(1, 0)), Some(0.25));
        assert_eq!(brush.alpha(IVec2::new(0, 0)), Some(0.0));
        assert_eq!(brush.alpha(IVec2::new(2, 0)), None);
    }

    #[test]
    fn test_settings_from_json() {
        let settings: BrushSettings =
            serde_json::from_str(r#"{ "size": 12, "index": 3, "auto_regions": true }"#).unwrap();
        assert_eq!(settings.size, 12);
        assert_eq!(settings.index, 3);
        assert!(settings.auto_regions);
        assert_eq!(settings.opacity, 1.0);
        assert_eq!(settings.color, LinearRgba::WHITE);
    }
}
