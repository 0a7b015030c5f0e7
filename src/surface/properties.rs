//! Terrain surface definitions.

use bevy::color::LinearRgba;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::storage::MapImage;

/// Maximum number of surfaces. Matches the shader's per-surface arrays.
pub const MAX_SURFACES: usize = 256;

/// One texture layer of the terrain material.
///
/// Surface `i` is painted wherever a control map pixel references index `i`.
/// Missing textures are replaced with flat defaults when the texture arrays
/// are generated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TerrainSurface {
    /// Display name for debugging and tooling.
    pub name: String,

    /// Albedo texture with roughness in alpha.
    pub albedo_texture: Option<MapImage>,

    /// Normal map texture.
    pub normal_texture: Option<MapImage>,

    /// Texture coordinate scale. Only `x` and `y` are used for projection.
    ///
    /// Default: 0.1
    pub uv_scale: Vec3,

    /// Tint multiplied into the albedo.
    ///
    /// Default: white
    pub albedo: LinearRgba,
}

impl Default for TerrainSurface {
    fn default() -> Self {
        Self {
            name: String::new(),
            albedo_texture: None,
            normal_texture: None,
            uv_scale: Vec3::splat(0.1),
            albedo: LinearRgba::WHITE,
        }
    }
}

impl TerrainSurface {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_albedo_texture(mut self, texture: MapImage) -> Self {
        self.albedo_texture = Some(texture);
        self
    }

    pub fn with_normal_texture(mut self, texture: MapImage) -> Self {
        self.normal_texture = Some(texture);
        self
    }

    pub fn with_uv_scale(mut self, scale: Vec3) -> Self {
        self.uv_scale = scale;
        self
    }

    pub fn with_albedo(mut self, color: LinearRgba) -> Self {
        self.albedo = color;
        self
    }
}
