//! Shader parameters pushed to the renderer on every sync.

use bevy::color::LinearRgba;
use bevy::math::{IVec2, Vec3, Vec4};

use super::settings::TerrainSettingsGpu;

/// Every value the terrain shader reads, as last published by
/// [`TerrainStorage::sync`](crate::storage::TerrainStorage::sync).
///
/// Texture handles are `None` until their generated texture has been built.
#[derive(Clone, Debug)]
pub struct ShaderParams<H> {
    pub shader_code: String,
    pub terrain_height: f32,
    pub region_size: f32,
    pub region_pixel_size: f32,
    pub region_map_size: i32,
    pub region_offsets: Vec<IVec2>,
    pub height_maps: Option<H>,
    pub control_maps: Option<H>,
    pub color_maps: Option<H>,
    pub region_map: Option<H>,
    pub region_blend_map: Option<H>,
    pub texture_array_albedo: Option<H>,
    pub texture_array_normal: Option<H>,
    pub texture_uv_scale_array: Vec<Vec3>,
    pub texture_color_array: Vec<LinearRgba>,
    /// `region_offsets` in the uniform layout, two offsets per `vec4`.
    pub region_offsets_packed: Vec<Vec4>,
    /// `texture_uv_scale_array` and `texture_color_array` in the uniform
    /// layout, padded to [`MAX_SURFACES`](crate::surface::MAX_SURFACES).
    pub texture_uv_scale_packed: Vec<Vec4>,
    pub texture_color_packed: Vec<Vec4>,
    pub settings: TerrainSettingsGpu,
}

impl<H> Default for ShaderParams<H> {
    fn default() -> Self {
        Self {
            shader_code: String::new(),
            terrain_height: 0.0,
            region_size: 0.0,
            region_pixel_size: 0.0,
            region_map_size: 0,
            region_offsets: Vec::new(),
            height_maps: None,
            control_maps: None,
            color_maps: None,
            region_map: None,
            region_blend_map: None,
            texture_array_albedo: None,
            texture_array_normal: None,
            texture_uv_scale_array: Vec::new(),
            texture_color_array: Vec::new(),
            region_offsets_packed: Vec::new(),
            texture_uv_scale_packed: Vec::new(),
            texture_color_packed: Vec::new(),
            settings: TerrainSettingsGpu::default(),
        }
    }
}

/// Material state that must be recomputed on the next sync.
///
/// Setters only mark bits; the sync pass recomputes in a fixed order:
/// surfaces, then shader code, then parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MaterialStale(u32);

impl MaterialStale {
    pub const NONE: Self = Self(0);
    /// Surface texture arrays must be regenerated.
    pub const SURFACES: Self = Self(1 << 0);
    /// Shader code must be regenerated or the override reapplied.
    pub const SHADER: Self = Self(1 << 1);
    pub const ALL: Self = Self(Self::SURFACES.0 | Self::SHADER.0);

    #[inline]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    #[inline]
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl Default for MaterialStale {
    fn default() -> Self {
        Self::ALL
    }
}
