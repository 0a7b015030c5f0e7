//! Material configuration and its GPU uniform block.

use bevy::render::render_resource::ShaderType;
use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Procedural noise blended in where no region exists.
///
/// `blend_near` never exceeds `blend_far`: the setters push the other bound
/// along when they would cross.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoiseSettings {
    pub enabled: bool,
    /// Frequency multiplier applied to world UVs. Typical range 0 - 10.
    pub scale: f32,
    /// Noise amplitude in normalized height units. Typical range 0 - 10.
    pub height: f32,
    /// Region blend weight where noise starts to fade in, 0 - 1.
    pub blend_near: f32,
    /// Region blend weight where noise is fully applied, 0 - 1.
    pub blend_far: f32,
}

impl Default for NoiseSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            scale: 2.0,
            height: 1.0,
            blend_near: 0.5,
            blend_far: 1.0,
        }
    }
}

impl NoiseSettings {
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_height(mut self, height: f32) -> Self {
        self.height = height;
        self
    }

    pub fn with_blend_near(mut self, near: f32) -> Self {
        self.set_blend_near(near);
        self
    }

    pub fn with_blend_far(mut self, far: f32) -> Self {
        self.set_blend_far(far);
        self
    }

    pub fn set_blend_near(&mut self, near: f32) {
        self.blend_near = near;
        if self.blend_near > self.blend_far {
            self.blend_far = near;
        }
    }

    pub fn set_blend_far(&mut self, far: f32) {
        self.blend_far = far;
        if self.blend_far < self.blend_near {
            self.blend_near = far;
        }
    }
}

/// Scalar uniforms of the generated terrain shader.
#[derive(Clone, Copy, Debug, Default, ShaderType, Pod, Zeroable)]
#[repr(C)]
pub struct TerrainSettingsGpu {
    pub terrain_height: f32,
    pub region_size: f32,
    pub region_pixel_size: f32,
    pub region_map_size: u32,
    pub noise_scale: f32,
    pub noise_height: f32,
    pub noise_blend_near: f32,
    pub noise_blend_far: f32,
    pub flags: u32,
    pub surface_count: u32,
    pub _padding0: u32,
    pub _padding1: u32,
}

impl TerrainSettingsGpu {
    pub const FLAG_SURFACES_ENABLED: u32 = 1 << 0;
    pub const FLAG_NOISE_ENABLED: u32 = 1 << 1;
    pub const FLAG_SHADER_OVERRIDE: u32 = 1 << 2;
}
