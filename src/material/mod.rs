//! Terrain material state: shader generation, uniforms and the sync system.
//!
//! [`TerrainStorage::sync`](crate::storage::TerrainStorage::sync) fills a
//! [`ShaderParams`] from the storage; the renderer binds those values to the
//! code produced by [`generate_shader_code`].

mod params;
mod settings;
mod shader;
mod systems;

pub use params::{MaterialStale, ShaderParams};
pub use settings::{NoiseSettings, TerrainSettingsGpu};
pub use shader::{
    ShaderFeatures, generate_shader_code, pack_colors, pack_region_offsets, pack_uv_scales,
};
pub use systems::{TerrainSystems, sync_terrain_storage};
