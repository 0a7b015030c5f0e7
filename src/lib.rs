//! # bevy_terrain_editor
//!
//! Region-based heightmap terrain storage for Bevy, with brush editing and
//! a generated terrain material.
//!
//! ## Features
//!
//! - Terrain split into square regions on a 16x16 grid, each with height,
//!   control and color maps
//! - Brush stamping with falloff, gamma, jitter and view alignment
//! - Automatic region creation while painting
//! - Lazily rebuilt texture arrays, uploaded once per frame
//! - Generated WGSL with optional surface splatting and procedural noise
//!
//! ## Quick Start
//!
//! ```ignore
//! use bevy::prelude::*;
//! use bevy_terrain_editor::prelude::*;
//!
//! fn main() {
//!     App::new()
//!         .add_plugins(DefaultPlugins)
//!         .add_plugins(TerrainEditPlugin)
//!         .add_systems(Startup, setup)
//!         .add_systems(Update, paint)
//!         .run();
//! }
//!
//! fn setup(mut commands: Commands, mut editor: ResMut<TerrainEditor>) {
//!     let mut storage: TerrainStorage = TerrainStorage::new(RegionSize::Size256);
//!     storage.add_region(Vec3::ZERO).unwrap();
//!     storage.set_surface(Some(TerrainSurface::new("grass")), 0);
//!     commands.spawn(storage);
//!
//!     let falloff = MapImage::filled(64, 64, LinearRgba::WHITE);
//!     let brush = Brush::new(BrushSettings::default().with_size(32), falloff).unwrap();
//!     editor.set_tool(Tool::Height);
//!     editor.set_brush(brush);
//! }
//!
//! fn paint(terrains: Query<Entity, With<TerrainStorage>>, mut strokes: MessageWriter<TerrainStroke>) {
//!     for terrain in &terrains {
//!         strokes.write(TerrainStroke {
//!             terrain,
//!             position: Vec3::ZERO,
//!             camera_direction: 0.0,
//!             continuous: true,
//!         });
//!     }
//! }
//! ```

pub mod editor;
pub mod material;
mod plugin;
pub mod storage;
pub mod surface;

pub mod prelude {
    pub use crate::editor::{
        Brush, BrushError, BrushSettings, Operation, TerrainEditor, TerrainStroke, Tool,
    };
    pub use crate::material::{NoiseSettings, ShaderParams, TerrainSettingsGpu, TerrainSystems};
    pub use crate::plugin::TerrainEditPlugin;
    pub use crate::storage::{
        ImageArrayBackend, MapImage, MapType, RegionSize, StorageError, TERRAIN_MAX_HEIGHT,
        TerrainSnapshot, TerrainStorage, TextureArrayBackend,
    };
    pub use crate::surface::{SurfaceError, TerrainSurface};
}
