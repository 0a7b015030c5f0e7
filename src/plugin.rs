//! Plugin for terrain editing.
use bevy::prelude::*;

use crate::editor::{TerrainEditor, TerrainStroke, apply_terrain_strokes};
use crate::material::{TerrainSystems, sync_terrain_storage};

/// Plugin that adds terrain editing and GPU sync to Bevy.
///
/// This plugin registers:
/// - the [`TerrainStroke`] message
/// - the [`TerrainEditor`] resource
/// - stroke application followed by [`TerrainStorage`](crate::storage::TerrainStorage)
///   sync in [`TerrainSystems`], in `Update`
///
/// # Example
/// ```ignore
/// use bevy::prelude::*;
/// use bevy_terrain_editor::prelude::*;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(TerrainEditPlugin)
///     .run();
/// ```
pub struct TerrainEditPlugin;

impl Plugin for TerrainEditPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<TerrainStroke>()
            .init_resource::<TerrainEditor>()
            .add_systems(
                Update,
                (apply_terrain_strokes, sync_terrain_storage)
                    .chain()
                    .in_set(TerrainSystems),
            );
    }
}
