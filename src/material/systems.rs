//! Systems keeping terrain GPU state current.

use bevy::prelude::*;

use crate::storage::{ImageArrayBackend, TerrainStorage};

/// System set for terrain editing and sync systems.
///
/// Strokes are applied before the sync so a frame's edits are uploaded in
/// the same frame.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct TerrainSystems;

/// Rebuilds stale textures and shader parameters of every terrain.
///
/// Errors are logged; the storage stays usable with whatever could be built.
pub fn sync_terrain_storage(
    mut terrains: Query<(Entity, &mut TerrainStorage)>,
    mut images: ResMut<Assets<Image>>,
) {
    let mut backend = ImageArrayBackend::new(&mut images);
    for (entity, mut storage) in &mut terrains {
        if let Err(err) = storage.sync(&mut backend) {
            error!("Terrain {} sync failed: {}", entity, err);
        }
    }
}
