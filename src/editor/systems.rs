//! Stroke input for the terrain editor.

use bevy::prelude::*;

use super::TerrainEditor;
use crate::storage::TerrainStorage;

/// One brush input event against a terrain entity.
///
/// Send a non-continuous stroke when the pointer is pressed, then
/// continuous strokes while it is dragged.
#[derive(Message, Clone, Debug)]
pub struct TerrainStroke {
    /// Entity holding the [`TerrainStorage`].
    pub terrain: Entity,
    pub position: Vec3,
    /// Camera heading in radians.
    pub camera_direction: f32,
    pub continuous: bool,
}

/// Applies queued strokes with the shared [`TerrainEditor`].
pub fn apply_terrain_strokes(
    mut strokes: MessageReader<TerrainStroke>,
    mut editor: ResMut<TerrainEditor>,
    mut terrains: Query<&mut TerrainStorage>,
) {
    for stroke in strokes.read() {
        let Ok(mut storage) = terrains.get_mut(stroke.terrain) else {
            warn!("Stroke targets {} which has no terrain storage", stroke.terrain);
            continue;
        };
        if !stroke.continuous {
            editor.reset_stroke();
        }
        editor.operate(
            &mut *storage,
            stroke.position,
            stroke.camera_direction,
            stroke.continuous,
        );
    }
}
