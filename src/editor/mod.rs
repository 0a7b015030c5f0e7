//! Brush editing of terrain maps.
//!
//! The [`TerrainEditor`] applies one [`Brush`] stamp per stroke event,
//! reading and writing the height, control or color maps of a
//! [`TerrainStorage`](crate::storage::TerrainStorage).

mod blend;
mod brush;
mod systems;
mod terrain_editor;

use serde::{Deserialize, Serialize};

pub use blend::{blend, blend_color, blend_control, blend_height};
pub use brush::{Brush, BrushError, BrushSettings};
pub use systems::{TerrainStroke, apply_terrain_strokes};
pub use terrain_editor::TerrainEditor;

/// What a stroke edits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tool {
    /// Adds or removes whole regions.
    #[default]
    Region,
    Height,
    /// Paints material indices into the control map.
    Texture,
    Color,
}

/// How a stroke combines the brush with existing data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    #[default]
    Add,
    Subtract,
    Multiply,
    Replace,
}
