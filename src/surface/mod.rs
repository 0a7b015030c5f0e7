//! Terrain surfaces: the texture layers referenced by control map indices.
//!
//! A [`SurfaceSet`] owns the ordered surface list and generates the albedo
//! and normal texture arrays the terrain shader splats from.

mod properties;
mod set;
mod validation;

pub use properties::{MAX_SURFACES, TerrainSurface};
pub use set::{DEFAULT_ALBEDO, DEFAULT_NORMAL, SurfaceSet};
pub use validation::{ArraySizes, SurfaceError, array_sizes, validate_surface_count};
