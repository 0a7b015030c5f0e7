//! Region-addressed terrain map storage.
//!
//! A terrain is a set of square regions on a bounded grid. Each region owns
//! a height, a control and a color map of identical size. The
//! [`RegionMap`] turns world positions into region indices, the
//! [`LayeredMapStore`] holds the pixel buffers, and [`GeneratedTexture`]
//! caches the GPU textures built from them.

pub(crate) mod backend;
mod error;
mod generated;
mod layers;
mod map_image;
mod region;
mod snapshot;
mod terrain;

pub use backend::{ImageArrayBackend, TextureArrayBackend};
pub use error::StorageError;
pub use generated::GeneratedTexture;
pub use layers::LayeredMapStore;
pub use map_image::{MapImage, MapType};
pub use region::{
    MAX_REGIONS, REGION_BLEND_MAP_SIZE, REGION_MAP_SIZE, RegionMap, RegionSize, is_offset_in_range,
    offset_from,
};
pub use snapshot::TerrainSnapshot;
pub use terrain::{TERRAIN_MAX_HEIGHT, TerrainStorage};
