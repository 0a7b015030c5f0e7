//! Storage error types.

use bevy::math::{IVec2, UVec2};
use thiserror::Error;

use super::MapType;
use crate::surface::SurfaceError;

/// Errors reported by [`TerrainStorage`](super::TerrainStorage) operations.
///
/// None of these are fatal. A failed operation leaves the storage unchanged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    #[error("Requested {map_type:?} map index {index} is out of bounds, {len} maps stored")]
    IndexOutOfRange {
        map_type: MapType,
        index: usize,
        len: usize,
    },

    #[error("A region already exists at offset {offset}")]
    RegionExists { offset: IVec2 },

    #[error("Region offset {offset} is outside the region map")]
    RegionOutOfBounds { offset: IVec2 },

    #[error("No region exists at offset {offset}")]
    NoRegion { offset: IVec2 },

    #[error("The last remaining region cannot be removed")]
    LastRegion,

    #[error("Region limit of {max} reached")]
    RegionLimit { max: usize },

    #[error("Expected {expected} {map_type:?} maps, found {found}")]
    MapCountMismatch {
        map_type: MapType,
        expected: usize,
        found: usize,
    },

    #[error("{map_type:?} map {index} is {found}, expected {expected}")]
    MapSizeMismatch {
        map_type: MapType,
        index: usize,
        expected: UVec2,
        found: UVec2,
    },

    #[error("Map of {width}x{height} holds {found} pixels")]
    PixelCountMismatch { width: u32, height: u32, found: usize },

    #[error("Region size cannot change while regions exist")]
    RegionSizeLocked,

    #[error(transparent)]
    Surface(#[from] SurfaceError),
}
