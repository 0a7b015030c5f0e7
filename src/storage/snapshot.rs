//! Serializable terrain data.

use bevy::math::{IVec2, UVec2};
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::{MapImage, MapType, RegionSize, StorageError, TerrainStorage};
use crate::material::NoiseSettings;
use crate::surface::TerrainSurface;

/// Everything a terrain persists. GPU state is regenerated on load.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TerrainSnapshot {
    pub region_size: RegionSize,
    pub region_offsets: Vec<IVec2>,
    pub height_maps: Vec<MapImage>,
    pub control_maps: Vec<MapImage>,
    pub color_maps: Vec<MapImage>,
    pub surfaces: Vec<TerrainSurface>,
    pub noise: NoiseSettings,
    pub shader_override: Option<String>,
    pub shader_override_enabled: bool,
}

impl TerrainSnapshot {
    pub fn maps(&self, map_type: MapType) -> &[MapImage] {
        match map_type {
            MapType::Height => &self.height_maps,
            MapType::Control => &self.control_maps,
            MapType::Color => &self.color_maps,
        }
    }

    fn take_maps(&mut self, map_type: MapType) -> Vec<MapImage> {
        match map_type {
            MapType::Height => std::mem::take(&mut self.height_maps),
            MapType::Control => std::mem::take(&mut self.control_maps),
            MapType::Color => std::mem::take(&mut self.color_maps),
        }
    }

    /// Checks that every layer has one map per region, sized to the region size.
    pub fn validate(&self) -> Result<(), StorageError> {
        let expected_size = UVec2::splat(self.region_size.as_u32());
        for map_type in MapType::ALL {
            let maps = self.maps(map_type);
            if maps.len() != self.region_offsets.len() {
                return Err(StorageError::MapCountMismatch {
                    map_type,
                    expected: self.region_offsets.len(),
                    found: maps.len(),
                });
            }
            if let Some((index, map)) = maps
                .iter()
                .enumerate()
                .find(|(_, map)| map.size() != expected_size)
            {
                return Err(StorageError::MapSizeMismatch {
                    map_type,
                    index,
                    expected: expected_size,
                    found: map.size(),
                });
            }
        }
        Ok(())
    }
}

impl<H: Send + Sync + 'static> TerrainStorage<H> {
    /// Deep copy of the persisted state.
    pub fn snapshot(&self) -> TerrainSnapshot {
        TerrainSnapshot {
            region_size: self.region_size(),
            region_offsets: self.region_offsets().to_vec(),
            height_maps: self.get_maps_copy(MapType::Height),
            control_maps: self.get_maps_copy(MapType::Control),
            color_maps: self.get_maps_copy(MapType::Color),
            surfaces: self.surfaces().to_vec(),
            noise: self.noise.clone(),
            shader_override: self.shader_override.clone(),
            shader_override_enabled: self.shader_override_enabled,
        }
    }

    /// Rebuilds a terrain from saved data. Every generated texture starts dirty.
    pub fn from_snapshot(mut snapshot: TerrainSnapshot) -> Result<Self, StorageError> {
        snapshot.validate()?;

        let mut storage = Self::new(snapshot.region_size);
        for offset in &snapshot.region_offsets {
            storage.regions.push(*offset)?;
        }
        storage.maps.load(MapType::ALL.map(|map_type| snapshot.take_maps(map_type)));
        storage.set_surfaces(snapshot.surfaces);
        storage.set_noise(snapshot.noise);
        storage.shader_override = snapshot.shader_override;
        storage.shader_override_enabled = snapshot.shader_override_enabled;

        info!(
            "Loaded terrain with {} regions of size {}",
            storage.region_count(),
            storage.region_size().as_u32()
        );
        Ok(storage)
    }
}
