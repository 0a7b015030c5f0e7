//! Per-region map buffers for the height, control and color layers.

use bevy::prelude::*;

use super::{GeneratedTexture, MapImage, MapType, StorageError, TextureArrayBackend};

/// Owns every region's height, control and color buffers, plus the layered
/// texture generated from each list.
///
/// Index `i` in each list belongs to region `i` of the
/// [`RegionMap`](super::RegionMap). Every buffer is `map_size` pixels square
/// and all three lists have the same length.
#[derive(Debug)]
pub struct LayeredMapStore<H> {
    map_size: u32,
    maps: [Vec<MapImage>; 3],
    generated: [GeneratedTexture<H>; 3],
}

impl<H> LayeredMapStore<H> {
    pub fn new(map_size: u32) -> Self {
        Self {
            map_size,
            maps: Default::default(),
            generated: Default::default(),
        }
    }

    #[inline]
    pub fn map_size(&self) -> u32 {
        self.map_size
    }

    /// Only valid while no regions are stored.
    pub(crate) fn set_map_size(&mut self, map_size: u32) {
        self.map_size = map_size;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.maps[MapType::Height.slot()].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All maps of one layer, in region order.
    #[inline]
    pub fn maps(&self, map_type: MapType) -> &[MapImage] {
        &self.maps[map_type.slot()]
    }

    /// Deep copies of all maps of one layer.
    pub fn maps_copy(&self, map_type: MapType) -> Vec<MapImage> {
        self.maps[map_type.slot()].clone()
    }

    /// Replaces a whole layer and invalidates its generated texture.
    ///
    /// The list must hold one map per region, each of the region size.
    pub fn set_maps(
        &mut self,
        map_type: MapType,
        maps: Vec<MapImage>,
    ) -> Result<(), StorageError> {
        let len = self.maps[map_type.slot()].len();
        if maps.len() != len {
            error!(
                "Rejected {} {:?} maps, {} regions stored",
                maps.len(),
                map_type,
                len
            );
            return Err(StorageError::MapCountMismatch {
                map_type,
                expected: len,
                found: maps.len(),
            });
        }
        for (index, map) in maps.iter().enumerate() {
            self.check_size(map_type, index, map)?;
        }
        info!("Setting {:?} maps: {}", map_type, maps.len());
        self.maps[map_type.slot()] = maps;
        self.invalidate(map_type);
        Ok(())
    }

    /// Installs already validated layers, e.g. from a snapshot.
    pub(crate) fn load(&mut self, layers: [Vec<MapImage>; 3]) {
        self.maps = layers;
        self.invalidate_all();
    }

    fn check_size(
        &self,
        map_type: MapType,
        index: usize,
        map: &MapImage,
    ) -> Result<(), StorageError> {
        let expected = UVec2::splat(self.map_size);
        if map.size() != expected {
            error!(
                "Rejected {:?} map {} of size {}, expected {}",
                map_type,
                index,
                map.size(),
                expected
            );
            return Err(StorageError::MapSizeMismatch {
                map_type,
                index,
                expected,
                found: map.size(),
            });
        }
        Ok(())
    }

    pub fn get_map(&self, map_type: MapType, index: usize) -> Option<&MapImage> {
        let maps = &self.maps[map_type.slot()];
        let map = maps.get(index);
        if map.is_none() {
            error!(
                "Requested index is out of bounds. {:?} maps size: {}",
                map_type,
                maps.len()
            );
        }
        map
    }

    /// Mutable access for in-place painting. Callers invalidate afterwards.
    pub fn get_map_mut(&mut self, map_type: MapType, index: usize) -> Option<&mut MapImage> {
        let maps = &mut self.maps[map_type.slot()];
        let len = maps.len();
        let map = maps.get_mut(index);
        if map.is_none() {
            error!(
                "Requested index is out of bounds. {:?} maps size: {}",
                map_type, len
            );
        }
        map
    }

    pub fn set_map(
        &mut self,
        map_type: MapType,
        index: usize,
        map: MapImage,
    ) -> Result<(), StorageError> {
        self.check_size(map_type, index, &map)?;
        let maps = &mut self.maps[map_type.slot()];
        let len = maps.len();
        let Some(slot) = maps.get_mut(index) else {
            error!(
                "Requested index is out of bounds. {:?} maps size: {}",
                map_type, len
            );
            return Err(StorageError::IndexOutOfRange {
                map_type,
                index,
                len,
            });
        };
        *slot = map;
        self.invalidate(map_type);
        Ok(())
    }

    /// Appends default-filled buffers for a new region.
    pub(crate) fn push_region(&mut self) {
        let size = self.map_size;
        for map_type in MapType::ALL {
            let maps = &mut self.maps[map_type.slot()];
            maps.push(MapImage::filled(size, size, map_type.default_color()));
            debug!("{:?} maps size after pushback: {}", map_type, maps.len());
        }
    }

    pub(crate) fn remove_region(&mut self, index: usize) {
        for map_type in MapType::ALL {
            let maps = &mut self.maps[map_type.slot()];
            if index < maps.len() {
                maps.remove(index);
            }
            debug!("{:?} maps size after removal: {}", map_type, maps.len());
        }
    }

    pub fn generated(&self, map_type: MapType) -> &GeneratedTexture<H> {
        &self.generated[map_type.slot()]
    }

    pub fn invalidate(&mut self, map_type: MapType) {
        self.generated[map_type.slot()].invalidate();
    }

    pub fn invalidate_all(&mut self) {
        for generated in &mut self.generated {
            generated.invalidate();
        }
    }

    /// Rebuilds dirty layered textures. Returns `true` if any was rebuilt.
    pub fn ensure_built<B>(&mut self, backend: &mut B) -> bool
    where
        B: TextureArrayBackend<Handle = H>,
    {
        let mut rebuilt = false;
        for map_type in MapType::ALL {
            let slot = map_type.slot();
            if self.generated[slot].is_dirty() {
                info!(
                    "Regenerating {:?} layered texture from {} maps",
                    map_type,
                    self.maps[slot].len()
                );
            }
            rebuilt |= self.generated[slot].ensure_layered(backend, &self.maps[slot]);
        }
        rebuilt
    }

    pub fn release<B>(&mut self, backend: &mut B)
    where
        B: TextureArrayBackend<Handle = H>,
    {
        for generated in &mut self.generated {
            generated.release(backend);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::backend::RecordingBackend;

    fn store_with_regions(count: usize) -> LayeredMapStore<u32> {
        let mut store = LayeredMapStore::new(64);
        for _ in 0..count {
            store.push_region();
        }
        store
    }

    #[test]
    fn test_push_region_defaults() {
        let store = store_with_regions(2);
        for map_type in MapType::ALL {
            assert_eq!(store.maps(map_type).len(), 2);
            let map = store.get_map(map_type, 1).unwrap();
            assert_eq!(map.size(), UVec2::splat(64));
            assert_eq!(map.get_pixel(10, 10), Some(map_type.default_color()));
        }
    }

    #[test]
    fn test_out_of_range_access() {
        let mut store = store_with_regions(1);
        assert!(store.get_map(MapType::Height, 1).is_none());
        assert!(store.get_map_mut(MapType::Color, 5).is_none());
        assert_eq!(
            store.set_map(MapType::Control, 3, MapImage::new(64, 64)),
            Err(StorageError::IndexOutOfRange {
                map_type: MapType::Control,
                index: 3,
                len: 1
            })
        );
    }

    #[test]
    fn test_copy_is_independent() {
        let mut store = store_with_regions(1);
        let mut copies = store.maps_copy(MapType::Height);
        copies[0].fill(bevy::color::LinearRgba::WHITE);
        assert_eq!(
            store.get_map(MapType::Height, 0).unwrap().get_pixel(0, 0),
            Some(MapType::Height.default_color())
        );
        store.set_maps(MapType::Height, copies).unwrap();
        assert_eq!(
            store.get_map(MapType::Height, 0).unwrap().get_pixel(0, 0),
            Some(bevy::color::LinearRgba::WHITE)
        );
    }

    #[test]
    fn test_set_maps_invalidates_layer_only() {
        let mut backend = RecordingBackend::default();
        let mut store = store_with_regions(2);
        assert!(store.ensure_built(&mut backend));
        assert_eq!(backend.created.len(), 3);

        store
            .set_maps(MapType::Control, store.maps_copy(MapType::Control))
            .unwrap();
        assert!(store.generated(MapType::Control).is_dirty());
        assert!(!store.generated(MapType::Height).is_dirty());
        assert!(!store.generated(MapType::Color).is_dirty());

        assert!(store.ensure_built(&mut backend));
        assert!(!store.generated(MapType::Control).is_dirty());
        assert!(!store.ensure_built(&mut backend));
        assert_eq!(backend.created.len(), 4);
    }

    #[test]
    fn test_remove_region_keeps_order() {
        let mut store = store_with_regions(3);
        let marked = MapImage::filled(64, 64, bevy::color::LinearRgba::BLUE);
        store.set_map(MapType::Height, 2, marked.clone()).unwrap();
        store.remove_region(0);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get_map(MapType::Height, 1), Some(&marked));
    }

    #[test]
    fn test_rejects_wrong_sized_maps() {
        let mut store = store_with_regions(2);
        assert_eq!(
            store.set_map(MapType::Height, 1, MapImage::new(32, 32)),
            Err(StorageError::MapSizeMismatch {
                map_type: MapType::Height,
                index: 1,
                expected: UVec2::splat(64),
                found: UVec2::splat(32),
            })
        );

        let mut maps = store.maps_copy(MapType::Color);
        maps[0] = MapImage::new(64, 8);
        assert!(matches!(
            store.set_maps(MapType::Color, maps),
            Err(StorageError::MapSizeMismatch { index: 0, .. })
        ));
        assert_eq!(
            store.set_maps(MapType::Color, vec![MapImage::new(64, 64)]),
            Err(StorageError::MapCountMismatch {
                map_type: MapType::Color,
                expected: 2,
                found: 1,
            })
        );
        assert_eq!(
            store.get_map(MapType::Color, 0).unwrap().size(),
            UVec2::splat(64)
        );
        assert!(store
            .maps(MapType::Height)
            .iter()
            .all(|map| map.size() == UVec2::splat(64)));
    }
}
