//! Region addressing: world position to region offset to region index.

use bevy::color::LinearRgba;
use bevy::math::{IVec2, Vec2, Vec3};
use bevy::prelude::*;
use image::imageops::{self, FilterType};
use serde::{Deserialize, Serialize};

use super::{MapImage, StorageError};

/// Side of the region lookup grid, in regions.
pub const REGION_MAP_SIZE: i32 = 16;

/// Side of the resampled region blend map used by the noise path.
pub const REGION_BLEND_MAP_SIZE: u32 = 512;

/// Maximum region count. Indices are encoded as `(index + 1) / 255`.
pub const MAX_REGIONS: usize = 255;

const HALF_REGION_MAP: i32 = REGION_MAP_SIZE / 2;

/// Side length of every region's map buffers, in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegionSize {
    Size64,
    Size128,
    Size256,
    Size512,
    #[default]
    Size1024,
    Size2048,
}

impl RegionSize {
    pub const fn as_u32(self) -> u32 {
        match self {
            RegionSize::Size64 => 64,
            RegionSize::Size128 => 128,
            RegionSize::Size256 => 256,
            RegionSize::Size512 => 512,
            RegionSize::Size1024 => 1024,
            RegionSize::Size2048 => 2048,
        }
    }

    pub fn as_f32(self) -> f32 {
        self.as_u32() as f32
    }

    pub fn from_pixels(pixels: u32) -> Option<Self> {
        match pixels {
            64 => Some(RegionSize::Size64),
            128 => Some(RegionSize::Size128),
            256 => Some(RegionSize::Size256),
            512 => Some(RegionSize::Size512),
            1024 => Some(RegionSize::Size1024),
            2048 => Some(RegionSize::Size2048),
            _ => None,
        }
    }
}

/// Converts a world position to the region offset containing it.
///
/// Only the XZ plane matters. Region `(0, 0)` is centered on the origin.
pub fn offset_from(global_position: Vec3, region_size: RegionSize) -> IVec2 {
    (Vec2::new(global_position.x, global_position.z) / region_size.as_f32() + Vec2::splat(0.5))
        .floor()
        .as_ivec2()
}

/// Whether an offset passes the region grid range test.
#[inline]
pub fn is_offset_in_range(offset: IVec2) -> bool {
    offset.x.abs() <= HALF_REGION_MAP && offset.y.abs() <= HALF_REGION_MAP
}

/// Maps region offsets to dense region indices.
///
/// The lookup image has one pixel per offset. An occupied pixel stores
/// `(index + 1) / 255` in red and `1.0` in green; empty pixels are zero.
/// It is rebuilt every time the offset list changes.
///
/// Indices are compacted on removal, so they are only valid until the next
/// add or remove. Hold on to the offset if you need a stable key.
#[derive(Clone, Debug)]
pub struct RegionMap {
    region_size: RegionSize,
    offsets: Vec<IVec2>,
    lookup: MapImage,
}

impl Default for RegionMap {
    fn default() -> Self {
        Self::new(RegionSize::default())
    }
}

impl RegionMap {
    pub fn new(region_size: RegionSize) -> Self {
        Self {
            region_size,
            offsets: Vec::new(),
            lookup: MapImage::new(REGION_MAP_SIZE as u32, REGION_MAP_SIZE as u32),
        }
    }

    #[inline]
    pub fn region_size(&self) -> RegionSize {
        self.region_size
    }

    pub(crate) fn set_region_size(&mut self, region_size: RegionSize) {
        self.region_size = region_size;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn offsets(&self) -> &[IVec2] {
        &self.offsets
    }

    pub fn offset(&self, index: usize) -> Option<IVec2> {
        self.offsets.get(index).copied()
    }

    pub fn offset_from(&self, global_position: Vec3) -> IVec2 {
        offset_from(global_position, self.region_size)
    }

    /// Region index at a world position, or `None` if there is no region.
    pub fn index_at(&self, global_position: Vec3) -> Option<usize> {
        self.index_of_offset(self.offset_from(global_position))
    }

    pub fn index_of_offset(&self, offset: IVec2) -> Option<usize> {
        if !is_offset_in_range(offset) {
            return None;
        }
        let value = self.lookup.get_pixelv(lookup_pixel(offset))?.red;
        let index = (value * 255.0).round() as i32 - 1;
        (index >= 0).then_some(index as usize)
    }

    /// The lookup image, one pixel per region offset.
    pub fn lookup_image(&self) -> &MapImage {
        &self.lookup
    }

    /// Replaces the offset list wholesale. Every offset is checked like
    /// [`push`](Self::push); on error the map is left unchanged.
    pub(crate) fn set_offsets(&mut self, offsets: &[IVec2]) -> Result<(), StorageError> {
        let mut replacement = Self::new(self.region_size);
        for offset in offsets {
            replacement.push(*offset)?;
        }
        *self = replacement;
        Ok(())
    }

    /// Appends a region at `offset` and returns its index.
    pub(crate) fn push(&mut self, offset: IVec2) -> Result<usize, StorageError> {
        if self.index_of_offset(offset).is_some() {
            return Err(StorageError::RegionExists { offset });
        }
        // The upper edge passes the range test but has no lookup pixel.
        if !is_offset_in_range(offset) || !self.lookup.contains(lookup_pixel(offset)) {
            return Err(StorageError::RegionOutOfBounds { offset });
        }
        if self.offsets.len() >= MAX_REGIONS {
            return Err(StorageError::RegionLimit { max: MAX_REGIONS });
        }
        self.offsets.push(offset);
        self.rebuild_lookup();
        Ok(self.offsets.len() - 1)
    }

    /// Removes the region at `index`, shifting every later index down by one.
    pub(crate) fn remove(&mut self, index: usize) -> IVec2 {
        let offset = self.offsets.remove(index);
        self.rebuild_lookup();
        offset
    }

    /// Single channel occupancy image resampled for smooth noise blending.
    pub fn blend_image(&self) -> MapImage {
        let side = REGION_MAP_SIZE as u32;
        let occupancy = image::ImageBuffer::from_fn(side, side, |x, y| {
            let green = self.lookup.get_pixel(x, y).map_or(0.0, |c| c.green);
            image::Luma([green])
        });
        let resized = imageops::resize(
            &occupancy,
            REGION_BLEND_MAP_SIZE,
            REGION_BLEND_MAP_SIZE,
            FilterType::Lanczos3,
        );
        MapImage::from_fn(REGION_BLEND_MAP_SIZE, REGION_BLEND_MAP_SIZE, |x, y| {
            let value = resized.get_pixel(x, y).0[0];
            LinearRgba::new(value, 0.0, 0.0, 1.0)
        })
    }

    fn rebuild_lookup(&mut self) {
        self.lookup.fill(LinearRgba::NONE);
        for (i, offset) in self.offsets.iter().enumerate() {
            let color = LinearRgba::new((i + 1) as f32 / 255.0, 1.0, 0.0, 1.0);
            if !self.lookup.set_pixelv(lookup_pixel(*offset), color) {
                error!("Region offset {} has no region map pixel", offset);
            }
        }
    }
}

#[inline]
fn lookup_pixel(offset: IVec2) -> IVec2 {
    offset + IVec2::splat(HALF_REGION_MAP)
}
