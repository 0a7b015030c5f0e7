//! Surface set validation.

use bevy::math::UVec2;
use thiserror::Error;

use super::properties::{MAX_SURFACES, TerrainSurface};
use crate::storage::MapImage;

/// Errors that stop texture array generation for a surface set.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SurfaceError {
    #[error("Albedo textures do not have the same size: expected {expected}, surface {index} is {found}")]
    AlbedoSizeMismatch {
        index: usize,
        expected: UVec2,
        found: UVec2,
    },

    #[error("Normal map textures do not have the same size: expected {expected}, surface {index} is {found}")]
    NormalSizeMismatch {
        index: usize,
        expected: UVec2,
        found: UVec2,
    },

    #[error("Surface count ({count}) exceeds maximum ({max})")]
    TooManySurfaces { count: usize, max: usize },
}

/// Texture array layer sizes for a surface set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArraySizes {
    pub albedo: UVec2,
    pub normal: UVec2,
}

/// Validates the surface set and computes the texture array sizes.
///
/// The first present texture of each kind sets that array's size. If only
/// one kind is present anywhere, the other adopts its size. A zero size
/// means no array of that kind can be built.
pub fn array_sizes(surfaces: &[TerrainSurface]) -> Result<ArraySizes, SurfaceError> {
    validate_surface_count(surfaces.len())?;

    let mut albedo = UVec2::ZERO;
    let mut normal = UVec2::ZERO;

    for (index, surface) in surfaces.iter().enumerate() {
        if let Some(found) = texture_size(surface.albedo_texture.as_ref()) {
            if albedo == UVec2::ZERO {
                albedo = found;
            } else if found != albedo {
                return Err(SurfaceError::AlbedoSizeMismatch {
                    index,
                    expected: albedo,
                    found,
                });
            }
        }
        if let Some(found) = texture_size(surface.normal_texture.as_ref()) {
            if normal == UVec2::ZERO {
                normal = found;
            } else if found != normal {
                return Err(SurfaceError::NormalSizeMismatch {
                    index,
                    expected: normal,
                    found,
                });
            }
        }
    }

    if normal == UVec2::ZERO {
        normal = albedo;
    } else if albedo == UVec2::ZERO {
        albedo = normal;
    }

    Ok(ArraySizes { albedo, normal })
}

pub fn validate_surface_count(count: usize) -> Result<(), SurfaceError> {
    if count > MAX_SURFACES {
        return Err(SurfaceError::TooManySurfaces {
            count,
            max: MAX_SURFACES,
        });
    }
    Ok(())
}

fn texture_size(texture: Option<&MapImage>) -> Option<UVec2> {
    texture.filter(|t| !t.is_empty()).map(MapImage::size)
}
