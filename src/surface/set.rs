//! Ordered surface list and its generated albedo/normal texture arrays.

use bevy::color::LinearRgba;
use bevy::math::{UVec2, Vec3};
use bevy::prelude::*;

use super::properties::TerrainSurface;
use super::validation::{self, SurfaceError};
use crate::storage::{GeneratedTexture, MapImage, TextureArrayBackend};

/// Fill for missing albedo textures: black, roughness 1 in alpha.
pub const DEFAULT_ALBEDO: LinearRgba = LinearRgba::new(0.0, 0.0, 0.0, 1.0);

/// Fill for missing normal textures: a flat tangent space normal.
pub const DEFAULT_NORMAL: LinearRgba = LinearRgba::new(0.5, 0.5, 1.0, 1.0);

/// The terrain's surfaces, in control index order.
#[derive(Debug)]
pub struct SurfaceSet<H> {
    surfaces: Vec<TerrainSurface>,
    generated_albedo: GeneratedTexture<H>,
    generated_normal: GeneratedTexture<H>,
    enabled: bool,
}

impl<H> Default for SurfaceSet<H> {
    fn default() -> Self {
        Self {
            surfaces: Vec::new(),
            generated_albedo: GeneratedTexture::default(),
            generated_normal: GeneratedTexture::default(),
            enabled: false,
        }
    }
}

impl<H> SurfaceSet<H> {
    #[inline]
    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TerrainSurface> {
        self.surfaces.get(index)
    }

    /// Mutable access. Value changes are picked up by the next sync; call
    /// [`invalidate_textures`](Self::invalidate_textures) after changing
    /// textures.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut TerrainSurface> {
        self.surfaces.get_mut(index)
    }

    pub fn surfaces(&self) -> &[TerrainSurface] {
        &self.surfaces
    }

    /// Replaces, removes (`None`) or appends (index past the end) a surface.
    pub fn set(&mut self, surface: Option<TerrainSurface>, index: usize) {
        match surface {
            Some(surface) if index < self.surfaces.len() => self.surfaces[index] = surface,
            Some(surface) => self.surfaces.push(surface),
            None if index < self.surfaces.len() => {
                self.surfaces.remove(index);
            }
            None => {}
        }
        self.invalidate_textures();
    }

    pub fn set_all(&mut self, surfaces: Vec<TerrainSurface>) {
        self.surfaces = surfaces;
        self.invalidate_textures();
    }

    pub fn invalidate_textures(&mut self) {
        self.generated_albedo.invalidate();
        self.generated_normal.invalidate();
    }

    /// Whether the albedo array exists, i.e. the shader can splat textures.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn albedo_handle(&self) -> Option<&H> {
        self.generated_albedo.handle()
    }

    pub fn normal_handle(&self) -> Option<&H> {
        self.generated_normal.handle()
    }

    pub fn uv_scales(&self) -> Vec<Vec3> {
        self.surfaces.iter().map(|s| s.uv_scale).collect()
    }

    pub fn colors(&self) -> Vec<LinearRgba> {
        self.surfaces.iter().map(|s| s.albedo).collect()
    }

    /// Regenerates dirty texture arrays, substituting flat images for
    /// missing textures so every array is fully populated.
    ///
    /// Returns whether [`is_enabled`](Self::is_enabled) changed.
    pub fn rebuild<B>(&mut self, backend: &mut B) -> Result<bool, SurfaceError>
    where
        B: TextureArrayBackend<Handle = H>,
    {
        info!("Regenerating terrain textures");
        let was_enabled = self.enabled;
        self.enabled = false;

        let sizes = match validation::array_sizes(&self.surfaces) {
            Ok(sizes) => sizes,
            Err(err) => {
                error!("{}", err);
                self.generated_albedo.release(backend);
                self.generated_normal.release(backend);
                return Err(err);
            }
        };

        if self.generated_albedo.is_dirty() {
            if sizes.albedo == UVec2::ZERO {
                self.generated_albedo.release(backend);
            } else {
                info!("Regenerating terrain albedo arrays");
                let layers =
                    self.layers(sizes.albedo, DEFAULT_ALBEDO, |s| s.albedo_texture.as_ref());
                self.generated_albedo.ensure_layered(backend, &layers);
            }
        }
        if self.generated_normal.is_dirty() {
            if sizes.normal == UVec2::ZERO {
                self.generated_normal.release(backend);
            } else {
                info!("Regenerating terrain normal arrays");
                let layers =
                    self.layers(sizes.normal, DEFAULT_NORMAL, |s| s.normal_texture.as_ref());
                self.generated_normal.ensure_layered(backend, &layers);
            }
        }

        self.enabled = self.generated_albedo.handle().is_some();
        Ok(was_enabled != self.enabled)
    }

    pub fn release<B>(&mut self, backend: &mut B)
    where
        B: TextureArrayBackend<Handle = H>,
    {
        self.generated_albedo.release(backend);
        self.generated_normal.release(backend);
        self.enabled = false;
    }

    fn layers<F>(&self, size: UVec2, fill: LinearRgba, texture: F) -> Vec<MapImage>
    where
        F: Fn(&TerrainSurface) -> Option<&MapImage>,
    {
        self.surfaces
            .iter()
            .map(|s| match texture(s).filter(|t| !t.is_empty()) {
                Some(t) => t.clone(),
                None => MapImage::filled(size.x, size.y, fill),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::backend::RecordingBackend;

    fn textured(name: &str) -> TerrainSurface {
        TerrainSurface::new(name).with_albedo_texture(MapImage::new(8, 8))
    }

    #[test]
    fn test_set_semantics() {
        let mut set = SurfaceSet::<u32>::default();
        set.set(Some(TerrainSurface::new("a")), 0);
        set.set(Some(TerrainSurface::new("b")), 5);
        assert_eq!(set.len(), 2);
        set.set(Some(TerrainSurface::new("c")), 0);
        assert_eq!(set.get(0).unwrap().name, "c");
        set.set(None, 0);
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(0).unwrap().name, "b");
        set.set(None, 7);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_rebuild_fills_missing_textures() {
        let mut backend = RecordingBackend::default();
        let mut set = SurfaceSet::default();
        set.set_all(vec![textured("a"), TerrainSurface::new("b"), textured("c")]);

        assert_eq!(set.rebuild(&mut backend), Ok(true));
        assert!(set.is_enabled());
        assert_eq!(backend.created.len(), 2);
        for (_, layers, size) in &backend.created {
            assert_eq!(*layers, 3);
            assert_eq!(*size, UVec2::splat(8));
        }
    }

    #[test]
    fn test_untextured_set_stays_disabled() {
        let mut backend = RecordingBackend::default();
        let mut set = SurfaceSet::default();
        set.set_all(vec![TerrainSurface::new("a")]);
        assert_eq!(set.rebuild(&mut backend), Ok(false));
        assert!(!set.is_enabled());
        assert!(backend.created.is_empty());
    }

    #[test]
    fn test_mismatch_disables_surfaces() {
        let mut backend = RecordingBackend::default();
        let mut set = SurfaceSet::default();
        set.set_all(vec![textured("a")]);
        set.rebuild(&mut backend).unwrap();

        let big = TerrainSurface::new("b").with_albedo_texture(MapImage::new(16, 16));
        set.set(Some(big), 1);
        assert!(matches!(
            set.rebuild(&mut backend),
            Err(SurfaceError::AlbedoSizeMismatch { index: 1, .. })
        ));
        assert!(!set.is_enabled());
    }

    #[test]
    fn test_values() {
        let mut set = SurfaceSet::<u32>::default();
        set.set_all(vec![
            TerrainSurface::new("a").with_uv_scale(Vec3::ONE),
            TerrainSurface::new("b").with_albedo(LinearRgba::BLUE),
        ]);
        assert_eq!(set.uv_scales(), vec![Vec3::ONE, Vec3::splat(0.1)]);
        assert_eq!(set.colors(), vec![LinearRgba::WHITE, LinearRgba::BLUE]);
    }
}
