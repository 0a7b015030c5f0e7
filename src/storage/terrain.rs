//! The terrain data component: regions, map layers, surfaces and material state.

use bevy::prelude::*;

use super::{
    GeneratedTexture, LayeredMapStore, MapImage, MapType, RegionMap, RegionSize, StorageError,
    TextureArrayBackend, REGION_MAP_SIZE,
};
use crate::material::{
    MaterialStale, NoiseSettings, ShaderFeatures, ShaderParams, TerrainSettingsGpu,
    generate_shader_code, pack_colors, pack_region_offsets, pack_uv_scales,
};
use crate::surface::{SurfaceSet, TerrainSurface};

/// World-space height of a normalized height value of 1.0 above 0.0.
pub const TERRAIN_MAX_HEIGHT: f32 = 512.0;

/// All editable data of one terrain, plus the GPU resources generated from it.
///
/// Mutations never touch the GPU. They mark generated textures dirty and
/// set [`MaterialStale`] bits; [`sync`](Self::sync) then rebuilds what is
/// stale and republishes [`ShaderParams`].
///
/// `H` is the backend's texture handle type. In an app this is
/// `Handle<Image>`, built through [`ImageArrayBackend`](super::ImageArrayBackend).
#[derive(Component, Debug)]
pub struct TerrainStorage<H: Send + Sync + 'static = Handle<Image>> {
    pub(crate) regions: RegionMap,
    pub(crate) maps: LayeredMapStore<H>,
    generated_region_map: GeneratedTexture<H>,
    generated_region_blend_map: GeneratedTexture<H>,
    pub(crate) surfaces: SurfaceSet<H>,
    pub(crate) noise: NoiseSettings,
    pub(crate) shader_override: Option<String>,
    pub(crate) shader_override_enabled: bool,
    stale: MaterialStale,
    params: ShaderParams<H>,
}

impl<H: Send + Sync + 'static> Default for TerrainStorage<H> {
    fn default() -> Self {
        Self::new(RegionSize::default())
    }
}

impl<H: Send + Sync + 'static> TerrainStorage<H> {
    /// Creates an empty terrain. Add at least one region before painting.
    pub fn new(region_size: RegionSize) -> Self {
        Self {
            regions: RegionMap::new(region_size),
            maps: LayeredMapStore::new(region_size.as_u32()),
            generated_region_map: GeneratedTexture::default(),
            generated_region_blend_map: GeneratedTexture::default(),
            surfaces: SurfaceSet::default(),
            noise: NoiseSettings::default(),
            shader_override: None,
            shader_override_enabled: false,
            stale: MaterialStale::ALL,
            params: ShaderParams::default(),
        }
    }

    // ---- Regions ----

    #[inline]
    pub fn region_size(&self) -> RegionSize {
        self.regions.region_size()
    }

    /// Changes the region size. Only allowed while there are no regions,
    /// since existing map buffers cannot be resized in place.
    pub fn set_region_size(&mut self, region_size: RegionSize) -> Result<(), StorageError> {
        if region_size == self.region_size() {
            return Ok(());
        }
        if !self.regions.is_empty() {
            warn!(
                "Rejected region size change to {} with {} regions present",
                region_size.as_u32(),
                self.regions.len()
            );
            return Err(StorageError::RegionSizeLocked);
        }
        info!("Setting region size: {}", region_size.as_u32());
        self.regions.set_region_size(region_size);
        self.maps.set_map_size(region_size.as_u32());
        Ok(())
    }

    #[inline]
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    pub fn region_offsets(&self) -> &[IVec2] {
        self.regions.offsets()
    }

    /// Reassigns the offsets of the existing regions. Region `i` keeps its
    /// maps and moves to `offsets[i]`.
    ///
    /// The list must hold one unique, in-grid offset per region. On error
    /// nothing changes. Use [`TerrainStorage::from_snapshot`] to load a
    /// terrain with a different region count.
    pub fn set_region_offsets(&mut self, offsets: Vec<IVec2>) -> Result<(), StorageError> {
        if offsets.len() != self.maps.len() {
            warn!(
                "Rejected {} region offsets for {} regions",
                offsets.len(),
                self.maps.len()
            );
            return Err(StorageError::MapCountMismatch {
                map_type: MapType::Height,
                expected: offsets.len(),
                found: self.maps.len(),
            });
        }
        self.regions.set_offsets(&offsets)?;
        info!("Setting region offsets: {}", offsets.len());
        self.invalidate_region_textures();
        Ok(())
    }

    pub fn regions(&self) -> &RegionMap {
        &self.regions
    }

    pub fn has_region(&self, global_position: Vec3) -> bool {
        self.get_region_index(global_position).is_some()
    }

    /// Region index at a world position. Indices shift on removal.
    pub fn get_region_index(&self, global_position: Vec3) -> Option<usize> {
        self.regions.index_at(global_position)
    }

    /// Adds a region with default-filled maps at the offset containing
    /// `global_position`. Returns the new region's index.
    pub fn add_region(&mut self, global_position: Vec3) -> Result<usize, StorageError> {
        let offset = self.regions.offset_from(global_position);
        let index = self.regions.push(offset)?;
        self.maps.push_region();
        info!(
            "Adding region at {}, offset {}, index {}",
            global_position, offset, index
        );
        self.maps.invalidate_all();
        self.invalidate_region_textures();
        Ok(index)
    }

    /// Removes the region containing `global_position`. Every later region
    /// index shifts down by one. The last region cannot be removed.
    pub fn remove_region(&mut self, global_position: Vec3) -> Result<(), StorageError> {
        if self.regions.len() == 1 {
            return Err(StorageError::LastRegion);
        }
        let offset = self.regions.offset_from(global_position);
        let Some(index) = self.regions.index_of_offset(offset) else {
            return Err(StorageError::NoRegion { offset });
        };
        info!(
            "Removing region at {}, offset {}, index {}",
            global_position, offset, index
        );
        self.regions.remove(index);
        self.maps.remove_region(index);
        self.maps.invalidate_all();
        self.invalidate_region_textures();
        Ok(())
    }

    // ---- Maps ----

    pub fn get_map(&self, map_type: MapType, index: usize) -> Option<&MapImage> {
        self.maps.get_map(map_type, index)
    }

    /// Mutable access to one region's map. Call
    /// [`force_update_maps`](Self::force_update_maps) after painting so the
    /// layered texture is rebuilt.
    pub fn get_map_mut(&mut self, map_type: MapType, index: usize) -> Option<&mut MapImage> {
        self.maps.get_map_mut(map_type, index)
    }

    pub fn set_map(
        &mut self,
        map_type: MapType,
        index: usize,
        map: MapImage,
    ) -> Result<(), StorageError> {
        self.maps.set_map(map_type, index, map)
    }

    pub fn get_maps(&self, map_type: MapType) -> &[MapImage] {
        self.maps.maps(map_type)
    }

    pub fn get_maps_copy(&self, map_type: MapType) -> Vec<MapImage> {
        self.maps.maps_copy(map_type)
    }

    /// Replaces all maps of one layer. The list must hold one map of the
    /// region size per region.
    pub fn set_maps(
        &mut self,
        map_type: MapType,
        maps: Vec<MapImage>,
    ) -> Result<(), StorageError> {
        self.maps.set_maps(map_type, maps)
    }

    /// Marks one layer's generated texture dirty, or all three for `None`.
    pub fn force_update_maps(&mut self, map_type: Option<MapType>) {
        match map_type {
            Some(map_type) => self.maps.invalidate(map_type),
            None => self.maps.invalidate_all(),
        }
    }

    /// Generated texture for one map layer.
    pub fn generated_maps(&self, map_type: MapType) -> &GeneratedTexture<H> {
        self.maps.generated(map_type)
    }

    pub fn generated_region_map(&self) -> &GeneratedTexture<H> {
        &self.generated_region_map
    }

    pub fn generated_region_blend_map(&self) -> &GeneratedTexture<H> {
        &self.generated_region_blend_map
    }

    // ---- Noise ----

    pub fn noise(&self) -> &NoiseSettings {
        &self.noise
    }

    /// Replaces all noise settings at once.
    pub fn set_noise(&mut self, noise: NoiseSettings) {
        let enabled = noise.enabled;
        self.noise = NoiseSettings {
            enabled: self.noise.enabled,
            ..noise
        };
        self.set_noise_enabled(enabled);
    }

    pub fn set_noise_enabled(&mut self, enabled: bool) {
        if self.noise.enabled == enabled {
            return;
        }
        self.noise.enabled = enabled;
        if enabled {
            self.invalidate_region_textures();
        }
        self.stale.insert(MaterialStale::SHADER);
    }

    pub fn set_noise_scale(&mut self, scale: f32) {
        self.noise.scale = scale;
    }

    pub fn set_noise_height(&mut self, height: f32) {
        self.noise.height = height;
    }

    pub fn set_noise_blend_near(&mut self, near: f32) {
        self.noise.set_blend_near(near);
    }

    pub fn set_noise_blend_far(&mut self, far: f32) {
        self.noise.set_blend_far(far);
    }

    // ---- Shader ----

    pub fn shader_override(&self) -> Option<&str> {
        self.shader_override.as_deref()
    }

    pub fn is_shader_override_enabled(&self) -> bool {
        self.shader_override_enabled
    }

    pub fn set_shader_override(&mut self, code: Option<String>) {
        self.shader_override = code;
        self.stale.insert(MaterialStale::SHADER);
    }

    /// Toggles the shader override. Enabling without an override seeds it
    /// with the currently generated code as a starting point for editing.
    pub fn enable_shader_override(&mut self, enabled: bool) {
        self.shader_override_enabled = enabled;
        if enabled && self.shader_override.is_none() {
            self.shader_override = Some(generate_shader_code(self.shader_features()));
        }
        self.stale.insert(MaterialStale::SHADER);
    }

    fn shader_features(&self) -> ShaderFeatures {
        ShaderFeatures {
            surfaces: self.surfaces.is_enabled(),
            noise: self.noise.enabled,
        }
    }

    // ---- Surfaces ----

    pub fn surface(&self, index: usize) -> Option<&TerrainSurface> {
        self.surfaces.get(index)
    }

    /// Mutable access to a surface. Follow texture edits with
    /// [`update_surface_textures`](Self::update_surface_textures).
    pub fn surface_mut(&mut self, index: usize) -> Option<&mut TerrainSurface> {
        self.surfaces.get_mut(index)
    }

    pub fn surfaces(&self) -> &[TerrainSurface] {
        self.surfaces.surfaces()
    }

    #[inline]
    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    pub fn surfaces_enabled(&self) -> bool {
        self.surfaces.is_enabled()
    }

    /// Replaces, removes (`None`) or appends (index past the end) a surface.
    pub fn set_surface(&mut self, surface: Option<TerrainSurface>, index: usize) {
        self.surfaces.set(surface, index);
        self.stale.insert(MaterialStale::SURFACES);
    }

    pub fn set_surfaces(&mut self, surfaces: Vec<TerrainSurface>) {
        info!("Setting surfaces: {}", surfaces.len());
        self.surfaces.set_all(surfaces);
        self.stale.insert(MaterialStale::SURFACES);
    }

    pub fn update_surface_textures(&mut self) {
        self.surfaces.invalidate_textures();
        self.stale.insert(MaterialStale::SURFACES);
    }

    /// Republishes per-surface UV scales and tints without touching textures.
    pub fn update_surface_values(&mut self) {
        let params = &mut self.params;
        params.texture_uv_scale_array = self.surfaces.uv_scales();
        params.texture_color_array = self.surfaces.colors();
        params.texture_uv_scale_packed = pack_uv_scales(&params.texture_uv_scale_array);
        params.texture_color_packed = pack_colors(&params.texture_color_array);
        params.settings.surface_count = self.surfaces.len() as u32;
    }

    // ---- Sync ----

    pub fn stale(&self) -> MaterialStale {
        self.stale
    }

    /// Rebuilds stale GPU state and republishes the shader parameters.
    ///
    /// Order: surface arrays, shader code, map and region textures, then
    /// parameters. A surface failure leaves surfaces disabled but the rest
    /// of the sync still runs; the error is returned afterwards.
    pub fn sync<B>(&mut self, backend: &mut B) -> Result<(), StorageError>
    where
        B: TextureArrayBackend<Handle = H>,
        H: Clone,
    {
        let mut result: Result<(), StorageError> = Ok(());

        if self.stale.contains(MaterialStale::SURFACES) {
            self.stale.remove(MaterialStale::SURFACES);
            let was_enabled = self.surfaces.is_enabled();
            if let Err(err) = self.surfaces.rebuild(backend) {
                result = Err(err.into());
            }
            if was_enabled != self.surfaces.is_enabled() {
                self.stale.insert(MaterialStale::SHADER);
            }
        }

        if self.stale.contains(MaterialStale::SHADER) {
            self.stale.remove(MaterialStale::SHADER);
            self.params.shader_code = match (&self.shader_override, self.shader_override_enabled) {
                (Some(code), true) => {
                    info!("Applying terrain shader override");
                    code.clone()
                }
                _ => {
                    info!("Regenerating terrain shader code");
                    generate_shader_code(self.shader_features())
                }
            };
        }

        self.maps.ensure_built(backend);
        self.generated_region_map
            .ensure_single(backend, self.regions.lookup_image());
        if !self.noise.enabled {
            self.generated_region_blend_map.release(backend);
        } else if self.generated_region_blend_map.is_dirty() {
            info!("Regenerating region blend map");
            let blend = self.regions.blend_image();
            self.generated_region_blend_map.ensure_single(backend, &blend);
        }

        self.update_params();
        result
    }

    /// Parameters as published by the last [`sync`](Self::sync).
    pub fn shader_params(&self) -> &ShaderParams<H> {
        &self.params
    }

    pub fn settings_gpu(&self) -> TerrainSettingsGpu {
        self.params.settings
    }

    /// Frees every generated GPU texture. The next sync rebuilds everything.
    pub fn release<B>(&mut self, backend: &mut B)
    where
        B: TextureArrayBackend<Handle = H>,
    {
        info!("Releasing terrain textures");
        self.maps.release(backend);
        self.generated_region_map.release(backend);
        self.generated_region_blend_map.release(backend);
        self.surfaces.release(backend);
        self.params = ShaderParams::default();
        self.stale = MaterialStale::ALL;
    }

    /// Dumps region and cache state to the debug log.
    pub fn log_audit(&self) {
        debug!("Dumping terrain storage state");
        debug!("Region size: {}", self.region_size().as_u32());
        debug!("Region offsets: {:?}", self.regions.offsets());
        for map_type in MapType::ALL {
            let generated = self.maps.generated(map_type);
            debug!(
                "{:?} maps: {}, generated dirty: {}, has handle: {}",
                map_type,
                self.maps.maps(map_type).len(),
                generated.is_dirty(),
                generated.handle().is_some()
            );
        }
        debug!(
            "Region map dirty: {}, blend map dirty: {}",
            self.generated_region_map.is_dirty(),
            self.generated_region_blend_map.is_dirty()
        );
        debug!(
            "Surfaces: {}, enabled: {}, noise: {:?}, shader override: {}",
            self.surfaces.len(),
            self.surfaces.is_enabled(),
            self.noise,
            self.shader_override_enabled
        );
        debug!("Material stale: {:?}", self.stale);
    }

    fn invalidate_region_textures(&mut self) {
        self.generated_region_map.invalidate();
        self.generated_region_blend_map.invalidate();
    }

    fn update_params(&mut self)
    where
        H: Clone,
    {
        let region_size = self.region_size().as_f32();
        let mut flags = self.shader_features().flags();
        if self.shader_override_enabled && self.shader_override.is_some() {
            flags |= TerrainSettingsGpu::FLAG_SHADER_OVERRIDE;
        }

        let params = &mut self.params;
        params.terrain_height = TERRAIN_MAX_HEIGHT;
        params.region_size = region_size;
        params.region_pixel_size = 1.0 / region_size;
        params.region_map_size = REGION_MAP_SIZE;
        params.region_offsets = self.regions.offsets().to_vec();
        params.region_offsets_packed = pack_region_offsets(&params.region_offsets);
        params.height_maps = self.maps.generated(MapType::Height).handle().cloned();
        params.control_maps = self.maps.generated(MapType::Control).handle().cloned();
        params.color_maps = self.maps.generated(MapType::Color).handle().cloned();
        params.region_map = self.generated_region_map.handle().cloned();
        params.region_blend_map = self.generated_region_blend_map.handle().cloned();
        params.texture_array_albedo = self.surfaces.albedo_handle().cloned();
        params.texture_array_normal = self.surfaces.normal_handle().cloned();
        params.settings = TerrainSettingsGpu {
            terrain_height: TERRAIN_MAX_HEIGHT,
            region_size,
            region_pixel_size: 1.0 / region_size,
            region_map_size: REGION_MAP_SIZE as u32,
            noise_scale: self.noise.scale,
            noise_height: self.noise.height,
            noise_blend_near: self.noise.blend_near,
            noise_blend_far: self.noise.blend_far,
            flags,
            ..default()
        };
        self.update_surface_values();
    }
}
