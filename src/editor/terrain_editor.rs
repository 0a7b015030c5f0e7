//! The stroke engine.

use std::f32::consts::PI;

use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{Brush, Operation, Tool, blend};
use crate::storage::{MapType, RegionSize, TerrainStorage};

/// Editing state shared by all strokes: the active tool, operation and brush.
///
/// Call [`operate`](Self::operate) once per input event. A non-continuous
/// call is a click, continuous calls are drag updates. Regions are added or
/// removed on click; maps are painted while dragging.
#[derive(Resource, Debug)]
pub struct TerrainEditor {
    tool: Tool,
    operation: Operation,
    brush: Option<Brush>,
    operation_position: Option<Vec3>,
    operation_interval: f32,
    rng: StdRng,
}

impl Default for TerrainEditor {
    fn default() -> Self {
        Self {
            tool: Tool::default(),
            operation: Operation::default(),
            brush: None,
            operation_position: None,
            operation_interval: 0.0,
            rng: StdRng::from_entropy(),
        }
    }
}

impl TerrainEditor {
    /// Uses a fixed seed for brush jitter, making stamps reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn with_tool(mut self, tool: Tool) -> Self {
        self.tool = tool;
        self
    }

    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operation = operation;
        self
    }

    pub fn with_brush(mut self, brush: Brush) -> Self {
        self.brush = Some(brush);
        self
    }

    #[inline]
    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
    }

    #[inline]
    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn set_operation(&mut self, operation: Operation) {
        self.operation = operation;
    }

    pub fn brush(&self) -> Option<&Brush> {
        self.brush.as_ref()
    }

    /// Replaces the brush. Takes effect from the next stamp.
    pub fn set_brush(&mut self, brush: Brush) {
        self.brush = Some(brush);
    }

    /// Distance between the last two [`operate`](Self::operate) positions
    /// of the current stroke.
    #[inline]
    pub fn operation_interval(&self) -> f32 {
        self.operation_interval
    }

    /// Forgets the previous stroke position.
    pub fn reset_stroke(&mut self) {
        self.operation_position = None;
        self.operation_interval = 0.0;
    }

    /// Applies the active tool at `global_position`.
    ///
    /// `camera_direction` is the camera heading in radians, used when the
    /// brush is aligned to the view.
    pub fn operate<H>(
        &mut self,
        storage: &mut TerrainStorage<H>,
        global_position: Vec3,
        camera_direction: f32,
        continuous: bool,
    ) where
        H: Send + Sync + 'static,
    {
        let previous = self.operation_position.unwrap_or(global_position);
        self.operation_interval = global_position.distance(previous);
        self.operation_position = Some(global_position);

        match (self.tool, continuous) {
            (Tool::Region, false) => self.operate_region(storage, global_position),
            (Tool::Height, true) => {
                self.stamp(storage, MapType::Height, global_position, camera_direction);
            }
            (Tool::Texture, true) => {
                self.stamp(storage, MapType::Control, global_position, camera_direction);
            }
            (Tool::Color, true) => {
                self.stamp(storage, MapType::Color, global_position, camera_direction);
            }
            _ => {}
        }
    }

    fn operate_region<H>(&mut self, storage: &mut TerrainStorage<H>, global_position: Vec3)
    where
        H: Send + Sync + 'static,
    {
        let has_region = storage.has_region(global_position);
        let result = match self.operation {
            Operation::Add if !has_region => storage.add_region(global_position).map(|_| ()),
            Operation::Subtract if has_region => storage.remove_region(global_position),
            _ => Ok(()),
        };
        if let Err(err) = result {
            warn!("Region {:?} at {} rejected: {}", self.operation, global_position, err);
        }
    }

    /// Stamps the brush once onto one map layer, centered on `global_position`.
    ///
    /// Nothing happens unless a region exists under the center. Footprint
    /// cells outside any region are skipped, or get a new region when the
    /// brush has automatic regions enabled. Returns the number of pixels
    /// written.
    pub fn stamp<H>(
        &mut self,
        storage: &mut TerrainStorage<H>,
        map_type: MapType,
        global_position: Vec3,
        camera_direction: f32,
    ) -> usize
    where
        H: Send + Sync + 'static,
    {
        if storage.get_region_index(global_position).is_none() {
            return 0;
        }
        let Some(brush) = self.brush.as_ref() else {
            warn!("No brush set, ignoring {:?} stamp", map_type);
            return 0;
        };

        let region_size = storage.region_size();
        let region_pixels = IVec2::splat(region_size.as_u32() as i32);
        let size = brush.size() as i32;
        let falloff_size = brush.falloff_size().as_vec2();
        let operation = self.operation;

        let mut rotation = self.rng.r#gen::<f32>() * PI * brush.jitter();
        if brush.is_aligned_to_view() {
            rotation += camera_direction;
        }

        let mut written = 0;
        for x in 0..size {
            for y in 0..size {
                let brush_offset = IVec2::new(x, y) - IVec2::splat(size / 2);
                let brush_position = vec3(
                    global_position.x + brush_offset.x as f32,
                    global_position.y,
                    global_position.z + brush_offset.y as f32,
                );

                let region_index = match storage.get_region_index(brush_position) {
                    Some(index) => index,
                    None if brush.auto_regions_enabled() => {
                        match storage.add_region(brush_position) {
                            Ok(index) => index,
                            Err(_) => continue,
                        }
                    }
                    None => continue,
                };

                let map_pixel = (uv_position(brush_position, region_size)
                    * region_size.as_f32())
                .as_ivec2();
                if !is_in_bounds(map_pixel, region_pixels) {
                    continue;
                }

                let brush_uv = Vec2::new(x as f32, y as f32) / size as f32;
                let brush_pixel = (rotate_uv(brush_uv, rotation) * falloff_size).as_ivec2();
                let Some(alpha) = brush.alpha(brush_pixel) else {
                    continue;
                };
                let alpha = alpha.powf(brush.gamma());

                let Some(map) = storage.get_map_mut(map_type, region_index) else {
                    continue;
                };
                let Some(src) = map.get_pixelv(map_pixel) else {
                    continue;
                };
                map.set_pixelv(map_pixel, blend(map_type, operation, src, brush, alpha));
                written += 1;
            }
        }

        if written > 0 {
            storage.force_update_maps(Some(map_type));
        }
        debug!(
            "{:?} {:?} stamp at {} wrote {} pixels",
            map_type, operation, global_position, written
        );
        written
    }
}

/// Position of a world point inside its region, in `[0, 1)` on both axes.
fn uv_position(global_position: Vec3, region_size: RegionSize) -> Vec2 {
    let position = Vec2::new(global_position.x, global_position.z) / region_size.as_f32()
        + Vec2::splat(0.5);
    position - position.floor()
}

/// Rotates a brush UV about the brush center, clamped to the unit square.
fn rotate_uv(uv: Vec2, angle: f32) -> Vec2 {
    let center = Vec2::splat(0.5);
    (Vec2::from_angle(angle).rotate(uv - center) + center).clamp(Vec2::ZERO, Vec2::ONE)
}

#[inline]
fn is_in_bounds(position: IVec2, max: IVec2) -> bool {
    position.cmpge(IVec2::ZERO).all() && position.cmplt(max).all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::BrushSettings;
    use crate::storage::{MapImage, StorageError, TERRAIN_MAX_HEIGHT};
    use crate::storage::backend::RecordingBackend;

    fn storage() -> TerrainStorage<u32> {
        let mut storage = TerrainStorage::new(RegionSize::Size64);
        storage.add_region(Vec3::ZERO).unwrap();
        storage
    }

    fn brush(settings: BrushSettings, alpha: f32) -> Brush {
        let falloff = MapImage::filled(16, 16, LinearRgba::new(alpha, alpha, alpha, 1.0));
        Brush::new(settings, falloff).unwrap()
    }

    fn editor(tool: Tool, operation: Operation, brush: Brush) -> TerrainEditor {
        TerrainEditor::default()
            .with_seed(7)
            .with_tool(tool)
            .with_operation(operation)
            .with_brush(brush)
    }

    fn height_at(storage: &TerrainStorage<u32>, index: usize, x: u32, y: u32) -> f32 {
        storage
            .get_map(MapType::Height, index)
            .and_then(|map| map.get_pixel(x, y))
            .map(|c| c.red)
            .unwrap()
    }

    #[test]
    fn test_uv_position() {
        let size = RegionSize::Size64;
        assert_eq!(uv_position(Vec3::ZERO, size), Vec2::splat(0.5));
        assert_eq!(uv_position(vec3(-32.0, 0.0, 32.0), size), Vec2::ZERO);
        assert_eq!(uv_position(vec3(16.0, 5.0, -16.0), size), vec2(0.75, 0.25));
    }

    #[test]
    fn test_rotate_uv() {
        let rotated = rotate_uv(vec2(0.75, 0.5), PI / 2.0);
        assert!((rotated - vec2(0.5, 0.75)).length() < 1e-6);
        assert_eq!(rotate_uv(vec2(0.5, 0.5), 1.3), Vec2::splat(0.5));
        assert_eq!(rotate_uv(vec2(0.0, 0.0), PI / 4.0).y, 0.0);
    }

    #[test]
    fn test_height_replace_sets_exact_value() {
        let mut storage = storage();
        let settings = BrushSettings::default()
            .with_size(8)
            .with_height(TERRAIN_MAX_HEIGHT)
            .with_opacity(0.3);
        let mut editor = editor(Tool::Height, Operation::Replace, brush(settings, 1.0));

        editor.operate(&mut storage, vec3(0.0, 0.0, 0.0), 0.0, true);
        // Footprint covers world -4..4, i.e. pixels 28..36 of the origin region.
        assert_eq!(height_at(&storage, 0, 28, 28), 1.0);
        assert_eq!(height_at(&storage, 0, 35, 35), 1.0);
        assert_eq!(height_at(&storage, 0, 36, 32), 0.5);
        assert_eq!(height_at(&storage, 0, 27, 32), 0.5);
    }

    #[test]
    fn test_height_add_with_zero_alpha_is_noop() {
        let mut storage = storage();
        let before = storage.get_maps_copy(MapType::Height);
        let mut editor = editor(
            Tool::Height,
            Operation::Add,
            brush(BrushSettings::default().with_size(8), 0.0),
        );
        assert_eq!(editor.stamp(&mut storage, MapType::Height, Vec3::ZERO, 0.0), 64);
        assert_eq!(storage.get_maps(MapType::Height), before.as_slice());
    }

    #[test]
    fn test_height_add_scales_by_max_height() {
        let mut storage = storage();
        let settings = BrushSettings::default()
            .with_size(2)
            .with_height(TERRAIN_MAX_HEIGHT * 0.25);
        let mut editor = editor(Tool::Height, Operation::Add, brush(settings, 1.0));
        editor.operate(&mut storage, Vec3::ZERO, 0.0, true);
        assert_eq!(height_at(&storage, 0, 32, 32), 0.75);
    }

    #[test]
    fn test_texture_add_base_index_erases_overlay() {
        let mut storage = storage();
        storage
            .get_map_mut(MapType::Control, 0)
            .unwrap()
            .fill(LinearRgba::new(3.0 / 255.0, 6.0 / 255.0, 0.6, 1.0));
        let settings = BrushSettings::default().with_size(4).with_index(3);
        let mut editor = editor(Tool::Texture, Operation::Add, brush(settings, 1.0));

        editor.operate(&mut storage, Vec3::ZERO, 0.0, true);
        let map = storage.get_map(MapType::Control, 0).unwrap();
        assert_eq!(map.get_pixel(32, 32).unwrap().blue, 0.0);
        assert_eq!(map.get_pixel(0, 0).unwrap().blue, 0.6);
    }

    #[test]
    fn test_color_replace() {
        let mut storage = storage();
        let settings = BrushSettings::default()
            .with_size(4)
            .with_color(LinearRgba::BLUE);
        let mut editor = editor(Tool::Color, Operation::Replace, brush(settings, 1.0));
        editor.operate(&mut storage, Vec3::ZERO, 0.0, true);
        let map = storage.get_map(MapType::Color, 0).unwrap();
        assert_eq!(map.get_pixel(31, 31), Some(LinearRgba::BLUE));
        assert_eq!(map.get_pixel(40, 40), Some(LinearRgba::WHITE));
    }

    #[test]
    fn test_tools_respect_continuous_flag() {
        let mut storage = storage();
        let settings = BrushSettings::default().with_size(4).with_height(TERRAIN_MAX_HEIGHT);
        let mut editor = editor(Tool::Height, Operation::Replace, brush(settings, 1.0));

        editor.operate(&mut storage, Vec3::ZERO, 0.0, false);
        assert_eq!(height_at(&storage, 0, 32, 32), 0.5);

        editor.set_tool(Tool::Region);
        editor.set_operation(Operation::Add);
        editor.operate(&mut storage, vec3(64.0, 0.0, 0.0), 0.0, true);
        assert_eq!(storage.region_count(), 1);
        editor.operate(&mut storage, vec3(64.0, 0.0, 0.0), 0.0, false);
        assert_eq!(storage.region_count(), 2);
    }

    #[test]
    fn test_region_tool() {
        let mut storage = storage();
        let mut editor = TerrainEditor::default().with_tool(Tool::Region);

        editor.operate(&mut storage, vec3(64.0, 0.0, 0.0), 0.0, false);
        editor.operate(&mut storage, vec3(64.0, 0.0, 64.0), 0.0, false);
        // Existing region: nothing to add.
        editor.operate(&mut storage, vec3(70.0, 0.0, 0.0), 0.0, false);
        assert_eq!(storage.region_count(), 3);

        editor.set_operation(Operation::Subtract);
        editor.operate(&mut storage, vec3(64.0, 0.0, 0.0), 0.0, false);
        assert_eq!(storage.region_offsets(), &[IVec2::ZERO, IVec2::new(1, 1)]);

        editor.operate(&mut storage, vec3(64.0, 0.0, 64.0), 0.0, false);
        editor.operate(&mut storage, Vec3::ZERO, 0.0, false);
        assert_eq!(storage.region_count(), 1);
        assert_eq!(storage.remove_region(Vec3::ZERO), Err(StorageError::LastRegion));
    }

    #[test]
    fn test_out_of_range_stamp_writes_nothing() {
        let mut storage = storage();
        let before = storage.snapshot();
        for auto_regions in [false, true] {
            let settings = BrushSettings::default()
                .with_size(16)
                .with_auto_regions(auto_regions);
            let mut editor = editor(Tool::Height, Operation::Add, brush(settings, 1.0));
            let far = vec3(64.0 * 20.0, 0.0, 0.0);
            assert_eq!(editor.stamp(&mut storage, MapType::Height, far, 0.0), 0);
        }
        assert_eq!(storage.snapshot(), before);
    }

    #[test]
    fn test_footprint_outside_regions_is_skipped() {
        let mut storage = storage();
        let settings = BrushSettings::default().with_size(16).with_height(TERRAIN_MAX_HEIGHT);
        let mut editor = editor(Tool::Height, Operation::Replace, brush(settings, 1.0));

        // Cells at world x >= 32 fall in the missing region (1, 0).
        let written = editor.stamp(&mut storage, MapType::Height, vec3(28.0, 0.0, 0.0), 0.0);
        assert_eq!(written, 12 * 16);
        assert_eq!(storage.region_count(), 1);
    }

    #[test]
    fn test_auto_regions_spill_over() {
        let mut storage = storage();
        let settings = BrushSettings::default()
            .with_size(16)
            .with_height(TERRAIN_MAX_HEIGHT)
            .with_auto_regions(true);
        let mut editor = editor(Tool::Height, Operation::Replace, brush(settings, 1.0));

        let written = editor.stamp(&mut storage, MapType::Height, vec3(28.0, 0.0, 0.0), 0.0);
        assert_eq!(written, 16 * 16);
        assert_eq!(storage.region_offsets(), &[IVec2::ZERO, IVec2::new(1, 0)]);
        // World x = 32 is the first column of the new region.
        assert_eq!(height_at(&storage, 1, 0, 32), 1.0);
        assert_eq!(height_at(&storage, 1, 4, 32), 0.5);
        assert_eq!(height_at(&storage, 0, 63, 32), 1.0);
    }

    #[test]
    fn test_stamp_dirties_only_its_layer() {
        let mut backend = RecordingBackend::default();
        let mut storage = storage();
        storage.sync(&mut backend).unwrap();

        let mut editor = editor(
            Tool::Texture,
            Operation::Replace,
            brush(BrushSettings::default().with_size(4).with_index(2), 1.0),
        );
        editor.operate(&mut storage, Vec3::ZERO, 0.0, true);
        assert!(storage.generated_maps(MapType::Control).is_dirty());
        assert!(!storage.generated_maps(MapType::Height).is_dirty());
        assert!(!storage.generated_maps(MapType::Color).is_dirty());

        storage.sync(&mut backend).unwrap();
        assert!(!storage.generated_maps(MapType::Control).is_dirty());
    }

    #[test]
    fn test_jitter_is_reproducible_with_seed() {
        let mut falloff = MapImage::new(16, 16);
        for x in 0..8 {
            for y in 0..16 {
                falloff.set_pixel(x, y, LinearRgba::WHITE);
            }
        }
        let settings = BrushSettings::default()
            .with_size(16)
            .with_height(TERRAIN_MAX_HEIGHT)
            .with_jitter(1.0);
        let paint = |seed| {
            let mut storage = storage();
            let mut editor = TerrainEditor::default()
                .with_seed(seed)
                .with_tool(Tool::Height)
                .with_operation(Operation::Replace)
                .with_brush(Brush::new(settings.clone(), falloff.clone()).unwrap());
            editor.operate(&mut storage, Vec3::ZERO, 0.0, true);
            storage.get_maps_copy(MapType::Height)
        };
        assert_eq!(paint(11), paint(11));
    }

    #[test]
    fn test_align_to_view_rotates_falloff() {
        // Left half of the falloff is opaque.
        let falloff = MapImage::from_fn(16, 16, |x, _| {
            if x < 8 { LinearRgba::WHITE } else { LinearRgba::BLACK }
        });
        let paint = |align_to_view| {
            let settings = BrushSettings::default()
                .with_size(16)
                .with_height(TERRAIN_MAX_HEIGHT)
                .with_align_to_view(align_to_view);
            let mut storage = storage();
            let mut editor = editor(
                Tool::Height,
                Operation::Replace,
                Brush::new(settings, falloff.clone()).unwrap(),
            );
            editor.operate(&mut storage, Vec3::ZERO, PI, true);
            // Footprint columns 24..40; skip the center column and the edges.
            (height_at(&storage, 0, 25, 34), height_at(&storage, 0, 38, 34))
        };

        assert_eq!(paint(false), (1.0, 0.5));
        assert_eq!(paint(true), (0.5, 1.0));
    }

    #[test]
    fn test_gamma_shapes_alpha() {
        let paint = |gamma| {
            let settings = BrushSettings::default()
                .with_size(4)
                .with_height(TERRAIN_MAX_HEIGHT)
                .with_gamma(gamma);
            let mut storage = storage();
            let mut editor = editor(Tool::Height, Operation::Replace, brush(settings, 0.5));
            editor.operate(&mut storage, Vec3::ZERO, 0.0, true);
            height_at(&storage, 0, 32, 32)
        };

        // Replace lerps from 0.5 toward 1.0 by alpha.
        assert!((paint(1.0) - 0.75).abs() < 1e-6);
        assert!((paint(2.0) - 0.625).abs() < 1e-6);
    }

    #[test]
    fn test_auto_regions_stop_at_grid_edge() {
        let mut storage = storage();
        storage.add_region(vec3(7.0 * 64.0, 0.0, 0.0)).unwrap();
        let settings = BrushSettings::default()
            .with_size(16)
            .with_height(TERRAIN_MAX_HEIGHT)
            .with_auto_regions(true);
        let mut editor = editor(Tool::Height, Operation::Replace, brush(settings, 1.0));

        // Footprint spans world x 468..484; offset 8 starts at x = 480.
        let center = vec3(7.0 * 64.0 + 28.0, 0.0, 0.0);
        let written = editor.stamp(&mut storage, MapType::Height, center, 0.0);
        assert_eq!(written, 12 * 16);
        assert_eq!(storage.region_offsets(), &[IVec2::ZERO, IVec2::new(7, 0)]);
        assert!(!storage.has_region(vec3(8.0 * 64.0, 0.0, 0.0)));
        assert_eq!(height_at(&storage, 1, 63, 32), 1.0);
        assert_eq!(height_at(&storage, 1, 51, 32), 0.5);
    }

    #[test]
    fn test_operation_interval() {
        let mut storage = storage();
        let mut editor = TerrainEditor::default().with_tool(Tool::Height);
        editor.operate(&mut storage, vec3(1.0, 0.0, 1.0), 0.0, true);
        assert_eq!(editor.operation_interval(), 0.0);
        editor.operate(&mut storage, vec3(4.0, 0.0, 5.0), 0.0, true);
        assert_eq!(editor.operation_interval(), 5.0);
        editor.reset_stroke();
        editor.operate(&mut storage, vec3(10.0, 0.0, 10.0), 0.0, true);
        assert_eq!(editor.operation_interval(), 0.0);
    }
}
