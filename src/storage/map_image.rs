//! Pixel buffers backing each region's height, control and color layers.

use bevy::color::LinearRgba;
use bevy::math::{IVec2, UVec2};
use serde::{Deserialize, Serialize};

use super::StorageError;

/// The three per-region map layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MapType {
    /// Single channel normalized height in the red channel.
    Height,
    /// Red = base material index, green = overlay index, blue = overlay blend.
    Control,
    /// RGBA tint. Alpha is reserved.
    Color,
}

impl MapType {
    pub const ALL: [MapType; 3] = [MapType::Height, MapType::Control, MapType::Color];

    /// Fill value for freshly created region maps.
    pub fn default_color(self) -> LinearRgba {
        match self {
            // Normalized mid-value is ground level.
            MapType::Height => LinearRgba::new(0.5, 0.0, 0.0, 1.0),
            MapType::Control => LinearRgba::new(0.0, 0.0, 0.0, 1.0),
            MapType::Color => LinearRgba::WHITE,
        }
    }

    #[inline]
    pub(crate) fn slot(self) -> usize {
        match self {
            MapType::Height => 0,
            MapType::Control => 1,
            MapType::Color => 2,
        }
    }
}

/// A 2D grid of linear RGBA float pixels.
///
/// Pixels are stored row-major (X varies fastest) as `[f32; 4]` so the whole
/// buffer can be handed to the GPU as `Rgba32Float` without conversion.
///
/// # Example
///
/// ```
/// use bevy::color::LinearRgba;
/// use bevy_terrain_editor::storage::MapImage;
///
/// let mut map = MapImage::filled(4, 4, LinearRgba::BLACK);
/// map.set_pixel(1, 2, LinearRgba::WHITE);
/// assert_eq!(map.get_pixel(1, 2), Some(LinearRgba::WHITE));
/// assert_eq!(map.get_pixel(9, 9), None);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MapImageData")]
pub struct MapImage {
    width: u32,
    height: u32,
    pixels: Vec<[f32; 4]>,
}

/// Unchecked wire form of [`MapImage`].
#[derive(Deserialize)]
struct MapImageData {
    width: u32,
    height: u32,
    pixels: Vec<[f32; 4]>,
}

impl TryFrom<MapImageData> for MapImage {
    type Error = StorageError;

    fn try_from(data: MapImageData) -> Result<Self, Self::Error> {
        if data.pixels.len() != data.width as usize * data.height as usize {
            return Err(StorageError::PixelCountMismatch {
                width: data.width,
                height: data.height,
                found: data.pixels.len(),
            });
        }
        Ok(Self {
            width: data.width,
            height: data.height,
            pixels: data.pixels,
        })
    }
}

impl MapImage {
    /// Creates a transparent black image.
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, LinearRgba::NONE)
    }

    pub fn filled(width: u32, height: u32, color: LinearRgba) -> Self {
        Self {
            width,
            height,
            pixels: vec![to_array(color); width as usize * height as usize],
        }
    }

    /// Builds an image by evaluating `f` at every pixel.
    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> LinearRgba,
    {
        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.push(to_array(f(x, y)));
            }
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Converts any `image` crate image, e.g. a decoded brush mask.
    pub fn from_dynamic_image(image: &image::DynamicImage) -> Self {
        let rgba = image.to_rgba32f();
        let (width, height) = rgba.dimensions();
        Self {
            width,
            height,
            pixels: rgba.pixels().map(|p| p.0).collect(),
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn size(&self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    #[inline]
    pub fn contains(&self, position: IVec2) -> bool {
        position.x >= 0
            && position.y >= 0
            && (position.x as u32) < self.width
            && (position.y as u32) < self.height
    }

    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<LinearRgba> {
        self.index(x, y).map(|i| from_array(self.pixels[i]))
    }

    #[inline]
    pub fn get_pixelv(&self, position: IVec2) -> Option<LinearRgba> {
        if !self.contains(position) {
            return None;
        }
        self.get_pixel(position.x as u32, position.y as u32)
    }

    /// Writes a pixel. Returns `false` if the position is out of bounds.
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, color: LinearRgba) -> bool {
        match self.index(x, y) {
            Some(i) => {
                self.pixels[i] = to_array(color);
                true
            }
            None => false,
        }
    }

    #[inline]
    pub fn set_pixelv(&mut self, position: IVec2, color: LinearRgba) -> bool {
        self.contains(position) && self.set_pixel(position.x as u32, position.y as u32, color)
    }

    pub fn fill(&mut self, color: LinearRgba) {
        self.pixels.fill(to_array(color));
    }

    /// Raw pixel data, four `f32` per pixel.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = y as usize * self.width as usize + x as usize;
        (i < self.pixels.len()).then_some(i)
    }
}

#[inline]
fn to_array(c: LinearRgba) -> [f32; 4] {
    [c.red, c.green, c.blue, c.alpha]
}

#[inline]
fn from_array(p: [f32; 4]) -> LinearRgba {
    LinearRgba::new(p[0], p[1], p[2], p[3])
}
