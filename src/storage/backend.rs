//! GPU texture backends for generated terrain textures.

use bevy::asset::{Assets, RenderAssetUsages};
use bevy::image::Image;
use bevy::prelude::*;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};

use super::MapImage;

/// Creates and frees GPU textures built from map buffers.
///
/// Generated caches only talk to this trait, so they never touch GPU state
/// directly and can be exercised without a renderer.
pub trait TextureArrayBackend {
    /// Opaque handle to a created texture.
    type Handle: Clone;

    /// Creates a 2D array texture with one layer per image.
    ///
    /// Callers guarantee `layers` is non-empty.
    fn create_layered(&mut self, layers: &[MapImage]) -> Self::Handle;

    /// Creates a plain 2D texture.
    fn create(&mut self, image: &MapImage) -> Self::Handle;

    fn free(&mut self, handle: Self::Handle);
}

/// Backend storing generated textures as `Rgba32Float` images in [`Assets<Image>`].
pub struct ImageArrayBackend<'a> {
    images: &'a mut Assets<Image>,
}

impl<'a> ImageArrayBackend<'a> {
    pub fn new(images: &'a mut Assets<Image>) -> Self {
        Self { images }
    }
}

impl TextureArrayBackend for ImageArrayBackend<'_> {
    type Handle = Handle<Image>;

    fn create_layered(&mut self, layers: &[MapImage]) -> Handle<Image> {
        let size = layers.first().map(MapImage::size).unwrap_or_default();
        let layer_bytes = size.x as usize * size.y as usize * 16;
        let mut data = Vec::with_capacity(layer_bytes * layers.len());

        for (i, layer) in layers.iter().enumerate() {
            if layer.size() == size {
                data.extend_from_slice(layer.as_bytes());
            } else {
                error!(
                    "Texture array layer {} is {}, expected {}. Uploading blank layer",
                    i,
                    layer.size(),
                    size
                );
                data.resize(data.len() + layer_bytes, 0);
            }
        }

        let image = Image::new(
            Extent3d {
                width: size.x,
                height: size.y,
                depth_or_array_layers: layers.len() as u32,
            },
            TextureDimension::D2,
            data,
            TextureFormat::Rgba32Float,
            RenderAssetUsages::default(),
        );
        self.images.add(image)
    }

    fn create(&mut self, image: &MapImage) -> Handle<Image> {
        let image = Image::new(
            Extent3d {
                width: image.width(),
                height: image.height(),
                depth_or_array_layers: 1,
            },
            TextureDimension::D2,
            image.as_bytes().to_vec(),
            TextureFormat::Rgba32Float,
            RenderAssetUsages::default(),
        );
        self.images.add(image)
    }

    fn free(&mut self, handle: Handle<Image>) {
        self.images.remove(&handle);
    }
}

/// Backend test double that records every call.
#[cfg(test)]
#[derive(Default, Debug)]
pub(crate) struct RecordingBackend {
    next: u32,
    /// `(handle, layer count, layer size)` for every created texture.
    pub created: Vec<(u32, usize, UVec2)>,
    pub freed: Vec<u32>,
}

#[cfg(test)]
impl RecordingBackend {
    pub fn live(&self) -> usize {
        self.created.len() - self.freed.len()
    }
}

#[cfg(test)]
impl TextureArrayBackend for RecordingBackend {
    type Handle = u32;

    fn create_layered(&mut self, layers: &[MapImage]) -> u32 {
        self.next += 1;
        let size = layers.first().map(MapImage::size).unwrap_or_default();
        self.created.push((self.next, layers.len(), size));
        self.next
    }

    fn create(&mut self, image: &MapImage) -> u32 {
        self.next += 1;
        self.created.push((self.next, 1, image.size()));
        self.next
    }

    fn free(&mut self, handle: u32) {
        self.freed.push(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::color::LinearRgba;

    #[test]
    fn test_image_backend_layers() {
        let mut images = Assets::<Image>::default();
        let mut backend = ImageArrayBackend::new(&mut images);
        let layers = vec![
            MapImage::filled(4, 4, LinearRgba::WHITE),
            MapImage::filled(4, 4, LinearRgba::BLACK),
            MapImage::filled(2, 2, LinearRgba::BLACK),
        ];
        let handle = backend.create_layered(&layers);

        let image = images.get(&handle).unwrap();
        assert_eq!(image.texture_descriptor.size.depth_or_array_layers, 3);
        assert_eq!(image.texture_descriptor.size.width, 4);
        assert_eq!(image.texture_descriptor.format, TextureFormat::Rgba32Float);
    }

    #[test]
    fn test_image_backend_free() {
        let mut images = Assets::<Image>::default();
        let handle = {
            let mut backend = ImageArrayBackend::new(&mut images);
            let handle = backend.create(&MapImage::new(16, 16));
            backend.free(handle.clone());
            handle
        };
        assert!(images.get(&handle).is_none());
    }
}
