//! Lazily rebuilt GPU textures derived from map buffers.

use super::{MapImage, TextureArrayBackend};

/// A GPU texture generated from source buffers, with dirty tracking.
///
/// The cache never owns source pixels. Invalidating drops the current
/// handle into a retired list; the handle is freed by the backend on the
/// next build or on [`release`](Self::release). Mutations can therefore
/// invalidate without access to the backend.
#[derive(Debug)]
pub struct GeneratedTexture<H> {
    handle: Option<H>,
    retired: Vec<H>,
    dirty: bool,
}

impl<H> Default for GeneratedTexture<H> {
    fn default() -> Self {
        Self {
            handle: None,
            retired: Vec::new(),
            dirty: true,
        }
    }
}

impl<H> GeneratedTexture<H> {
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Current handle. Always `None` while dirty.
    #[inline]
    pub fn handle(&self) -> Option<&H> {
        self.handle.as_ref()
    }

    pub fn invalidate(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.retired.push(handle);
        }
        self.dirty = true;
    }

    /// Builds a layered texture if dirty. Returns `true` if a build happened.
    ///
    /// An empty source leaves the cache dirty with no handle.
    pub fn ensure_layered<B>(&mut self, backend: &mut B, layers: &[MapImage]) -> bool
    where
        B: TextureArrayBackend<Handle = H>,
    {
        self.free_retired(backend);
        if !self.dirty || layers.is_empty() {
            return false;
        }
        self.handle = Some(backend.create_layered(layers));
        self.dirty = false;
        true
    }

    /// Builds a single 2D texture if dirty. Returns `true` if a build happened.
    pub fn ensure_single<B>(&mut self, backend: &mut B, image: &MapImage) -> bool
    where
        B: TextureArrayBackend<Handle = H>,
    {
        self.free_retired(backend);
        if !self.dirty || image.is_empty() {
            return false;
        }
        self.handle = Some(backend.create(image));
        self.dirty = false;
        true
    }

    /// Frees every handle and leaves the cache dirty.
    pub fn release<B>(&mut self, backend: &mut B)
    where
        B: TextureArrayBackend<Handle = H>,
    {
        self.invalidate();
        self.free_retired(backend);
    }

    fn free_retired<B>(&mut self, backend: &mut B)
    where
        B: TextureArrayBackend<Handle = H>,
    {
        for handle in self.retired.drain(..) {
            backend.free(handle);
        }
    }
}
