//! Textures and the name based texture registry.
//!
//! This module provides [`Texture`], the decoded pixel data of an image that
//! sprites reference, and [`TextureRegistry`], which maps names to shared
//! textures. The registry is owned by the caller and passed to every
//! constructor that resolves a texture by name.
//!
//! GPU copies are created lazily by the backend, keyed by [`TextureId`].

use std::{
    collections::HashMap,
    path::Path,
    sync::{
        Arc, Weak,
        atomic::{AtomicU32, Ordering},
    },
};

use image::{DynamicImage, RgbaImage};

use crate::error::{Error, Result};

static NEXT_TEXTURE_ID: AtomicU32 = AtomicU32::new(1);

/// Process-unique texture identity, stable for the lifetime of the texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(u32);

/// Decoded RGBA8 pixels of a sprite sheet.
///
/// Textures are read-only once created and shared between sprites via `Arc`.
/// Animation frames are laid out horizontally, left to right.
#[derive(Debug)]
pub struct Texture {
    id: TextureId,
    label: String,
    pixels: RgbaImage,
}

impl Texture {
    pub fn from_image(label: &str, img: &DynamicImage) -> Self {
        Self {
            id: TextureId(NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed)),
            label: label.to_string(),
            pixels: img.to_rgba8(),
        }
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

/// What a lookup of an unregistered texture name produces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MissingTexture {
    /// Fail with [`Error::TextureNotFound`]
    #[default]
    Error,
    /// Produce a sprite without texture that draws nothing
    Blank,
}

/// Name to texture lookup shared by sprite constructors.
#[derive(Debug, Default)]
pub struct TextureRegistry {
    textures: HashMap<String, Arc<Texture>>,
    missing: MissingTexture,
}

impl TextureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_missing_texture(mut self, missing: MissingTexture) -> Self {
        self.missing = missing;
        self
    }

    pub fn missing_texture(&self) -> MissingTexture {
        self.missing
    }

    /// Registers an already decoded image, replacing any texture of the same name.
    pub fn insert(&mut self, name: &str, img: &DynamicImage) -> Arc<Texture> {
        let texture = Arc::new(Texture::from_image(name, img));
        log::debug!(
            "registered texture `{}` ({}x{})",
            name,
            texture.width(),
            texture.height()
        );
        self.textures.insert(name.to_string(), texture.clone());
        texture
    }

    /// Decodes an image file and registers it under `name`.
    pub fn load(&mut self, name: &str, path: impl AsRef<Path>) -> Result<Arc<Texture>> {
        let img = image::open(path.as_ref()).map_err(|source| Error::TextureLoad {
            name: name.to_string(),
            source,
        })?;
        Ok(self.insert(name, &img))
    }

    /// Decodes image file contents (PNG, JPEG, etc.) and registers them under `name`.
    pub fn load_from_memory(&mut self, name: &str, bytes: &[u8]) -> Result<Arc<Texture>> {
        let img = image::load_from_memory(bytes).map_err(|source| Error::TextureLoad {
            name: name.to_string(),
            source,
        })?;
        Ok(self.insert(name, &img))
    }

    pub fn get(&self, name: &str) -> Option<Arc<Texture>> {
        self.textures.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.textures.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Looks up `name` and applies the [`MissingTexture`] policy on a miss.
    ///
    /// `Ok(None)` is only returned under [`MissingTexture::Blank`].
    pub fn resolve(&self, name: &str) -> Result<Option<Arc<Texture>>> {
        match (self.get(name), self.missing) {
            (Some(texture), _) => Ok(Some(texture)),
            (None, MissingTexture::Blank) => {
                log::warn!("texture `{name}` is not registered, using a blank sprite");
                Ok(None)
            }
            (None, MissingTexture::Error) => Err(Error::TextureNotFound(name.to_string())),
        }
    }
}

/// Backend resources per texture, kept only while the texture is alive.
///
/// Entries hold a weak reference to their [`Texture`]. Once the last `Arc`
/// is gone, [`evict_dropped`](Self::evict_dropped) releases the resource.
#[derive(Debug)]
pub struct TextureCache<G> {
    entries: HashMap<TextureId, (Weak<Texture>, G)>,
}

impl<G> Default for TextureCache<G> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<G> TextureCache<G> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, texture: &Arc<Texture>, resource: G) {
        self.entries
            .insert(texture.id(), (Arc::downgrade(texture), resource));
    }

    pub fn get(&self, id: TextureId) -> Option<&G> {
        self.entries.get(&id).map(|(_, resource)| resource)
    }

    pub fn contains(&self, id: TextureId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops the resources of textures nobody references anymore and
    /// returns how many were released.
    pub fn evict_dropped(&mut self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, (texture, _)| texture.strong_count() > 0);
        before - self.entries.len()
    }
}
