//! Environments built from colour-keyed maps.
//!
//! A map is a PNG in which every pixel stands for one block of the level.
//! The caller supplies a palette of [`EnvBlock`]s; each pixel whose colour
//! matches a block becomes a [`Sprite`] of `block_width` x `block_height`
//! pixels, placed on a grid under a single [`Env`] node. Pixels with colours
//! outside the palette are left empty.
//!
//! Colours are compared through [`color_key`], a packed 32-bit value over
//! 16-bit premultiplied channels. Map authoring tools rely on that packing,
//! including its wrap-around, so it must not change.

use std::{
    any::Any,
    collections::HashMap,
    fmt::Debug,
    fs::File,
    io::BufReader,
    path::PathBuf,
};

use image::{DynamicImage, GenericImageView, ImageFormat, Rgba};

use crate::{
    data_structures::{
        scene_graph::{Element, NodeId, SceneGraph, SceneNode},
        sprite::Sprite,
        texture::TextureRegistry,
    },
    error::{Error, Result},
};

/// Called once for every sprite placed for a block, right after it was attached.
pub type EnvBlockLoaded = Box<dyn Fn(NodeId, &mut Sprite, &EnvBlock)>;

/// One palette entry: which colour places which kind of block.
pub struct EnvBlock {
    /// Caller defined block type
    pub kind: i32,
    pub color: Rgba<u8>,
    /// Initial animation frame of the placed sprites
    pub frame_index: u32,
    pub on_loaded: Option<EnvBlockLoaded>,
}

impl EnvBlock {
    pub fn new(kind: i32, color: Rgba<u8>, frame_index: u32) -> Self {
        Self {
            kind,
            color,
            frame_index,
            on_loaded: None,
        }
    }

    pub fn on_loaded(mut self, handler: impl Fn(NodeId, &mut Sprite, &EnvBlock) + 'static) -> Self {
        self.on_loaded = Some(Box::new(handler));
        self
    }

    pub fn key(&self) -> u32 {
        let [r, g, b, a] = self.color.0.map(|c| u16::from(c) * 0x101);
        color_key(premultiply(Rgba([r, g, b, a])))
    }
}

impl Debug for EnvBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvBlock")
            .field("kind", &self.kind)
            .field("color", &self.color)
            .field("frame_index", &self.frame_index)
            .field("on_loaded", &self.on_loaded.is_some())
            .finish()
    }
}

/// Options for [`load_env`] and [`build_env`].
#[derive(Debug, Default)]
pub struct EnvOpts {
    pub blocks: Vec<EnvBlock>,
    /// Registry name of the sheet shared by all placed sprites
    pub texture_name: String,
    pub map_path: PathBuf,
    pub block_width: u32,
    pub block_height: u32,
    pub frames: i32,
}

/// Container of the sprites placed from a map.
///
/// The extent is the block size times the map size and can exceed `u32`.
#[derive(Clone, Debug, Default)]
pub struct Env {
    pub element: Element,
    pub width: u64,
    pub height: u64,
}

impl SceneNode for Env {
    fn element(&self) -> &Element {
        &self.element
    }

    fn element_mut(&mut self) -> &mut Element {
        &mut self.element
    }

    fn extent(&self) -> (f32, f32) {
        (self.width as f32, self.height as f32)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Packs a colour as `(((r << 8) + g) << 8 + b) << 8 + a` in wrapping 32-bit arithmetic.
pub fn color_key(color: Rgba<u16>) -> u32 {
    let [r, g, b, a] = color.0.map(u32::from);
    let key = (r << 8).wrapping_add(g);
    let key = (key << 8).wrapping_add(b);
    (key << 8).wrapping_add(a)
}

/// Scales the colour channels by alpha, as 16-bit premultiplied colour.
pub fn premultiply(color: Rgba<u16>) -> Rgba<u16> {
    let [r, g, b, a] = color.0.map(u32::from);
    let scale = |c: u32| (c * a / 0xffff) as u16;
    Rgba([scale(r), scale(g), scale(b), a as u16])
}

/// Opens and decodes the PNG at `opts.map_path` and builds its environment.
///
/// Nothing is added to `graph` when the file cannot be read or decoded.
pub fn load_env(
    graph: &mut SceneGraph,
    textures: &TextureRegistry,
    opts: &EnvOpts,
) -> Result<NodeId> {
    let path = opts.map_path.as_path();
    let map = {
        let file = File::open(path).map_err(|source| Error::MapIo {
            path: path.to_path_buf(),
            source,
        })?;
        image::load(BufReader::new(file), ImageFormat::Png).map_err(|source| {
            Error::MapDecode {
                path: path.to_path_buf(),
                source,
            }
        })?
    };
    build_env(graph, textures, opts, &map)
}

/// Builds an environment from an already decoded map.
///
/// Pixels are visited row by row from the top-left corner. Every recognized
/// pixel adds one sprite to the returned [`Env`] node.
pub fn build_env(
    graph: &mut SceneGraph,
    textures: &TextureRegistry,
    opts: &EnvOpts,
    map: &DynamicImage,
) -> Result<NodeId> {
    let texture = textures.resolve(&opts.texture_name)?;

    // later entries win
    let mut palette: HashMap<u32, &EnvBlock> = HashMap::with_capacity(opts.blocks.len());
    for block in &opts.blocks {
        palette.insert(block.key(), block);
    }

    let (width, height) = map.dimensions();
    let (block_width, block_height) = (u64::from(opts.block_width), u64::from(opts.block_height));
    let env = graph.insert(Env {
        element: Element::default(),
        width: block_width * u64::from(width),
        height: block_height * u64::from(height),
    });

    let pixels = map.to_rgba16();
    let mut skipped = 0usize;
    for y in 0..height {
        for x in 0..width {
            let key = color_key(premultiply(*pixels.get_pixel(x, y)));
            let Some(&block) = palette.get(&key) else {
                skipped += 1;
                continue;
            };
            let mut sprite = Sprite::with_texture(
                texture.clone(),
                (u64::from(x) * block_width) as f32,
                (u64::from(y) * block_height) as f32,
                opts.block_width,
                opts.block_height,
                opts.frames,
            );
            sprite.frame = block.frame_index;
            let id = graph.insert(sprite);
            graph.add_child(env, id);
            if let (Some(on_loaded), Some(sprite)) =
                (&block.on_loaded, graph.get_mut::<Sprite>(id))
            {
                on_loaded(id, sprite, block);
            }
        }
    }

    log::debug!(
        "built env {:?} from a {}x{} map: {} sprites, {} pixels skipped",
        env,
        width,
        height,
        graph.children(env).len(),
        skipped
    );
    Ok(env)
}
