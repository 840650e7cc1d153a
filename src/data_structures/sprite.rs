//! Animated, textured rectangles.

use std::{any::Any, sync::Arc};

use crate::{
    data_structures::{
        scene_graph::{Element, SceneNode},
        texture::{Texture, TextureRegistry},
    },
    error::Result,
    render::{QuadTarget, Vertex},
};

/// A textured rectangle with horizontal frame animation.
///
/// The texture is split into `frames` equally wide slices, left to right.
/// `frame` selects the slice and wraps around, so it can be advanced freely.
#[derive(Clone, Debug)]
pub struct Sprite {
    pub element: Element,
    texture: Option<Arc<Texture>>,
    pub width: u32,
    pub height: u32,
    pub frames: u32,
    pub frame: u32,
    pub velocity_x: f32,
    pub velocity_y: f32,
}

impl Sprite {
    /// Creates a sprite using the texture registered as `name`.
    ///
    /// `frames` below one is treated as a single frame. A missing texture is
    /// handled by the registry's [`MissingTexture`](super::texture::MissingTexture) policy.
    pub fn new(
        textures: &TextureRegistry,
        name: &str,
        x: f32,
        y: f32,
        width: u32,
        height: u32,
        frames: i32,
    ) -> Result<Self> {
        let texture = textures.resolve(name)?;
        Ok(Self::with_texture(texture, x, y, width, height, frames))
    }

    pub fn with_texture(
        texture: Option<Arc<Texture>>,
        x: f32,
        y: f32,
        width: u32,
        height: u32,
        frames: i32,
    ) -> Self {
        Self {
            element: Element::new(x, y),
            texture,
            width,
            height,
            frames: frames.max(1) as u32,
            frame: 0,
            velocity_x: 0.0,
            velocity_y: 0.0,
        }
    }

    pub fn texture(&self) -> Option<&Arc<Texture>> {
        self.texture.as_ref()
    }

    /// Horizontal texture coordinates `(start, stop)` of the current frame.
    pub fn frame_span(&self) -> (f32, f32) {
        let frames = self.frames.max(1);
        let frame = self.frame % frames;
        let step = 1.0 / frames as f32;
        (step * frame as f32, step * (frame + 1) as f32)
    }

    /// The four corners of this sprite placed at `origin`, in submission order.
    pub fn quad(&self, origin: (f32, f32)) -> [Vertex; 4] {
        let (x1, y1) = origin;
        let x2 = x1 + self.width as f32;
        let y2 = y1 + self.height as f32;
        let (start, stop) = self.frame_span();
        [
            Vertex::new([x1, y1], [start, 1.0]),
            Vertex::new([x2, y1], [stop, 1.0]),
            Vertex::new([x2, y2], [stop, 0.0]),
            Vertex::new([x1, y2], [start, 0.0]),
        ]
    }
}

impl SceneNode for Sprite {
    fn element(&self) -> &Element {
        &self.element
    }

    fn element_mut(&mut self) -> &mut Element {
        &mut self.element
    }

    fn extent(&self) -> (f32, f32) {
        (self.width as f32, self.height as f32)
    }

    fn draw_self(&self, origin: (f32, f32), target: &mut dyn QuadTarget) {
        // blank sprites have nothing to show
        let Some(texture) = &self.texture else {
            return;
        };
        target.bind(texture);
        target.quad(&self.quad(origin));
        target.unbind();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
