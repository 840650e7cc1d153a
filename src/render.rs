//! Quad submission and batching.
//!
//! Scene nodes never talk to the GPU directly. They submit textured quads to
//! a [`QuadTarget`], the immediate-mode contract every drawable in this crate
//! is written against. [`QuadBatcher`] is the default target: it collects the
//! quads of a frame on the CPU and groups them into [`Batch`]es that the wgpu
//! backend in [`crate::pipelines::sprite`] can submit with one draw call each.
//!
//! # Key types
//!
//! - [`Vertex`] is a 2D position plus texture coordinate, laid out for the GPU
//! - [`QuadTarget`] is the bind / quad / unbind contract
//! - [`QuadBatcher`] records quads into batches
//!

use std::{ops::Range, sync::Arc};

use crate::{camera::Rect, data_structures::texture::Texture};

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub tex_coords: [f32; 2],
}

impl Vertex {
    pub fn new(position: [f32; 2], tex_coords: [f32; 2]) -> Self {
        Self {
            position,
            tex_coords,
        }
    }

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// Immediate, stateful quad submission.
///
/// A drawable binds its texture, submits one or more quads of four
/// `(position, tex_coords)` pairs in winding order and unbinds again.
pub trait QuadTarget {
    /// Sets the view rectangle used for all following quads.
    fn set_projection(&mut self, _view: Rect) {}

    fn bind(&mut self, texture: &Arc<Texture>);

    fn quad(&mut self, vertices: &[Vertex; 4]);

    fn unbind(&mut self);
}

/// A run of triangles that share one texture and one view.
#[derive(Clone, Debug)]
pub struct Batch {
    pub texture: Arc<Texture>,
    pub view: Option<Rect>,
    /// Range into [`QuadBatcher::vertices`]
    pub vertices: Range<u32>,
}

/// Collects a frame's quads into triangle batches.
#[derive(Debug, Default)]
pub struct QuadBatcher {
    vertices: Vec<Vertex>,
    batches: Vec<Batch>,
    bound: Option<Arc<Texture>>,
    view: Option<Rect>,
}

impl QuadBatcher {
    /// Triangle corners for one quad: `0,1,2` and `0,2,3`.
    const QUAD_INDICES: [usize; 6] = [0, 1, 2, 0, 2, 3];

    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Drops everything recorded so far, including the current view.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.batches.clear();
        self.bound = None;
        self.view = None;
    }
}

impl QuadTarget for QuadBatcher {
    fn set_projection(&mut self, view: Rect) {
        self.view = Some(view);
    }

    fn bind(&mut self, texture: &Arc<Texture>) {
        self.bound = Some(texture.clone());
    }

    fn quad(&mut self, vertices: &[Vertex; 4]) {
        let Some(texture) = &self.bound else {
            log::warn!("a quad was submitted without a bound texture and is dropped");
            return;
        };
        let start = self.vertices.len() as u32;
        self.vertices
            .extend(Self::QUAD_INDICES.iter().map(|&i| vertices[i]));
        let end = self.vertices.len() as u32;

        match self.batches.last_mut() {
            Some(batch)
                if batch.texture.id() == texture.id()
                    && batch.view == self.view
                    && batch.vertices.end == start =>
            {
                batch.vertices.end = end;
            }
            _ => self.batches.push(Batch {
                texture: texture.clone(),
                view: self.view,
                vertices: start..end,
            }),
        }
    }

    fn unbind(&mut self) {
        self.bound = None;
    }
}
