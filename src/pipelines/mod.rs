//! Render pipelines of the wgpu backend.

pub mod sprite;
