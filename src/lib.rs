//! flow-twodee
//!
//! A small 2D scene graph and sprite library. Nodes are placed relative to
//! their parents, sprites animate through horizontal frames of a sheet and
//! test for overlap with inclusive bounding boxes, and whole levels can be
//! built from colour-keyed PNG maps. Drawing goes through a minimal
//! bind / quad / unbind contract that the bundled wgpu backend implements.
//!
//! High-level modules
//! - `camera`: orthographic view rectangle with pan and zoom
//! - `config`: window and run loop settings
//! - `context`: GPU and window context that owns device/queue/surface
//! - `data_structures`: scene graph, sprites, environments and textures
//! - `error`: error type of scene construction and asset loading
//! - `event`: mouse events handed to the layer stack
//! - `flow`: event loop driving a layer stack
//! - `layers`: ordered render/update/input stack
//! - `pipelines`: the textured quad pipeline
//! - `render`: quad submission contract and CPU batching
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod event;
pub mod flow;
pub mod layers;
pub mod pipelines;
pub mod render;

pub use error::{Error, Result};

// Re-exports commonly used types for convenience in downstream code.
pub use data_structures::{
    env::{Env, EnvBlock, EnvOpts, build_env, load_env},
    scene_graph::{Aabb, Element, NodeId, Scene, SceneGraph, SceneNode},
    sprite::Sprite,
    texture::{MissingTexture, Texture, TextureRegistry},
};
pub use instant::Duration;
