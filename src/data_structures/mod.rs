//! Scene data structures: the node tree, sprites, environments and textures.
//!
//! - `scene_graph` holds the node arena, the container and depth-sorted scene nodes
//! - `sprite` is the animated, collidable rectangle
//! - `env` builds sprite grids from colour-keyed maps
//! - `texture` contains decoded sheets and the name based registry

pub mod env;
pub mod scene_graph;
pub mod sprite;
pub mod texture;
