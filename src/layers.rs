//! Stacked layers that render, update and receive mouse input in order.

use instant::Duration;

use crate::{event::MouseEvent, render::QuadTarget};

/// A self-contained part of the screen, e.g. a level or a HUD.
pub trait Layer {
    fn render(&mut self, target: &mut dyn QuadTarget);

    fn update(&mut self, dt: Duration);

    /// Releases whatever the layer holds. Called once by the owner.
    fn delete(&mut self);

    /// Returns false if the event was not handled, which stops propagation.
    fn handle_mouse_event(&mut self, event: &MouseEvent) -> bool;
}

/// LIFO stack of layers. Every fan-out runs bottom to top.
#[derive(Default)]
pub struct Layers {
    layers: Vec<Box<dyn Layer>>,
}

impl Layers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, layer: Box<dyn Layer>) {
        self.layers.push(layer);
    }

    /// Removes the top layer without calling [`Layer::delete`].
    pub fn pop(&mut self) -> Option<Box<dyn Layer>> {
        self.layers.pop()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn render(&mut self, target: &mut dyn QuadTarget) {
        for layer in self.layers.iter_mut() {
            layer.render(target);
        }
    }

    pub fn update(&mut self, dt: Duration) {
        for layer in self.layers.iter_mut() {
            layer.update(dt);
        }
    }

    pub fn delete(&mut self) {
        for layer in self.layers.iter_mut() {
            layer.delete();
        }
    }

    /**
     * Dispatches bottom to top and stops at the first layer that reports
     * the event as unhandled. Layers above it never see the event.
     */
    pub fn handle_mouse_event(&mut self, event: &MouseEvent) -> bool {
        for layer in self.layers.iter_mut() {
            if !layer.handle_mouse_event(event) {
                return false;
            }
        }
        true
    }
}

// Dummy impl, dyn Layer has no Debug bound
impl std::fmt::Debug for Layers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Layers")
            .field("len", &self.layers.len())
            .finish()
    }
}
