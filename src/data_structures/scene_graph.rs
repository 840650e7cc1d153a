//! Scene graph and hierarchical scene organization.
//!
//! Nodes live in a [`SceneGraph`] arena and are addressed by [`NodeId`]. Every
//! node embeds an [`Element`] that stores its parent-relative position, its
//! depth and the ids of its parent and children. A parent owns its children:
//! removing a node releases its whole subtree. The link back to the parent is
//! a plain id and never keeps anything alive. Freed slots are reused; ids
//! carry a generation, so a stale id never resolves to the slot's new node.
//!
//! Positions compose along the parent chain: a node's global position is its
//! parent's global position plus its own local offset. Root nodes are placed
//! at their local offset.
//!
//! Drawing follows insertion order ([`SceneGraph::draw`]) except below a
//! [`Scene`], which flattens its subtree and paints by depth.

use std::{any::Any, fmt::Debug};

use crate::render::QuadTarget;

/// Handle of a node inside the [`SceneGraph`] that issued it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

impl NodeId {
    /// Arena slot of the node. Slots are reused after removal.
    pub fn index(self) -> usize {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

/// Shared state of every node and the generic container node itself.
#[derive(Clone, Debug, Default)]
pub struct Element {
    pub x: f32,
    pub y: f32,
    /// Painting depth inside a [`Scene`]; higher is drawn later
    pub z: i32,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Element {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            ..Default::default()
        }
    }

    pub fn with_depth(mut self, z: i32) -> Self {
        self.z = z;
        self
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Capabilities shared by everything that can be placed in the scene graph.
///
/// Implementors embed an [`Element`] and expose it through
/// [`element`](Self::element). Parent links, child lists and global
/// positions are handled by the [`SceneGraph`].
pub trait SceneNode: Any {
    fn element(&self) -> &Element;

    fn element_mut(&mut self) -> &mut Element;

    /// Width and height used for overlap tests. Nodes without a visual
    /// extent behave like a point.
    fn extent(&self) -> (f32, f32) {
        (0.0, 0.0)
    }

    fn depth(&self) -> i32 {
        self.element().z
    }

    /// Renders this node's own primitive at the global position `origin`,
    /// without touching the children.
    fn draw_self(&self, _origin: (f32, f32), _target: &mut dyn QuadTarget) {}

    /// Renders this node and then its subtree in stored order.
    fn draw(&self, graph: &SceneGraph, id: NodeId, target: &mut dyn QuadTarget) {
        self.draw_self(graph.global_position(id), target);
        graph.draw_children(id, target);
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl SceneNode for Element {
    fn element(&self) -> &Element {
        self
    }

    fn element_mut(&mut self) -> &mut Element {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A container that paints its whole subtree ordered by depth.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    pub element: Element,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SceneNode for Scene {
    fn element(&self) -> &Element {
        &self.element
    }

    fn element_mut(&mut self) -> &mut Element {
        &mut self.element
    }

    /**
     * Every descendant draws only itself here. The subtree is already
     * flattened, so recursing would paint children twice.
     */
    fn draw(&self, graph: &SceneGraph, id: NodeId, target: &mut dyn QuadTarget) {
        let order = graph.depth_sorted(id);
        log::trace!("scene {:?} paints {} nodes", id, order.len());
        for node_id in order {
            if let Some(node) = graph.node(node_id) {
                node.draw_self(graph.global_position(node_id), target);
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Axis-aligned bounding box with inclusive edges.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Aabb {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x + width,
            max_y: y + height,
        }
    }

    /// Touching edges count as overlap. X is checked first.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        intervals_meet(self.min_x, self.max_x, other.min_x, other.max_x)
            && intervals_meet(self.min_y, self.max_y, other.min_y, other.max_y)
    }
}

fn inside(point: f32, start: f32, end: f32) -> bool {
    start <= point && point <= end
}

fn intervals_meet(a1: f32, a2: f32, b1: f32, b2: f32) -> bool {
    inside(a1, b1, b2) || inside(a2, b1, b2) || inside(b1, a1, a2) || inside(b2, a1, a2)
}

struct Slot {
    generation: u32,
    node: Option<Box<dyn SceneNode>>,
}

/// Arena owning every node of a scene.
#[derive(Default)]
pub struct SceneGraph {
    slots: Vec<Slot>,
    free: Vec<usize>,
    live: usize,
}

// dyn SceneNode has no Debug bound
impl Debug for SceneGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneGraph")
            .field("nodes", &self.live)
            .field("slots", &self.slots.len())
            .finish()
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `node` as a detached root and returns its id.
    pub fn insert<N: SceneNode>(&mut self, node: N) -> NodeId {
        let mut node: Box<dyn SceneNode> = Box::new(node);
        // ids carried over from another graph mean nothing here
        let element = node.element_mut();
        element.parent = None;
        element.children.clear();
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.node = Some(node);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId {
                    index: self.slots.len() - 1,
                    generation: 0,
                }
            }
        };
        self.live += 1;
        id
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of allocated slots, live or free.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn node(&self, id: NodeId) -> Option<&dyn SceneNode> {
        let slot = self.slots.get(id.index)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_deref()
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut (dyn SceneNode + 'static)> {
        let slot = self.slots.get_mut(id.index)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_deref_mut()
    }

    pub fn get<T: SceneNode>(&self, id: NodeId) -> Option<&T> {
        self.node(id)?.as_any().downcast_ref::<T>()
    }

    pub fn get_mut<T: SceneNode>(&mut self, id: NodeId) -> Option<&mut T> {
        self.node_mut(id)?.as_any_mut().downcast_mut::<T>()
    }

    /// Ids of all live nodes without a parent, in slot order.
    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| match &slot.node {
                Some(node) if node.element().parent.is_none() => Some(NodeId {
                    index,
                    generation: slot.generation,
                }),
                _ => None,
            })
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.element().parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.node(id) {
            Some(node) => node.element().children(),
            None => &[],
        }
    }

    /// Attaches `child` as the last child of `parent`.
    ///
    /// A child that already has a parent is moved. Cycles are not detected;
    /// attaching an ancestor below its own descendant is undefined.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == child || !self.contains(parent) || !self.contains(child) {
            log::warn!("ignoring add_child({:?}, {:?})", parent, child);
            return;
        }
        self.detach(child);
        if let Some(node) = self.node_mut(child) {
            node.element_mut().parent = Some(parent);
        }
        if let Some(node) = self.node_mut(parent) {
            node.element_mut().children.push(child);
        }
    }

    /// Re-links `id` below `parent`, or turns it into a root for `None`.
    pub fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) {
        match parent {
            Some(parent) => self.add_child(parent, id),
            None => self.detach(id),
        }
    }

    fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(node) = self.node_mut(parent) {
            node.element_mut().children.retain(|&c| c != id);
        }
        if let Some(node) = self.node_mut(id) {
            node.element_mut().parent = None;
        }
    }

    /// Releases `id` and its whole subtree. Returns false for unknown ids.
    pub fn remove(&mut self, id: NodeId) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.detach(id);
        let subtree = self.all_children(id);
        for node_id in subtree.into_iter().chain(std::iter::once(id)) {
            let slot = &mut self.slots[node_id.index];
            slot.node = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(node_id.index);
            self.live -= 1;
        }
        true
    }

    pub fn global_x(&self, id: NodeId) -> f32 {
        let Some(node) = self.node(id) else {
            return 0.0;
        };
        let element = node.element();
        match element.parent {
            None => element.x,
            Some(parent) => self.global_x(parent) + element.x,
        }
    }

    pub fn global_y(&self, id: NodeId) -> f32 {
        let Some(node) = self.node(id) else {
            return 0.0;
        };
        let element = node.element();
        match element.parent {
            None => element.y,
            Some(parent) => self.global_y(parent) + element.y,
        }
    }

    pub fn global_position(&self, id: NodeId) -> (f32, f32) {
        (self.global_x(id), self.global_y(id))
    }

    /// Every descendant of `id` in pre-order, `id` itself excluded.
    pub fn all_children(&self, id: NodeId) -> Vec<NodeId> {
        let mut flattened = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node_id) = stack.pop() {
            flattened.push(node_id);
            stack.extend(self.children(node_id).iter().rev());
        }
        flattened
    }

    /// Descendants of `id` ordered by ascending depth. Equal depths keep
    /// their pre-order position.
    pub fn depth_sorted(&self, id: NodeId) -> Vec<NodeId> {
        let mut nodes = self.all_children(id);
        // sort_by_key is stable
        nodes.sort_by_key(|&node_id| self.node(node_id).map_or(0, |node| node.depth()));
        nodes
    }

    pub fn draw(&self, id: NodeId, target: &mut dyn QuadTarget) {
        if let Some(node) = self.node(id) {
            node.draw(self, id, target);
        }
    }

    pub fn draw_children(&self, id: NodeId, target: &mut dyn QuadTarget) {
        for &child in self.children(id) {
            self.draw(child, target);
        }
    }

    /// Bounding box of `id` at its global position.
    pub fn bounds(&self, id: NodeId) -> Option<Aabb> {
        self.bounds_moved(id, 0.0, 0.0)
    }

    fn bounds_moved(&self, id: NodeId, dx: f32, dy: f32) -> Option<Aabb> {
        let (width, height) = self.node(id)?.extent();
        Some(Aabb::new(
            self.global_x(id) + dx,
            self.global_y(id) + dy,
            width,
            height,
        ))
    }

    /// Returns true if moving `id` by `(dx, dy)` keeps it clear of `other`.
    ///
    /// Touching edges count as a collision. Unknown ids never block a move.
    pub fn test_move(&self, id: NodeId, dx: f32, dy: f32, other: NodeId) -> bool {
        match (self.bounds_moved(id, dx, dy), self.bounds(other)) {
            (Some(moved), Some(other)) => !moved.overlaps(&other),
            _ => {
                log::warn!("test_move with unknown node {:?} or {:?}", id, other);
                true
            }
        }
    }

    pub fn collides_with(&self, id: NodeId, other: NodeId) -> bool {
        !self.test_move(id, 0.0, 0.0, other)
    }
}
