//! Nodes that are expected to be part of a way.

use hashbrown::HashMap;
use id_arena::{Arena, Id};
use osmi_ptv2::models::{Node, ObjectId, Way};

/// Stores candidate nodes during the second pass. The third pass removes
/// every node referenced by a way, whatever is left is not on a way.
///
/// The arena cannot shrink, so removed slots are emptied instead.
#[derive(Default)]
pub struct MustOnTrack {
    arena: Arena<Option<Node>>,
    handles: HashMap<ObjectId, Id<Option<Node>>>,
}

impl MustOnTrack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: Node) {
        let id = node.id;
        let handle = self.arena.alloc(Some(node));
        if let Some(previous) = self.handles.insert(id, handle) {
            self.arena[previous] = None;
        }
    }

    pub fn remove(&mut self, id: ObjectId) -> bool {
        match self.handles.remove(&id) {
            Some(handle) => {
                self.arena[handle] = None;
                true
            }
            None => false,
        }
    }

    /// Drop all nodes referenced by `way`.
    pub fn remove_way_nodes(&mut self, way: &Way) {
        for node_ref in &way.nodes {
            self.remove(node_ref.id);
        }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Nodes still registered, ordered by id.
    pub fn remaining(&self) -> Vec<&Node> {
        let mut nodes: Vec<&Node> = self
            .handles
            .values()
            .filter_map(|&handle| self.arena[handle].as_ref())
            .collect();
        nodes.sort_by_key(|n| n.id);
        nodes
    }
}
