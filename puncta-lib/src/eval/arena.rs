use std::ops::Index;

/// Handle to a node inside the [`Arena`] that allocated it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId(usize);

/// A fixed capacity node store. Nodes are only ever added, and everything is freed at once
/// when the arena is dropped.
#[derive(Debug, Clone)]
pub struct Arena<T> {
    nodes: Vec<T>,
    capacity: usize,
}

impl<T> Arena<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// returns `None` once the arena is full
    pub fn alloc(&mut self, node: T) -> Option<NodeId> {
        if self.nodes.len() >= self.capacity {
            return None;
        }
        self.nodes.push(node);
        Some(NodeId(self.nodes.len() - 1))
    }

    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T> Index<NodeId> for Arena<T> {
    type Output = T;
    fn index(&self, id: NodeId) -> &T {
        &self.nodes[id.0]
    }
}
