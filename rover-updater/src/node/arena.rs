use super::types::{NodeId, VNode};
use crate::unit::UnitHandle;

/// Arena-based storage for virtual nodes with explicit parent links
pub struct NodeArena {
    nodes: Vec<Option<VNode>>,
    parents: Vec<Option<NodeId>>,
    children: Vec<Vec<NodeId>>,
    free_list: Vec<u32>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            parents: Vec::new(),
            children: Vec::new(),
            free_list: Vec::new(),
        }
    }

    pub fn create(&mut self, node: VNode, parent: Option<NodeId>) -> NodeId {
        let index = if let Some(idx) = self.free_list.pop() {
            idx as usize
        } else {
            self.nodes.len()
        };

        if index >= self.nodes.len() {
            self.nodes.push(Some(node));
            self.parents.push(parent);
            self.children.push(Vec::new());
        } else {
            self.nodes[index] = Some(node);
            self.parents[index] = parent;
            self.children[index].clear();
        }

        NodeId(index as u32)
    }

    pub fn get(&self, id: NodeId) -> Option<&VNode> {
        self.nodes.get(id.0 as usize)?.as_ref()
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut VNode> {
        self.nodes.get_mut(id.0 as usize)?.as_mut()
    }

    pub fn get_parent(&self, node: NodeId) -> Option<NodeId> {
        *self.parents.get(node.0 as usize)?
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.children
            .get(id.0 as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Replace the child list of `id`, re-pointing each child's parent link.
    pub fn set_children(&mut self, id: NodeId, children: Vec<NodeId>) {
        if self.get(id).is_none() {
            return;
        }
        for child in &children {
            if let Some(p) = self.parents.get_mut(child.0 as usize) {
                *p = Some(id);
            }
        }
        self.children[id.0 as usize] = children;
    }

    /// Drop the child list without touching the children themselves.
    pub fn detach_children(&mut self, id: NodeId) -> Vec<NodeId> {
        self.children
            .get_mut(id.0 as usize)
            .map(std::mem::take)
            .unwrap_or_default()
    }

    /// Parent chain of `id`, nearest first, excluding `id` itself.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            arena: self,
            next: self.get_parent(id),
        }
    }

    pub fn set_unit(&mut self, id: NodeId, unit: Option<UnitHandle>) {
        if let Some(node) = self.get_mut(id) {
            node.unit = unit;
        }
    }

    pub fn unit_of(&self, id: NodeId) -> Option<UnitHandle> {
        self.get(id)?.unit
    }

    pub fn dispose(&mut self, id: NodeId) {
        let idx = id.0 as usize;
        if idx < self.nodes.len() && self.nodes[idx].is_some() {
            self.nodes[idx] = None;
            self.parents[idx] = None;
            self.children[idx].clear();
            self.free_list.push(id.0);
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &VNode)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(idx, node)| node.as_ref().map(|n| (NodeId(idx as u32), n)))
    }
}

impl Default for NodeArena {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Ancestors<'a> {
    arena: &'a NodeArena,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.arena.get_parent(current);
        Some(current)
    }
}
