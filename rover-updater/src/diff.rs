use crate::component::Context;
use crate::error::UpdateError;
use crate::node::{Element, Key, NodeId, NodeKind, NodeSnapshot, Rendered, VNode};
use crate::refs::{NodeRef, RefTarget};
use crate::scheduler::UpdateBatch;
use crate::tree::UpdateTree;
use crate::unit::UnitHandle;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// What a render hands to the diff
#[derive(Debug)]
pub enum ChildList {
    Elements(Vec<Element>),
    /// Keep the previous children untouched
    Reuse,
}

/// Structural reconciliation of one node's children.
///
/// Implementations mount new composites through
/// [`UpdateTree::mount_composite`], update existing ones through
/// [`UpdateTree::receive`], and unmount with [`UpdateTree::dispose`]
/// followed by [`UpdateTree::release_unit`]. The resulting child list must
/// be stored with `NodeArena::set_children`.
pub trait TreeDiff {
    fn reconcile(
        &self,
        tree: &UpdateTree,
        previous: &[NodeId],
        next: ChildList,
        parent: NodeId,
        context: &Rc<Context>,
        batch: &UpdateBatch,
    );
}

/// Default diff: children are matched by key, unkeyed children by position
/// among the unkeyed ones. A match of a different kind is replaced.
#[derive(Debug, Default)]
pub struct KeyedDiff;

impl TreeDiff for KeyedDiff {
    fn reconcile(
        &self,
        tree: &UpdateTree,
        previous: &[NodeId],
        next: ChildList,
        parent: NodeId,
        context: &Rc<Context>,
        batch: &UpdateBatch,
    ) {
        let elements = match next {
            ChildList::Reuse => return,
            ChildList::Elements(elements) => elements,
        };

        let mut keyed: HashMap<Key, NodeId> = HashMap::new();
        let mut unkeyed = Vec::new();
        {
            let nodes = tree.nodes();
            for &id in previous {
                match nodes.get(id).and_then(|node| node.key.clone()) {
                    Some(key) => {
                        keyed.insert(key, id);
                    }
                    None => unkeyed.push(id),
                }
            }
        }

        let mut unkeyed = unkeyed.into_iter();
        let mut next_ids = Vec::with_capacity(elements.len());
        for element in elements {
            let candidate = match &element.key {
                Some(key) => keyed.remove(key),
                None => unkeyed.next(),
            };
            let matched = candidate.filter(|id| {
                tree.nodes()
                    .get(*id)
                    .is_some_and(|node| node.kind.same_kind(&element.kind))
            });
            let id = match matched {
                Some(id) => {
                    self.update(tree, id, element, context, batch);
                    id
                }
                None => self.create(tree, element, parent, context, batch),
            };
            next_ids.push(id);
        }

        let kept: HashSet<NodeId> = next_ids.iter().copied().collect();
        for &id in previous {
            if !kept.contains(&id) {
                self.remove(tree, id);
            }
        }
        tree.nodes_mut().set_children(parent, next_ids);
    }
}

impl KeyedDiff {
    fn create(
        &self,
        tree: &UpdateTree,
        element: Element,
        parent: NodeId,
        context: &Rc<Context>,
        batch: &UpdateBatch,
    ) -> NodeId {
        let composite = match &element.kind {
            NodeKind::Composite(ty) => Some(ty.clone()),
            _ => None,
        };
        if let Some(ty) = composite {
            return tree.mount_composite(&ty, element, parent, context, batch);
        }

        let (vnode, children) = VNode::from_element(element);
        let owner = vnode.owner;
        let tag = vnode.kind.name().to_string();
        let node_ref = vnode.node_ref.clone();
        let id = tree.nodes_mut().create(vnode, Some(parent));

        if !children.is_empty() {
            let elements = self.host_children(tree, children, owner, &tag);
            self.reconcile(tree, &[], ChildList::Elements(elements), id, context, batch);
        }
        if let Some(node_ref) = node_ref {
            tree.refs().fire(id, &node_ref, Some(RefTarget::Host(id)));
        }
        id
    }

    fn update(
        &self,
        tree: &UpdateTree,
        id: NodeId,
        element: Element,
        context: &Rc<Context>,
        batch: &UpdateBatch,
    ) {
        if element.kind.is_composite() {
            let snapshot = NodeSnapshot::from_element(&element);
            match tree.unit_of(id) {
                Some(unit) => tree.receive(unit, snapshot, context, batch),
                None => tracing::warn!("composite node {:?} has no unit", id),
            }
            return;
        }
        if matches!(element.kind, NodeKind::Text(_)) {
            if let Some(node) = tree.nodes_mut().get_mut(id) {
                node.kind = element.kind;
            }
            return;
        }

        let tag = element.kind.name().to_string();
        let (vnode, children) = VNode::from_element(element);
        let previous_ref = {
            let mut nodes = tree.nodes_mut();
            let Some(node) = nodes.get_mut(id) else {
                return;
            };
            let previous_ref = node.node_ref.clone();
            node.props = Rc::clone(&vnode.props);
            node.key = vnode.key.clone();
            node.owner = vnode.owner;
            node.node_ref = vnode.node_ref.clone();
            previous_ref
        };
        if !NodeRef::same(previous_ref.as_ref(), vnode.node_ref.as_ref()) {
            if let Some(previous_ref) = previous_ref {
                tree.refs().detach(id, &previous_ref);
            }
            if let Some(node_ref) = &vnode.node_ref {
                tree.refs().fire(id, node_ref, Some(RefTarget::Host(id)));
            }
        }

        let elements = self.host_children(tree, children, vnode.owner, &tag);
        let previous = tree.children(id);
        self.reconcile(tree, &previous, ChildList::Elements(elements), id, context, batch);
    }

    /// Unmount `id` and everything below it, parents first.
    fn remove(&self, tree: &UpdateTree, id: NodeId) {
        let children = tree.children(id);
        let (unit, node_ref) = match tree.nodes().get(id) {
            Some(node) => (node.unit(), node.node_ref.clone()),
            None => return,
        };

        match unit {
            Some(unit) => tree.dispose(unit),
            None => {
                if let Some(node_ref) = node_ref {
                    tree.refs().fire(id, &node_ref, None);
                }
            }
        }
        for child in children {
            self.remove(tree, child);
        }
        if let Some(unit) = unit {
            tree.release_unit(unit);
        }
        tree.nodes_mut().dispose(id);
    }

    fn host_children(
        &self,
        tree: &UpdateTree,
        children: Vec<Rendered>,
        owner: Option<UnitHandle>,
        tag: &str,
    ) -> Vec<Element> {
        match tree.normalizer().to_child_list(Rendered::List(children), owner) {
            Ok(elements) => elements,
            Err(unsupported) => {
                let component = owner
                    .and_then(|owner| tree.name_of(owner))
                    .unwrap_or_else(|| tag.to_string());
                tree.report_error(
                    owner,
                    UpdateError::RenderShape {
                        component: component.into(),
                        shape: unsupported.0,
                    },
                );
                Vec::new()
            }
        }
    }
}
