use crate::node::NodeId;
use crate::unit::UnitHandle;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// What a ref callback is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefTarget {
    Component(UnitHandle),
    Host(NodeId),
}

/// Callback ref carried by a virtual node. Identity is pointer identity.
#[derive(Clone)]
pub struct NodeRef(Rc<dyn Fn(Option<RefTarget>)>);

impl NodeRef {
    pub fn new(callback: impl Fn(Option<RefTarget>) + 'static) -> Self {
        Self(Rc::new(callback))
    }

    pub fn call(&self, target: Option<RefTarget>) {
        (self.0)(target)
    }

    pub fn same(a: Option<&NodeRef>, b: Option<&NodeRef>) -> bool {
        match (a, b) {
            (Some(a), Some(b)) => Rc::ptr_eq(&a.0, &b.0),
            (None, None) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeRef({:p})", Rc::as_ptr(&self.0))
    }
}

/// Ref bookkeeping used by the update engine
pub trait RefRegistry {
    /// Invoke `node_ref` with the attachment, or with `None` to clear it.
    fn fire(&self, node: NodeId, node_ref: &NodeRef, target: Option<RefTarget>);

    /// Release a binding that is about to be replaced by a different ref.
    fn detach(&self, node: NodeId, node_ref: &NodeRef);

    /// Unit whose render call is currently running.
    ///
    /// The engine sets it around every render. The built-in normalizer is
    /// handed the owner directly, so this getter serves custom registries
    /// and components that need to know who is rendering them.
    fn current_owner(&self) -> Option<UnitHandle>;

    /// Swap the current owner, returning the previous one.
    fn set_current_owner(&self, owner: Option<UnitHandle>) -> Option<UnitHandle>;
}

/// Default registry: plain callback refs.
#[derive(Default)]
pub struct Refs {
    current_owner: Cell<Option<UnitHandle>>,
}

impl Refs {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RefRegistry for Refs {
    fn fire(&self, node: NodeId, node_ref: &NodeRef, target: Option<RefTarget>) {
        tracing::trace!("firing ref on {:?} with {:?}", node, target);
        node_ref.call(target);
    }

    fn detach(&self, node: NodeId, node_ref: &NodeRef) {
        tracing::trace!("detaching ref on {:?}", node);
        node_ref.call(None);
    }

    fn current_owner(&self) -> Option<UnitHandle> {
        self.current_owner.get()
    }

    fn set_current_owner(&self, owner: Option<UnitHandle>) -> Option<UnitHandle> {
        self.current_owner.replace(owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_node_ref_identity() {
        let a = NodeRef::new(|_| {});
        let b = NodeRef::new(|_| {});
        let a2 = a.clone();

        assert!(NodeRef::same(Some(&a), Some(&a2)));
        assert!(!NodeRef::same(Some(&a), Some(&b)));
        assert!(!NodeRef::same(Some(&a), None));
        assert!(NodeRef::same(None, None));
    }

    #[test]
    fn test_fire_and_detach() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let node_ref = NodeRef::new(move |target| log.borrow_mut().push(target));
        let refs = Refs::new();

        refs.fire(NodeId(3), &node_ref, Some(RefTarget::Host(NodeId(3))));
        refs.detach(NodeId(3), &node_ref);

        assert_eq!(
            *seen.borrow(),
            vec![Some(RefTarget::Host(NodeId(3))), None]
        );
    }

    #[test]
    fn test_owner_swap() {
        let refs = Refs::new();
        assert_eq!(refs.current_owner(), None);
        let handle = UnitHandle::new(1, 0);
        assert_eq!(refs.set_current_owner(Some(handle)), None);
        assert_eq!(refs.current_owner(), Some(handle));
        assert_eq!(refs.set_current_owner(None), Some(handle));
    }
}
