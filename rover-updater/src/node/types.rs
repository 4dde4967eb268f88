use crate::component::{ComponentType, Props};
use crate::refs::NodeRef;
use crate::unit::UnitHandle;
use serde_json::{Map, Value};
use smartstring::alias::String as SmartString;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> u32 {
        self.0
    }
}

pub type Key = SmartString;

/// What a virtual node stands for
#[derive(Clone)]
pub enum NodeKind {
    Host(SmartString),
    Text(SmartString),
    Composite(ComponentType),
}

impl NodeKind {
    /// Whether a node of kind `other` can be updated in place of this one.
    pub fn same_kind(&self, other: &NodeKind) -> bool {
        match (self, other) {
            (NodeKind::Host(a), NodeKind::Host(b)) => a == b,
            (NodeKind::Text(_), NodeKind::Text(_)) => true,
            (NodeKind::Composite(a), NodeKind::Composite(b)) => a.same_type(b),
            _ => false,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, NodeKind::Composite(_))
    }

    pub fn name(&self) -> &str {
        match self {
            NodeKind::Host(tag) => tag,
            NodeKind::Text(_) => "#text",
            NodeKind::Composite(ty) => ty.name(),
        }
    }
}

impl fmt::Debug for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Host(tag) => write!(f, "Host({tag})"),
            NodeKind::Text(text) => write!(f, "Text({text:?})"),
            NodeKind::Composite(ty) => write!(f, "Composite({})", ty.name()),
        }
    }
}

/// A node living in the `NodeArena`.
#[derive(Debug, Clone)]
pub struct VNode {
    pub kind: NodeKind,
    pub props: Rc<Props>,
    pub key: Option<Key>,
    pub node_ref: Option<NodeRef>,
    /// Unit whose render produced this node
    pub owner: Option<UnitHandle>,
    pub(crate) unit: Option<UnitHandle>,
}

impl VNode {
    pub fn host(tag: impl Into<SmartString>) -> Self {
        Self {
            kind: NodeKind::Host(tag.into()),
            props: Rc::new(Props::new()),
            key: None,
            node_ref: None,
            owner: None,
            unit: None,
        }
    }

    /// Split an element into the node to store and the children still to reconcile.
    pub fn from_element(element: Element) -> (Self, Vec<Rendered>) {
        let Element {
            kind,
            props,
            key,
            node_ref,
            owner,
            children,
        } = element;
        let node = Self {
            kind,
            props: Rc::new(props),
            key,
            node_ref,
            owner,
            unit: None,
        };
        (node, children)
    }

    /// The unit driving this node, for composite nodes that are mounted.
    pub fn unit(&self) -> Option<UnitHandle> {
        self.unit
    }

    pub fn has_ref(&self) -> bool {
        self.node_ref.is_some()
    }

    pub fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            props: Rc::clone(&self.props),
            key: self.key.clone(),
            node_ref: self.node_ref.clone(),
        }
    }

    pub(crate) fn apply(&mut self, snapshot: NodeSnapshot) {
        self.props = snapshot.props;
        self.key = snapshot.key;
        self.node_ref = snapshot.node_ref;
    }
}

/// The replaceable part of a composite node, queued on its unit until the next pass.
#[derive(Debug, Clone)]
pub struct NodeSnapshot {
    pub props: Rc<Props>,
    pub key: Option<Key>,
    pub node_ref: Option<NodeRef>,
}

impl NodeSnapshot {
    pub fn from_element(element: &Element) -> Self {
        Self {
            props: Rc::new(element.props.clone()),
            key: element.key.clone(),
            node_ref: element.node_ref.clone(),
        }
    }
}

/// Description of a node as produced by a render call, before it is placed in the arena.
#[derive(Debug, Clone)]
pub struct Element {
    pub kind: NodeKind,
    pub props: Props,
    pub key: Option<Key>,
    pub node_ref: Option<NodeRef>,
    pub owner: Option<UnitHandle>,
    pub children: Vec<Rendered>,
}

impl Element {
    fn with_kind(kind: NodeKind) -> Self {
        Self {
            kind,
            props: Props::new(),
            key: None,
            node_ref: None,
            owner: None,
            children: Vec::new(),
        }
    }

    pub fn host(tag: impl Into<SmartString>) -> Self {
        Self::with_kind(NodeKind::Host(tag.into()))
    }

    pub fn text(text: impl Into<SmartString>) -> Self {
        Self::with_kind(NodeKind::Text(text.into()))
    }

    pub fn component(ty: &ComponentType) -> Self {
        Self::with_kind(NodeKind::Composite(ty.clone()))
    }

    pub fn prop(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    pub fn props(mut self, props: Props) -> Self {
        self.props = props;
        self
    }

    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_ref(mut self, node_ref: NodeRef) -> Self {
        self.node_ref = Some(node_ref);
        self
    }

    pub fn child(mut self, child: impl Into<Rendered>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<I, R>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Rendered>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }
}

/// Output of a render call
#[derive(Debug, Clone, Default)]
pub enum Rendered {
    #[default]
    Nothing,
    Bool(bool),
    Text(SmartString),
    Number(f64),
    Element(Element),
    List(Vec<Rendered>),
    /// Raw JSON object; never a valid child
    Object(Map<String, Value>),
}

/// Coarse classification of render output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderShape {
    /// `Nothing` or a boolean: the unit renders no children
    Empty,
    Text,
    Element,
    List,
    Unsupported(&'static str),
}

impl RenderShape {
    /// Only element- and list-shaped output can carry components that read a new context.
    pub fn introduces_context(self) -> bool {
        matches!(self, RenderShape::Element | RenderShape::List)
    }
}

impl Rendered {
    pub fn shape(&self) -> RenderShape {
        match self {
            Rendered::Nothing | Rendered::Bool(_) => RenderShape::Empty,
            Rendered::Text(_) | Rendered::Number(_) => RenderShape::Text,
            Rendered::Element(_) => RenderShape::Element,
            Rendered::List(_) => RenderShape::List,
            Rendered::Object(_) => RenderShape::Unsupported("an object"),
        }
    }
}

impl From<Element> for Rendered {
    fn from(element: Element) -> Self {
        Rendered::Element(element)
    }
}

impl From<&str> for Rendered {
    fn from(text: &str) -> Self {
        Rendered::Text(text.into())
    }
}

impl From<String> for Rendered {
    fn from(text: String) -> Self {
        Rendered::Text(text.into())
    }
}

impl From<Vec<Rendered>> for Rendered {
    fn from(items: Vec<Rendered>) -> Self {
        Rendered::List(items)
    }
}

impl From<Vec<Element>> for Rendered {
    fn from(items: Vec<Element>) -> Self {
        Rendered::List(items.into_iter().map(Rendered::Element).collect())
    }
}

impl<T: Into<Rendered>> From<Option<T>> for Rendered {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Rendered::Nothing)
    }
}

impl From<Value> for Rendered {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Rendered::Nothing,
            Value::Bool(b) => Rendered::Bool(b),
            Value::Number(n) => Rendered::Number(n.as_f64().unwrap_or_default()),
            Value::String(s) => Rendered::Text(s.into()),
            Value::Array(items) => Rendered::List(items.into_iter().map(Rendered::from).collect()),
            Value::Object(map) => Rendered::Object(map),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_shapes() {
        assert_eq!(Rendered::Nothing.shape(), RenderShape::Empty);
        assert_eq!(Rendered::Bool(true).shape(), RenderShape::Empty);
        assert_eq!(Rendered::from("hi").shape(), RenderShape::Text);
        assert_eq!(Rendered::Number(3.0).shape(), RenderShape::Text);
        assert_eq!(Rendered::from(Element::host("div")).shape(), RenderShape::Element);
        assert_eq!(Rendered::List(vec![]).shape(), RenderShape::List);
        assert!(matches!(
            Rendered::from(json!({ "a": 1 })).shape(),
            RenderShape::Unsupported(_)
        ));
    }

    #[test]
    fn test_context_only_for_element_and_list() {
        assert!(RenderShape::Element.introduces_context());
        assert!(RenderShape::List.introduces_context());
        assert!(!RenderShape::Text.introduces_context());
        assert!(!RenderShape::Empty.introduces_context());
    }

    #[test]
    fn test_json_conversion() {
        let rendered = Rendered::from(json!(["a", 1, null, [true]]));
        let Rendered::List(items) = rendered else {
            panic!("expected list");
        };
        assert_eq!(items.len(), 4);
        assert!(matches!(items[2], Rendered::Nothing));
        assert!(matches!(items[3], Rendered::List(_)));
    }

    #[test]
    fn test_same_kind() {
        assert!(NodeKind::Host("div".into()).same_kind(&NodeKind::Host("div".into())));
        assert!(!NodeKind::Host("div".into()).same_kind(&NodeKind::Host("span".into())));
        assert!(NodeKind::Text("a".into()).same_kind(&NodeKind::Text("b".into())));
        assert!(!NodeKind::Text("a".into()).same_kind(&NodeKind::Host("a".into())));
    }

    #[test]
    fn test_element_builder() {
        let element = Element::host("list")
            .key("k1")
            .prop("title", "Todo")
            .child("first")
            .children(vec!["second", "third"]);
        assert_eq!(element.key.as_deref(), Some("k1"));
        assert_eq!(element.props.get("title"), Some(&json!("Todo")));
        assert_eq!(element.children.len(), 3);
    }
}
