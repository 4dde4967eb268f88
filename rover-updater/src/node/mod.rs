mod arena;
mod types;

pub use arena::{Ancestors, NodeArena};
pub use types::{Element, Key, NodeId, NodeKind, NodeSnapshot, RenderShape, Rendered, VNode};
