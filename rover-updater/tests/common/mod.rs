#![allow(dead_code)]

use rover_updater::node::NodeKind;
use rover_updater::{NodeId, State, UnitHandle, UpdateTree};
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;

/// Shared log buffer components write their hook calls into
#[derive(Clone, Default)]
pub struct Log(Rc<RefCell<Vec<String>>>);

impl Log {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, line: impl Into<String>) {
        self.0.borrow_mut().push(line.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub fn buffer(&self) -> Rc<RefCell<Vec<String>>> {
        Rc::clone(&self.0)
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    pub fn count(&self, line: &str) -> usize {
        self.0.borrow().iter().filter(|l| l.as_str() == line).count()
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.0.borrow().iter().filter(|l| l.starts_with(prefix)).count()
    }

    pub fn position(&self, line: &str) -> Option<usize> {
        self.0.borrow().iter().position(|l| l == line)
    }

    pub fn last_position(&self, line: &str) -> Option<usize> {
        self.0.borrow().iter().rposition(|l| l == line)
    }

    pub fn position_prefix(&self, prefix: &str) -> Option<usize> {
        self.0.borrow().iter().position(|l| l.starts_with(prefix))
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Build a JSON object map from a `json!` literal.
pub fn object(value: Value) -> State {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

/// Concatenated text of every text node below `node`, in tree order.
pub fn text_content(tree: &UpdateTree, node: NodeId) -> String {
    let mut out = String::new();
    collect_text(tree, node, &mut out);
    out
}

fn collect_text(tree: &UpdateTree, node: NodeId, out: &mut String) {
    if let Some(NodeKind::Text(text)) = tree.nodes().get(node).map(|n| n.kind.clone()) {
        out.push_str(&text);
    }
    for child in tree.children(node) {
        collect_text(tree, child, out);
    }
}

pub fn only_unit(tree: &UpdateTree, name: &str) -> UnitHandle {
    let units = tree.find_units(name);
    assert_eq!(units.len(), 1, "expected exactly one <{name}>");
    units[0]
}

pub fn state_value(tree: &UpdateTree, unit: UnitHandle, key: &str) -> Value {
    tree.state(unit)
        .and_then(|state| state.get(key).cloned())
        .unwrap_or(Value::Null)
}
