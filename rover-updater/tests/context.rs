mod common;

use common::{Log, only_unit, text_content};
use rover_updater::{
    Component, ComponentType, Context, Element, Props, Rendered, Scope, State, UpdateTree,
    UpdaterConfig,
};
use serde_json::{Value, json};
use std::rc::Rc;

struct ThemeProvider {
    children: Vec<ComponentType>,
}

impl Component for ThemeProvider {
    fn initial_state(&self, _props: &Props) -> State {
        common::object(json!({ "theme": "dark" }))
    }

    fn render(&mut self, _scope: &Scope<'_>) -> anyhow::Result<Rendered> {
        Ok(Element::host("frame")
            .children(self.children.iter().map(Element::component))
            .into())
    }

    fn child_context(&mut self, scope: &Scope<'_>) -> Option<Context> {
        let mut context = Context::new();
        context.insert("theme".into(), scope.state()["theme"].clone());
        Some(context)
    }
}

struct ThemedLabel {
    log: Log,
}

impl Component for ThemedLabel {
    fn render(&mut self, scope: &Scope<'_>) -> anyhow::Result<Rendered> {
        Ok(Rendered::from(format!("[{}]", theme_of(scope.context()))))
    }

    fn component_will_receive_props(
        &mut self,
        _scope: &Scope<'_>,
        _next_props: &Props,
        next_context: &Context,
    ) -> anyhow::Result<()> {
        self.log
            .push(format!("label receives {}", theme_of(next_context)));
        Ok(())
    }
}

fn theme_of(context: &Context) -> &str {
    context
        .get("theme")
        .and_then(Value::as_str)
        .unwrap_or("none")
}

fn provider_type(log: &Log) -> ComponentType {
    let label = {
        let log = log.clone();
        ComponentType::new("ThemedLabel", move |_, _| ThemedLabel { log: log.clone() })
            .with_context_keys(["theme"])
    };
    let blind = ComponentType::stateless("Blind", |_, context| {
        Ok(Rendered::from(format!("({})", theme_of(context))))
    });
    ComponentType::new("ThemeProvider", move |_, _| ThemeProvider {
        children: vec![label.clone(), blind.clone()],
    })
}

/// Keyed components see the provider's context; undeclared readers see none of it
#[test]
fn test_context_reaches_declared_readers() {
    let log = Log::new();
    let tree = UpdateTree::new(UpdaterConfig::default());
    let root = tree.render(Element::component(&provider_type(&log)));

    assert_eq!(text_content(&tree, root), "[dark](none)");
    let label = only_unit(&tree, "ThemedLabel");
    assert_eq!(
        tree.context(label).map(|c| c["theme"].clone()),
        Some(json!("dark"))
    );
    let blind = only_unit(&tree, "Blind");
    assert_eq!(tree.context(blind).map(|c| c.is_empty()), Some(true));
}

/// A provider state change flows down as a new context through receive
#[test]
fn test_context_change_propagates() {
    let log = Log::new();
    let tree = UpdateTree::new(UpdaterConfig::default());
    let root = tree.render(Element::component(&provider_type(&log)));
    let provider = only_unit(&tree, "ThemeProvider");
    let label = only_unit(&tree, "ThemedLabel");
    let before = tree.context(label);

    tree.set_state(provider, json!({ "theme": "light" }));

    assert_eq!(text_content(&tree, root), "[light](none)");
    assert_eq!(log.entries(), vec!["label receives light"]);
    let after = tree.context(label);
    assert!(!matches!((&before, &after), (Some(a), Some(b)) if Rc::ptr_eq(a, b)));
}

/// An unchanged context keeps its identity, so the reader is not told about new props
#[test]
fn test_unchanged_context_keeps_identity() {
    let log = Log::new();
    let tree = UpdateTree::new(UpdaterConfig::default());
    tree.render(Element::component(&provider_type(&log)));
    let provider = only_unit(&tree, "ThemeProvider");
    let label = only_unit(&tree, "ThemedLabel");
    let before = tree.context(label);

    tree.set_state(provider, json!({ "unrelated": 1 }));

    let after = tree.context(label);
    assert!(matches!((&before, &after), (Some(a), Some(b)) if Rc::ptr_eq(a, b)));
    assert!(log.entries().is_empty());
}
