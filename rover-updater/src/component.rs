use crate::error::{ErrorInfo, UpdateError};
use crate::node::Rendered;
use crate::tree::UpdateTree;
use crate::unit::{StatePatch, UnitHandle, UpdateRequest};
use serde_json::{Map, Value};
use smartstring::alias::String as SmartString;
use std::fmt;
use std::rc::Rc;

pub type Props = Map<String, Value>;
pub type State = Map<String, Value>;
pub type Context = Map<String, Value>;

/// Lifecycle hooks the engine invokes on an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleHook {
    WillReceiveProps,
    ShouldUpdate,
    WillUpdate,
    Render,
    DidMount,
    DidUpdate,
    WillUnmount,
    DidCatch,
    ChildContext,
}

impl LifecycleHook {
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleHook::WillReceiveProps => "componentWillReceiveProps",
            LifecycleHook::ShouldUpdate => "shouldComponentUpdate",
            LifecycleHook::WillUpdate => "componentWillUpdate",
            LifecycleHook::Render => "render",
            LifecycleHook::DidMount => "componentDidMount",
            LifecycleHook::DidUpdate => "componentDidUpdate",
            LifecycleHook::WillUnmount => "componentWillUnmount",
            LifecycleHook::DidCatch => "componentDidCatch",
            LifecycleHook::ChildContext => "getChildContext",
        }
    }
}

impl fmt::Display for LifecycleHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user-defined component driven by an update unit.
///
/// Props, state and context are owned by the unit, not by the implementor:
/// every hook receives a [`Scope`] exposing the committed values and the
/// update entry points. A hook returning `Err` never unwinds through the
/// engine; the failure is recorded and routed to the nearest error boundary.
pub trait Component: 'static {
    fn render(&mut self, scope: &Scope<'_>) -> anyhow::Result<Rendered>;

    fn initial_state(&self, _props: &Props) -> State {
        State::new()
    }

    fn component_will_receive_props(
        &mut self,
        _scope: &Scope<'_>,
        _next_props: &Props,
        _next_context: &Context,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn should_component_update(
        &mut self,
        _scope: &Scope<'_>,
        _next_props: &Props,
        _next_state: &State,
        _next_context: &Context,
    ) -> anyhow::Result<bool> {
        Ok(true)
    }

    fn component_will_update(
        &mut self,
        _scope: &Scope<'_>,
        _next_props: &Props,
        _next_state: &State,
        _next_context: &Context,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn component_did_mount(&mut self, _scope: &Scope<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn component_did_update(
        &mut self,
        _scope: &Scope<'_>,
        _prev_props: &Props,
        _prev_state: &State,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn component_will_unmount(&mut self, _scope: &Scope<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Whether this component acts as an error boundary. Read once at mount.
    fn catches_errors(&self) -> bool {
        false
    }

    fn component_did_catch(
        &mut self,
        _scope: &Scope<'_>,
        _error: &UpdateError,
        _info: &ErrorInfo,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// Context additions for descendants. `None` means the component contributes nothing.
    fn child_context(&mut self, _scope: &Scope<'_>) -> Option<Context> {
        None
    }

    /// Stateless components never merge state and attach `None` to refs.
    fn is_stateless(&self) -> bool {
        false
    }
}

type Constructor = dyn Fn(&Props, &Context) -> Box<dyn Component>;

struct TypeInner {
    name: SmartString,
    construct: Box<Constructor>,
}

/// A component constructor plus its display name. Identity is pointer identity.
#[derive(Clone)]
pub struct ComponentType {
    inner: Rc<TypeInner>,
    context_keys: Option<Rc<[SmartString]>>,
}

impl ComponentType {
    pub fn new<C, F>(name: &str, construct: F) -> Self
    where
        C: Component,
        F: Fn(&Props, &Context) -> C + 'static,
    {
        Self {
            inner: Rc::new(TypeInner {
                name: name.into(),
                construct: Box::new(move |props, context| Box::new(construct(props, context))),
            }),
            context_keys: None,
        }
    }

    /// Function-style component: a render function with no instance state.
    pub fn stateless<F>(name: &str, render: F) -> Self
    where
        F: Fn(&Props, &Context) -> anyhow::Result<Rendered> + 'static,
    {
        let render: Rc<dyn Fn(&Props, &Context) -> anyhow::Result<Rendered>> = Rc::new(render);
        Self::new(name, move |_, _| Stateless {
            render: Rc::clone(&render),
        })
    }

    /// Declare the context keys this component reads.
    pub fn with_context_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmartString>,
    {
        self.context_keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn context_keys(&self) -> Option<&[SmartString]> {
        self.context_keys.as_deref()
    }

    pub fn same_type(&self, other: &ComponentType) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn construct(&self, props: &Props, context: &Context) -> Box<dyn Component> {
        (self.inner.construct)(props, context)
    }
}

impl fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentType")
            .field("name", &self.inner.name)
            .field("context_keys", &self.context_keys)
            .finish()
    }
}

struct Stateless {
    render: Rc<dyn Fn(&Props, &Context) -> anyhow::Result<Rendered>>,
}

impl Component for Stateless {
    fn render(&mut self, scope: &Scope<'_>) -> anyhow::Result<Rendered> {
        (self.render)(scope.props(), scope.context())
    }

    fn is_stateless(&self) -> bool {
        true
    }
}

/// What a lifecycle hook sees of its own unit.
pub struct Scope<'a> {
    tree: &'a UpdateTree,
    handle: UnitHandle,
    props: &'a Props,
    state: &'a State,
    context: &'a Context,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(
        tree: &'a UpdateTree,
        handle: UnitHandle,
        props: &'a Props,
        state: &'a State,
        context: &'a Context,
    ) -> Self {
        Self {
            tree,
            handle,
            props,
            state,
            context,
        }
    }

    pub fn handle(&self) -> UnitHandle {
        self.handle
    }

    pub fn props(&self) -> &Props {
        self.props
    }

    pub fn state(&self) -> &State {
        self.state
    }

    pub fn context(&self) -> &Context {
        self.context
    }

    /// The tree, for requesting updates on other units.
    pub fn tree(&self) -> &'a UpdateTree {
        self.tree
    }

    pub fn set_state(&self, patch: impl Into<StatePatch>) {
        self.tree
            .request_update(self.handle, UpdateRequest::SetState(patch.into()), None);
    }

    pub fn update_state(&self, update: impl FnOnce(&State, &Props) -> State + 'static) {
        self.set_state(StatePatch::updater(update));
    }

    pub fn set_state_then(&self, patch: impl Into<StatePatch>, callback: impl FnOnce() + 'static) {
        self.tree.request_update(
            self.handle,
            UpdateRequest::SetState(patch.into()),
            Some(Box::new(callback)),
        );
    }

    pub fn force_update(&self) {
        self.tree
            .request_update(self.handle, UpdateRequest::Force, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Empty;

    impl Component for Empty {
        fn render(&mut self, _scope: &Scope<'_>) -> anyhow::Result<Rendered> {
            Ok(Rendered::Nothing)
        }
    }

    #[test]
    fn test_type_identity() {
        let a = ComponentType::new("Empty", |_, _| Empty);
        let b = ComponentType::new("Empty", |_, _| Empty);
        assert!(a.same_type(&a.clone()));
        assert!(!a.same_type(&b));
    }

    #[test]
    fn test_context_keys_keep_identity() {
        let a = ComponentType::new("Empty", |_, _| Empty);
        let keyed = a.clone().with_context_keys(["theme"]);
        assert!(a.same_type(&keyed));
        assert_eq!(keyed.context_keys().map(|k| k.len()), Some(1));
        assert!(a.context_keys().is_none());
    }

    #[test]
    fn test_stateless_type_builds_stateless_instance() {
        let ty = ComponentType::stateless("Label", |_, _| Ok(Rendered::from("hi")));
        let instance = ty.construct(&Props::new(), &Context::new());
        assert!(instance.is_stateless());
        assert_eq!(ty.name(), "Label");
    }

    #[test]
    fn test_hook_names() {
        assert_eq!(LifecycleHook::ShouldUpdate.to_string(), "shouldComponentUpdate");
        assert_eq!(LifecycleHook::ChildContext.as_str(), "getChildContext");
    }
}
