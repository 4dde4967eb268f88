use crate::component::Context;
use std::rc::Rc;

/// Overlay a component's context contribution onto the context it inherited.
///
/// `None` or an empty contribution hands back `parent` itself, so descendants
/// can tell an unchanged context by pointer.
pub fn resolve_child_context(contribution: Option<Context>, parent: &Rc<Context>) -> Rc<Context> {
    match contribution {
        Some(additions) if !additions.is_empty() => {
            let mut merged = Context::clone(parent);
            merged.extend(additions);
            Rc::new(merged)
        }
        _ => Rc::clone(parent),
    }
}

/// Pick the declared keys out of `current`. Keys missing from `current` are left out.
pub fn select_context_by_keys<K: AsRef<str>>(current: Option<&Context>, keys: Option<&[K]>) -> Context {
    let (Some(current), Some(keys)) = (current, keys) else {
        return Context::new();
    };
    keys.iter()
        .filter_map(|key| {
            let key = key.as_ref();
            current.get(key).map(|value| (key.to_string(), value.clone()))
        })
        .collect()
}
