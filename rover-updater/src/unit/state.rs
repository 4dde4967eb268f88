use crate::component::{Props, State};
use serde_json::Value;
use std::fmt;
use std::rc::Rc;

/// A queued state change
pub enum StatePatch {
    /// Shallow-merged onto the snapshot
    Partial(State),
    /// Called with the snapshot so far and the latest props
    Updater(Box<dyn FnOnce(&State, &Props) -> State>),
}

impl StatePatch {
    pub fn updater(update: impl FnOnce(&State, &Props) -> State + 'static) -> Self {
        StatePatch::Updater(Box::new(update))
    }
}

impl fmt::Debug for StatePatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatePatch::Partial(state) => f.debug_tuple("Partial").field(state).finish(),
            StatePatch::Updater(_) => f.write_str("Updater(..)"),
        }
    }
}

impl From<State> for StatePatch {
    fn from(state: State) -> Self {
        StatePatch::Partial(state)
    }
}

/// Non-object values merge as an empty patch.
impl From<Value> for StatePatch {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => StatePatch::Partial(map),
            _ => StatePatch::Partial(State::new()),
        }
    }
}

pub type UpdateCallback = Box<dyn FnOnce()>;

/// What a caller asks of a unit
#[derive(Debug)]
pub enum UpdateRequest {
    SetState(StatePatch),
    /// Re-render once without consulting `should_component_update`
    Force,
}

/// Fold `pending` onto `current` in arrival order.
///
/// Returns `current` itself when nothing is pending; otherwise a new snapshot.
/// `current` is never mutated.
pub fn merge_states(current: &Rc<State>, pending: Vec<StatePatch>, props: &Props) -> Rc<State> {
    if pending.is_empty() {
        return Rc::clone(current);
    }

    let mut next = State::clone(current);
    for patch in pending {
        let partial = match patch {
            StatePatch::Partial(partial) => partial,
            StatePatch::Updater(update) => update(&next, props),
        };
        next.extend(partial);
    }
    Rc::new(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state(value: Value) -> State {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_empty_queue_returns_same_snapshot() {
        let current = Rc::new(state(json!({ "count": 0 })));
        let merged = merge_states(&current, Vec::new(), &Props::new());
        assert!(Rc::ptr_eq(&current, &merged));
    }

    #[test]
    fn test_partials_merge_left_to_right() {
        let current = Rc::new(state(json!({ "a": 1, "b": 1 })));
        let merged = merge_states(
            &current,
            vec![json!({ "a": 2 }).into(), json!({ "a": 3, "c": 1 }).into()],
            &Props::new(),
        );

        assert_eq!(Value::Object((*merged).clone()), json!({ "a": 3, "b": 1, "c": 1 }));
        assert_eq!(Value::Object((*current).clone()), json!({ "a": 1, "b": 1 }));
        assert!(!Rc::ptr_eq(&current, &merged));
    }

    #[test]
    fn test_updater_sees_earlier_patches_and_props() {
        let current = Rc::new(state(json!({ "count": 1 })));
        let props = state(json!({ "step": 10 }));
        let merged = merge_states(
            &current,
            vec![
                json!({ "count": 5 }).into(),
                StatePatch::updater(|snapshot, props| {
                    let count = snapshot["count"].as_i64().unwrap_or_default();
                    let step = props["step"].as_i64().unwrap_or_default();
                    state(json!({ "count": count + step }))
                }),
            ],
            &props,
        );

        assert_eq!(merged["count"], json!(15));
    }

    #[test]
    fn test_non_object_patch_is_empty() {
        let current = Rc::new(state(json!({ "x": true })));
        let merged = merge_states(&current, vec![json!(42).into()], &Props::new());
        assert_eq!(*merged, *current);
    }
}
