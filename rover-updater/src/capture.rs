use crate::component::{Component, LifecycleHook, Scope};
use crate::error::{CapturedError, ErrorInfo, UpdateError};
use crate::tree::UpdateTree;
use crate::unit::{Job, UnitHandle};
use smartstring::alias::String as SmartString;
use std::rc::Rc;
use tracing::{debug, error, trace, warn};

/// Where a failure ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    Boundary(UnitHandle),
    Uncaught,
}

impl UpdateTree {
    /// Call one lifecycle hook on the unit's instance.
    ///
    /// Returns `None` when the hook failed (the failure is recorded and
    /// routed to a boundary), when the instance already had a hook fail, or
    /// when the instance is still inside another hook.
    pub(crate) fn invoke_guarded<T, F>(&self, handle: UnitHandle, hook: LifecycleHook, call: F) -> Option<T>
    where
        F: FnOnce(&mut dyn Component, &Scope<'_>) -> anyhow::Result<T>,
    {
        let unit = self.unit(handle)?;
        let (instance, props, state, context, name) = {
            let unit = unit.borrow();
            if unit.hooks_disabled {
                trace!("skipping {} on failed <{}>", hook, unit.name);
                return None;
            }
            (
                Rc::clone(&unit.instance),
                Rc::clone(&unit.committed.props),
                Rc::clone(&unit.committed.state),
                Rc::clone(&unit.committed.context),
                unit.name.clone(),
            )
        };

        let outcome = {
            let Ok(mut instance) = instance.try_borrow_mut() else {
                self.push_error(handle, UpdateError::Reentrant { component: name, hook });
                return None;
            };
            let scope = Scope::new(self, handle, &props, &state, &context);
            call(&mut **instance, &scope)
        };

        match outcome {
            Ok(value) => Some(value),
            Err(cause) => {
                self.push_error(
                    handle,
                    UpdateError::Hook {
                        component: name,
                        hook,
                        cause,
                    },
                );
                None
            }
        }
    }

    /// Record a failure that did not come out of a guarded hook, such as
    /// render output with no child form. `None` means no unit owns the
    /// failing node and the failure is reported as uncaught.
    pub fn report_error(&self, handle: Option<UnitHandle>, error: UpdateError) -> Routed {
        match handle {
            Some(handle) => self.push_error(handle, error),
            None => {
                let hook = error.hook().unwrap_or(LifecycleHook::Render);
                self.record_uncaught(CapturedError {
                    error: Rc::new(error),
                    info: ErrorInfo::new::<&str>(hook, &[]),
                });
                Routed::Uncaught
            }
        }
    }

    /// Disable the failing instance's hooks and hand the failure to the
    /// nearest boundary above it.
    ///
    /// Every composite unit between the failure and the boundary, and the
    /// boundary itself, gets a resolve job so the subtree settles before the
    /// boundary's recovery hook runs.
    pub(crate) fn push_error(&self, handle: UnitHandle, error: UpdateError) -> Routed {
        let hook = error.hook().unwrap_or(LifecycleHook::Render);
        let Some(unit) = self.unit(handle) else {
            self.record_uncaught(CapturedError {
                error: Rc::new(error),
                info: ErrorInfo::new::<&str>(hook, &[]),
            });
            return Routed::Uncaught;
        };
        let (node, name) = {
            let mut unit = unit.borrow_mut();
            unit.hooks_disabled = true;
            (unit.node, unit.name.clone())
        };

        let mut names: Vec<SmartString> = vec![name];
        let mut intervening = Vec::new();
        let mut boundary = None;
        let ancestors: Vec<UnitHandle> = {
            let nodes = self.nodes.borrow();
            nodes
                .ancestors(node)
                .filter_map(|ancestor| nodes.unit_of(ancestor))
                .collect()
        };
        for ancestor in ancestors {
            let Some(unit) = self.unit(ancestor) else {
                continue;
            };
            let unit = unit.borrow();
            names.push(unit.name.clone());
            // a boundary being unmounted can no longer recover anything
            if unit.phase.is_disposed() {
                continue;
            }
            if unit.boundary && !unit.hooks_disabled {
                boundary = Some(ancestor);
                break;
            }
            intervening.push(ancestor);
        }

        let captured = CapturedError {
            error: Rc::new(error),
            info: ErrorInfo::new(hook, names.as_slice()),
        };
        let Some(boundary) = boundary else {
            self.record_uncaught(captured);
            return Routed::Uncaught;
        };

        if let Some(unit) = self.unit(boundary) {
            let mut unit = unit.borrow_mut();
            warn!("<{}> caught: {}", unit.name, captured);
            if unit.caught.is_none() {
                unit.caught = Some(captured);
            } else {
                debug!("<{}> already holds an error, keeping the first", unit.name);
            }
        }

        let batch = self.scheduler.batch();
        for handle in intervening.into_iter().chain(std::iter::once(boundary)) {
            if let Some(unit) = self.unit(handle) {
                unit.borrow_mut().jobs.push(Job::Resolve);
                batch.push(handle);
            }
        }
        Routed::Boundary(boundary)
    }

    fn record_uncaught(&self, captured: CapturedError) {
        error!("uncaught: {}", captured);
        self.uncaught.borrow_mut().push(captured);
    }
}
