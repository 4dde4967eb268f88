//! The jobs an update unit runs: hydrate, render, resolve and dispose, plus
//! the mount and receive entry points the diff uses to drive composites.

use crate::component::{ComponentType, Context, LifecycleHook};
use crate::context::{resolve_child_context, select_context_by_keys};
use crate::diff::ChildList;
use crate::error::UpdateError;
use crate::node::{Element, NodeId, NodeSnapshot, RenderShape, Rendered, VNode};
use crate::refs::{NodeRef, RefTarget};
use crate::scheduler::UpdateBatch;
use crate::tree::UpdateTree;
use crate::unit::{
    Committed, Job, PhaseEvent, Receiving, SharedUnit, UnitHandle, UnitPhase, UpdateUnit,
    merge_states,
};
use std::rc::Rc;
use tracing::{debug, trace};

fn alive(unit: &SharedUnit) -> bool {
    !unit.borrow().phase.is_disposed()
}

impl UpdateTree {
    /// Run the next job of one unit. A unit with jobs left goes back on the batch.
    pub(crate) fn exec(&self, handle: UnitHandle) {
        let Some(unit) = self.unit(handle) else {
            return;
        };
        let job = {
            let mut unit = unit.borrow_mut();
            if unit.phase.is_disposed() {
                return;
            }
            unit.jobs.shift()
        };
        let batch = self.scheduler.batch();
        match job {
            Some(Job::Hydrate) => self.hydrate(handle, batch),
            Some(Job::Resolve) => self.resolve(handle, batch),
            Some(Job::Dispose) => self.dispose(handle),
            None => return,
        }
        let more = self
            .unit(handle)
            .is_some_and(|unit| alive(&unit) && !unit.borrow().jobs.is_empty());
        if more {
            batch.push(handle);
        }
    }

    /// Create the unit for a composite element and run its first render.
    ///
    /// The unit starts with a single resolve job and is pushed onto `batch`
    /// after its subtree, so children resolve before their parent.
    pub fn mount_composite(
        &self,
        ty: &ComponentType,
        element: Element,
        parent: NodeId,
        parent_context: &Rc<Context>,
        batch: &UpdateBatch,
    ) -> NodeId {
        // children of a composite element are not rendered; data goes through props
        let (vnode, _children) = VNode::from_element(element);
        let props = Rc::clone(&vnode.props);
        let node = self.nodes.borrow_mut().create(vnode, Some(parent));

        let context = Rc::new(select_context_by_keys(
            Some(parent_context.as_ref()),
            ty.context_keys(),
        ));
        let instance = ty.construct(&props, &context);
        let unit = UpdateUnit::new(
            ty.clone(),
            instance,
            node,
            props,
            context,
            Rc::clone(parent_context),
            self.next_mount_order(),
        );
        let handle = self.units.borrow_mut().insert(unit);
        self.nodes.borrow_mut().set_unit(node, Some(handle));
        debug!("mounting <{}> as {:?}", ty.name(), handle);

        if let Some(unit) = self.unit(handle) {
            unit.borrow_mut().advance(PhaseEvent::Render);
        }
        self.render_job(handle, batch);
        batch.push(handle);
        node
    }

    /// Deliver a parent's re-render to an existing unit and hydrate it in place.
    pub fn receive(
        &self,
        handle: UnitHandle,
        snapshot: NodeSnapshot,
        parent_context: &Rc<Context>,
        batch: &UpdateBatch,
    ) {
        let Some(unit) = self.unit(handle) else {
            return;
        };
        {
            let mut unit = unit.borrow_mut();
            if unit.phase.is_disposed() {
                return;
            }
            let next_context = match unit.component_type.context_keys() {
                Some(keys) => {
                    let selected = select_context_by_keys(Some(parent_context.as_ref()), Some(keys));
                    if selected == *unit.context {
                        Rc::clone(&unit.context)
                    } else {
                        Rc::new(selected)
                    }
                }
                None => Rc::clone(&unit.context),
            };
            let same_ref = self.nodes.borrow().get(unit.node).is_some_and(|node| {
                NodeRef::same(node.node_ref.as_ref(), snapshot.node_ref.as_ref())
            });
            let changed = *unit.props != *snapshot.props
                || !Rc::ptr_eq(&unit.context, &next_context)
                || !same_ref;

            if changed {
                unit.receiving = Some(Receiving {
                    next_context: Rc::clone(&next_context),
                });
                unit.reuse_output = false;
            } else {
                unit.reuse_output = self.config.reuse_unchanged_output
                    && unit.pending_states.is_empty()
                    && !unit.force_update
                    && *unit.parent_context == **parent_context;
            }
            unit.props = Rc::clone(&snapshot.props);
            unit.context = next_context;
            unit.parent_context = Rc::clone(parent_context);
            unit.pending_node = Some(snapshot);
            unit.jobs.remove(Job::Hydrate);
        }
        self.hydrate(handle, batch);
    }

    /// Merge pending state, run the guard hooks, commit, and render if allowed.
    pub(crate) fn hydrate(&self, handle: UnitHandle, batch: &UpdateBatch) {
        let Some(unit) = self.unit(handle) else {
            return;
        };
        if !alive(&unit) {
            return;
        }

        let receiving = unit.borrow().receiving.clone();
        if let Some(receiving) = receiving {
            let next_props = Rc::clone(&unit.borrow().props);
            self.invoke_guarded(handle, LifecycleHook::WillReceiveProps, |instance, scope| {
                instance.component_will_receive_props(scope, &next_props, &receiving.next_context)
            });
            let stale_ref = {
                let mut unit = unit.borrow_mut();
                unit.receiving = None;
                let next_ref = unit.pending_node.as_ref().map(|pending| pending.node_ref.clone());
                let current_ref = self
                    .nodes
                    .borrow()
                    .get(unit.node)
                    .and_then(|node| node.node_ref.clone());
                match (current_ref, next_ref) {
                    (Some(current), Some(next)) if !NodeRef::same(Some(&current), next.as_ref()) => {
                        Some((unit.node, current))
                    }
                    _ => None,
                }
            };
            if let Some((node, node_ref)) = stale_ref {
                self.refs.detach(node, &node_ref);
            }
        }
        if !alive(&unit) {
            return;
        }

        let (current, pending, props) = unit.borrow_mut().take_merge_input();
        let next_state = merge_states(&current, pending, &props);
        let (force, next_props, next_context, name) = {
            let unit = unit.borrow();
            (
                unit.force_update,
                Rc::clone(&unit.props),
                Rc::clone(&unit.context),
                unit.name.clone(),
            )
        };

        let should_render = force
            || self
                .invoke_guarded(handle, LifecycleHook::ShouldUpdate, |instance, scope| {
                    instance.should_component_update(scope, &next_props, &next_state, &next_context)
                })
                .unwrap_or(false);

        if should_render {
            self.invoke_guarded(handle, LifecycleHook::WillUpdate, |instance, scope| {
                instance.component_will_update(scope, &next_props, &next_state, &next_context)
            });
            let mut unit = unit.borrow_mut();
            unit.hook_args = Some((
                Rc::clone(&unit.committed.props),
                Rc::clone(&unit.committed.state),
            ));
        } else {
            debug!("<{}> declined to render", name);
            unit.borrow_mut().reuse_output = false;
            self.swap_pending_node(&unit);
        }

        {
            let mut unit = unit.borrow_mut();
            if unit.phase.is_disposed() {
                return;
            }
            unit.force_update = false;
            unit.committed = Committed {
                props: next_props,
                state: next_state,
                context: next_context,
            };
            unit.jobs.push(Job::Resolve);
            if should_render {
                unit.advance(PhaseEvent::Render);
            }
        }
        if should_render {
            self.render_job(handle, batch);
        }
        batch.push(handle);
    }

    /// Call render, turn the output into child elements, and hand them to the diff.
    pub(crate) fn render_job(&self, handle: UnitHandle, batch: &UpdateBatch) {
        let Some(unit) = self.unit(handle) else {
            return;
        };
        self.swap_pending_node(&unit);
        let (reuse, node, name, parent_context) = {
            let mut unit = unit.borrow_mut();
            (
                std::mem::take(&mut unit.reuse_output),
                unit.node,
                unit.name.clone(),
                Rc::clone(&unit.parent_context),
            )
        };
        let previous = self.children(node);

        let (children, child_context) = if reuse {
            trace!("<{}> reuses its previous output", name);
            (ChildList::Reuse, parent_context)
        } else {
            let owner = self.refs.set_current_owner(Some(handle));
            let rendered = self.invoke_guarded(handle, LifecycleHook::Render, |instance, scope| {
                instance.render(scope)
            });
            self.refs.set_current_owner(owner);
            // a failed render still reconciles, as if it rendered nothing
            let rendered = rendered.unwrap_or(Rendered::Bool(true));

            match rendered.shape() {
                RenderShape::Empty => (ChildList::Elements(Vec::new()), parent_context),
                RenderShape::Unsupported(shape) => {
                    self.report_error(
                        Some(handle),
                        UpdateError::RenderShape {
                            component: name,
                            shape,
                        },
                    );
                    (ChildList::Elements(Vec::new()), parent_context)
                }
                shape => {
                    let child_context = if shape.introduces_context() {
                        self.child_context(handle, &parent_context)
                    } else {
                        parent_context
                    };
                    let elements = match self.normalizer.to_child_list(rendered, Some(handle)) {
                        Ok(elements) => elements,
                        Err(unsupported) => {
                            self.report_error(
                                Some(handle),
                                UpdateError::RenderShape {
                                    component: name,
                                    shape: unsupported.0,
                                },
                            );
                            Vec::new()
                        }
                    };
                    (ChildList::Elements(elements), child_context)
                }
            }
        };

        self.diff
            .reconcile(self, &previous, children, node, &child_context, batch);

        let next = self.children(node);
        let mut unit = unit.borrow_mut();
        unit.last_children = previous;
        unit.next_children = next;
    }

    /// Finish a cycle: commit hooks, error recovery, refs, and the follow-up pass.
    pub(crate) fn resolve(&self, handle: UnitHandle, batch: &UpdateBatch) {
        let Some(unit) = self.unit(handle) else {
            return;
        };
        let (was_mounted, hydrating, node, name) = {
            let mut unit = unit.borrow_mut();
            let was_mounted = unit.mounted;
            unit.mounted = true;
            (
                was_mounted,
                unit.phase == UnitPhase::Hydrating,
                unit.node,
                unit.name.clone(),
            )
        };

        if hydrating {
            if was_mounted {
                let (prev_props, prev_state) = {
                    let mut unit = unit.borrow_mut();
                    let fallback = (
                        Rc::clone(&unit.committed.props),
                        Rc::clone(&unit.committed.state),
                    );
                    unit.hook_args.take().unwrap_or(fallback)
                };
                self.invoke_guarded(handle, LifecycleHook::DidUpdate, |instance, scope| {
                    instance.component_did_update(scope, &prev_props, &prev_state)
                });
                self.observer.after_update(handle, &name);
            } else {
                unit.borrow_mut().hook_args = None;
                self.invoke_guarded(handle, LifecycleHook::DidMount, |instance, scope| {
                    instance.component_did_mount(scope)
                });
                self.observer.after_mount(handle, &name);
            }
        }
        if !alive(&unit) {
            return;
        }
        unit.borrow_mut().advance(PhaseEvent::Resolve);

        let caught = unit.borrow_mut().caught.take();
        if let Some(captured) = caught {
            let ancestors: Vec<UnitHandle> = {
                let nodes = self.nodes.borrow();
                nodes
                    .ancestors(node)
                    .filter_map(|ancestor| nodes.unit_of(ancestor))
                    .collect()
            };
            for ancestor in ancestors {
                if let Some(ancestor_unit) = self.unit(ancestor) {
                    ancestor_unit.borrow_mut().jobs.push(Job::Resolve);
                    batch.push(ancestor);
                }
            }

            debug!("<{}> recovering from {}", name, captured.error);
            unit.borrow_mut().advance(PhaseEvent::Unwind);
            self.invoke_guarded(handle, LifecycleHook::DidCatch, |instance, scope| {
                instance.component_did_catch(scope, &captured.error, &captured.info)
            });
            if !alive(&unit) {
                return;
            }
            unit.borrow_mut().advance(PhaseEvent::Recover);
        } else {
            // refs attach even when one of the unit's own hooks failed
            let target = {
                let unit = unit.borrow();
                let attachment = (!unit.stateless).then_some(RefTarget::Component(handle));
                self.nodes
                    .borrow()
                    .get(node)
                    .and_then(|vnode| vnode.node_ref.clone())
                    .map(|node_ref| (node_ref, attachment))
            };
            if let Some((node_ref, attachment)) = target {
                self.refs.fire(node, &node_ref, attachment);
            }
        }

        let follow_up = {
            let mut unit = unit.borrow_mut();
            if unit.phase.is_disposed() {
                return;
            }
            unit.advance(PhaseEvent::Settle);
            let follow_up = std::mem::take(&mut unit.needs_render_next_cycle);
            if follow_up {
                unit.jobs.push(Job::Hydrate);
            }
            follow_up
        };
        if follow_up {
            trace!("<{}> renders again for updates raised during its cycle", name);
            batch.push(handle);
        }
        self.scheduler.note_resolved(handle);
    }

    /// Tear a unit down. Called by the diff when its node leaves the tree;
    /// every later update request on the unit is ignored.
    pub fn dispose(&self, handle: UnitHandle) {
        let Some(unit) = self.unit(handle) else {
            return;
        };
        let (node, name) = {
            let unit = unit.borrow();
            if unit.phase.is_disposed() {
                return;
            }
            (unit.node, unit.name.clone())
        };
        debug!("disposing <{}>", name);
        self.observer.before_unmount(handle, &name);
        unit.borrow_mut().entry_points_revoked = true;

        let node_ref = self
            .nodes
            .borrow()
            .get(node)
            .and_then(|vnode| vnode.node_ref.clone());
        if let Some(node_ref) = node_ref {
            self.refs.fire(node, &node_ref, None);
        }
        self.invoke_guarded(handle, LifecycleHook::WillUnmount, |instance, scope| {
            instance.component_will_unmount(scope)
        });

        {
            let mut unit = unit.borrow_mut();
            unit.mounted = false;
            unit.needs_render_next_cycle = false;
            unit.jobs.clear();
            unit.pending_states.clear();
            unit.pending_callbacks.clear();
            unit.last_children.clear();
            unit.next_children.clear();
            unit.advance(PhaseEvent::Dispose);
        }
        self.nodes.borrow_mut().detach_children(node);
    }

    fn child_context(&self, handle: UnitHandle, parent: &Rc<Context>) -> Rc<Context> {
        let contribution = self
            .invoke_guarded(handle, LifecycleHook::ChildContext, |instance, scope| {
                Ok(instance.child_context(scope))
            })
            .flatten();
        resolve_child_context(contribution, parent)
    }

    /// Move a queued node snapshot onto the unit's arena node.
    fn swap_pending_node(&self, unit: &SharedUnit) {
        let (node, snapshot) = {
            let mut unit = unit.borrow_mut();
            (unit.node, unit.swap_pending_node())
        };
        if let Some(snapshot) = snapshot {
            if let Some(vnode) = self.nodes.borrow_mut().get_mut(node) {
                vnode.apply(snapshot);
            }
        }
    }
}
