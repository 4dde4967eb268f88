use crate::component::{Context, LifecycleHook, Props, State};
use crate::config::{UpdateMode, UpdaterConfig};
use crate::diff::{ChildList, KeyedDiff, TreeDiff};
use crate::error::{CapturedError, ErrorInfo, UpdateError};
use crate::node::{Element, NodeArena, NodeId, VNode};
use crate::normalize::{ChildNormalizer, Normalizer};
use crate::observer::{LifecycleObserver, NoopObserver};
use crate::refs::{RefRegistry, Refs};
use crate::scheduler::{Drained, Scheduler};
use crate::unit::{
    Job, SharedUnit, StatePatch, UnitArena, UnitHandle, UnitPhase, UpdateCallback, UpdateRequest,
};
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::rc::Rc;
use tracing::{debug, error, trace};

pub const ROOT_TAG: &str = "#root";

/// Owns the node and unit arenas plus the collaborators, and is the entry
/// point for every update request.
///
/// All state sits behind `Cell`/`RefCell` so lifecycle hooks can call back
/// into the tree through a shared reference. Borrows are never held across
/// a hook call.
pub struct UpdateTree {
    pub(crate) config: UpdaterConfig,
    pub(crate) nodes: RefCell<NodeArena>,
    pub(crate) units: RefCell<UnitArena>,
    pub(crate) scheduler: Scheduler,
    mount_counter: Cell<u64>,
    pub(crate) uncaught: RefCell<Vec<CapturedError>>,
    root: Cell<Option<NodeId>>,
    pub(crate) refs: Box<dyn RefRegistry>,
    pub(crate) normalizer: Box<dyn Normalizer>,
    pub(crate) diff: Box<dyn TreeDiff>,
    pub(crate) observer: Box<dyn LifecycleObserver>,
}

impl UpdateTree {
    pub fn new(config: UpdaterConfig) -> Self {
        Self {
            config,
            nodes: RefCell::new(NodeArena::new()),
            units: RefCell::new(UnitArena::new()),
            scheduler: Scheduler::new(),
            mount_counter: Cell::new(0),
            uncaught: RefCell::new(Vec::new()),
            root: Cell::new(None),
            refs: Box::new(Refs::new()),
            normalizer: Box::new(ChildNormalizer),
            diff: Box::new(KeyedDiff),
            observer: Box::new(NoopObserver),
        }
    }

    pub fn with_refs(mut self, refs: impl RefRegistry + 'static) -> Self {
        self.refs = Box::new(refs);
        self
    }

    pub fn with_normalizer(mut self, normalizer: impl Normalizer + 'static) -> Self {
        self.normalizer = Box::new(normalizer);
        self
    }

    pub fn with_diff(mut self, diff: impl TreeDiff + 'static) -> Self {
        self.diff = Box::new(diff);
        self
    }

    pub fn with_observer(mut self, observer: impl LifecycleObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    /// Mount `element` under the root container, or reconcile it against
    /// what is already mounted there.
    pub fn render(&self, element: Element) -> NodeId {
        let root = match self.root.get() {
            Some(root) => root,
            None => {
                let root = self.nodes.borrow_mut().create(VNode::host(ROOT_TAG), None);
                self.root.set(Some(root));
                root
            }
        };
        debug!("rendering <{}> into {:?}", element.kind.name(), root);

        let outermost = self.scheduler.begin_drain();
        let previous = self.children(root);
        let context = Rc::new(Context::new());
        self.diff.reconcile(
            self,
            &previous,
            ChildList::Elements(vec![element]),
            root,
            &context,
            self.scheduler.batch(),
        );
        if outermost {
            let drained = self
                .scheduler
                .run_batch(self.config.max_drain_steps, |handle| self.exec(handle));
            self.finish_drain(drained);
        }
        root
    }

    /// Unmount everything under the root container.
    pub fn unmount(&self) {
        let Some(root) = self.root.take() else {
            return;
        };
        debug!("unmounting tree at {:?}", root);

        let outermost = self.scheduler.begin_drain();
        let previous = self.children(root);
        self.diff.reconcile(
            self,
            &previous,
            ChildList::Elements(Vec::new()),
            root,
            &Rc::new(Context::new()),
            self.scheduler.batch(),
        );
        self.nodes.borrow_mut().dispose(root);
        if outermost {
            let drained = self
                .scheduler
                .run_batch(self.config.max_drain_steps, |handle| self.exec(handle));
            self.finish_drain(drained);
        }
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root.get()
    }

    /// Queue a state patch or a forced render on a unit.
    ///
    /// Never fails: requests on disposed or unknown units, requests raised
    /// while the unit receives new props, and requests on a unit that has
    /// not started its first render are dropped.
    pub fn request_update(
        &self,
        handle: UnitHandle,
        request: UpdateRequest,
        callback: Option<UpdateCallback>,
    ) {
        let Some(unit) = self.unit(handle) else {
            trace!("update for released unit {:?} ignored", handle);
            return;
        };

        let batching = self.config.mode == UpdateMode::Batched || self.scheduler.is_batching();
        let admission = {
            let mut unit = unit.borrow_mut();
            if unit.entry_points_revoked || unit.phase.is_disposed() {
                trace!("update for disposed <{}> ignored", unit.name);
                return;
            }
            if unit.mounted && unit.receiving.is_some() {
                trace!("update raised while <{}> receives props dropped", unit.name);
                return;
            }
            let deferred = !batching && unit.phase.defers_updates();
            if !batching && !unit.mounted && !deferred {
                trace!("update for <{}> before its first render dropped", unit.name);
                return;
            }

            if let Some(callback) = callback {
                unit.pending_callbacks.push(callback);
            }
            match request {
                UpdateRequest::SetState(patch) => unit.pending_states.push(patch),
                UpdateRequest::Force => unit.force_update = true,
            }

            if batching {
                Admission::Enqueue
            } else if deferred {
                trace!("update for <{}> deferred to the next cycle", unit.name);
                unit.needs_render_next_cycle = true;
                Admission::Deferred
            } else if unit.jobs.push(Job::Hydrate) {
                Admission::Drain
            } else {
                // hydrate is already the next thing this unit does
                Admission::Deferred
            }
        };

        match admission {
            Admission::Enqueue => self.scheduler.enqueue(handle),
            Admission::Deferred => {}
            Admission::Drain => self.drain(&[handle]),
        }
    }

    pub fn set_state(&self, handle: UnitHandle, patch: impl Into<StatePatch>) {
        self.request_update(handle, UpdateRequest::SetState(patch.into()), None);
    }

    pub fn force_update(&self, handle: UnitHandle) {
        self.request_update(handle, UpdateRequest::Force, None);
    }

    /// Run every update registered since the last flush, in mount order.
    pub fn flush(&self) {
        let mut dirty = self.scheduler.take_dirty();
        if dirty.is_empty() {
            return;
        }
        dirty.retain(|handle| {
            self.unit(*handle).is_some_and(|unit| {
                let unit = unit.borrow();
                unit.mounted && !unit.phase.is_disposed()
            })
        });
        dirty.sort_by_key(|handle| self.mount_order(*handle).unwrap_or(u64::MAX));
        debug!("flushing {} batched units", dirty.len());

        let seeds: Vec<UnitHandle> = dirty
            .into_iter()
            .filter(|handle| {
                self.unit(*handle).is_some_and(|unit| {
                    let queued = unit.borrow_mut().jobs.push(Job::Hydrate);
                    queued
                })
            })
            .collect();
        self.drain(&seeds);
    }

    /// Run `f` with update requests batched; the outermost call flushes on exit.
    pub fn batch_updates<R>(&self, f: impl FnOnce() -> R) -> R {
        self.scheduler.enter_batch();
        let result = f();
        if self.scheduler.exit_batch() {
            self.flush();
        }
        result
    }

    /// Failures that found no error boundary, oldest first.
    pub fn take_uncaught_errors(&self) -> Vec<CapturedError> {
        std::mem::take(&mut *self.uncaught.borrow_mut())
    }

    pub(crate) fn drain(&self, units: &[UnitHandle]) {
        let drained = self
            .scheduler
            .drain(units, self.config.max_drain_steps, |handle| self.exec(handle));
        self.finish_drain(drained);
    }

    fn finish_drain(&self, drained: Drained) {
        match drained {
            Drained::Appended => return,
            Drained::Completed { steps } => trace!("drain finished after {} jobs", steps),
            Drained::Aborted { steps, abandoned } => {
                error!(
                    "drain aborted after {} jobs, dropping {} queued units",
                    steps,
                    abandoned.len()
                );
                for handle in abandoned {
                    if let Some(unit) = self.unit(handle) {
                        unit.borrow_mut().jobs.clear();
                    }
                }
                self.uncaught.borrow_mut().push(CapturedError {
                    error: Rc::new(UpdateError::DrainLimitExceeded { steps }),
                    info: ErrorInfo::new::<&str>(LifecycleHook::Render, &[]),
                });
            }
        }
        self.deliver_callbacks();
    }

    /// Run the callbacks queued on every unit that resolved during the last drain.
    fn deliver_callbacks(&self) {
        for handle in self.scheduler.take_resolved() {
            let callbacks = match self.unit(handle) {
                Some(unit) => std::mem::take(&mut unit.borrow_mut().pending_callbacks),
                None => continue,
            };
            for callback in callbacks {
                callback();
            }
        }
    }

    pub(crate) fn next_mount_order(&self) -> u64 {
        let order = self.mount_counter.get();
        self.mount_counter.set(order + 1);
        order
    }

    pub(crate) fn unit(&self, handle: UnitHandle) -> Option<SharedUnit> {
        self.units.borrow().get(handle)
    }

    /// Drop a disposed unit from the arena; its handle goes stale.
    pub fn release_unit(&self, handle: UnitHandle) {
        if self.units.borrow_mut().release(handle).is_some() {
            trace!("released {:?}", handle);
        }
    }

    pub fn nodes(&self) -> Ref<'_, NodeArena> {
        self.nodes.borrow()
    }

    pub fn nodes_mut(&self) -> RefMut<'_, NodeArena> {
        self.nodes.borrow_mut()
    }

    pub fn refs(&self) -> &dyn RefRegistry {
        self.refs.as_ref()
    }

    pub fn normalizer(&self) -> &dyn Normalizer {
        self.normalizer.as_ref()
    }

    // Introspection

    pub fn state(&self, handle: UnitHandle) -> Option<Rc<State>> {
        self.unit(handle)
            .map(|unit| Rc::clone(&unit.borrow().committed.state))
    }

    pub fn props(&self, handle: UnitHandle) -> Option<Rc<Props>> {
        self.unit(handle)
            .map(|unit| Rc::clone(&unit.borrow().committed.props))
    }

    pub fn context(&self, handle: UnitHandle) -> Option<Rc<Context>> {
        self.unit(handle)
            .map(|unit| Rc::clone(&unit.borrow().committed.context))
    }

    pub fn phase(&self, handle: UnitHandle) -> Option<UnitPhase> {
        self.unit(handle).map(|unit| unit.borrow().phase)
    }

    pub fn is_mounted(&self, handle: UnitHandle) -> bool {
        self.unit(handle).is_some_and(|unit| unit.borrow().mounted)
    }

    pub fn mount_order(&self, handle: UnitHandle) -> Option<u64> {
        self.unit(handle).map(|unit| unit.borrow().mount_order)
    }

    pub fn pending_jobs(&self, handle: UnitHandle) -> Vec<Job> {
        self.unit(handle)
            .map(|unit| unit.borrow().jobs.as_slice().to_vec())
            .unwrap_or_default()
    }

    pub fn name_of(&self, handle: UnitHandle) -> Option<String> {
        self.unit(handle).map(|unit| unit.borrow().name.to_string())
    }

    pub fn node_of(&self, handle: UnitHandle) -> Option<NodeId> {
        self.unit(handle).map(|unit| unit.borrow().node)
    }

    pub fn unit_of(&self, node: NodeId) -> Option<UnitHandle> {
        self.nodes.borrow().unit_of(node)
    }

    /// Live units rendering the component named `name`, in mount order.
    pub fn find_units(&self, name: &str) -> Vec<UnitHandle> {
        let mut found: Vec<(u64, UnitHandle)> = self
            .units
            .borrow()
            .iter()
            .filter_map(|(handle, unit)| {
                let unit = unit.borrow();
                (unit.name.as_str() == name && !unit.phase.is_disposed()).then_some((unit.mount_order, handle))
            })
            .collect();
        found.sort_by_key(|(order, _)| *order);
        found.into_iter().map(|(_, handle)| handle).collect()
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes.borrow().children(node).to_vec()
    }
}

enum Admission {
    Enqueue,
    Deferred,
    Drain,
}

impl Default for UpdateTree {
    fn default() -> Self {
        Self::new(UpdaterConfig::default())
    }
}
