mod arena;
mod jobs;
mod phase;
mod state;

pub use arena::{SharedUnit, UnitArena, UnitHandle};
pub use jobs::{Job, JobQueue};
pub use phase::{PhaseEvent, UnitPhase};
pub use state::{StatePatch, UpdateCallback, UpdateRequest, merge_states};

use crate::component::{Component, ComponentType, Context, Props, State};
use crate::error::CapturedError;
use crate::node::{NodeId, NodeSnapshot};
use smartstring::alias::String as SmartString;
use std::cell::RefCell;
use std::rc::Rc;

/// Props, state and context as the instance currently sees them
#[derive(Debug, Clone)]
pub struct Committed {
    pub props: Rc<Props>,
    pub state: Rc<State>,
    pub context: Rc<Context>,
}

/// A props/context delivery from the parent that the next hydrate must apply
#[derive(Debug, Clone)]
pub struct Receiving {
    pub next_context: Rc<Context>,
}

/// Per-instance lifecycle driver.
///
/// Everything here is mutated only by the jobs in `cycle.rs` and by update
/// requests; the instance itself lives behind its own `RefCell` so hooks can
/// run while the unit record is free to be updated.
pub struct UpdateUnit {
    pub(crate) name: SmartString,
    pub(crate) component_type: ComponentType,
    pub(crate) instance: Rc<RefCell<Box<dyn Component>>>,
    pub(crate) node: NodeId,
    pub(crate) pending_node: Option<NodeSnapshot>,

    // latest known values; committed onto the instance by hydrate
    pub(crate) props: Rc<Props>,
    pub(crate) context: Rc<Context>,
    pub(crate) parent_context: Rc<Context>,
    pub(crate) committed: Committed,

    pub(crate) pending_states: Vec<StatePatch>,
    pub(crate) pending_callbacks: Vec<UpdateCallback>,
    pub(crate) jobs: JobQueue,
    pub(crate) phase: UnitPhase,

    pub(crate) mounted: bool,
    pub(crate) needs_render_next_cycle: bool,
    pub(crate) force_update: bool,
    pub(crate) receiving: Option<Receiving>,
    pub(crate) caught: Option<CapturedError>,
    pub(crate) hooks_disabled: bool,
    pub(crate) entry_points_revoked: bool,
    pub(crate) reuse_output: bool,
    /// Props/state before the render that is waiting for its did-update hook
    pub(crate) hook_args: Option<(Rc<Props>, Rc<State>)>,

    pub(crate) boundary: bool,
    pub(crate) stateless: bool,
    pub(crate) mount_order: u64,
    pub(crate) last_children: Vec<NodeId>,
    pub(crate) next_children: Vec<NodeId>,
}

impl UpdateUnit {
    pub(crate) fn new(
        component_type: ComponentType,
        instance: Box<dyn Component>,
        node: NodeId,
        props: Rc<Props>,
        context: Rc<Context>,
        parent_context: Rc<Context>,
        mount_order: u64,
    ) -> Self {
        let stateless = instance.is_stateless();
        let state = if stateless {
            State::new()
        } else {
            instance.initial_state(&props)
        };
        let boundary = instance.catches_errors();

        Self {
            name: component_type.name().into(),
            component_type,
            instance: Rc::new(RefCell::new(instance)),
            node,
            pending_node: None,
            committed: Committed {
                props: Rc::clone(&props),
                state: Rc::new(state),
                context: Rc::clone(&context),
            },
            props,
            context,
            parent_context,
            pending_states: Vec::new(),
            pending_callbacks: Vec::new(),
            // the first pass renders during mount and only needs resolving
            jobs: JobQueue::with_job(Job::Resolve),
            phase: UnitPhase::Idle,
            mounted: false,
            needs_render_next_cycle: false,
            force_update: false,
            receiving: None,
            caught: None,
            hooks_disabled: false,
            entry_points_revoked: false,
            reuse_output: false,
            hook_args: None,
            boundary,
            stateless,
            mount_order,
            last_children: Vec::new(),
            next_children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn phase(&self) -> UnitPhase {
        self.phase
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn mount_order(&self) -> u64 {
        self.mount_order
    }

    pub fn jobs(&self) -> &[Job] {
        self.jobs.as_slice()
    }

    pub fn component_type(&self) -> &ComponentType {
        &self.component_type
    }

    /// Move to the phase `event` leads to. Disallowed transitions are logged and ignored.
    pub(crate) fn advance(&mut self, event: PhaseEvent) {
        match self.phase.transition(event) {
            Some(next) => self.phase = next,
            None => tracing::warn!(
                "<{}> ignored {:?} while {:?}",
                self.name,
                event,
                self.phase
            ),
        }
    }

    /// Fold the queued patches into a new snapshot, clearing the queue.
    ///
    /// The merge closures run while the unit is not borrowed: callers pass
    /// in what `take_merge_input` handed out.
    pub(crate) fn take_merge_input(&mut self) -> (Rc<State>, Vec<StatePatch>, Rc<Props>) {
        let pending = std::mem::take(&mut self.pending_states);
        if self.stateless {
            return (Rc::clone(&self.committed.state), Vec::new(), Rc::clone(&self.props));
        }
        (Rc::clone(&self.committed.state), pending, Rc::clone(&self.props))
    }

    pub(crate) fn swap_pending_node(&mut self) -> Option<NodeSnapshot> {
        self.pending_node.take()
    }
}
