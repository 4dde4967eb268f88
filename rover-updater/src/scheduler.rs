use crate::unit::UnitHandle;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};

/// Units waiting for the drain loop to run their next job.
///
/// A unit is queued at most once; pushing it again moves it to the back, so
/// it runs after whatever it queued in the meantime. Moving leaves a stale
/// entry behind that `pop` skips, so a push never scans the queue.
#[derive(Debug, Default)]
pub struct UpdateBatch {
    queue: RefCell<VecDeque<(UnitHandle, u64)>>,
    /// Stamp of each unit's live queue entry
    live: RefCell<HashMap<UnitHandle, u64>>,
    stamp: Cell<u64>,
}

impl UpdateBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, handle: UnitHandle) {
        let stamp = self.stamp.get() + 1;
        self.stamp.set(stamp);
        let queued = {
            let mut live = self.live.borrow_mut();
            live.insert(handle, stamp);
            live.len()
        };
        let mut queue = self.queue.borrow_mut();
        queue.push_back((handle, stamp));
        // drop stale entries once they outnumber the live ones
        if queue.len() > 2 * queued + 16 {
            let live = self.live.borrow();
            queue.retain(|(queued, stamp)| live.get(queued) == Some(stamp));
        }
    }

    pub fn extend(&self, handles: &[UnitHandle]) {
        for handle in handles {
            self.push(*handle);
        }
    }

    pub fn pop(&self) -> Option<UnitHandle> {
        let mut queue = self.queue.borrow_mut();
        let mut live = self.live.borrow_mut();
        while let Some((handle, stamp)) = queue.pop_front() {
            if live.get(&handle) == Some(&stamp) {
                live.remove(&handle);
                return Some(handle);
            }
        }
        None
    }

    pub fn contains(&self, handle: UnitHandle) -> bool {
        self.live.borrow().contains_key(&handle)
    }

    /// Empty the batch, returning what was still queued.
    pub fn clear(&self) -> Vec<UnitHandle> {
        let mut live = self.live.borrow_mut();
        let pending = self
            .queue
            .borrow_mut()
            .drain(..)
            .filter(|(handle, stamp)| live.get(handle) == Some(stamp))
            .map(|(handle, _)| handle)
            .collect();
        live.clear();
        pending
    }

    pub fn len(&self) -> usize {
        self.live.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.borrow().is_empty()
    }
}

/// How a call to [`Scheduler::drain`] ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Drained {
    /// A drain was already running; the units were appended to its batch.
    Appended,
    Completed { steps: usize },
    /// The step limit was hit. `abandoned` were still queued and have been dropped.
    Aborted {
        steps: usize,
        abandoned: Vec<UnitHandle>,
    },
}

/// Batches and drains update units.
///
/// There is exactly one running batch per tree. Drains requested while a
/// drain is running are flattened into it instead of recursing.
#[derive(Debug, Default)]
pub struct Scheduler {
    batch: UpdateBatch,
    /// Units registered while batching, waiting for `flush`
    dirty: RefCell<Vec<UnitHandle>>,
    depth: Cell<usize>,
    draining: Cell<bool>,
    /// Units that ran a resolve job during the current drain
    resolved: RefCell<Vec<UnitHandle>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batch(&self) -> &UpdateBatch {
        &self.batch
    }

    /// Register a unit for the next flush.
    pub fn enqueue(&self, handle: UnitHandle) {
        let mut dirty = self.dirty.borrow_mut();
        if !dirty.contains(&handle) {
            tracing::trace!("enqueued {:?} for the next flush", handle);
            dirty.push(handle);
        }
    }

    pub fn take_dirty(&self) -> Vec<UnitHandle> {
        std::mem::take(&mut *self.dirty.borrow_mut())
    }

    pub fn has_dirty(&self) -> bool {
        !self.dirty.borrow().is_empty()
    }

    pub fn enter_batch(&self) {
        self.depth.set(self.depth.get() + 1);
    }

    /// Leave a `batch_updates` scope. Returns true when it was the outermost one.
    pub fn exit_batch(&self) -> bool {
        let depth = self.depth.get().saturating_sub(1);
        self.depth.set(depth);
        depth == 0
    }

    pub fn is_batching(&self) -> bool {
        self.depth.get() > 0
    }

    pub fn is_draining(&self) -> bool {
        self.draining.get()
    }

    /// Claim the drain loop. Returns false when a drain is already running.
    pub fn begin_drain(&self) -> bool {
        !self.draining.replace(true)
    }

    pub fn note_resolved(&self, handle: UnitHandle) {
        let mut resolved = self.resolved.borrow_mut();
        if !resolved.contains(&handle) {
            resolved.push(handle);
        }
    }

    pub fn take_resolved(&self) -> Vec<UnitHandle> {
        std::mem::take(&mut *self.resolved.borrow_mut())
    }

    /// Queue `units` and run jobs until the batch is empty.
    pub fn drain<F>(&self, units: &[UnitHandle], max_steps: usize, exec: F) -> Drained
    where
        F: FnMut(UnitHandle),
    {
        self.batch.extend(units);
        if !self.begin_drain() {
            return Drained::Appended;
        }
        self.run_batch(max_steps, exec)
    }

    /// Drain loop proper. Must follow a successful `begin_drain`.
    pub fn run_batch<F>(&self, max_steps: usize, mut exec: F) -> Drained
    where
        F: FnMut(UnitHandle),
    {
        let mut steps = 0;
        let drained = loop {
            let Some(handle) = self.batch.pop() else {
                break Drained::Completed { steps };
            };
            if steps >= max_steps {
                let mut abandoned = vec![handle];
                abandoned.extend(self.batch.clear());
                break Drained::Aborted { steps, abandoned };
            }
            steps += 1;
            exec(handle);
        };
        self.draining.set(false);
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(index: u32) -> UnitHandle {
        UnitHandle::new(index, 0)
    }

    #[test]
    fn test_batch_moves_repeat_to_back() {
        let batch = UpdateBatch::new();
        batch.push(handle(1));
        batch.push(handle(2));
        batch.push(handle(1));

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.pop(), Some(handle(2)));
        assert_eq!(batch.pop(), Some(handle(1)));
        assert!(batch.is_empty());
    }

    #[test]
    fn test_batch_repeated_pushes_keep_one_entry() {
        let batch = UpdateBatch::new();
        for round in 0..1000 {
            batch.push(handle(round % 3));
        }
        batch.push(handle(7));
        batch.push(handle(0));

        assert_eq!(batch.len(), 4);
        assert!(batch.contains(handle(2)));
        assert!(batch.queue.borrow().len() < 64);
        assert_eq!(batch.pop(), Some(handle(1)));
        assert!(!batch.contains(handle(1)));
        assert_eq!(batch.clear(), vec![handle(2), handle(7), handle(0)]);
        assert!(batch.is_empty());
        assert_eq!(batch.pop(), None);
    }

    #[test]
    fn test_drain_runs_in_order() {
        let scheduler = Scheduler::new();
        let mut seen = Vec::new();
        let drained = scheduler.drain(&[handle(1), handle(2)], 10, |h| seen.push(h));

        assert_eq!(drained, Drained::Completed { steps: 2 });
        assert_eq!(seen, vec![handle(1), handle(2)]);
        assert!(!scheduler.is_draining());
    }

    #[test]
    fn test_nested_drain_is_flattened() {
        let scheduler = Scheduler::new();
        let mut seen = Vec::new();
        let drained = scheduler.drain(&[handle(1)], 10, |h| {
            seen.push(h);
            if h == handle(1) {
                let inner = scheduler.drain(&[handle(2)], 10, |_| {
                    panic!("nested drain must not run jobs")
                });
                assert_eq!(inner, Drained::Appended);
            }
        });

        assert_eq!(drained, Drained::Completed { steps: 2 });
        assert_eq!(seen, vec![handle(1), handle(2)]);
    }

    #[test]
    fn test_drain_limit_aborts() {
        let scheduler = Scheduler::new();
        let drained = scheduler.drain(&[handle(1)], 3, |h| scheduler.batch().push(h));

        assert_eq!(
            drained,
            Drained::Aborted {
                steps: 3,
                abandoned: vec![handle(1)]
            }
        );
        assert!(scheduler.batch().is_empty());
        assert!(!scheduler.is_draining());
    }

    #[test]
    fn test_batch_depth() {
        let scheduler = Scheduler::new();
        scheduler.enter_batch();
        scheduler.enter_batch();
        assert!(scheduler.is_batching());
        assert!(!scheduler.exit_batch());
        assert!(scheduler.exit_batch());
        assert!(!scheduler.is_batching());
    }

    #[test]
    fn test_enqueue_dedups() {
        let scheduler = Scheduler::new();
        scheduler.enqueue(handle(3));
        scheduler.enqueue(handle(3));
        scheduler.enqueue(handle(1));
        assert!(scheduler.has_dirty());
        assert_eq!(scheduler.take_dirty(), vec![handle(3), handle(1)]);
        assert!(!scheduler.has_dirty());
    }
}
