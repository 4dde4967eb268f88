use crate::unit::UnitHandle;
use std::cell::RefCell;
use std::rc::Rc;

/// Instrumentation hooks fired around commits and unmounts (devtools, profilers).
pub trait LifecycleObserver {
    fn after_mount(&self, _unit: UnitHandle, _name: &str) {}

    fn after_update(&self, _unit: UnitHandle, _name: &str) {}

    fn before_unmount(&self, _unit: UnitHandle, _name: &str) {}
}

#[derive(Debug, Default)]
pub struct NoopObserver;

impl LifecycleObserver for NoopObserver {}

/// Observer that writes one line per notification into a shared buffer
///
/// Lines look like `mount Counter`, `update Counter`, `unmount Counter`.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    log_buffer: Rc<RefCell<Vec<String>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record into an existing buffer, e.g. one a test also hands to its components
    pub fn with_buffer(buffer: Rc<RefCell<Vec<String>>>) -> Self {
        Self { log_buffer: buffer }
    }

    pub fn buffer(&self) -> Rc<RefCell<Vec<String>>> {
        Rc::clone(&self.log_buffer)
    }

    pub fn entries(&self) -> Vec<String> {
        self.log_buffer.borrow().clone()
    }

    fn log(&self, event: &str, name: &str) {
        let line = format!("{event} {name}");
        tracing::debug!("{}", line);
        self.log_buffer.borrow_mut().push(line);
    }
}

impl LifecycleObserver for RecordingObserver {
    fn after_mount(&self, _unit: UnitHandle, name: &str) {
        self.log("mount", name);
    }

    fn after_update(&self, _unit: UnitHandle, name: &str) {
        self.log("update", name);
    }

    fn before_unmount(&self, _unit: UnitHandle, name: &str) {
        self.log("unmount", name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_observer_shares_buffer() {
        let buffer = Rc::new(RefCell::new(vec!["before".to_string()]));
        let observer = RecordingObserver::with_buffer(buffer.clone());
        let unit = UnitHandle::new(0, 0);

        observer.after_mount(unit, "App");
        observer.after_update(unit, "App");
        observer.before_unmount(unit, "App");

        assert_eq!(
            *buffer.borrow(),
            vec!["before", "mount App", "update App", "unmount App"]
        );
        assert_eq!(observer.entries().len(), 4);
    }
}
