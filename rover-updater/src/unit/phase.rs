/// Lifecycle phase of an update unit.
///
/// `Hydrating` covers the render call and the did-mount/did-update hooks;
/// `ErrorUnwinding` covers a boundary's `componentDidCatch`. Update requests
/// that arrive in either phase are deferred to one follow-up pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UnitPhase {
    #[default]
    Idle,
    Hydrating,
    Resolving,
    ErrorUnwinding,
    Disposed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    /// The render job is about to run
    Render,
    /// The resolve job started (after the commit hooks when a render ran)
    Resolve,
    /// A caught error is handed to the boundary's recovery hook
    Unwind,
    /// The recovery hook returned
    Recover,
    /// The resolve job finished
    Settle,
    Dispose,
}

impl UnitPhase {
    /// Next phase for `event`, or `None` when the transition is not allowed.
    pub fn transition(self, event: PhaseEvent) -> Option<UnitPhase> {
        use PhaseEvent as E;
        use UnitPhase as P;

        match (self, event) {
            (P::Disposed, _) => None,
            (_, E::Dispose) => Some(P::Disposed),
            // a parent may re-render a child whose first commit is still queued
            (P::Idle | P::Hydrating, E::Render) => Some(P::Hydrating),
            (P::Idle | P::Hydrating, E::Resolve) => Some(P::Resolving),
            (P::Resolving, E::Unwind) => Some(P::ErrorUnwinding),
            (P::ErrorUnwinding, E::Recover) => Some(P::Resolving),
            (P::Resolving, E::Settle) => Some(P::Idle),
            _ => None,
        }
    }

    pub fn defers_updates(self) -> bool {
        matches!(self, UnitPhase::Hydrating | UnitPhase::ErrorUnwinding)
    }

    pub fn is_disposed(self) -> bool {
        self == UnitPhase::Disposed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_cycle() {
        let phase = UnitPhase::Idle;
        let phase = phase.transition(PhaseEvent::Render).unwrap();
        assert_eq!(phase, UnitPhase::Hydrating);
        let phase = phase.transition(PhaseEvent::Resolve).unwrap();
        assert_eq!(phase, UnitPhase::Resolving);
        let phase = phase.transition(PhaseEvent::Settle).unwrap();
        assert_eq!(phase, UnitPhase::Idle);
    }

    #[test]
    fn test_resolve_without_render() {
        assert_eq!(
            UnitPhase::Idle.transition(PhaseEvent::Resolve),
            Some(UnitPhase::Resolving)
        );
    }

    #[test]
    fn test_error_unwinding() {
        let phase = UnitPhase::Resolving.transition(PhaseEvent::Unwind).unwrap();
        assert!(phase.defers_updates());
        assert_eq!(
            phase.transition(PhaseEvent::Recover),
            Some(UnitPhase::Resolving)
        );
        assert_eq!(UnitPhase::Idle.transition(PhaseEvent::Unwind), None);
    }

    #[test]
    fn test_disposed_is_terminal() {
        for phase in [
            UnitPhase::Idle,
            UnitPhase::Hydrating,
            UnitPhase::Resolving,
            UnitPhase::ErrorUnwinding,
        ] {
            assert_eq!(
                phase.transition(PhaseEvent::Dispose),
                Some(UnitPhase::Disposed)
            );
        }
        assert_eq!(UnitPhase::Disposed.transition(PhaseEvent::Render), None);
        assert_eq!(UnitPhase::Disposed.transition(PhaseEvent::Dispose), None);
    }

    #[test]
    fn test_deferring_phases() {
        assert!(UnitPhase::Hydrating.defers_updates());
        assert!(!UnitPhase::Idle.defers_updates());
        assert!(!UnitPhase::Resolving.defers_updates());
    }
}
