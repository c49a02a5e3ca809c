//! Scoped suspension of instrumentation

use crate::host::Instrumentation;

/// Disables instrumentation until dropped
///
/// The previous state is restored on every exit path, including early returns
/// and unwinding, so the tracer's own work never generates events and tracing
/// always resumes afterwards.
pub struct PauseGuard<'a> {
    instrumentation: &'a dyn Instrumentation,
    was_enabled: bool,
}

impl<'a> PauseGuard<'a> {
    pub fn new(instrumentation: &'a dyn Instrumentation) -> Self {
        let was_enabled = instrumentation.is_enabled();
        instrumentation.set_enabled(false);
        Self {
            instrumentation,
            was_enabled,
        }
    }
}

impl Drop for PauseGuard<'_> {
    fn drop(&mut self) {
        if self.was_enabled {
            self.instrumentation.set_enabled(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::TraceSwitch;

    #[test]
    fn test_pause_and_restore() {
        let switch = TraceSwitch::new();
        switch.set_enabled(true);
        {
            let _guard = PauseGuard::new(&switch);
            assert!(!switch.is_enabled());
        }
        assert!(switch.is_enabled());
    }

    #[test]
    fn test_keeps_disabled_switch_disabled() {
        let switch = TraceSwitch::new();
        {
            let _guard = PauseGuard::new(&switch);
        }
        assert!(!switch.is_enabled());
    }

    #[test]
    fn test_restored_on_early_return() {
        fn fails(switch: &TraceSwitch) -> Result<(), String> {
            let _guard = PauseGuard::new(switch);
            if switch.is_enabled() {
                return Ok(());
            }
            Err("serialization blew up".to_string())
        }

        let switch = TraceSwitch::new();
        switch.set_enabled(true);
        assert!(fails(&switch).is_err());
        assert!(switch.is_enabled());
    }

    #[test]
    fn test_restored_on_panic() {
        let switch = TraceSwitch::new();
        switch.set_enabled(true);

        let inner = switch.clone();
        let result = std::panic::catch_unwind(move || {
            let _guard = PauseGuard::new(&inner);
            panic!("boom");
        });

        assert!(result.is_err());
        assert!(switch.is_enabled());
    }
}
