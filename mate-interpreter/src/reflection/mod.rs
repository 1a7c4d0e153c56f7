//!
//! The meta-object protocol.
//!
//! An **Environment** bundles up to three meta-objects (semantics, layout, message).
//! Environments can be installed globally, on a single activation, or on a single object,
//! and are consulted in that order by every interceptable operation running at base level.
//!

use log::debug;

use crate::assumption::Assumption;
use crate::value::Value;

/// Interception dispatch to meta-objects.
pub mod dispatch;
/// The interceptable operations.
pub mod operation;
/// The three-tier semantic check.
pub mod semantics;

pub use self::operation::{EnvironmentSlot, ReflectiveOp};

/// Universe-wide reflective state.
#[derive(Debug)]
pub struct ReflectionState {
    active: bool,
    global_environment: Value,
    /// Valid while a global environment is installed.
    global_activated: Assumption,
    /// Valid while no global environment is installed.
    global_deactivated: Assumption,
    /// Bumped whenever a meta-object's answer to a lookup may have changed.
    epoch: u64,
}

impl ReflectionState {
    pub fn new(active: bool) -> Self {
        Self {
            active,
            global_environment: Value::Nil,
            global_activated: Assumption::invalid("global semantics activated"),
            global_deactivated: Assumption::new("global semantics deactivated"),
            epoch: 0,
        }
    }

    /// Whether semantic checks consult environments at all.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        if self.active != active {
            debug!("reflection {}", if active { "activated" } else { "deactivated" });
        }
        self.active = active;
    }

    pub fn global_environment(&self) -> &Value {
        &self.global_environment
    }

    pub fn global_activated(&self) -> &Assumption {
        &self.global_activated
    }

    pub fn global_deactivated(&self) -> &Assumption {
        &self.global_deactivated
    }

    /// Install (or, with `Nil`, remove) the global environment.
    ///
    /// Both assumptions are invalidated, then a fresh one is minted for the new state,
    /// so every cached global-tier decision is dropped.
    pub fn install_global_environment(&mut self, environment: Value) {
        self.global_activated.invalidate();
        self.global_deactivated.invalidate();
        if environment.is_nil() {
            self.global_deactivated = Assumption::new("global semantics deactivated");
            debug!("global environment removed");
        } else {
            self.global_activated = Assumption::new("global semantics activated");
            debug!("global environment installed");
        }
        self.global_environment = environment;
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Record that meta-object lookups may now answer differently.
    pub fn bump_epoch(&mut self) {
        self.epoch += 1;
        debug!("reflection epoch is now {}", self.epoch);
    }
}

#[cfg(test)]
mod tests {
    use super::ReflectionState;
    use crate::value::Value;

    #[test]
    fn installing_swaps_assumptions() {
        let mut state = ReflectionState::new(true);
        let deactivated = state.global_deactivated().clone();
        assert!(deactivated.is_valid());
        assert!(!state.global_activated().is_valid());

        state.install_global_environment(Value::Integer(1));
        assert!(!deactivated.is_valid());
        let activated = state.global_activated().clone();
        assert!(activated.is_valid());

        state.install_global_environment(Value::Integer(2));
        assert!(!activated.is_valid());
        assert!(state.global_activated().is_valid());

        state.install_global_environment(Value::Nil);
        assert!(!state.global_activated().is_valid());
        assert!(state.global_deactivated().is_valid());
        assert!(!state.global_deactivated().ptr_eq(&deactivated));
    }
}
