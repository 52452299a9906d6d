//! Runtime-tunable settings the host can flip between worker-task iterations
//! (§10 Configuration). Nothing here is persisted — §1 excludes persisted
//! user preferences — this is purely the in-memory knobs the worker reads on
//! its hot path without taking a lock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

/// Shared, cheaply-readable settings. Wrap in an `Arc` to share across the
/// worker task and the host's own tasks.
#[derive(Debug)]
pub struct Settings {
    enable_transmit: AtomicBool,
    emulator_on: AtomicBool,
    interface_override: RwLock<Option<String>>,
}

impl Settings {
    pub fn new(enable_transmit: bool, emulator_on: bool, interface_override: Option<String>) -> Self {
        Settings {
            enable_transmit: AtomicBool::new(enable_transmit),
            emulator_on: AtomicBool::new(emulator_on),
            interface_override: RwLock::new(interface_override),
        }
    }

    pub fn enable_transmit(&self) -> bool {
        self.enable_transmit.load(Ordering::Relaxed)
    }

    pub fn set_enable_transmit(&self, on: bool) {
        self.enable_transmit.store(on, Ordering::Relaxed);
    }

    pub fn emulator_on(&self) -> bool {
        self.emulator_on.load(Ordering::Relaxed)
    }

    pub fn set_emulator_on(&self, on: bool) {
        self.emulator_on.store(on, Ordering::Relaxed);
    }

    pub fn interface_override(&self) -> Option<String> {
        self.interface_override.read().unwrap().clone()
    }

    pub fn set_interface_override(&self, name: Option<String>) {
        *self.interface_override.write().unwrap() = name;
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings::new(true, false, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_transmit_and_disable_emulator() {
        let s = Settings::default();
        assert!(s.enable_transmit());
        assert!(!s.emulator_on());
        assert_eq!(s.interface_override(), None);
    }

    #[test]
    fn settings_are_mutable_after_construction() {
        let s = Settings::default();
        s.set_emulator_on(true);
        s.set_interface_override(Some("eth0".into()));
        assert!(s.emulator_on());
        assert_eq!(s.interface_override().as_deref(), Some("eth0"));
    }
}
