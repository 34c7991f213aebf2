//! Thread-safe wrapper for `Machine` used by rspec suites.

use cogwork::Machine;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Wrapper that forwards `Send` and `Sync` because access is mutex-guarded.
pub struct ThreadSafeMachine(pub Machine);

impl Deref for ThreadSafeMachine {
    type Target = Machine;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for ThreadSafeMachine {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

// SAFETY: rspec requires `Send + Sync` environments but the suites run
// serially through `run_serial`, and every access goes through the mutex.
// The machine's closures never escape the wrapper, so no other thread can
// observe them.
unsafe impl Send for ThreadSafeMachine {}
unsafe impl Sync for ThreadSafeMachine {}

/// Shared pointer type for the wrapped machine.
pub type SharedMachine = Arc<Mutex<ThreadSafeMachine>>;

/// Wraps `machine` for sharing across rspec closures.
pub fn share(machine: Machine) -> SharedMachine {
    Arc::new(Mutex::new(ThreadSafeMachine(machine)))
}

/// Locks the shared machine, recovering from a poisoned mutex.
pub fn lock_machine(machine: &SharedMachine) -> MutexGuard<'_, ThreadSafeMachine> {
    machine.lock().unwrap_or_else(PoisonError::into_inner)
}
