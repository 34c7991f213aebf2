//! Shared helpers for cogwork integration tests.
pub mod faults;
pub mod machines;

pub use faults::{install_fault_observer, CapturedFaults};
pub use machines::{assemble, bool_at, number_at, try_assemble};
