//! Core state shared by every component of a run
//!
//! Pure synchronization state with no I/O of its own, testable in isolation.

pub mod pool;
pub mod run_state;

pub use pool::ProcessPool;
pub use run_state::RunState;
