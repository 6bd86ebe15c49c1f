//! Service implementations
//!
//! Real implementations of the worker traits. These handle actual OS
//! processes and their output pipes.

pub mod output_capture;
pub mod process_spawner;

#[cfg(test)]
mod tests;

pub use output_capture::OutputBuffer;
pub use process_spawner::{ChildProcess, ProcessSpawner};
