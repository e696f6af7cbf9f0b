//! Shared infrastructure for the kiln workspace.
//!
//! Two concerns live here: crash-consistent file writes (every on-disk
//! document in kiln goes through [`atomic_write`]) and tracing
//! initialization for the CLI.

pub mod atomic_write;
pub mod logging;

pub use atomic_write::write_file_atomic;
pub use logging::init_tracing;
