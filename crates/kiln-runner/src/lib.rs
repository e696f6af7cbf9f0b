//! Process execution for test targets.
//!
//! All execution goes through [`CommandSpec`] to ensure argv-style
//! invocation: arguments cross the trust boundary as discrete elements and
//! no shell string evaluation ever occurs. [`ProcessRunner`] is the seam
//! the sweep loop runs through, so tests substitute a scripted runner for
//! real child processes.
//!
//! The interface is synchronous: the driver blocks on each child until
//! exit or timeout, per the single-threaded cooperative scheduling model.

mod command_spec;
mod error;
mod native;
mod process;

pub use command_spec::CommandSpec;
pub use error::RunnerError;
pub use native::NativeRunner;
pub use process::{ProcessOutput, ProcessRunner};
