//! Parser for the `[TST] ` structured test telemetry protocol.
//!
//! Test binaries interleave plain output with one-line JSON events prefixed
//! by the sentinel `[TST] `. The parser decodes those events into typed
//! records, tags each with the block that was current when it was emitted,
//! and derives the rigging-failure flag the scheduler uses to tell setup
//! faults apart from assertion failures.
//!
//! Block tracking is deliberately linear: only `phase`/`block_start` events
//! move `current_block`, and `block_end` is ignored, so a parent block name
//! never "pops" back into effect after a nested block closes. Malformed
//! events produce warnings and are otherwise skipped; unknown event types
//! are skipped silently for forward compatibility.

mod event;
mod parser;

pub use event::{ErrorRecord, FeatureRecord, MeasurementRecord, ResultRecord};
pub use parser::{ParsedOutput, parse_lines, parse_output};

/// Sentinel prefix marking a structured event line.
pub const SENTINEL: &str = "[TST] ";

/// Name of the setup/precondition block.
pub const RIGGING_BLOCK: &str = "rigging";
