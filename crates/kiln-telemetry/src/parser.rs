//! Line-oriented parsing with current-block tracking.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::{ErrorRecord, FeatureRecord, MeasurementRecord, RawEvent, ResultRecord};
use crate::{RIGGING_BLOCK, SENTINEL};

/// Everything extracted from one test invocation's output stream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedOutput {
    /// Phase names in observation order.
    pub block_sequence: Vec<String>,
    pub features: Vec<FeatureRecord>,
    pub measurements: Vec<MeasurementRecord>,
    pub results: Vec<ResultRecord>,
    pub errors: Vec<ErrorRecord>,
    /// Non-sentinel lines, in order.
    pub plain_output: Vec<String>,
    /// Diagnostics for malformed event payloads.
    pub warnings: Vec<String>,
    /// True iff an error event was emitted while the rigging block was
    /// current.
    pub has_rigging_failure: bool,
}

impl ParsedOutput {
    /// Names of features declared while the rigging block was current, in
    /// emission order. These feed dependency inference.
    #[must_use]
    pub fn rigging_features(&self) -> Vec<String> {
        self.features
            .iter()
            .filter(|f| f.block.as_deref() == Some(RIGGING_BLOCK))
            .map(|f| f.name.clone())
            .collect()
    }
}

/// Parse a full output capture, splitting on newlines.
#[must_use]
pub fn parse_output(text: &str) -> ParsedOutput {
    parse_lines(text.lines())
}

/// Parse an iterator of output lines.
pub fn parse_lines<'a, I>(lines: I) -> ParsedOutput
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out = ParsedOutput::default();
    let mut current_block: Option<String> = None;

    for line in lines {
        match line.strip_prefix(SENTINEL) {
            Some(payload) => handle_event(payload, &mut out, &mut current_block),
            None => out.plain_output.push(line.to_string()),
        }
    }

    out
}

fn handle_event(payload: &str, out: &mut ParsedOutput, current_block: &mut Option<String>) {
    if payload.trim().is_empty() {
        out.warnings
            .push("empty [TST] event payload".to_string());
        return;
    }

    let value: Value = match serde_json::from_str(payload) {
        Ok(v) => v,
        Err(_) => {
            out.warnings.push(format!("malformed [TST] event: {payload}"));
            return;
        }
    };

    if !value.is_object() {
        out.warnings
            .push(format!("[TST] event is not a JSON object: {payload}"));
        return;
    }
    if value.get("type").is_none() {
        out.warnings
            .push(format!("[TST] event missing type field: {payload}"));
        return;
    }

    let event: RawEvent = match serde_json::from_value(value) {
        Ok(e) => e,
        Err(_) => {
            out.warnings.push(format!("malformed [TST] event: {payload}"));
            return;
        }
    };

    match event {
        RawEvent::Phase { block } | RawEvent::BlockStart { block } => {
            // A phase event without a block name carries no information.
            if let Some(block) = block {
                out.block_sequence.push(block.clone());
                *current_block = Some(block);
            }
        }
        RawEvent::Feature { name } => {
            out.features.push(FeatureRecord {
                name: name.unwrap_or_default(),
                block: current_block.clone(),
            });
        }
        RawEvent::Measurement { name, value, unit } => {
            out.measurements.push(MeasurementRecord {
                name: name.unwrap_or_default(),
                value,
                unit,
                block: current_block.clone(),
            });
        }
        RawEvent::Result {
            name,
            passed,
            status,
            message,
        } => {
            let status = status.unwrap_or_else(|| match passed {
                Some(true) => "pass".to_string(),
                Some(false) => "fail".to_string(),
                None => String::new(),
            });
            out.results.push(ResultRecord {
                name: name.unwrap_or_default(),
                status,
                message: message.unwrap_or_default(),
                block: current_block.clone(),
            });
        }
        RawEvent::Error { name, message } => {
            if current_block.as_deref() == Some(RIGGING_BLOCK) {
                out.has_rigging_failure = true;
            }
            out.errors.push(ErrorRecord {
                name: name.unwrap_or_default(),
                message: message.unwrap_or_default(),
                block: current_block.clone(),
            });
        }
        // Steps subdivide blocks for reporting; block_end never pops the
        // current block. Unknown types are skipped for forward
        // compatibility.
        RawEvent::BlockEnd {} | RawEvent::StepStart {} | RawEvent::StepEnd {} | RawEvent::Unknown => {}
    }
}
