// replay.rs — Drive an analysis from a recorded trace
//
// Dispatches each trace event to the matching `AnalysisCallbacks` hook in
// order, then runs the terminal reporting pass. The first fatal error stops
// the replay and is returned with the trace line it occurred on.
//
// Preconditions: `trace` came from `parser::parse` without diagnostics.
// Postconditions: on success, every event was delivered exactly once.
// Failure modes: protocol violations (`AnalysisError`), tagged with line.
// Side effects: mutates the analysis.

use tracing::{debug, info};

use crate::analysis::AnalysisCallbacks;
use crate::error::AnalysisError;
use crate::trace::{Event, EventKind, Trace};

/// Replay every event of `trace` into `analysis` and complete the run.
pub fn replay<A: AnalysisCallbacks>(
    trace: &Trace,
    analysis: &mut A,
) -> Result<A::Output, AnalysisError> {
    for event in &trace.events {
        dispatch(event, analysis).map_err(|e| e.at_line(event.line))?;
    }
    info!(events = trace.len(), "trace replayed");
    analysis.on_run_complete()
}

/// Deliver one event.
pub fn dispatch<A: AnalysisCallbacks>(event: &Event, analysis: &mut A) -> Result<(), AnalysisError> {
    debug!(line = event.line, event = event.kind.name(), "dispatch");
    match &event.kind {
        EventKind::ScriptEnter { file } => {
            analysis.on_script_enter(file.as_deref().unwrap_or("<anonymous>"))
        }
        EventKind::ScriptExit => analysis.on_script_exit(),
        EventKind::FunctionEnter => analysis.on_function_enter(),
        EventKind::FunctionExit => analysis.on_function_exit(),
        EventKind::Literal { pid, value } => analysis.on_object_literal(*pid, value),
        EventKind::CallStart { pid } => analysis.on_call_start(*pid),
        EventKind::CallCompleted {
            pid,
            is_constructor,
            callee,
            result,
        } => analysis.on_call_completed(*pid, *is_constructor, callee, result),
        EventKind::FieldRead { pid, base } => analysis.on_field_read(*pid, base),
        EventKind::FieldWrite { pid, base } => analysis.on_field_write(*pid, base),
        EventKind::Reclaim { object } => analysis.on_reclaim(*object),
    }
}
