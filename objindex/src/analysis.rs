// analysis.rs — Callback protocol and the object-index analysis
//
// `AnalysisCallbacks` is the fixed protocol the instrumentation layer (or
// trace replay) invokes as the monitored program runs. Every hook has a
// no-op default so analyses override only what they observe.
// `ObjectIndexAnalysis` wires the hooks to the path indexer and identity
// tracker and produces a `Report` when the run completes.
//
// Preconditions: hooks are invoked in program order, enter/exit balanced.
// Postconditions: `on_run_complete` reports the trie as of the last event.
// Failure modes: unbalanced frame exit or unclosed frames at completion
//   (`AnalysisError`, fatal).
// Side effects: none outside the owned state.

use tracing::{debug, warn};

use crate::config::TrackerConfig;
use crate::error::AnalysisError;
use crate::id::{ObjectId, ProgramPointId};
use crate::location::LocationResolver;
use crate::path_index::PathIndexer;
use crate::report::Report;
use crate::shadow::{ShadowStore, Value};
use crate::tracker::IdentityTracker;

/// Hooks fired by the instrumentation layer.
pub trait AnalysisCallbacks {
    /// Result of the terminal reporting pass.
    type Output;

    fn on_script_enter(&mut self, _file: &str) -> Result<(), AnalysisError> {
        Ok(())
    }

    fn on_script_exit(&mut self) -> Result<(), AnalysisError> {
        Ok(())
    }

    fn on_function_enter(&mut self) -> Result<(), AnalysisError> {
        Ok(())
    }

    fn on_function_exit(&mut self) -> Result<(), AnalysisError> {
        Ok(())
    }

    /// An object or array literal was evaluated.
    fn on_object_literal(
        &mut self,
        _pid: ProgramPointId,
        _value: &Value,
    ) -> Result<(), AnalysisError> {
        Ok(())
    }

    /// A call is about to transfer control to its callee.
    fn on_call_start(&mut self, _pid: ProgramPointId) -> Result<(), AnalysisError> {
        Ok(())
    }

    /// A call returned `result`.
    fn on_call_completed(
        &mut self,
        _pid: ProgramPointId,
        _is_constructor: bool,
        _callee: &Value,
        _result: &Value,
    ) -> Result<(), AnalysisError> {
        Ok(())
    }

    fn on_field_read(&mut self, _pid: ProgramPointId, _base: &Value) -> Result<(), AnalysisError> {
        Ok(())
    }

    fn on_field_write(&mut self, _pid: ProgramPointId, _base: &Value) -> Result<(), AnalysisError> {
        Ok(())
    }

    /// The collector reclaimed `object`.
    fn on_reclaim(&mut self, _object: ObjectId) -> Result<(), AnalysisError> {
        Ok(())
    }

    /// The monitored program finished.
    fn on_run_complete(&mut self) -> Result<Self::Output, AnalysisError>;
}

// ── Object index ────────────────────────────────────────────────────────────

/// Context-sensitive object counting over one monitored run.
pub struct ObjectIndexAnalysis<S, R> {
    indexer: PathIndexer,
    tracker: IdentityTracker<S>,
    resolver: R,
}

impl<S: ShadowStore, R: LocationResolver> ObjectIndexAnalysis<S, R> {
    pub fn new(shadow: S, resolver: R, config: TrackerConfig) -> Self {
        ObjectIndexAnalysis {
            indexer: PathIndexer::new(),
            tracker: IdentityTracker::new(shadow, config),
            resolver,
        }
    }

    pub fn indexer(&self) -> &PathIndexer {
        &self.indexer
    }

    pub fn tracker(&self) -> &IdentityTracker<S> {
        &self.tracker
    }

    /// Build the report for the current state without the balance check.
    pub fn report(&self) -> Report {
        Report::build(
            self.tracker.trie(),
            &self.resolver,
            self.tracker.config().access_point,
            self.tracker.tracked_objects(),
            self.tracker.stats(),
        )
    }
}

impl<S: ShadowStore, R: LocationResolver> AnalysisCallbacks for ObjectIndexAnalysis<S, R> {
    type Output = Report;

    fn on_script_enter(&mut self, file: &str) -> Result<(), AnalysisError> {
        debug!(file, "script enter");
        self.indexer.enter_frame();
        Ok(())
    }

    fn on_script_exit(&mut self) -> Result<(), AnalysisError> {
        self.indexer.exit_frame()
    }

    fn on_function_enter(&mut self) -> Result<(), AnalysisError> {
        self.indexer.enter_frame();
        Ok(())
    }

    fn on_function_exit(&mut self) -> Result<(), AnalysisError> {
        self.indexer.exit_frame()
    }

    fn on_object_literal(&mut self, pid: ProgramPointId, value: &Value) -> Result<(), AnalysisError> {
        self.tracker.annotate_creation(&mut self.indexer, pid, value);
        Ok(())
    }

    fn on_call_start(&mut self, pid: ProgramPointId) -> Result<(), AnalysisError> {
        self.indexer.touch(pid);
        Ok(())
    }

    fn on_call_completed(
        &mut self,
        pid: ProgramPointId,
        is_constructor: bool,
        callee: &Value,
        result: &Value,
    ) -> Result<(), AnalysisError> {
        if is_constructor {
            self.tracker.annotate_creation(&mut self.indexer, pid, result);
        }
        self.tracker.annotate_access(&mut self.indexer, callee);
        Ok(())
    }

    fn on_field_read(&mut self, _pid: ProgramPointId, base: &Value) -> Result<(), AnalysisError> {
        self.tracker.annotate_access(&mut self.indexer, base);
        Ok(())
    }

    fn on_field_write(&mut self, _pid: ProgramPointId, base: &Value) -> Result<(), AnalysisError> {
        self.tracker.annotate_access(&mut self.indexer, base);
        Ok(())
    }

    fn on_reclaim(&mut self, object: ObjectId) -> Result<(), AnalysisError> {
        self.tracker.reclaim(object);
        Ok(())
    }

    fn on_run_complete(&mut self) -> Result<Report, AnalysisError> {
        if !self.indexer.is_balanced() {
            let open_frames = self.indexer.depth() - 1;
            warn!(open_frames, "run completed with open frames");
            return Err(AnalysisError::UnbalancedRun { open_frames });
        }
        Ok(self.report())
    }
}
