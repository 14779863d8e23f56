// error.rs — Fatal error taxonomy for the identity-tracking core
//
// The only fatal category is a protocol violation: unbalanced frame
// enter/exit calls corrupt the call-stack invariant every path vector is
// built on, so analysis halts instead of producing wrong identities.
// Missing shadow state and mismatched path lengths are not errors.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal conditions raised while driving the callback protocol.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnalysisError {
    /// `exit_frame` was called with only the bottom frame on the stack.
    #[error("protocol violation: frame exit with {depth} frame(s) on the stack (bottom frame cannot be popped)")]
    UnbalancedExit { depth: usize },

    /// The run finished with frames still open above the bottom frame.
    #[error("protocol violation: run completed with {open_frames} unclosed frame(s)")]
    UnbalancedRun { open_frames: usize },

    /// A fatal error raised while replaying a trace event.
    #[error("trace line {line}: {source}")]
    Replay {
        line: usize,
        #[source]
        source: Box<AnalysisError>,
    },
}

impl AnalysisError {
    /// Attach the 1-based trace line an error was raised on.
    pub fn at_line(self, line: usize) -> Self {
        AnalysisError::Replay {
            line,
            source: Box::new(self),
        }
    }

    /// True for the unbalanced enter/exit family, looking through replay context.
    pub fn is_protocol_violation(&self) -> bool {
        match self {
            AnalysisError::UnbalancedExit { .. } | AnalysisError::UnbalancedRun { .. } => true,
            AnalysisError::Replay { source, .. } => source.is_protocol_violation(),
        }
    }
}

/// Errors raised while loading a location map.
#[derive(Debug, Error)]
pub enum LocationError {
    #[error("{}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: invalid location map: {}", .path.display(), .source)]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{}: key '{}' is not a program point id", .path.display(), .key)]
    BadKey { path: PathBuf, key: String },
}
