// Event-trace node types.
//
// A trace is the recorded callback stream of one monitored run. Every event
// carries the `SimpleSpan` of its source line and the 1-based line number
// used when replay reports a fatal error.
//
// Preconditions: produced by the parser from a valid token stream.
// Postconditions: each event's span covers its source line.
// Failure modes: none (data-only module).
// Side effects: none.

use chumsky::span::SimpleSpan;

use crate::id::{ObjectId, ProgramPointId};
use crate::shadow::Value;

/// Byte-offset span (alias for chumsky's `SimpleSpan`).
pub type Span = SimpleSpan;

/// A parsed trace.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    pub events: Vec<Event>,
}

impl Trace {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// One recorded callback with its source position.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub span: Span,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// `script-enter "file"?`
    ScriptEnter { file: Option<String> },
    /// `script-exit`
    ScriptExit,
    /// `function-enter`
    FunctionEnter,
    /// `function-exit`
    FunctionExit,
    /// `literal PID VALUE`
    Literal { pid: ProgramPointId, value: Value },
    /// `call PID`
    CallStart { pid: ProgramPointId },
    /// `call-done PID new? CALLEE RESULT`
    CallCompleted {
        pid: ProgramPointId,
        is_constructor: bool,
        callee: Value,
        result: Value,
    },
    /// `get PID BASE`
    FieldRead { pid: ProgramPointId, base: Value },
    /// `put PID BASE`
    FieldWrite { pid: ProgramPointId, base: Value },
    /// `reclaim @N`
    Reclaim { object: ObjectId },
}

impl EventKind {
    /// Event name as written in trace text.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::ScriptEnter { .. } => "script-enter",
            EventKind::ScriptExit => "script-exit",
            EventKind::FunctionEnter => "function-enter",
            EventKind::FunctionExit => "function-exit",
            EventKind::Literal { .. } => "literal",
            EventKind::CallStart { .. } => "call",
            EventKind::CallCompleted { .. } => "call-done",
            EventKind::FieldRead { .. } => "get",
            EventKind::FieldWrite { .. } => "put",
            EventKind::Reclaim { .. } => "reclaim",
        }
    }
}

/// Byte offsets of every line start, built in one pass over the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        LineIndex { starts }
    }

    /// 1-based line number of a byte offset.
    pub fn line(&self, offset: usize) -> usize {
        self.starts.partition_point(|&start| start <= offset)
    }

    pub fn line_count(&self) -> usize {
        self.starts.len()
    }
}

/// 1-based line number of a byte offset. Scans the source; use a
/// `LineIndex` when resolving many offsets.
pub fn line_of(source: &str, offset: usize) -> usize {
    let end = offset.min(source.len());
    source.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count() + 1
}

/// 1-based (line, column) of a byte offset.
pub fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let end = offset.min(source.len());
    let line_start = source[..end].rfind('\n').map_or(0, |i| i + 1);
    (line_of(source, end), source[line_start..end].chars().count() + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_numbers() {
        let src = "a\nbb\n\nccc";
        assert_eq!(line_of(src, 0), 1);
        assert_eq!(line_of(src, 2), 2);
        assert_eq!(line_of(src, 6), 4);
        assert_eq!(line_col(src, 3), (2, 2));
        assert_eq!(line_col(src, 100), (4, 4));
    }

    #[test]
    fn line_index_agrees_with_scan() {
        let src = "a\nbb\n\nccc\n";
        let index = LineIndex::new(src);
        assert_eq!(index.line_count(), 5);
        for offset in 0..=src.len() + 2 {
            assert_eq!(index.line(offset), line_of(src, offset), "offset {}", offset);
        }
    }

    #[test]
    fn line_index_of_empty_source() {
        let index = LineIndex::new("");
        assert_eq!(index.line(0), 1);
        assert_eq!(index.line_count(), 1);
    }

    #[test]
    fn event_names() {
        assert_eq!(EventKind::FunctionExit.name(), "function-exit");
        assert_eq!(
            EventKind::CallStart {
                pid: ProgramPointId(1)
            }
            .name(),
            "call"
        );
    }
}
