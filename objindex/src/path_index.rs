// path_index.rs — Per-frame execution indexing
//
// Keeps one counter map per live call frame and turns "how many times has
// program point P fired in this frame" into a comparable path vector.
// Nested per-frame counters make recursion depth and loop iteration visible:
// two iterations of the same loop differ only in the entry for the frame
// that owns the loop.
//
// Preconditions: enter/exit calls are balanced by the instrumentation layer.
// Postconditions: the stack always holds at least the bottom frame.
// Failure modes: popping the bottom frame returns `UnbalancedExit`.
// Side effects: none beyond the owned stack.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use tracing::{trace, warn};

use crate::error::AnalysisError;
use crate::id::ProgramPointId;

// ── Path vectors ────────────────────────────────────────────────────────────

/// One (program point, firing count) sample taken from a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PathEntry {
    pub pid: ProgramPointId,
    pub count: u64,
}

impl PathEntry {
    pub fn new(pid: ProgramPointId, count: u64) -> Self {
        PathEntry { pid, count }
    }
}

impl fmt::Display for PathEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.pid, self.count)
    }
}

/// Snapshot of the dynamic call context.
///
/// Index 0 is the bottom-most frame with a current point; the last entry is
/// the innermost frame. Frames where nothing has fired yet contribute no
/// entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PathVector(Vec<PathEntry>);

impl PathVector {
    pub fn new(entries: Vec<PathEntry>) -> Self {
        PathVector(entries)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn entries(&self) -> &[PathEntry] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<&PathEntry> {
        self.0.get(index)
    }

    /// Innermost entry, if any frame has fired.
    pub fn innermost(&self) -> Option<&PathEntry> {
        self.0.last()
    }
}

impl fmt::Display for PathVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, entry) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", entry)?;
        }
        write!(f, "]")
    }
}

/// First index at which two path vectors disagree.
///
/// Entries match only when both pid and count are equal. If the shared
/// prefix matches completely, the result is the shorter of the two lengths,
/// so identical vectors yield their full length.
pub fn deviation_index(creation: &PathVector, access: &PathVector) -> usize {
    let limit = creation.len().min(access.len());
    creation
        .entries()
        .iter()
        .zip(access.entries())
        .position(|(c, a)| c != a)
        .unwrap_or(limit)
}

// ── Frames ──────────────────────────────────────────────────────────────────

/// Firing counters for one call frame.
#[derive(Debug, Default)]
struct PathFrame {
    counts: HashMap<ProgramPointId, u64>,
    current: Option<PathEntry>,
}

impl PathFrame {
    fn touch(&mut self, pid: ProgramPointId) -> PathEntry {
        let count = self.counts.entry(pid).or_insert(0);
        *count += 1;
        let entry = PathEntry::new(pid, *count);
        self.current = Some(entry);
        entry
    }
}

// ── Indexer ─────────────────────────────────────────────────────────────────

/// Call-stack shaped execution index. One per monitored run.
///
/// The bottom frame lives outside the pushed stack so it can never be
/// popped.
#[derive(Debug, Default)]
pub struct PathIndexer {
    bottom: PathFrame,
    frames: Vec<PathFrame>,
}

impl PathIndexer {
    /// Create an indexer holding only the bottom frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a fresh frame (function or script entry).
    pub fn enter_frame(&mut self) {
        self.frames.push(PathFrame::default());
        trace!(depth = self.depth(), "enter frame");
    }

    /// Pop the top frame (function or script exit).
    pub fn exit_frame(&mut self) -> Result<(), AnalysisError> {
        if self.frames.pop().is_none() {
            warn!(depth = self.depth(), "frame exit would pop the bottom frame");
            return Err(AnalysisError::UnbalancedExit {
                depth: self.depth(),
            });
        }
        trace!(depth = self.depth(), "exit frame");
        Ok(())
    }

    /// Record one firing of `pid` in the top frame and make it current.
    pub fn touch(&mut self, pid: ProgramPointId) -> PathEntry {
        let top = match self.frames.last_mut() {
            Some(frame) => frame,
            None => &mut self.bottom,
        };
        let entry = top.touch(pid);
        trace!(pid = %entry.pid, count = entry.count, "touch");
        entry
    }

    /// Current path vector, bottom frame first.
    pub fn current_path(&self) -> PathVector {
        PathVector(
            std::iter::once(&self.bottom)
                .chain(&self.frames)
                .filter_map(|f| f.current)
                .collect(),
        )
    }

    /// Number of live frames, including the bottom frame.
    pub fn depth(&self) -> usize {
        self.frames.len() + 1
    }

    /// True when only the bottom frame remains.
    pub fn is_balanced(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(n: u32) -> ProgramPointId {
        ProgramPointId(n)
    }

    fn path(entries: &[(u32, u64)]) -> PathVector {
        PathVector::new(
            entries
                .iter()
                .map(|&(pid, count)| PathEntry::new(p(pid), count))
                .collect(),
        )
    }

    #[test]
    fn fresh_indexer_has_empty_path() {
        let idx = PathIndexer::new();
        assert!(idx.current_path().is_empty());
        assert_eq!(idx.depth(), 1);
        assert!(idx.is_balanced());
    }

    #[test]
    fn touch_counts_per_frame() {
        let mut idx = PathIndexer::new();
        assert_eq!(idx.touch(p(5)), PathEntry::new(p(5), 1));
        assert_eq!(idx.touch(p(5)), PathEntry::new(p(5), 2));
        assert_eq!(idx.touch(p(6)), PathEntry::new(p(6), 1));
        assert_eq!(idx.current_path(), path(&[(6, 1)]));
        // Returning to an earlier point continues its own count.
        assert_eq!(idx.touch(p(5)), PathEntry::new(p(5), 3));
    }

    #[test]
    fn frames_without_current_point_are_skipped() {
        let mut idx = PathIndexer::new();
        idx.enter_frame();
        idx.touch(p(1));
        idx.enter_frame();
        assert_eq!(idx.current_path(), path(&[(1, 1)]));
        idx.touch(p(2));
        assert_eq!(idx.current_path(), path(&[(1, 1), (2, 1)]));
    }

    #[test]
    fn new_frame_restarts_counts() {
        let mut idx = PathIndexer::new();
        idx.touch(p(3));
        idx.enter_frame();
        idx.touch(p(3));
        assert_eq!(idx.current_path(), path(&[(3, 1), (3, 1)]));
        idx.exit_frame().unwrap();
        idx.enter_frame();
        idx.touch(p(3));
        assert_eq!(idx.current_path(), path(&[(3, 1), (3, 1)]));
    }

    #[test]
    fn exit_restores_caller_state() {
        let mut idx = PathIndexer::new();
        idx.touch(p(1));
        idx.touch(p(1));
        idx.enter_frame();
        idx.touch(p(9));
        idx.exit_frame().unwrap();
        assert_eq!(idx.current_path(), path(&[(1, 2)]));
        assert_eq!(idx.touch(p(1)), PathEntry::new(p(1), 3));
    }

    #[test]
    fn popping_bottom_frame_is_a_protocol_violation() {
        let mut idx = PathIndexer::new();
        idx.touch(p(1));
        let err = idx.exit_frame().unwrap_err();
        assert_eq!(err, AnalysisError::UnbalancedExit { depth: 1 });
        // The stack is left intact.
        assert_eq!(idx.depth(), 1);
        assert_eq!(idx.current_path(), path(&[(1, 1)]));
    }

    #[test]
    fn deviation_of_identical_paths_is_full_length() {
        let a = path(&[(1, 1), (2, 3)]);
        assert_eq!(deviation_index(&a, &a.clone()), 2);
    }

    #[test]
    fn deviation_requires_equal_counts() {
        let a = path(&[(1, 1), (2, 3)]);
        let b = path(&[(1, 1), (2, 4)]);
        assert_eq!(deviation_index(&a, &b), 1);
        let c = path(&[(1, 2), (2, 3)]);
        assert_eq!(deviation_index(&a, &c), 0);
    }

    #[test]
    fn deviation_is_capped_by_shorter_path() {
        let creation = path(&[(1, 1), (2, 1), (3, 1)]);
        let shallow = path(&[(1, 1), (2, 1)]);
        assert_eq!(deviation_index(&creation, &shallow), 2);
        let deep = path(&[(1, 1), (2, 1), (3, 1), (4, 1)]);
        assert_eq!(deviation_index(&creation, &deep), 3);
        assert_eq!(deviation_index(&creation, &PathVector::default()), 0);
    }

    #[test]
    fn display_path() {
        assert_eq!(path(&[(1, 1), (7, 2)]).to_string(), "[1#1, 7#2]");
    }
}
