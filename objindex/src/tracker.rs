// tracker.rs — Context-sensitive object identity tracking
//
// On creation, an object's shadow record receives the current path vector
// as its creation identity and one unit of count is parked in the
// aggregation trie at full depth. On every later access the current path is
// re-sampled and compared with the creation identity; a deviation at an
// index below the recorded depth moves the object's unit to the node for
// that index.
//
// Preconditions: the caller drives `PathIndexer` frame entry/exit.
// Postconditions: trie total == objects recorded minus objects evicted;
//   a record's depth never increases; its creation path never changes.
// Failure modes: none. Untracked values and records without a creation
//   identity turn every operation into a no-op.
// Side effects: mutates shadow records and the trie.

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::TrackerConfig;
use crate::id::{ObjectId, ProgramPointId};
use crate::path_index::{deviation_index, PathIndexer, PathVector};
use crate::shadow::{ShadowRecord, ShadowStore, Value};
use crate::trie::AggregationTrie;

// ── Outcomes ────────────────────────────────────────────────────────────────

/// What `annotate_creation` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationOutcome {
    /// No shadow record for the value.
    Untracked,
    /// The record already carries a creation identity.
    AlreadyRecorded,
    /// A creation identity was recorded at the given depth.
    Recorded { depth: usize },
}

/// What `annotate_access` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessOutcome {
    /// No shadow record, or no creation identity yet.
    Untracked,
    /// Deviation at or beyond the recorded depth.
    Unchanged { deviation: usize },
    /// The object's unit moved to a shallower index.
    Refined { from: usize, to: usize },
    /// The unit was missing from the node for the recorded depth; nothing
    /// moved and the record keeps its depth.
    Stranded { depth: usize, deviation: usize },
}

/// Running counters, reported alongside the trie.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrackerStats {
    pub created: u64,
    pub refinements: u64,
    pub reclaimed: u64,
    pub evicted: u64,
}

// ── Tracker ─────────────────────────────────────────────────────────────────

pub struct IdentityTracker<S> {
    shadow: S,
    trie: AggregationTrie,
    config: TrackerConfig,
    stats: TrackerStats,
}

impl<S: ShadowStore> IdentityTracker<S> {
    pub fn new(shadow: S, config: TrackerConfig) -> Self {
        IdentityTracker {
            shadow,
            trie: AggregationTrie::new(),
            config,
            stats: TrackerStats::default(),
        }
    }

    pub fn trie(&self) -> &AggregationTrie {
        &self.trie
    }

    pub fn shadow(&self) -> &S {
        &self.shadow
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn stats(&self) -> TrackerStats {
        self.stats
    }

    /// Objects currently holding a unit in the trie.
    pub fn tracked_objects(&self) -> u64 {
        self.stats.created - self.stats.evicted
    }

    /// Assign a creation identity to `value` on its first observation.
    pub fn annotate_creation(
        &mut self,
        indexer: &mut PathIndexer,
        pid: ProgramPointId,
        value: &Value,
    ) -> CreationOutcome {
        let Some(record) = self.shadow.shadow_record(value) else {
            return CreationOutcome::Untracked;
        };
        if record.creation_path.is_some() {
            return CreationOutcome::AlreadyRecorded;
        }

        indexer.touch(pid);
        let path = indexer.current_path();
        let depth = path.len().saturating_sub(1);
        self.trie.insert_at(&path, depth);
        debug!(%value, %pid, %path, depth, "creation recorded");

        record.creation_path = Some(path);
        record.depth = depth;
        self.stats.created += 1;
        CreationOutcome::Recorded { depth }
    }

    /// Re-sample the access context for `value` and refine its depth.
    pub fn annotate_access(&mut self, indexer: &mut PathIndexer, value: &Value) -> AccessOutcome {
        let Some(record) = self.shadow.shadow_record(value) else {
            return AccessOutcome::Untracked;
        };
        if record.creation_path.is_none() {
            return AccessOutcome::Untracked;
        }

        indexer.touch(self.config.access_point);
        let access = indexer.current_path();
        let outcome = refine(&mut self.trie, record, &access);
        if let AccessOutcome::Refined { from, to } = outcome {
            debug!(%value, %access, from, to, "depth refined");
            self.stats.refinements += 1;
        }
        outcome
    }

    /// Handle a reclamation notice for `object`.
    ///
    /// The shadow record is always released. The object's trie unit is only
    /// removed when eviction is enabled; otherwise it stays parked.
    pub fn reclaim(&mut self, object: ObjectId) {
        let Some(record) = self.shadow.release(object) else {
            warn!(%object, "reclamation notice for an object without a shadow record");
            return;
        };
        let Some(path) = record.creation_path else {
            return;
        };
        self.stats.reclaimed += 1;
        if self.config.evict_on_reclaim && self.trie.remove_at(&path, record.depth) {
            self.stats.evicted += 1;
            debug!(%object, %path, depth = record.depth, "evicted");
        }
    }
}

/// Compare `access` against the record's creation identity and move its
/// trie unit when the deviation lies below the recorded depth.
fn refine(trie: &mut AggregationTrie, record: &mut ShadowRecord, access: &PathVector) -> AccessOutcome {
    let Some(creation) = record.creation_path.as_ref() else {
        return AccessOutcome::Untracked;
    };
    let deviation = deviation_index(creation, access);
    if deviation >= record.depth {
        return AccessOutcome::Unchanged { deviation };
    }
    let from = record.depth;
    if !trie.remove_at(creation, from) {
        warn!(path = %creation, depth = from, deviation, "object unit missing from the trie, refinement skipped");
        return AccessOutcome::Stranded {
            depth: from,
            deviation,
        };
    }
    trie.insert_at(creation, deviation);
    record.depth = deviation;
    AccessOutcome::Refined {
        from,
        to: deviation,
    }
}
