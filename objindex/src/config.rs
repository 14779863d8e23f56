// config.rs — Tracker configuration
//
// Knobs the binary exposes on the command line. Library users build a
// `TrackerConfig` directly; `Default` matches the observed behavior of the
// object-index analysis (access sentinel 0, no eviction on reclamation).

use crate::id::{ProgramPointId, ACCESS_POINT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Program point sampled on every access query.
    pub access_point: ProgramPointId,
    /// Remove a reclaimed object's unit from the aggregation trie. When
    /// false, counts reflect every object ever created.
    pub evict_on_reclaim: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            access_point: ACCESS_POINT,
            evict_on_reclaim: false,
        }
    }
}

impl TrackerConfig {
    pub fn with_access_point(mut self, pid: ProgramPointId) -> Self {
        self.access_point = pid;
        self
    }

    pub fn with_eviction(mut self, evict: bool) -> Self {
        self.evict_on_reclaim = evict;
        self
    }
}
