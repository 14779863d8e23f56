// id.rs — Stable identifiers shared by the path indexer and identity tracker
//
// Program-point ids name static source locations (allocation sites, call
// sites, field accesses). Object ids name runtime heap objects and key the
// shadow side table. Both are plain newtypes: equality is the only
// semantically meaningful comparison, ordering exists for deterministic
// report output.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier for a static program point.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ProgramPointId(pub u32);

/// Reserved program point sampled on every plain access query.
pub const ACCESS_POINT: ProgramPointId = ProgramPointId(0);

impl fmt::Display for ProgramPointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identity of a runtime heap object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}
