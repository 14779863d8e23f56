// location.rs — Program-point to source-location resolution
//
// The reporting pass only needs `LocationResolver::location_of`. The
// `LocationTable` implementation is loaded from a JSON source map:
//
//     { "7": { "file": "app.js", "line": 3, "column": 9 }, ... }
//
// Preconditions: map keys are decimal program-point ids.
// Postconditions: every pid resolves to some string (unknown pids included).
// Failure modes: unreadable file, malformed JSON, or non-numeric keys.
// Side effects: reads the map file once in `LocationTable::load`.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::LocationError;
use crate::id::{ProgramPointId, ACCESS_POINT};

/// A static source position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}:{}:{})", self.file, self.line, self.column)
    }
}

/// Resolves a program point to a human-readable location string.
pub trait LocationResolver {
    fn location_of(&self, pid: ProgramPointId) -> String;
}

impl<F> LocationResolver for F
where
    F: Fn(ProgramPointId) -> String,
{
    fn location_of(&self, pid: ProgramPointId) -> String {
        self(pid)
    }
}

/// Location map keyed by program point.
#[derive(Debug, Clone)]
pub struct LocationTable {
    locations: HashMap<ProgramPointId, Location>,
    access_point: ProgramPointId,
}

impl Default for LocationTable {
    fn default() -> Self {
        LocationTable {
            locations: HashMap::new(),
            access_point: ACCESS_POINT,
        }
    }
}

impl LocationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a non-default access sentinel when rendering.
    pub fn with_access_point(mut self, pid: ProgramPointId) -> Self {
        self.access_point = pid;
        self
    }

    pub fn insert(&mut self, pid: ProgramPointId, location: Location) {
        self.locations.insert(pid, location);
    }

    pub fn get(&self, pid: ProgramPointId) -> Option<&Location> {
        self.locations.get(&pid)
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Load a JSON location map from disk.
    pub fn load(path: &Path) -> Result<Self, LocationError> {
        let text = std::fs::read_to_string(path).map_err(|source| LocationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text, path)
    }

    /// Parse a JSON location map. `origin` is used only in error messages.
    pub fn from_json(text: &str, origin: &Path) -> Result<Self, LocationError> {
        let raw: HashMap<String, Location> =
            serde_json::from_str(text).map_err(|source| LocationError::Json {
                path: origin.to_path_buf(),
                source,
            })?;
        let mut table = LocationTable::new();
        for (key, location) in raw {
            let pid = key
                .trim()
                .parse::<u32>()
                .map_err(|_| LocationError::BadKey {
                    path: origin.to_path_buf(),
                    key: key.clone(),
                })?;
            table.insert(ProgramPointId(pid), location);
        }
        Ok(table)
    }
}

impl LocationResolver for LocationTable {
    fn location_of(&self, pid: ProgramPointId) -> String {
        match self.locations.get(&pid) {
            Some(loc) => loc.to_string(),
            None if pid == self.access_point => "(access)".to_string(),
            None => format!("(unknown pid {})", pid),
        }
    }
}
