// report.rs — Aggregation-trie reporting pass
//
// Walks the trie depth-first (children in ascending program-point order),
// resolving each node's program point to a location string. Nodes are kept
// as a flat pre-order list tagged with their trie level, so neither the walk
// nor the report itself nests as deep as the monitored call chain. The text
// form prints one `#<count>:<location>` line per node, indented four spaces
// per level; the JSON form lists the same nodes under a summary block.
//
// Preconditions: the run has completed; the trie is no longer mutated.
// Postconditions: output is a deterministic function of trie + resolver.
// Failure modes: none (pure formatting).
// Side effects: none.

use std::fmt;

use serde::Serialize;

use crate::id::ProgramPointId;
use crate::location::LocationResolver;
use crate::tracker::TrackerStats;
use crate::trie::{AggregationTrie, TrieNode};

// ── Provenance ──────────────────────────────────────────────────────────────

/// Identifies the input a report was computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub trace_hash: [u8; 32],
    pub tool_version: &'static str,
}

impl Provenance {
    /// SHA-256 of the raw trace text.
    pub fn of_trace(source: &str) -> Self {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        let result = hasher.finalize();
        let mut trace_hash = [0u8; 32];
        trace_hash.copy_from_slice(&result);

        Provenance {
            trace_hash,
            tool_version: env!("CARGO_PKG_VERSION"),
        }
    }

    /// Hex string of the trace hash (64 characters).
    pub fn trace_hash_hex(&self) -> String {
        let mut s = String::with_capacity(64);
        for b in &self.trace_hash {
            use std::fmt::Write;
            let _ = write!(s, "{:02x}", b);
        }
        s
    }
}

// ── Report model ────────────────────────────────────────────────────────────

/// One trie node with its resolved location. `depth` is 0 for children of
/// the trie root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportNode {
    pub depth: usize,
    pub pid: ProgramPointId,
    pub location: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub tool_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_sha256: Option<String>,
    pub access_point: ProgramPointId,
    pub tracked_objects: u64,
    pub total_count: u64,
    pub trie_nodes: usize,
    pub stats: TrackerStats,
}

/// Result of the reporting pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub summary: ReportSummary,
    /// Trie nodes in depth-first pre-order.
    pub nodes: Vec<ReportNode>,
}

impl Report {
    /// Build the report for a finished run.
    pub fn build(
        trie: &AggregationTrie,
        resolver: &dyn LocationResolver,
        access_point: ProgramPointId,
        tracked_objects: u64,
        stats: TrackerStats,
    ) -> Self {
        Report {
            summary: ReportSummary {
                tool_version: env!("CARGO_PKG_VERSION").to_string(),
                trace_sha256: None,
                access_point,
                tracked_objects,
                total_count: trie.total_count(),
                trie_nodes: trie.node_count(),
                stats,
            },
            nodes: collect_nodes(trie.root(), resolver),
        }
    }

    /// Stamp the report with the provenance of its input.
    pub fn with_provenance(mut self, provenance: &Provenance) -> Self {
        self.summary.trace_sha256 = Some(provenance.trace_hash_hex());
        self.summary.tool_version = provenance.tool_version.to_string();
        self
    }

    /// Indented text form, one line per trie node.
    pub fn render_text(&self) -> String {
        self.to_string()
    }

    /// Pretty-printed JSON form.
    pub fn render_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Nodes one level below the node at `index`.
    pub fn children_of(&self, index: usize) -> impl Iterator<Item = &ReportNode> {
        let depth = self.nodes.get(index).map_or(0, |n| n.depth);
        self.nodes
            .iter()
            .skip(index + 1)
            .take_while(move |n| n.depth > depth)
            .filter(move |n| n.depth == depth + 1)
    }
}

fn collect_nodes(root: &TrieNode, resolver: &dyn LocationResolver) -> Vec<ReportNode> {
    let mut nodes = Vec::new();
    let mut pending: Vec<(usize, ProgramPointId, &TrieNode)> =
        root.children().rev().map(|(pid, child)| (0, pid, child)).collect();
    while let Some((depth, pid, node)) = pending.pop() {
        nodes.push(ReportNode {
            depth,
            pid,
            location: resolver.location_of(pid),
            count: node.count(),
        });
        pending.extend(
            node.children()
                .rev()
                .map(|(pid, child)| (depth + 1, pid, child)),
        );
    }
    nodes
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.nodes {
            writeln!(
                f,
                "{:indent$}#{}:{}",
                "",
                node.count,
                node.location,
                indent = node.depth * 4
            )?;
        }
        Ok(())
    }
}
