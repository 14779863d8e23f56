// trie.rs — Aggregation trie of per-context object counts
//
// Each tracked object parks exactly one unit of count at the node addressed
// by its (creation path, depth) pair: walk the path's program points from
// the innermost entry outward, stopping at index `depth`. All mutation goes
// through `insert_at` / `remove_at` so the conservation invariant (sum of
// counts == tracked objects) is maintained in one place.
//
// Preconditions: callers pair every `remove_at` with an earlier `insert_at`
//   for the same (path, depth).
// Postconditions: `total_count()` equals inserts minus successful removes.
// Failure modes: removing from an empty or missing node is refused.
// Side effects: none.

use std::collections::BTreeMap;
use std::fmt;

use tracing::warn;

use crate::id::ProgramPointId;
use crate::path_index::PathVector;

/// One trie node. The root carries no program point.
#[derive(Default)]
pub struct TrieNode {
    count: u64,
    children: BTreeMap<ProgramPointId, TrieNode>,
}

impl TrieNode {
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Children in ascending program-point order.
    pub fn children(&self) -> impl DoubleEndedIterator<Item = (ProgramPointId, &TrieNode)> {
        self.children.iter().map(|(pid, node)| (*pid, node))
    }

    pub fn child(&self, pid: ProgramPointId) -> Option<&TrieNode> {
        self.children.get(&pid)
    }

    /// This node and all of its descendants, parents before children.
    fn subtree(&self) -> impl Iterator<Item = &TrieNode> {
        let mut pending = vec![self];
        std::iter::from_fn(move || {
            let node = pending.pop()?;
            pending.extend(node.children.values());
            Some(node)
        })
    }
}

// Tries grow as deep as the monitored call chain; the derived drop would
// recurse once per level.
impl Drop for TrieNode {
    fn drop(&mut self) {
        let mut pending: Vec<TrieNode> = std::mem::take(&mut self.children).into_values().collect();
        while let Some(mut node) = pending.pop() {
            pending.extend(std::mem::take(&mut node.children).into_values());
        }
    }
}

impl fmt::Debug for TrieNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrieNode")
            .field("count", &self.count)
            .field("children", &self.children.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Shared tally of tracked objects per minimal distinguishing context.
#[derive(Debug, Default)]
pub struct AggregationTrie {
    root: TrieNode,
}

/// Program points addressed by `(path, depth)`, innermost first.
fn address(path: &PathVector, depth: usize) -> impl Iterator<Item = ProgramPointId> + '_ {
    path.entries()
        .iter()
        .skip(depth)
        .rev()
        .map(|entry| entry.pid)
}

impl AggregationTrie {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> &TrieNode {
        &self.root
    }

    /// Park one unit of count at the node addressed by `(path, depth)`,
    /// creating intermediate nodes on demand.
    pub fn insert_at(&mut self, path: &PathVector, depth: usize) {
        let mut node = &mut self.root;
        for pid in address(path, depth) {
            node = node.children.entry(pid).or_default();
        }
        node.count += 1;
    }

    /// Take one unit of count back from the node addressed by
    /// `(path, depth)`. Returns false, leaving the trie untouched, when that
    /// node does not exist or holds no count.
    pub fn remove_at(&mut self, path: &PathVector, depth: usize) -> bool {
        let mut node = &mut self.root;
        for pid in address(path, depth) {
            node = match node.children.get_mut(&pid) {
                Some(child) => child,
                None => {
                    warn!(%path, depth, "trie removal from a missing node");
                    return false;
                }
            };
        }
        if node.count == 0 {
            warn!(%path, depth, "trie removal from an empty node");
            return false;
        }
        node.count -= 1;
        true
    }

    /// Count parked at the node addressed by `(path, depth)`.
    pub fn count_at(&self, path: &PathVector, depth: usize) -> u64 {
        let mut node = &self.root;
        for pid in address(path, depth) {
            node = match node.children.get(&pid) {
                Some(child) => child,
                None => return 0,
            };
        }
        node.count
    }

    /// Sum of counts over every node.
    pub fn total_count(&self) -> u64 {
        self.root.subtree().map(TrieNode::count).sum()
    }

    /// Number of nodes below the root.
    pub fn node_count(&self) -> usize {
        self.root.subtree().count() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty() && self.root.count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path_index::PathEntry;

    fn path(entries: &[(u32, u64)]) -> PathVector {
        PathVector::new(
            entries
                .iter()
                .map(|&(pid, count)| PathEntry::new(ProgramPointId(pid), count))
                .collect(),
        )
    }

    #[test]
    fn insert_walks_from_innermost_entry() {
        let mut trie = AggregationTrie::new();
        let p = path(&[(1, 1), (2, 1), (3, 1)]);
        trie.insert_at(&p, 2);
        {
            let inner = trie.root().child(ProgramPointId(3)).unwrap();
            assert_eq!(inner.count(), 1);
            assert_eq!(inner.children().count(), 0);
        }

        trie.insert_at(&p, 0);
        let middle = trie
            .root()
            .child(ProgramPointId(3))
            .and_then(|n| n.child(ProgramPointId(2)))
            .unwrap();
        assert_eq!(middle.count(), 0);
        assert_eq!(middle.child(ProgramPointId(1)).unwrap().count(), 1);
        assert_eq!(trie.count_at(&p, 0), 1);
        assert_eq!(trie.count_at(&p, 1), 0);
        assert_eq!(trie.count_at(&p, 2), 1);
        assert_eq!(trie.node_count(), 3);
    }

    #[test]
    fn counts_ignore_firing_counts() {
        let mut trie = AggregationTrie::new();
        trie.insert_at(&path(&[(1, 1), (7, 1)]), 1);
        trie.insert_at(&path(&[(1, 1), (7, 2)]), 1);
        assert_eq!(trie.node_count(), 1);
        assert_eq!(trie.count_at(&path(&[(1, 5), (7, 9)]), 1), 2);
    }

    #[test]
    fn remove_then_insert_moves_a_unit() {
        let mut trie = AggregationTrie::new();
        let p = path(&[(1, 1), (2, 1)]);
        trie.insert_at(&p, 1);
        assert!(trie.remove_at(&p, 1));
        trie.insert_at(&p, 0);
        assert_eq!(trie.total_count(), 1);
        assert_eq!(trie.count_at(&p, 1), 0);
        assert_eq!(trie.count_at(&p, 0), 1);
    }

    #[test]
    fn remove_refuses_missing_or_empty_nodes() {
        let mut trie = AggregationTrie::new();
        let p = path(&[(1, 1), (2, 1)]);
        assert!(!trie.remove_at(&p, 0));
        trie.insert_at(&p, 0);
        // Node for depth 1 exists as an intermediate but holds no count.
        assert!(!trie.remove_at(&p, 1));
        assert_eq!(trie.total_count(), 1);
    }

    #[test]
    fn deep_chain_counts_and_drops() {
        let levels = 100_000u32;
        let p = PathVector::new(
            (0..levels)
                .map(|n| PathEntry::new(ProgramPointId(n % 3), 1))
                .collect(),
        );
        let mut trie = AggregationTrie::new();
        trie.insert_at(&p, 0);
        trie.insert_at(&p, levels as usize - 1);
        assert_eq!(trie.total_count(), 2);
        assert_eq!(trie.node_count(), levels as usize);
        assert!(trie.remove_at(&p, 0));
        assert_eq!(trie.count_at(&p, 0), 0);
        drop(trie);
    }

    #[test]
    fn empty_trie() {
        let trie = AggregationTrie::new();
        assert!(trie.is_empty());
        assert_eq!(trie.total_count(), 0);
        assert_eq!(trie.node_count(), 0);
    }
}
