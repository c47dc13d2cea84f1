//! Node trie traversal
//!
//! Each component owns one trie. A node expects `length` bytes equal to its
//! characters at byte `offset` of the normalised input. Children are stored
//! sorted by `(offset, length, characters)`, so every `(offset, length)`
//! group is a contiguous run that can be binary searched by characters.
//!
//! ```text
//!            root
//!           /    \
//!   @13 "iPhone"  @13 "iPad"        group (13, 4) then (13, 6)
//!         |
//!   @25 "OS 7_1"
//! ```

use crate::dataset::{Dataset, Node, NodeId, Signature, SignatureId};
use memchr::memmem;

/// Result of descending a trie as far as the input allows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descent {
    /// Deepest node whose whole path matched the input
    pub deepest: NodeId,
    /// Number of nodes matched below the root
    pub depth: u32,
    /// Signature of the deepest node on the matched path that carries one
    pub signature: Option<SignatureId>,
}

/// Bytes of `input` a node would compare against, if in range
#[inline]
fn window<'a>(node: &Node, input: &'a [u8]) -> Option<&'a [u8]> {
    let start = node.offset as usize;
    let end = start.checked_add(node.length as usize)?;
    input.get(start..end)
}

/// True when the node's characters appear at exactly its offset
#[inline]
pub fn matches_at(dataset: &Dataset, node: &Node, input: &[u8]) -> bool {
    window(node, input).is_some_and(|slice| slice == dataset.node_characters(node))
}

/// True when the node's characters appear within `shift` bytes of its
/// offset (in either direction)
pub fn matches_shifted(dataset: &Dataset, node: &Node, input: &[u8], shift: usize) -> bool {
    let needle = dataset.node_characters(node);
    if needle.is_empty() {
        return false;
    }
    let offset = node.offset as usize;
    let start = offset.saturating_sub(shift).min(input.len());
    let end = offset
        .saturating_add(needle.len())
        .saturating_add(shift)
        .min(input.len());
    end > start && memmem::find(&input[start..end], needle).is_some()
}

/// Find the child of `node` matching the input
///
/// Groups are tried in ascending `(offset, length)` order and the first
/// group holding a match wins.
pub fn find_child(dataset: &Dataset, node: &Node, input: &[u8]) -> Option<NodeId> {
    let children = dataset.children(node);
    let mut start = 0;
    while start < children.len() {
        let first = dataset.node(children[start]);
        let key = (first.offset, first.length);
        let end = start
            + children[start..].partition_point(|id| {
                let child = dataset.node(*id);
                (child.offset, child.length) == key
            });
        let group = &children[start..end];

        if let Some(slice) = window(first, input) {
            let found = group.binary_search_by(|id| {
                dataset.node_characters(dataset.node(*id)).cmp(slice)
            });
            if let Ok(pos) = found {
                return Some(group[pos]);
            }
        }
        start = end;
    }
    None
}

/// Descend from `root` while children keep matching
pub fn descend(dataset: &Dataset, root: NodeId, input: &[u8]) -> Descent {
    let mut current = root;
    let mut depth = 0;
    let mut signature = None;
    while let Some(next) = find_child(dataset, dataset.node(current), input) {
        current = next;
        depth += 1;
        signature = dataset.node(current).signature.or(signature);
    }
    Descent {
        deepest: current,
        depth,
        signature,
    }
}

/// Distance of a signature from the input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Score {
    /// Sum of per-node costs
    pub distance: u32,
    /// Nodes found at or near their offset
    pub matched: u32,
    /// Sum of node weights along the path
    pub weight: u32,
}

/// Score a signature: a node at its offset costs nothing, a node within
/// `shift` bytes of its offset costs half its weight rounded up, and an
/// absent node costs its full weight
pub fn score(dataset: &Dataset, signature: &Signature, input: &[u8], shift: usize) -> Score {
    let mut score = Score::default();
    for id in dataset.signature_nodes(signature) {
        let node = dataset.node(*id);
        score.weight = score.weight.saturating_add(node.weight);
        if matches_at(dataset, node, input) {
            score.matched += 1;
        } else if matches_shifted(dataset, node, input, shift) {
            score.matched += 1;
            score.distance = score.distance.saturating_add(node.weight.div_ceil(2));
        } else {
            score.distance = score.distance.saturating_add(node.weight);
        }
    }
    score
}
