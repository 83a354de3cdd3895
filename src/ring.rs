use sha2::{Digest, Sha256};
use std::collections::HashSet;
use thiserror::Error;

pub const DEFAULT_VIRTUAL_NODES: usize = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RingError {
    #[error("no nodes available in the hash ring")]
    Empty,
}

#[derive(Debug, Clone)]
struct RingPosition {
    hash: u32,
    node: String,
}

/// Consistent-hash ring mapping string keys onto cache/shard nodes.
///
/// Each node occupies `virtual_nodes` positions on a 32-bit ring so that no
/// single node owns one large contiguous arc; adding or removing a node
/// reassigns roughly `1/N` of the key space. Positions stay sorted by hash
/// and lookups binary-search for the first position at or past the key's
/// hash, wrapping to the start of the ring when none exists.
#[derive(Debug, Clone)]
pub struct ConsistentHashRing {
    positions: Vec<RingPosition>,
    nodes: HashSet<String>,
    virtual_nodes: usize,
}

/// First 32 bits of the SHA-256 digest, uniform over the full u32 range.
/// Collisions across virtual nodes are harmless.
fn hash_key(key: &str) -> u32 {
    let digest = Sha256::digest(key.as_bytes());
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

impl ConsistentHashRing {
    pub fn new<I, S>(nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_virtual_nodes(nodes, DEFAULT_VIRTUAL_NODES)
    }

    pub fn with_virtual_nodes<I, S>(nodes: I, virtual_nodes: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ring = Self {
            positions: Vec::new(),
            nodes: HashSet::new(),
            virtual_nodes,
        };
        for node in nodes {
            ring.add_node(node.into());
        }
        ring
    }

    /// Add a node and its virtual positions. No-op if already present.
    pub fn add_node(&mut self, node: impl Into<String>) {
        let node = node.into();
        if !self.nodes.insert(node.clone()) {
            return;
        }

        self.positions.reserve(self.virtual_nodes);
        for i in 0..self.virtual_nodes {
            let hash = hash_key(&format!("{node}:{i}"));
            self.positions.push(RingPosition {
                hash,
                node: node.clone(),
            });
        }

        // Node name breaks hash ties so the order is deterministic
        self.positions
            .sort_unstable_by(|a, b| a.hash.cmp(&b.hash).then_with(|| a.node.cmp(&b.node)));
    }

    /// Remove a node and every position belonging to it. No-op if absent.
    pub fn remove_node(&mut self, node: &str) {
        if !self.nodes.remove(node) {
            return;
        }
        self.positions.retain(|position| position.node != node);
    }

    /// The node owning `key`: the first position clockwise from the key's
    /// hash, wrapping around the ring.
    pub fn get_node(&self, key: &str) -> Result<&str, RingError> {
        if self.positions.is_empty() {
            return Err(RingError::Empty);
        }

        let hash = hash_key(key);
        let idx = self.positions.partition_point(|p| p.hash < hash);
        let idx = idx % self.positions.len();
        Ok(&self.positions[idx].node)
    }

    pub fn nodes(&self) -> Vec<&str> {
        self.nodes.iter().map(String::as_str).collect()
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn virtual_nodes(&self) -> usize {
        self.virtual_nodes
    }
}

/// Count how many of `keys` land on each node. Used to eyeball load skew
/// when sizing a node set.
pub fn analyze_distribution<'a, I>(
    ring: &ConsistentHashRing,
    keys: I,
) -> Result<std::collections::HashMap<String, usize>, RingError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut distribution = std::collections::HashMap::new();
    for key in keys {
        let node = ring.get_node(key)?;
        *distribution.entry(node.to_string()).or_insert(0) += 1;
    }
    Ok(distribution)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_ring_errors() {
        let ring = ConsistentHashRing::new(Vec::<String>::new());
        assert_eq!(ring.get_node("anything"), Err(RingError::Empty));
    }

    #[test]
    fn test_lookup_is_deterministic() {
        let ring = ConsistentHashRing::new(["n1", "n2", "n3"]);
        let first = ring.get_node("user-123").unwrap().to_string();
        for _ in 0..10 {
            assert_eq!(ring.get_node("user-123").unwrap(), first);
        }
    }

    #[test]
    fn test_position_counts() {
        let mut ring = ConsistentHashRing::new(["n1", "n2", "n3"]);
        assert_eq!(ring.position_count(), 300);

        ring.add_node("n4");
        assert_eq!(ring.position_count(), 400);

        // Re-adding is a no-op
        ring.add_node("n4");
        assert_eq!(ring.position_count(), 400);

        ring.remove_node("n1");
        assert_eq!(ring.position_count(), 300);
        assert_eq!(ring.nodes().len(), 3);

        ring.remove_node("n1");
        assert_eq!(ring.position_count(), 300);
    }

    #[test]
    fn test_positions_stay_sorted() {
        let mut ring = ConsistentHashRing::new(["a", "b"]);
        ring.add_node("c");
        assert!(ring
            .positions
            .windows(2)
            .all(|w| w[0].hash <= w[1].hash));
    }
}
