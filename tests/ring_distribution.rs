//! Distribution properties of the consistent-hash ring: load balance under
//! virtual nodes and bounded key movement when membership changes.

use boltlink::ring::{analyze_distribution, ConsistentHashRing, RingError};
use rand::distr::Alphanumeric;
use rand::RngExt;
use std::collections::HashMap;

fn sample_keys(count: usize) -> Vec<String> {
    let mut rng = rand::rng();
    (0..count)
        .map(|_| {
            (&mut rng)
                .sample_iter(&Alphanumeric)
                .take(16)
                .map(char::from)
                .collect()
        })
        .collect()
}

fn assignments<'a>(ring: &ConsistentHashRing, keys: &'a [String]) -> HashMap<&'a str, String> {
    keys.iter()
        .map(|k| (k.as_str(), ring.get_node(k).unwrap().to_string()))
        .collect()
}

#[test]
fn test_load_spreads_across_nodes() {
    let ring = ConsistentHashRing::new(["n1", "n2", "n3"]);
    let keys = sample_keys(30_000);

    let distribution =
        analyze_distribution(&ring, keys.iter().map(String::as_str)).unwrap();

    assert_eq!(distribution.len(), 3);
    // Virtual nodes keep per-node share near 1/3; allow generous variance
    for (node, &count) in &distribution {
        let share = count as f64 / keys.len() as f64;
        assert!(
            (0.15..=0.55).contains(&share),
            "node {node} owns {share:.3} of the key space"
        );
    }
}

#[test]
fn test_adding_a_node_moves_about_its_fair_share() {
    let keys = sample_keys(30_000);

    let mut ring = ConsistentHashRing::new(["n1", "n2", "n3"]);
    let before = assignments(&ring, &keys);

    ring.add_node("n4");
    let after = assignments(&ring, &keys);

    let mut moved = 0usize;
    for key in &keys {
        let old = &before[key.as_str()];
        let new = &after[key.as_str()];
        if old != new {
            // Every relocated key must land on the new node, never shuffle
            // between the surviving nodes
            assert_eq!(new, "n4", "key {key} moved from {old} to {new}");
            moved += 1;
        }
    }

    // Expect roughly 1/4 of keys to move; tolerate virtual-node variance
    let fraction = moved as f64 / keys.len() as f64;
    assert!(
        (0.12..=0.40).contains(&fraction),
        "moved fraction {fraction:.3} out of expected band around 0.25"
    );
}

#[test]
fn test_removing_a_node_only_reassigns_its_keys() {
    let keys = sample_keys(20_000);

    let mut ring = ConsistentHashRing::new(["n1", "n2", "n3"]);
    let before = assignments(&ring, &keys);

    ring.remove_node("n2");
    let after = assignments(&ring, &keys);

    for key in &keys {
        let old = &before[key.as_str()];
        let new = &after[key.as_str()];
        if old == "n2" {
            assert_ne!(new, "n2");
        } else {
            assert_eq!(old, new, "key {key} owned by {old} moved without cause");
        }
    }
}

#[test]
fn test_round_trip_membership() {
    let keys = sample_keys(10_000);

    let mut ring = ConsistentHashRing::new(["n1", "n2", "n3"]);
    let before = assignments(&ring, &keys);

    // Add and remove the same node: the ring must return to its exact
    // previous assignment
    ring.add_node("n4");
    ring.remove_node("n4");
    let after = assignments(&ring, &keys);

    assert_eq!(before, after);
}

#[test]
fn test_draining_the_ring_empties_it() {
    let mut ring = ConsistentHashRing::new(["n1", "n2"]);
    ring.remove_node("n1");
    ring.remove_node("n2");

    assert_eq!(ring.position_count(), 0);
    assert_eq!(ring.get_node("key"), Err(RingError::Empty));
}
