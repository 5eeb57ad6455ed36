//! Replay tests for the transient result store.
//!
//! These tests verify:
//! - Arbitrary graphs survive a write and replay with edges, first-level
//!   markers and artifact set bindings intact
//! - Concurrent first loads decode once and share the result

#![allow(clippy::unwrap_used, clippy::expect_used)]

use depot_core::{ModuleVersionIdentifier, ResolvedConfigurationIdentifier};
use depot_results::TransientConfigurationResultsBuilder;
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;

fn identifier(index: u64) -> ResolvedConfigurationIdentifier {
    ResolvedConfigurationIdentifier::new(
        ModuleVersionIdentifier::new("org.example", format!("module-{index}"), "1.0"),
        "runtime",
    )
}

/// A graph as (node count, edges with artifact set ids, first-level ids). Edges
/// always point from a lower to a higher node id.
fn graph_strategy() -> impl Strategy<Value = (u64, Vec<(u64, u64, u64)>, Vec<u64>)> {
    (2u64..12).prop_flat_map(|count| {
        let edge = (0..count - 1).prop_flat_map(move |parent| {
            ((parent + 1)..count, 0u64..1000).prop_map(move |(child, set)| (parent, child, set))
        });
        (
            Just(count),
            proptest::collection::vec(edge, 0..20),
            proptest::collection::vec(1..count, 0..4),
        )
    })
}

proptest! {
    #[test]
    fn graphs_survive_replay((count, edges, first_level) in graph_strategy()) {
        let builder = TransientConfigurationResultsBuilder::new().unwrap();
        for id in 0..count {
            builder.resolved_dependency(id, &identifier(id)).unwrap();
        }
        for (parent, child, set) in &edges {
            builder.parent_child(*parent, *child, *set).unwrap();
        }
        for id in &first_level {
            builder.first_level_dependency(*id).unwrap();
        }
        builder.done(0).unwrap();

        let results = builder.load().unwrap();
        prop_assert_eq!(results.root_id(), 0);
        prop_assert_eq!(results.len() as u64, count);
        prop_assert_eq!(results.edges().len(), edges.len());
        for (edge, (parent, child, set)) in results.edges().iter().zip(&edges) {
            prop_assert_eq!((edge.parent, edge.child, edge.artifact_set_id), (*parent, *child, *set));
            prop_assert!(results.node(*parent).unwrap().children.contains(child));
            prop_assert!(results.node(*child).unwrap().parents.contains(parent));
        }
        let replayed: BTreeSet<u64> = results.first_level_ids().iter().copied().collect();
        prop_assert_eq!(replayed, first_level.into_iter().collect::<BTreeSet<u64>>());
        for id in 0..count {
            prop_assert_eq!(&results.node(id).unwrap().identifier, &identifier(id));
        }
    }
}

#[test]
fn concurrent_first_loads_share_one_graph() {
    let builder = Arc::new(TransientConfigurationResultsBuilder::new().unwrap());
    builder.resolved_dependency(1, &identifier(1)).unwrap();
    builder.resolved_dependency(2, &identifier(2)).unwrap();
    builder.parent_child(1, 2, 42).unwrap();
    builder.first_level_dependency(2).unwrap();
    builder.done(1).unwrap();

    let loaded: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let builder = Arc::clone(&builder);
                scope.spawn(move || builder.load().unwrap())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for results in &loaded[1..] {
        assert!(Arc::ptr_eq(&loaded[0], results));
    }
    assert_eq!(loaded[0].artifact_set_id(1, 2), Some(42));
    assert_eq!(loaded[0].first_level().count(), 1);
}
