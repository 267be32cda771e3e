use super::*;

use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::HashMap;

const DEPTH: usize = 4;

fn validate_tree<T: LayerValue + std::hash::Hash>(t: &RatTree<T>) {
    let mut stack: Vec<(Option<NodeId>, usize)> = vec![(t.head, 0)];
    let mut leaf_rows: Vec<RowId> = Vec::new();
    let mut reachable = 0usize;

    while let Some((first, level)) = stack.pop() {
        let mut seen = std::collections::HashSet::new();
        for id in t.nodes.siblings(first) {
            reachable += 1;
            let node = t.nodes.get(id);
            assert!(seen.insert(node.value), "duplicate sibling value at level {level}");

            match node.link {
                Link::Row(row) => {
                    assert_eq!(Some(level + 1), t.depth(), "row link above the final level");
                    leaf_rows.push(row);
                }
                Link::Child(child) => {
                    assert!(child.is_some(), "dangling chain at level {level}");
                    assert!(Some(level + 1) < t.depth(), "child link at the final level");
                    stack.push((child, level + 1));
                }
            }
        }
    }

    assert_eq!(reachable, t.node_count(), "every node must be reachable");

    leaf_rows.sort_unstable();
    let base = t.config().base_row;
    let expected: Vec<RowId> = (base..t.next_row()).collect();
    assert_eq!(leaf_rows, expected, "rows must be dense and unique");
}

fn tuple_strategy() -> impl Strategy<Value = Vec<u8>> {
    // Few distinct values per level so prefixes are shared often.
    prop::collection::vec(0u8..4, DEPTH)
}

#[derive(Arbitrary, Clone, Debug)]
enum Op {
    #[proptest(weight = 3)]
    Insert(#[proptest(strategy = "tuple_strategy()")] Vec<u8>),
    Lookup(#[proptest(strategy = "tuple_strategy()")] Vec<u8>),
    Finalize,
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_equivalence(ops in prop::collection::vec(any::<Op>(), 0..=500), grow_size in 1usize..16) {
        let mut t: RatTree<u8> = RatTree::with_config(Config::default().with_grow_size(grow_size)).unwrap();
        let mut m: HashMap<Vec<u8>, RowId> = HashMap::new();
        let mut first_seen: Vec<Vec<u8>> = Vec::new();
        let mut hits: Vec<u64> = Vec::new();

        for op in ops {
            match op {
                Op::Insert(tuple) => {
                    let next = t.next_row();
                    let row = t.insert_or_lookup(&tuple).unwrap();
                    let expected = *m.entry(tuple.clone()).or_insert_with(|| {
                        first_seen.push(tuple.clone());
                        hits.push(0);
                        next
                    });
                    prop_assert_eq!(row, expected);
                    hits[(row - 1) as usize] += 1;
                }
                Op::Lookup(tuple) => {
                    prop_assert_eq!(t.lookup(&tuple), m.get(&tuple).copied());
                }
                Op::Finalize => {
                    let rat = t.finalize();
                    prop_assert_eq!(rat.len(), m.len());
                    prop_assert_eq!(rat.histogram(), hits.as_slice());
                }
            }
            prop_assert_eq!(t.len(), m.len());
        }

        validate_tree(&t);

        let rat = t.finalize();
        prop_assert_eq!(rat.len(), first_seen.len());
        for (i, tuple) in first_seen.iter().enumerate() {
            prop_assert_eq!(&rat[i as RowId + 1], tuple.as_slice());
        }

        let mut paths: Vec<(Vec<u8>, RowId)> = t.iter().collect();
        paths.sort();
        let mut expected: Vec<(Vec<u8>, RowId)> = m.into_iter().collect();
        expected.sort();
        prop_assert_eq!(paths, expected);
    }

    #[test]
    fn prop_block_matches_per_pixel(
        pixels in prop::collection::vec(prop::collection::vec(0u8..3, 3), 0..300),
    ) {
        let layers: Vec<Vec<u8>> = (0..3)
            .map(|l| pixels.iter().map(|p| p[l]).collect())
            .collect();
        let layer_refs: Vec<&[u8]> = layers.iter().map(Vec::as_slice).collect();

        let mut block_tree: RatTree<u8> = RatTree::new();
        let rows = block_tree.insert_block(&layer_refs, &[0, 0, 0]).unwrap();

        let mut pixel_tree: RatTree<u8> = RatTree::new();
        for (p, row) in pixels.iter().zip(&rows) {
            if p.contains(&0) {
                prop_assert_eq!(*row, NODATA_ROW);
            } else {
                prop_assert_eq!(*row, pixel_tree.insert_or_lookup(p).unwrap());
            }
        }
        prop_assert_eq!(block_tree.finalize(), pixel_tree.finalize());
    }
}

/// Calls `f` once per ordering of `items`, using Heap's algorithm.
fn each_ordering<T: Clone>(items: &[T], mut f: impl FnMut(&[T])) {
    let mut order = items.to_vec();
    let mut counters = vec![0usize; order.len()];
    f(&order);

    let mut i = 1;
    while i < order.len() {
        if counters[i] < i {
            let j = if i % 2 == 0 { 0 } else { counters[i] };
            order.swap(j, i);
            f(&order);
            counters[i] += 1;
            i = 1;
        } else {
            counters[i] = 0;
            i += 1;
        }
    }
}

#[test]
fn exhaustive_insert_order_small_set() {
    let tuples: Vec<Vec<u32>> = vec![
        vec![5, 3, 9],
        vec![5, 4, 8],
        vec![5, 4, 7],
        vec![9, 0, 1],
        vec![9, 0, 2],
        vec![5, 3, 8],
    ];

    let mut orderings = std::collections::HashSet::new();
    each_ordering(&tuples, |perm| {
        orderings.insert(perm.to_vec());
        let mut t: RatTree<u32> = RatTree::with_config(Config::default().with_grow_size(2)).unwrap();
        for (i, tuple) in perm.iter().enumerate() {
            assert_eq!(t.insert_or_lookup(tuple).unwrap(), i as RowId + 1);
        }
        // A second pass in reverse order finds every row again.
        for (i, tuple) in perm.iter().enumerate().rev() {
            assert_eq!(t.insert_or_lookup(tuple).unwrap(), i as RowId + 1);
        }

        validate_tree(&t);
        assert_eq!(t.node_count(), 11);
        assert_eq!(t.level_widths(), vec![2, 3, 6]);

        let rat = t.finalize();
        let got: Vec<Vec<u32>> = rat.rows().map(|(_, row)| row.to_vec()).collect();
        assert_eq!(got, perm);
        assert!(rat.histogram().iter().all(|&c| c == 2));
    });
    assert_eq!(orderings.len(), 720);
}
