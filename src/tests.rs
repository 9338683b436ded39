extern crate std;

use core::ptr::NonNull;
use std::{ops::Range, prelude::v1::*, vec};

use proptest::prelude::*;

use crate::model::{self, TestNode};

use super::*;

fn tree_of(keys: &[u32]) -> AvlTree<TestNode> {
    let mut tree: AvlTree<TestNode> = AvlTree::new();

    for &key in keys {
        assert!(tree.insert(TestNode::new(key)).is_none());
        tree.assert_invariants();
    }

    tree
}

fn keys(tree: &AvlTree<TestNode>) -> Vec<u32> {
    tree.iter().map(|node| node.key).collect()
}

fn root_key(tree: &AvlTree<TestNode>) -> Option<u32> {
    tree.root.map(|root| unsafe { root.as_ref().key })
}

// Returns `(left key, right key, balance)` of the node holding `key`.
fn shape_at(tree: &AvlTree<TestNode>, key: u32) -> (Option<u32>, Option<u32>, i8) {
    let node = tree.get_raw(&key).expect("item not found");

    unsafe {
        let links = tree.links(node);
        let child_key = |child: Link<TestNode>| child.map(|c| c.as_ref().key);

        (
            child_key(links.left()),
            child_key(links.right()),
            links.balance(),
        )
    }
}

// Pre-order `(key, balance)` listing, which pins down the whole shape of the tree.
fn preorder(tree: &AvlTree<TestNode>) -> Vec<(u32, i8)> {
    fn visit(tree: &AvlTree<TestNode>, node: Link<TestNode>, out: &mut Vec<(u32, i8)>) {
        let Some(node) = node else { return };

        unsafe {
            out.push((node.as_ref().key, tree.links(node).balance()));
            visit(tree, tree.links(node).left(), out);
            visit(tree, tree.links(node).right(), out);
        }
    }

    let mut out = Vec::new();
    visit(tree, tree.root, &mut out);
    out
}

fn insert_find_all(keys: &[u32]) {
    let tree = tree_of(keys);

    for key in keys {
        let node = tree.get_raw(key).expect("item not found");
        assert_eq!(unsafe { node.as_ref().key() }, key);
    }
}

#[test]
fn zero_elems_find() {
    insert_find_all(&[]);
}

#[test]
fn single_elem_find() {
    insert_find_all(&[0]);
}

#[test]
fn two_elems_find() {
    insert_find_all(&[0, 1]);
    insert_find_all(&[1, 0]);
}

#[test]
fn three_elems_find() {
    insert_find_all(&[0, 1, 2]);
    insert_find_all(&[0, 2, 1]);
    insert_find_all(&[1, 0, 2]);
    insert_find_all(&[1, 2, 0]);
    insert_find_all(&[2, 0, 1]);
    insert_find_all(&[2, 1, 0]);
}

// Calls `f` with every permutation of `items` (Heap's algorithm).
fn for_each_permutation(items: &mut [u32], k: usize, f: &mut impl FnMut(&[u32])) {
    if k <= 1 {
        f(items);
        return;
    }

    for i in 0..k - 1 {
        for_each_permutation(items, k - 1, f);

        if k % 2 == 0 {
            items.swap(i, k - 1);
        } else {
            items.swap(0, k - 1);
        }
    }

    for_each_permutation(items, k - 1, f);
}

#[test]
fn all_permutations_find() {
    for n in 0..=6 {
        let mut items: Vec<u32> = (0..n).collect();
        let k = items.len();
        for_each_permutation(&mut items, k, &mut |keys: &[u32]| insert_find_all(keys));
    }
}

fn insert_remove_all(keys: &[u32]) {
    let mut tree = tree_of(keys);

    for key in keys {
        let removed = tree.remove(key).expect("item not found");
        assert_eq!(removed.key, *key);
        tree.assert_invariants();
    }

    assert!(tree.is_empty());

    for &key in keys {
        tree.insert(TestNode::new(key));
        tree.assert_invariants();
    }

    for key in keys.iter().rev() {
        let node = tree.get_raw(key).expect("item not found");
        let removed = unsafe { tree.remove_at(node) };
        assert_eq!(removed.key, *key);
        tree.assert_invariants();
    }

    assert!(tree.is_empty());
}

#[test]
fn remove_one() {
    insert_remove_all(&[0]);
}

#[test]
fn remove_two() {
    insert_remove_all(&[0, 1]);
    insert_remove_all(&[1, 0]);
}

#[test]
fn remove_three() {
    insert_remove_all(&[0, 1, 2]);
    insert_remove_all(&[0, 2, 1]);
    insert_remove_all(&[1, 0, 2]);
    insert_remove_all(&[1, 2, 0]);
    insert_remove_all(&[2, 0, 1]);
    insert_remove_all(&[2, 1, 0]);
}

#[test]
fn all_permutations_remove() {
    for n in 0..=6 {
        let mut items: Vec<u32> = (0..n).collect();
        let k = items.len();
        for_each_permutation(&mut items, k, &mut |keys: &[u32]| insert_remove_all(keys));
    }
}

#[test]
fn remove_every_key_from_each_shape() {
    // Every 7-key insertion order, followed by removing each key in turn from a fresh copy, hits
    // all rotation cases on the way down.
    let mut items: Vec<u32> = (0..7).collect();

    for_each_permutation(&mut items, 7, &mut |order: &[u32]| {
        for &victim in order {
            let mut tree = tree_of(order);
            let expected: Vec<u32> = (0..7).filter(|&k| k != victim).collect();

            assert_eq!(tree.remove(&victim).map(|node| node.key), Some(victim));
            tree.assert_invariants();
            assert_eq!(keys(&tree), expected);
        }
    });
}

#[test]
fn remove_absent_key_is_a_noop() {
    let mut tree = tree_of(&[2, 1, 3]);
    let before = preorder(&tree);

    assert!(tree.remove(&7).is_none());
    assert_eq!(preorder(&tree), before);
    assert_eq!(tree.len(), 3);

    let mut empty: AvlTree<TestNode> = AvlTree::new();
    assert!(empty.remove(&0).is_none());
    assert!(empty.is_empty());
}

#[test]
fn ascending_inserts_rotate_left() {
    let tree = tree_of(&[10, 20, 30]);

    assert_eq!(root_key(&tree), Some(20));
    assert_eq!(shape_at(&tree, 20), (Some(10), Some(30), 0));
    assert_eq!(shape_at(&tree, 10), (None, None, 0));
    assert_eq!(shape_at(&tree, 30), (None, None, 0));
}

#[test]
fn descending_inserts_rotate_right() {
    let tree = tree_of(&[30, 20, 10]);

    assert_eq!(root_key(&tree), Some(20));
    assert_eq!(preorder(&tree), vec![(20, 0), (10, 0), (30, 0)]);
}

#[test]
fn zig_zag_inserts_rotate_twice() {
    let tree = tree_of(&[30, 10, 20]);

    assert_eq!(root_key(&tree), Some(20));
    assert_eq!(shape_at(&tree, 20), (Some(10), Some(30), 0));
    assert_eq!(preorder(&tree), vec![(20, 0), (10, 0), (30, 0)]);

    let tree = tree_of(&[10, 30, 20]);
    assert_eq!(preorder(&tree), vec![(20, 0), (10, 0), (30, 0)]);
}

#[test]
fn double_rotation_balance_table() {
    // The new node's balance before the double rotation decides the outcome.
    let tree = tree_of(&[50, 20, 80, 10, 30, 25]);
    assert_eq!(
        preorder(&tree),
        vec![(30, 0), (20, 0), (10, 0), (25, 0), (50, 1), (80, 0)]
    );

    let tree = tree_of(&[50, 20, 80, 10, 30, 35]);
    assert_eq!(
        preorder(&tree),
        vec![(30, 0), (20, -1), (10, 0), (50, 0), (35, 0), (80, 0)]
    );
}

#[test]
fn insert_into_leaning_parent_stops_early() {
    let mut tree = tree_of(&[20, 10, 30, 5]);
    assert_eq!(shape_at(&tree, 10), (Some(5), None, -1));
    assert_eq!(shape_at(&tree, 20), (Some(10), Some(30), -1));

    tree.insert(TestNode::new(15));
    tree.assert_invariants();

    assert_eq!(shape_at(&tree, 10), (Some(5), Some(15), 0));
    assert_eq!(shape_at(&tree, 20), (Some(10), Some(30), -1));
}

#[test]
fn remove_root_of_perfect_tree() {
    let mut tree = tree_of(&[4, 2, 6, 1, 3, 5, 7]);
    assert!(tree.has_equal_leaf_depths());
    assert_eq!(tree.height(), 3);

    let removed = tree.remove(&4).expect("item not found");
    assert_eq!(removed.key, 4);
    tree.assert_invariants();

    // The predecessor takes the root's place.
    assert_eq!(root_key(&tree), Some(3));
    assert_eq!(shape_at(&tree, 3), (Some(2), Some(6), 0));
    assert_eq!(shape_at(&tree, 2), (Some(1), None, -1));
    assert_eq!(keys(&tree), vec![1, 2, 3, 5, 6, 7]);

    // 2 now has a single child, so it is no longer a leaf.
    assert!(tree.has_equal_leaf_depths());
}

#[test]
fn remove_with_adjacent_predecessor() {
    // The predecessor of 20 is its direct left child.
    let mut tree = tree_of(&[20, 10, 30, 40]);

    assert_eq!(tree.remove(&20).map(|node| node.key), Some(20));
    tree.assert_invariants();
    assert_eq!(preorder(&tree), vec![(30, 0), (10, 0), (40, 0)]);
}

#[test]
fn remove_rotation_keeping_height_stops() {
    // Removing 5 leaves 10 right-heavy by two with a balanced right child.
    let mut tree = tree_of(&[10, 5, 20, 15, 25]);

    tree.remove(&5);
    tree.assert_invariants();
    assert_eq!(preorder(&tree), vec![(20, -1), (10, 1), (15, 0), (25, 0)]);
}

#[test]
fn remove_propagates_to_root() {
    let mut tree = tree_of(&[8, 4, 12, 2, 6, 10, 14, 1, 3, 5, 7, 9, 11, 13, 15, 16]);
    tree.assert_invariants();

    for key in [1, 3, 2, 5, 7, 6, 4] {
        tree.remove(&key);
        tree.assert_invariants();
    }

    assert_eq!(keys(&tree), vec![8, 9, 10, 11, 12, 13, 14, 15, 16]);
    assert!(tree.height() <= 4);
}

#[test]
fn node_swap_exchanges_positions_and_balances() {
    let mut tree = tree_of(&[4, 2, 6, 1, 3, 5, 7, 0]);
    let before = preorder(&tree);

    let two = tree.get_raw(&2).expect("item not found");
    let six = tree.get_raw(&6).expect("item not found");

    unsafe { tree.node_swap(two, six) };

    let swapped: Vec<(u32, i8)> = before
        .iter()
        .map(|&(key, _)| match key {
            2 => 6,
            6 => 2,
            key => key,
        })
        .zip(before.iter().map(|&(_, balance)| balance))
        .collect();
    assert_eq!(preorder(&tree), swapped);

    // Swapping back restores a valid tree.
    unsafe { tree.node_swap(six, two) };
    assert_eq!(preorder(&tree), before);
    tree.assert_invariants();
}

#[test]
fn node_swap_with_root_and_child() {
    let mut tree = tree_of(&[2, 1, 3]);

    let one = tree.get_raw(&1).expect("item not found");
    let two = tree.get_raw(&2).expect("item not found");

    unsafe { tree.node_swap(two, one) };
    assert_eq!(root_key(&tree), Some(1));
    assert_eq!(preorder(&tree), vec![(1, 0), (2, 0), (3, 0)]);

    unsafe { tree.node_swap(one, two) };
    assert_eq!(root_key(&tree), Some(2));
    tree.assert_invariants();
}

#[test]
fn node_swap_with_itself_is_a_noop() {
    let mut tree = tree_of(&[4, 2, 6, 1]);
    let before = preorder(&tree);

    let two = tree.get_raw(&2).expect("item not found");
    unsafe { tree.node_swap(two, two) };

    assert_eq!(preorder(&tree), before);
    tree.assert_invariants();
}

#[test]
fn same_node_ignores_metadata() {
    let mut items = [1u32, 2, 3];
    let whole = NonNull::from(&mut items[..]);
    let prefix = NonNull::slice_from_raw_parts(whole.cast::<u32>(), 1);
    let tail = NonNull::from(&mut items[1..]);

    assert!(same_node(whole, prefix));
    assert!(!same_node(whole, tail));
}

#[test]
#[should_panic(expected = "stale balance tag at 2")]
fn invariants_catch_stale_balance() {
    let mut tree = tree_of(&[2, 1, 3]);
    let root = tree.root.expect("tree is not empty");

    unsafe { tree.links_mut(root).set_balance(1) };
    tree.assert_invariants();
}

#[test]
fn rotations_preserve_order() {
    let mut tree = tree_of(&[4, 2, 6, 1, 3, 5, 7]);
    let root = tree.root.expect("tree is not empty");

    unsafe { tree.rotate(root, Dir::Left) };
    assert_eq!(root_key(&tree), Some(6));
    assert_eq!(keys(&tree), vec![1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(shape_at(&tree, 4).0, Some(2));
    assert_eq!(shape_at(&tree, 4).1, Some(5));

    let root = tree.root.expect("tree is not empty");
    unsafe { tree.rotate(root, Dir::Right) };
    assert_eq!(root_key(&tree), Some(4));
    assert_eq!(keys(&tree), vec![1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(shape_at(&tree, 6).0, Some(5));
}

#[test]
fn duplicate_insert_replaces_in_place() {
    let mut tree = tree_of(&[2, 1, 3, 4]);
    let before = preorder(&tree);

    let old = tree.insert(TestNode::new(3)).expect("key was present");
    assert_eq!(old.key, 3);
    assert_eq!(tree.len(), 4);
    assert_eq!(preorder(&tree), before);
    tree.assert_invariants();

    let old = tree.insert(TestNode::new(2)).expect("key was present");
    assert_eq!(old.key, 2);
    assert_eq!(preorder(&tree), before);
    tree.assert_invariants();
}

#[test]
fn entry_reports_occupancy() {
    let mut tree = tree_of(&[5, 3, 8]);

    assert!(tree.entry(&3).is_occupied());

    match tree.entry(&4) {
        Entry::Vacant(entry) => {
            assert_eq!(*entry.key(), 4);
            let node = unsafe { entry.insert(TestNode::new(4)) };
            assert_eq!(node.key, 4);
        }
        Entry::Occupied(_) => panic!("4 is not in the tree"),
    }
    tree.assert_invariants();

    match tree.entry(&8) {
        Entry::Occupied(entry) => assert_eq!(entry.remove().key, 8),
        Entry::Vacant(_) => panic!("8 is in the tree"),
    }
    tree.assert_invariants();
    assert_eq!(keys(&tree), vec![3, 4, 5]);
}

#[test]
fn height_follows_avl_bound() {
    let mut tree: AvlTree<TestNode> = AvlTree::new();

    for (n, key) in (0..1024).enumerate() {
        tree.insert(TestNode::new(key));

        let n = (n + 1) as f64;
        let bound = 1.4405 * (n + 2.0).log2() - 0.3277;
        assert!(
            (tree.height() as f64) <= bound,
            "height {} exceeds bound {bound} at n = {n}",
            tree.height()
        );
    }

    tree.assert_invariants();
    assert_eq!(tree.height(), 11);
}

#[test]
fn insert_then_remove_restores_shape() {
    let mut tree = tree_of(&[8, 4, 12, 2, 6, 10, 14]);
    let before = preorder(&tree);

    tree.insert(TestNode::new(9));
    tree.assert_invariants();
    tree.remove(&9);
    tree.assert_invariants();

    assert_eq!(keys(&tree), vec![2, 4, 6, 8, 10, 12, 14]);
    assert_eq!(preorder(&tree), before);
}

#[test]
fn first_last_and_pop() {
    let mut tree = tree_of(&[5, 2, 9, 7]);

    assert_eq!(tree.first().map(|node| node.key), Some(2));
    assert_eq!(tree.last().map(|node| node.key), Some(9));

    assert_eq!(tree.pop_first().map(|node| node.key), Some(2));
    assert_eq!(tree.pop_last().map(|node| node.key), Some(9));
    tree.assert_invariants();
    assert_eq!(keys(&tree), vec![5, 7]);

    tree.clear();
    assert!(tree.is_empty());
    assert!(tree.first().is_none());
    assert!(tree.pop_last().is_none());
}

#[test]
fn cursor_walks_in_order() {
    let tree = tree_of(&[4, 2, 6, 1, 3, 5, 7]);

    let mut curs = tree.cursor_first();
    let mut seen = Vec::new();
    while let Some(node) = curs.get() {
        seen.push(node.key);
        curs.move_next();
    }
    assert_eq!(seen, vec![1, 2, 3, 4, 5, 6, 7]);

    // Past the end is the ghost position, which wraps to the first element.
    assert_eq!(curs.peek_next().map(|node| node.key), Some(1));

    let mut curs = tree.cursor_last();
    assert_eq!(curs.get().map(|node| node.key), Some(7));
    curs.move_prev();
    assert_eq!(curs.peek_prev().map(|node| node.key), Some(5));
}

#[test]
fn leaf_depths_of_tree() {
    assert!(AvlTree::<TestNode>::new().has_equal_leaf_depths());
    assert!(tree_of(&[2, 1, 3]).has_equal_leaf_depths());
    assert!(!tree_of(&[2, 1, 3, 4]).has_equal_leaf_depths());
}

#[test]
fn dotgraph_labels_balances() {
    let tree = tree_of(&[2, 1]);

    let mut out = String::new();
    tree.dotgraph("t", &mut out).expect("writing to a String cannot fail");

    assert!(out.starts_with("digraph \"graph-t\""));
    assert!(out.contains("\"grapht-2\" [label=\"2:-1\"]"));
    assert!(out.contains("\"grapht-1\" [label=\"1:0\"]"));
    assert!(out.contains("\"grapht-2\" -> \"grapht-1\";"));

    let empty: AvlTree<TestNode> = AvlTree::new();
    let mut out = String::new();
    empty.dotgraph("e", &mut out).expect("writing to a String cannot fail");
    assert_eq!(out, "digraph \"graph-e\" {}");
}

#[test]
fn map_overwrites_and_reports_missing_keys() {
    let mut map: AvlMap<u32, &str> = AvlMap::new();

    assert_eq!(map.insert(1, "one"), None);
    assert_eq!(map.insert(2, "two"), None);
    assert_eq!(map.insert(3, "three"), None);
    let height = map.height();

    assert_eq!(map.insert(2, "deux"), Some("two"));
    assert_eq!(map.len(), 3);
    assert_eq!(map.height(), height);
    assert_eq!(map.get(&2), Some(&"deux"));

    assert_eq!(map.try_get(&3), Ok(&"three"));
    assert_eq!(map.try_get(&4), Err(KeyError));
    assert_eq!(KeyError.to_string(), "key not found");

    if let Ok(value) = map.try_get_mut(&1) {
        *value = "un";
    }
    assert_eq!(map.get(&1), Some(&"un"));
    assert!(map.try_get_mut(&9).is_err());

    assert_eq!(map.remove(&4), None);
    assert_eq!(map.remove(&1), Some("un"));
    map.assert_invariants();
    assert_eq!(format!("{map:?}"), "{2: \"deux\", 3: \"three\"}");
}

#[test]
fn map_collects_in_key_order() {
    let map: AvlMap<u32, u32> = [(5, 50), (1, 10), (3, 30), (1, 11)].into_iter().collect();

    map.assert_invariants();
    assert_eq!(map.len(), 3);
    assert_eq!(
        map.iter().map(|(&k, &v)| (k, v)).collect::<Vec<_>>(),
        vec![(1, 11), (3, 30), (5, 50)]
    );
    assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![1, 3, 5]);
    assert_eq!(map.first_key_value(), Some((&1, &11)));
    assert_eq!(map.last_key_value(), Some((&5, &50)));
    assert!(map.contains_key(&3));
    assert!(!map.contains_key(&4));
}

#[cfg(miri)]
const FUZZ_RANGE: Range<usize> = 0..10;

#[cfg(not(miri))]
const FUZZ_RANGE: Range<usize> = 0..1000;

proptest::proptest! {
    #![proptest_config(ProptestConfig {
        max_shrink_iters: 65536,
        .. ProptestConfig::default()
    })]

    #[test]
    fn btree_equivalence(ops in proptest::collection::vec(model::op_strategy(), FUZZ_RANGE)) {
        model::run_btree_equivalence(ops);
    }

    #[test]
    fn cursor_equivalence(
        values in proptest::collection::vec(0u32..500, 0..100),
        ops in proptest::collection::vec(model::cursor_op_strategy(), 0..200),
    ) {
        model::run_cursor_equivalence(values, ops);
    }
}
