//! Leaf depth checks for binary trees.
//!
//! [`check_equal_leaf_depths`] works on anything that can hand out its children through
//! [`Children`]: the plain owned [`BinaryNode`] tree defined here, or the nodes of an
//! [`AvlTree`](crate::AvlTree) via [`AvlTree::has_equal_leaf_depths`](crate::AvlTree::has_equal_leaf_depths).

use core::{marker::PhantomData, ptr::NonNull};

use crate::{Links, TreeNode};

/// Access to the children of a node in a binary tree.
///
/// Implemented on cheap handles (usually references), so children are returned by value.
pub trait Children: Sized {
    fn left(&self) -> Option<Self>;

    fn right(&self) -> Option<Self>;
}

/// A node of a general, unbalanced binary tree that owns its children.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinaryNode<T> {
    pub value: T,
    pub left: Option<Box<BinaryNode<T>>>,
    pub right: Option<Box<BinaryNode<T>>>,
}

impl<T> BinaryNode<T> {
    /// Returns a node without children.
    pub fn leaf(value: T) -> Self {
        BinaryNode {
            value,
            left: None,
            right: None,
        }
    }

    /// Returns a node with the given children.
    pub fn new(value: T, left: Option<BinaryNode<T>>, right: Option<BinaryNode<T>>) -> Self {
        BinaryNode {
            value,
            left: left.map(Box::new),
            right: right.map(Box::new),
        }
    }
}

impl<'a, T> Children for &'a BinaryNode<T> {
    fn left(&self) -> Option<Self> {
        let node: &'a BinaryNode<T> = *self;
        node.left.as_deref()
    }

    fn right(&self) -> Option<Self> {
        let node: &'a BinaryNode<T> = *self;
        node.right.as_deref()
    }
}

/// Returns `true` if every leaf of the tree rooted at `root` is at the same depth.
///
/// The root is at depth 0. An empty tree has no leaves and trivially passes.
pub fn check_equal_leaf_depths<N: Children>(root: Option<N>) -> bool {
    let mut leaf_depth = None;

    match root {
        Some(root) => leaves_at_depth(&root, 0, &mut leaf_depth),
        None => true,
    }
}

// `leaf_depth` holds the depth of the first leaf seen; every later leaf must match it.
fn leaves_at_depth<N: Children>(node: &N, depth: usize, leaf_depth: &mut Option<usize>) -> bool {
    match (node.left(), node.right()) {
        (None, None) => *leaf_depth.get_or_insert(depth) == depth,
        (left, right) => [left, right]
            .into_iter()
            .flatten()
            .all(|child| leaves_at_depth(&child, depth + 1, leaf_depth)),
    }
}

/// A borrowed node of an [`AvlTree`](crate::AvlTree).
pub(crate) struct LinkedNode<'tree, T: ?Sized> {
    ptr: NonNull<T>,
    _tree: PhantomData<&'tree T>,
}

impl<T: ?Sized> LinkedNode<'_, T> {
    pub(crate) fn new(ptr: NonNull<T>) -> Self {
        LinkedNode {
            ptr,
            _tree: PhantomData,
        }
    }
}

impl<T> Children for LinkedNode<'_, T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn left(&self) -> Option<Self> {
        unsafe { T::links(self.ptr).as_ref().left() }.map(LinkedNode::new)
    }

    fn right(&self) -> Option<Self> {
        unsafe { T::links(self.ptr).as_ref().right() }.map(LinkedNode::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(value: u32) -> Option<BinaryNode<u32>> {
        Some(BinaryNode::leaf(value))
    }

    #[test]
    fn empty_tree_has_equal_leaf_depths() {
        assert!(check_equal_leaf_depths::<&BinaryNode<u32>>(None));
    }

    #[test]
    fn single_node_has_equal_leaf_depths() {
        let root = BinaryNode::leaf(1);
        assert!(check_equal_leaf_depths(Some(&root)));
    }

    #[test]
    fn perfect_tree_has_equal_leaf_depths() {
        let root = BinaryNode::new(
            4,
            Some(BinaryNode::new(2, leaf(1), leaf(3))),
            Some(BinaryNode::new(6, leaf(5), leaf(7))),
        );
        assert!(check_equal_leaf_depths(Some(&root)));
    }

    #[test]
    fn uneven_leaves_are_detected() {
        // Leaves 1 and 3 at depth 2, leaf 6 at depth 1.
        let root = BinaryNode::new(4, Some(BinaryNode::new(2, leaf(1), leaf(3))), leaf(6));
        assert!(!check_equal_leaf_depths(Some(&root)));
    }

    #[test]
    fn unary_chains_count_only_leaves() {
        // Both leaves at depth 2, reached through single-child nodes.
        let root = BinaryNode::new(
            1,
            Some(BinaryNode::new(2, leaf(3), None)),
            Some(BinaryNode::new(4, None, leaf(5))),
        );
        assert!(check_equal_leaf_depths(Some(&root)));

        let root = BinaryNode::new(1, Some(BinaryNode::new(2, leaf(3), None)), None);
        assert!(check_equal_leaf_depths(Some(&root)));
    }

    #[test]
    fn each_call_starts_fresh() {
        let shallow = BinaryNode::new(1, leaf(0), None);
        let deep = BinaryNode::new(1, Some(BinaryNode::new(2, leaf(3), None)), None);

        assert!(check_equal_leaf_depths(Some(&shallow)));
        assert!(check_equal_leaf_depths(Some(&deep)));
    }
}
