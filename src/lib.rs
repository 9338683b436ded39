//! An intrusive AVL tree.

// Conventions used in comments:
// - The height of a missing subtree is -1, so a leaf has height 0.
// - The balance of a node `x` is `h(right(x)) - h(left(x))`.
// - The parent of a node `x` is denoted `p(x)`.
// - A node is left-heavy if its balance is -1 and right-heavy if its balance is +1.
//
// The fundamental invariants of an AVL tree are:
// 1. Every key in the left subtree of `x` is less than the key of `x`, which in turn is less than
//    every key in the right subtree of `x`.
// 2. The balance of every node is -1, 0 or +1.
//
// Balances are maintained incrementally by the insert and remove paths. Heights are never
// recomputed, except by `assert_invariants`.

use core::{
    cell::UnsafeCell, cmp::Ordering, fmt, marker::PhantomPinned, mem, ops::Not, pin::Pin,
    ptr::NonNull,
};
use std::borrow::Borrow;

use cordyceps::Linked;

mod cursor;
mod debug;
mod entry;
mod error;
mod iter;
mod map;
pub mod paths;

#[cfg(any(test, feature = "model"))]
pub mod model;

#[cfg(test)]
mod tests;

pub use cursor::{Cursor, CursorMut};
pub use entry::{Entry, OccupiedEntry, VacantEntry};
pub use error::KeyError;
pub use iter::Iter;
pub use map::AvlMap;
pub use paths::{check_equal_leaf_depths, BinaryNode, Children};

pub trait TreeNode<L>: Linked<L> {
    type Key: Ord + fmt::Debug;

    fn key(&self) -> &Self::Key;
}

/// An intrusive AVL tree.
///
/// Nodes embed their own [`Links`], so linking an item into the tree does not allocate. The tree
/// owns every linked item through its [`Linked::Handle`] and hands it back when the item is
/// removed.
pub struct AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    root: Link<T>,
    len: usize,
}

pub struct Links<T: ?Sized> {
    inner: UnsafeCell<LinksInner<T>>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Dir {
    Left = 0,
    Right = 1,
}

impl Dir {
    // The change in balance of a node whose subtree on this side grew by one level.
    #[inline]
    fn sign(self) -> i8 {
        match self {
            Dir::Left => -1,
            Dir::Right => 1,
        }
    }
}

impl Not for Dir {
    type Output = Dir;

    fn not(self) -> Self::Output {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

#[repr(C)]
struct LinksInner<T: ?Sized> {
    parent: Link<T>,
    children: [Link<T>; 2],
    balance: i8,
    _unpin: PhantomPinned,
}

type Link<T> = Option<NonNull<T>>;

impl<T> AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    /// Returns a new empty tree.
    pub const fn new() -> AvlTree<T> {
        AvlTree { root: None, len: 0 }
    }

    /// Returns `true` if the tree contains no elements.
    pub const fn is_empty(&self) -> bool {
        let empty = self.len() == 0;

        if cfg!(debug_assertions) {
            // Can't use assert_eq!() in const fn.
            assert!(empty == self.root.is_none());
        }

        empty
    }

    /// Returns the number of elements in the tree.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns the number of nodes on the longest path from the root to a leaf.
    ///
    /// An empty tree has height 0. The walk follows the heavier child at every level, so this
    /// completes in _O(log(n))_ time.
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut opt_cur = self.root;

        while let Some(cur) = opt_cur {
            height += 1;

            let links = unsafe { self.links(cur) };
            opt_cur = if links.balance() > 0 {
                links.right()
            } else {
                links.left()
            };
        }

        height
    }

    /// Returns `true` if every leaf of the tree is at the same depth.
    pub fn has_equal_leaf_depths(&self) -> bool {
        check_equal_leaf_depths(self.root.map(paths::LinkedNode::new))
    }

    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        let mut count = 0;

        if let Some(root) = self.root {
            unsafe {
                assert_eq!(self.links(root).parent(), None, "root has a parent");
                self.assert_invariants_at(root, None, None, &mut count);
            }
        }

        assert_eq!(count, self.len, "`len` does not match the number of linked nodes");
    }

    // Checks the subtree rooted at `node` and returns its height.
    unsafe fn assert_invariants_at<'k>(
        &self,
        node: NonNull<T>,
        lower: Option<&'k T::Key>,
        upper: Option<&'k T::Key>,
        count: &mut usize,
    ) -> i32
    where
        T: 'k,
    {
        unsafe {
            let key: &'k T::Key = node.as_ref().key();

            if let Some(lower) = lower {
                assert!(lower < key, "{key:?} is out of order (lower bound {lower:?})");
            }

            if let Some(upper) = upper {
                assert!(key < upper, "{key:?} is out of order (upper bound {upper:?})");
            }

            *count += 1;

            let mut heights = [-1; 2];

            for dir in [Dir::Left, Dir::Right] {
                if let Some(child) = self.links(node).child(dir) {
                    // Ensure child's parent link points to this node.
                    let parent = self
                        .links(child)
                        .parent()
                        .expect("child parent pointer not set");
                    assert_eq!(node, parent);

                    let (lower, upper) = match dir {
                        Dir::Left => (lower, Some(key)),
                        Dir::Right => (Some(key), upper),
                    };

                    heights[dir as usize] = self.assert_invariants_at(child, lower, upper, count);
                }
            }

            let balance = heights[Dir::Right as usize] - heights[Dir::Left as usize];
            assert!(
                (-1..=1).contains(&balance),
                "{key:?} is out of balance ({balance})"
            );
            assert_eq!(
                i32::from(self.links(node).balance()),
                balance,
                "stale balance tag at {key:?}"
            );

            1 + heights[0].max(heights[1])
        }
    }

    /// Returns `true` if the tree contains an element with the given key.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        T::Key: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        self.get_raw(key).is_some()
    }

    /// Returns a reference to the node corresponding to `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<Pin<&T>>
    where
        T::Key: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let ptr = self.get_raw(key)?;
        unsafe { Some(Pin::new_unchecked(ptr.as_ref())) }
    }

    /// Returns a pinned mutable reference to the node corresponding to `key`.
    ///
    /// Callers must not change the result of comparing the node's key with other keys.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<Pin<&mut T>>
    where
        T::Key: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let mut ptr = self.get_raw(key)?;
        unsafe { Some(Pin::new_unchecked(ptr.as_mut())) }
    }

    fn get_raw<Q>(&self, key: &Q) -> Link<T>
    where
        T::Key: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let mut opt_cur = self.root;

        loop {
            let cur = opt_cur?;

            unsafe {
                match key.cmp(cur.as_ref().key().borrow()) {
                    Ordering::Less => opt_cur = self.links(cur).left(),
                    Ordering::Equal => return Some(cur),
                    Ordering::Greater => opt_cur = self.links(cur).right(),
                }
            }
        }
    }

    /// Returns the minimum element of the tree.
    pub fn first(&self) -> Option<Pin<&T>> {
        self.first_raw()
            .map(|first| unsafe { Pin::new_unchecked(first.as_ref()) })
    }

    /// Returns the maximum element of the tree.
    pub fn last(&self) -> Option<Pin<&T>> {
        self.last_raw()
            .map(|last| unsafe { Pin::new_unchecked(last.as_ref()) })
    }

    fn first_raw(&self) -> Link<T> {
        self.root
            .map(|root| unsafe { self.extreme_in_subtree(root, Dir::Left) })
    }

    fn last_raw(&self) -> Link<T> {
        self.root
            .map(|root| unsafe { self.extreme_in_subtree(root, Dir::Right) })
    }

    // Returns the in-order successor of `node`.
    unsafe fn successor_raw(&self, node: NonNull<T>) -> Link<T> {
        unsafe { self.step_raw(node, Dir::Right) }
    }

    // Returns the in-order predecessor of `node`.
    unsafe fn predecessor_raw(&self, node: NonNull<T>) -> Link<T> {
        unsafe { self.step_raw(node, Dir::Left) }
    }

    // Returns the in-order neighbour of `node` in direction `dir`.
    unsafe fn step_raw(&self, node: NonNull<T>, dir: Dir) -> Link<T> {
        unsafe {
            if let Some(child) = self.links(node).child(dir) {
                return Some(self.extreme_in_subtree(child, !dir));
            }

            // Climb until `cur` is reached from the opposite side.
            let mut cur = node;
            while let Some(parent) = self.links(cur).parent() {
                if self.which_child(parent, cur) == !dir {
                    return Some(parent);
                }

                cur = parent;
            }

            None
        }
    }

    // Returns the node reached by following `dir` links from `root` for as long as possible.
    #[inline]
    unsafe fn extreme_in_subtree(&self, root: NonNull<T>, dir: Dir) -> NonNull<T> {
        let mut cur = root;

        while let Some(next) = unsafe { self.links(cur).child(dir) } {
            cur = next;
        }

        cur
    }

    /// Returns an iterator over the elements of the tree in ascending key order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self)
    }

    /// Returns a cursor pointing to the minimum element of the tree.
    pub fn cursor_first(&self) -> Cursor<'_, T> {
        Cursor::first(self)
    }

    /// Returns a cursor pointing to the maximum element of the tree.
    pub fn cursor_last(&self) -> Cursor<'_, T> {
        Cursor::last(self)
    }

    /// Returns a mutable cursor pointing to the minimum element of the tree.
    pub fn cursor_first_mut(&mut self) -> CursorMut<'_, T> {
        CursorMut::first(self)
    }

    /// Returns a mutable cursor pointing to the maximum element of the tree.
    pub fn cursor_last_mut(&mut self) -> CursorMut<'_, T> {
        CursorMut::last(self)
    }

    /// Returns the entry for `key`, which is occupied if the tree holds an element with that key.
    pub fn entry<'tree, 'key, Q>(&'tree mut self, key: &'key Q) -> Entry<'tree, 'key, T, Q>
    where
        T::Key: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let Some(mut cur) = self.root else {
            return unsafe { Entry::vacant_root(self, key) };
        };

        loop {
            let dir = match key.cmp(unsafe { cur.as_ref().key().borrow() }) {
                Ordering::Less => Dir::Left,
                Ordering::Equal => return unsafe { Entry::occupied(self, cur) },
                Ordering::Greater => Dir::Right,
            };

            match unsafe { self.links(cur).child(dir) } {
                Some(child) => cur = child,
                None => return unsafe { Entry::vacant_child(self, key, cur, dir) },
            }
        }
    }

    /// Inserts an item into the tree.
    ///
    /// If the tree already holds an item with an equal key, `item` takes its place without any
    /// restructuring and the previous item is returned.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn insert(&mut self, item: T::Handle) -> Option<T::Handle> {
        let ptr = T::into_ptr(item);
        let key = unsafe { ptr.as_ref().key() };

        match self.entry(key) {
            Entry::Occupied(mut entry) => Some(unsafe { entry.replace_raw(ptr) }),
            Entry::Vacant(entry) => {
                unsafe { entry.insert_raw(ptr) };
                None
            }
        }
    }

    unsafe fn insert_as_root(&mut self, node: NonNull<T>) {
        debug_assert!(self.root.is_none());

        unsafe { self.links_mut(node).clear() };
        self.root = Some(node);
        self.len += 1;
    }

    // Links `node` as the `dir` child of `parent`, which must not have a child on that side, and
    // restores the balance invariant.
    unsafe fn insert_as_child(&mut self, parent: NonNull<T>, dir: Dir, node: NonNull<T>) {
        unsafe {
            debug_assert!(self.links(parent).child(dir).is_none());

            let links = self.links_mut(node);
            links.clear();
            links.set_parent(Some(parent));

            let parent_links = self.links_mut(parent);
            parent_links.set_child(dir, Some(node));
            self.len += 1;

            if parent_links.balance() != 0 {
                // `parent` leaned towards its only child. The new leaf fills the empty side, so
                // the height of `parent` is unchanged.
                parent_links.set_balance(0);
                return;
            }

            parent_links.update_balance(dir.sign());
            self.insert_fix(parent, node);
        }
    }

    // Performs a bottom-up rebalance after the subtree rooted at `parent` grew by one level.
    //
    // Invariants on entry:
    // - `node` is the child of `parent` on the side that grew.
    // - The balance of `parent` is already updated and is -1 or +1.
    fn insert_fix(&mut self, mut parent: NonNull<T>, mut node: NonNull<T>) {
        unsafe {
            loop {
                let Some(grandparent) = self.links(parent).parent() else {
                    return;
                };

                let side = self.which_child(grandparent, parent);
                let s = side.sign();

                let g_links = self.links_mut(grandparent);
                g_links.update_balance(s);

                match g_links.balance() * s {
                    // The shorter side caught up; the height of `grandparent` is unchanged.
                    0 => return,

                    // `grandparent` grew and now leans towards `parent`; keep climbing.
                    1 => {
                        node = parent;
                        parent = grandparent;
                    }

                    _ => {
                        let p_balance = self.links(parent).balance();

                        if p_balance == s {
                            tracing::trace!(
                                key = ?grandparent.as_ref().key(),
                                ?side,
                                "insert: single rotation"
                            );

                            self.rotate(grandparent, !side);
                            self.links_mut(parent).set_balance(0);
                            self.links_mut(grandparent).set_balance(0);
                        } else {
                            debug_assert_eq!(p_balance, -s);

                            tracing::trace!(
                                key = ?grandparent.as_ref().key(),
                                ?side,
                                "insert: double rotation"
                            );

                            let n_balance = self.links(node).balance();
                            self.rotate(parent, side);
                            self.rotate(grandparent, !side);

                            let (p_balance, g_balance) = match n_balance * s {
                                1 => (0, -s),
                                0 => (0, 0),
                                _ => (s, 0),
                            };

                            self.links_mut(parent).set_balance(p_balance);
                            self.links_mut(grandparent).set_balance(g_balance);
                            self.links_mut(node).set_balance(0);
                        }

                        // The rotated subtree is back to its height from before the insertion.
                        return;
                    }
                }
            }
        }
    }

    // Rotates `node` down towards `dir`, lifting its child on the other side into its place.
    //
    // `rotate(a, Dir::Left)` is a left rotation, moving `a`'s right child up; `rotate(a,
    // Dir::Right)` is a right rotation. The in-order sequence is preserved.
    //
    // The balances of affected nodes are not updated.
    unsafe fn rotate(&mut self, node: NonNull<T>, dir: Dir) {
        unsafe {
            let up = self
                .links(node)
                .child(!dir)
                .expect("rotation requires a child on the lifted side");
            let across = self.links(up).child(dir);
            let parent = self.links(node).parent();

            tracing::trace!(pivot = ?node.as_ref().key(), ?dir, "rotate");

            // - `up` takes the place of `node` under `parent`.
            // - `node` becomes the `dir` child of `up`.
            // - `across` goes from the `dir` child of `up` to the `!dir` child of `node`.
            self.replace_child_or_set_root(parent, node, Some(up));
            self.links_mut(up).set_parent(parent);

            self.links_mut(up).set_child(dir, Some(node));
            self.links_mut(node).set_parent(Some(up));

            self.links_mut(node).set_child(!dir, across);
            self.maybe_set_parent(across, Some(node));
        }
    }

    /// Removes the element with the given key and returns it.
    ///
    /// Returns `None` and leaves the tree untouched if no element has that key.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<T::Handle>
    where
        T::Key: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let node = self.get_raw(key)?;
        Some(unsafe { self.remove_at(node) })
    }

    /// Removes and returns the minimum element of the tree.
    pub fn pop_first(&mut self) -> Option<T::Handle> {
        let first = self.first_raw()?;
        Some(unsafe { self.remove_at(first) })
    }

    /// Removes and returns the maximum element of the tree.
    pub fn pop_last(&mut self) -> Option<T::Handle> {
        let last = self.last_raw()?;
        Some(unsafe { self.remove_at(last) })
    }

    /// Removes an arbitrary node from the tree.
    ///
    /// # Safety
    ///
    /// It is the caller's responsibility to ensure that `node` is an element of `self`, and not any
    /// other tree.
    pub unsafe fn remove_at(&mut self, node: NonNull<T>) -> T::Handle {
        unsafe {
            // A node with two children first trades places with its in-order predecessor, which
            // has no right child. Either way `node` ends up with at most one child.
            if let (Some(left), Some(_)) = (self.links(node).left(), self.links(node).right()) {
                let predecessor = self.extreme_in_subtree(left, Dir::Right);
                self.node_swap(node, predecessor);
            }

            let parent = self.links(node).parent();
            let shrunk = parent.map(|p| self.which_child(p, node));

            // Elevate the sole child, if any, into the vacated slot.
            let child = self.links(node).left().or(self.links(node).right());
            self.replace_child_or_set_root(parent, node, child);
            self.maybe_set_parent(child, parent);

            self.links_mut(node).clear();
            self.len -= 1;

            if let (Some(parent), Some(shrunk)) = (parent, shrunk) {
                self.remove_fix(parent, shrunk);
            }

            T::from_ptr(node)
        }
    }

    // Performs a bottom-up rebalance after the `shrunk` subtree of `node` lost one level.
    //
    // Climbing stops as soon as a subtree keeps its height or the root has been fixed.
    unsafe fn remove_fix(&mut self, mut node: NonNull<T>, mut shrunk: Dir) {
        unsafe {
            loop {
                // Record where `node` hangs before any rotation moves it.
                let next = self
                    .links(node)
                    .parent()
                    .map(|p| (p, self.which_child(p, node)));

                let heavy = !shrunk;
                let s = heavy.sign();
                let balance = self.links(node).balance() + s;

                if balance == 2 * s {
                    let Some(child) = self.links(node).child(heavy) else {
                        self.links_mut(node).set_balance(0);
                        return;
                    };

                    let c_balance = self.links(child).balance();

                    if c_balance == s {
                        tracing::trace!(key = ?node.as_ref().key(), ?shrunk, "remove: single rotation");

                        self.rotate(node, shrunk);
                        self.links_mut(node).set_balance(0);
                        self.links_mut(child).set_balance(0);
                    } else if c_balance == 0 {
                        tracing::trace!(key = ?node.as_ref().key(), ?shrunk, "remove: single rotation, height kept");

                        self.rotate(node, shrunk);
                        self.links_mut(node).set_balance(s);
                        self.links_mut(child).set_balance(-s);
                        return;
                    } else {
                        tracing::trace!(key = ?node.as_ref().key(), ?shrunk, "remove: double rotation");

                        let grandchild = self
                            .links(child)
                            .child(shrunk)
                            .expect("inner grandchild of a leaning child must exist");
                        let g_balance = self.links(grandchild).balance();

                        self.rotate(child, heavy);
                        self.rotate(node, shrunk);

                        let (n_balance, c_balance) = match g_balance * s {
                            1 => (-s, 0),
                            0 => (0, 0),
                            _ => (0, s),
                        };

                        self.links_mut(node).set_balance(n_balance);
                        self.links_mut(child).set_balance(c_balance);
                        self.links_mut(grandchild).set_balance(0);
                    }
                } else if balance == s {
                    // `node` was balanced and now leans away from the shrunk side; its height is
                    // unchanged.
                    self.links_mut(node).set_balance(s);
                    return;
                } else {
                    debug_assert_eq!(balance, 0);
                    self.links_mut(node).set_balance(0);
                }

                // The subtree formerly rooted at `node` is one level shorter.
                let Some((parent, side)) = next else {
                    return;
                };

                node = parent;
                shrunk = side;
            }
        }
    }

    // Exchanges the tree positions of `a` and `b`, including their balances.
    //
    // Each node keeps its own key and payload; only links, root status and balances move. The
    // nodes may be adjacent.
    unsafe fn node_swap(&mut self, a: NonNull<T>, b: NonNull<T>) {
        if same_node(a, b) {
            return;
        }

        unsafe {
            tracing::trace!(a = ?a.as_ref().key(), b = ?b.as_ref().key(), "swap nodes");

            let swapped = move |link: Link<T>| match link {
                Some(x) if same_node(x, a) => Some(b),
                Some(x) if same_node(x, b) => Some(a),
                other => other,
            };

            let a_parent = self.links(a).parent();
            let a_left = self.links(a).left();
            let a_right = self.links(a).right();
            let a_balance = self.links(a).balance();

            let b_parent = self.links(b).parent();
            let b_left = self.links(b).left();
            let b_right = self.links(b).right();
            let b_balance = self.links(b).balance();

            // Slots in outside parents must be located before any link changes; for siblings
            // both slots live in the same parent.
            let a_slot = a_parent
                .filter(|&p| !same_node(p, b))
                .map(|p| (p, self.which_child(p, a)));
            let b_slot = b_parent
                .filter(|&p| !same_node(p, a))
                .map(|p| (p, self.which_child(p, b)));

            let a_links = self.links_mut(a);
            a_links.set_parent(swapped(b_parent));
            a_links.set_left(swapped(b_left));
            a_links.set_right(swapped(b_right));
            a_links.set_balance(b_balance);

            let b_links = self.links_mut(b);
            b_links.set_parent(swapped(a_parent));
            b_links.set_left(swapped(a_left));
            b_links.set_right(swapped(a_right));
            b_links.set_balance(a_balance);

            if let Some((parent, dir)) = a_slot {
                self.links_mut(parent).set_child(dir, Some(b));
            }

            if let Some((parent, dir)) = b_slot {
                self.links_mut(parent).set_child(dir, Some(a));
            }

            if a_parent.is_none() {
                self.root = Some(b);
            } else if b_parent.is_none() {
                self.root = Some(a);
            }

            for (node, other) in [(a, b), (b, a)] {
                for dir in [Dir::Left, Dir::Right] {
                    let child = self
                        .links(node)
                        .child(dir)
                        .filter(|&c| !same_node(c, other));
                    self.maybe_set_parent(child, Some(node));
                }
            }
        }
    }

    /// Clears the tree, removing all elements.
    pub fn clear(&mut self) {
        let mut opt_cur = self.root;

        while let Some(cur) = opt_cur {
            unsafe {
                // Descend to the minimum node.
                let cur = self.extreme_in_subtree(cur, Dir::Left);
                let parent = self.links(cur).parent();
                let right = self.links(cur).right();

                // Elevate the node's right child (which may be None).
                self.replace_child_or_set_root(parent, cur, right);
                self.maybe_set_parent(right, parent);

                // Drop the node.
                self.links_mut(cur).clear();
                drop(T::from_ptr(cur));
                self.len -= 1;

                // If the node had no right child, climb to the parent. If the node had no parent,
                // the tree is empty.
                opt_cur = right.or(parent);
            }
        }

        debug_assert!(self.root.is_none());
        debug_assert_eq!(self.len(), 0);
    }

    // Support methods ========================================================

    #[inline]
    unsafe fn links<'a>(&self, node: NonNull<T>) -> &'a Links<T> {
        unsafe { T::links(node).as_ref() }
    }

    #[inline]
    unsafe fn links_mut<'a>(&mut self, node: NonNull<T>) -> &'a mut Links<T> {
        unsafe { T::links(node).as_mut() }
    }

    unsafe fn maybe_set_parent(&mut self, opt_node: Link<T>, parent: Link<T>) {
        let Some(node) = opt_node else {
            return;
        };

        unsafe { self.links_mut(node).set_parent(parent) };
    }

    #[inline]
    unsafe fn replace_child_or_set_root(
        &mut self,
        parent: Link<T>,
        old_child: NonNull<T>,
        new_child: Link<T>,
    ) {
        match parent {
            Some(parent) => unsafe { self.replace_child(parent, old_child, new_child) },
            None => self.root = new_child,
        }
    }

    // Replaces the child pointer of `parent` pointing at `old_child` with `new_child`.
    //
    // `new_child`'s parent pointer is not updated.
    //
    // # Safety
    //
    // The caller must ensure that the following conditions hold:
    // - `old_child` is a child node of `parent`.
    // - `new_child` is not a child node of `parent`.
    unsafe fn replace_child(
        &mut self,
        parent: NonNull<T>,
        old_child: NonNull<T>,
        new_child: Link<T>,
    ) {
        unsafe {
            let dir = self.which_child(parent, old_child);

            debug_assert_eq!(
                self.links(parent).child(dir),
                Some(old_child),
                "`old_child` must be a child of `parent`"
            );
            debug_assert!(
                new_child.is_none() || self.links(parent).child(!dir) != new_child,
                "`new_child` must not be a child of `parent`"
            );

            self.links_mut(parent).set_child(dir, new_child);
        }
    }

    unsafe fn which_child(&self, parent: NonNull<T>, child: NonNull<T>) -> Dir {
        let left = unsafe { self.links(parent).left() };

        if left.is_some_and(|left| same_node(left, child)) {
            Dir::Left
        } else {
            Dir::Right
        }
    }
}

// Compares node addresses, ignoring any pointer metadata.
#[inline]
fn same_node<T: ?Sized>(a: NonNull<T>, b: NonNull<T>) -> bool {
    core::ptr::addr_eq(a.as_ptr(), b.as_ptr())
}

impl<T> Default for AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(|node| node.key())).finish()
    }
}

impl<T> Drop for AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T: ?Sized> Links<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: UnsafeCell::new(LinksInner {
                parent: None,
                children: [None; 2],
                balance: 0,
                _unpin: PhantomPinned,
            }),
        }
    }

    // Resets the links to those of a detached leaf.
    #[inline]
    fn clear(&mut self) {
        let inner = self.inner.get_mut();
        inner.parent = None;
        inner.children = [None; 2];
        inner.balance = 0;
    }

    #[inline]
    fn balance(&self) -> i8 {
        unsafe { (*self.inner.get()).balance }
    }

    #[inline]
    fn set_balance(&mut self, balance: i8) {
        debug_assert!((-1..=1).contains(&balance));
        self.inner.get_mut().balance = balance;
    }

    #[inline]
    fn update_balance(&mut self, diff: i8) {
        let inner = self.inner.get_mut();
        inner.balance = inner
            .balance
            .checked_add(diff)
            .expect("balance out of range");
    }

    #[inline]
    fn parent(&self) -> Link<T> {
        unsafe { (*self.inner.get()).parent }
    }

    #[inline]
    fn child(&self, dir: Dir) -> Link<T> {
        unsafe { (*self.inner.get()).children[dir as usize] }
    }

    #[inline]
    fn left(&self) -> Link<T> {
        self.child(Dir::Left)
    }

    #[inline]
    fn right(&self) -> Link<T> {
        self.child(Dir::Right)
    }

    #[inline]
    fn set_parent(&mut self, parent: Link<T>) -> Link<T> {
        mem::replace(&mut self.inner.get_mut().parent, parent)
    }

    #[inline]
    fn set_child(&mut self, dir: Dir, child: Link<T>) -> Link<T> {
        mem::replace(&mut self.inner.get_mut().children[dir as usize], child)
    }

    #[inline]
    fn set_left(&mut self, left: Link<T>) -> Link<T> {
        self.set_child(Dir::Left, left)
    }

    #[inline]
    fn set_right(&mut self, right: Link<T>) -> Link<T> {
        self.set_child(Dir::Right, right)
    }
}

impl<T: ?Sized> Default for Links<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for Links<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Links")
            .field("parent", &self.parent())
            .field("left", &self.left())
            .field("right", &self.right())
            .field("balance", &self.balance())
            .finish()
    }
}
