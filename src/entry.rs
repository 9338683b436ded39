use core::{borrow::Borrow, pin::Pin, ptr::NonNull};

use crate::{AvlTree, Dir, Links, TreeNode};

/// A view into a single entry in an [`AvlTree`], which may be either vacant or occupied.
pub enum Entry<'tree, 'key, T, Q>
where
    T: TreeNode<Links<T>> + ?Sized,
    T::Key: Borrow<Q> + Ord,
    Q: Ord + ?Sized,
{
    Vacant(VacantEntry<'tree, 'key, T, Q>),
    Occupied(OccupiedEntry<'tree, T>),
}

impl<'tree, 'key, T, Q> Entry<'tree, 'key, T, Q>
where
    T: TreeNode<Links<T>> + ?Sized,
    T::Key: Borrow<Q> + Ord,
    Q: Ord + ?Sized,
{
    pub(crate) unsafe fn vacant_root(tree: &'tree mut AvlTree<T>, key: &'key Q) -> Self {
        Entry::Vacant(VacantEntry {
            tree,
            key,
            insert_as: InsertAs::Root,
        })
    }

    pub(crate) unsafe fn vacant_child(
        tree: &'tree mut AvlTree<T>,
        key: &'key Q,
        parent: NonNull<T>,
        dir: Dir,
    ) -> Self {
        Entry::Vacant(VacantEntry {
            tree,
            key,
            insert_as: InsertAs::Child { parent, dir },
        })
    }

    pub(crate) unsafe fn occupied(tree: &'tree mut AvlTree<T>, node: NonNull<T>) -> Self {
        Entry::Occupied(OccupiedEntry { tree, node })
    }

    /// Returns `true` if the tree holds an element with the entry's key.
    pub fn is_occupied(&self) -> bool {
        matches!(self, Entry::Occupied(_))
    }
}

pub(crate) enum InsertAs<T: ?Sized> {
    Root,
    Child { parent: NonNull<T>, dir: Dir },
}

/// An entry for a key with no element in the tree.
///
/// Holds the leaf slot a new element with this key would be linked into.
pub struct VacantEntry<'tree, 'key, T, Q>
where
    T: TreeNode<Links<T>> + ?Sized,
    T::Key: Borrow<Q> + Ord,
    Q: Ord + ?Sized,
{
    pub(crate) tree: &'tree mut AvlTree<T>,
    pub(crate) key: &'key Q,
    pub(crate) insert_as: InsertAs<T>,
}

impl<'tree, 'key, T, Q> VacantEntry<'tree, 'key, T, Q>
where
    T: TreeNode<Links<T>> + ?Sized,
    T::Key: Borrow<Q> + Ord,
    Q: Ord + ?Sized,
{
    /// Returns the key used to look up this entry.
    pub fn key(&self) -> &'key Q {
        self.key
    }

    /// Inserts `item` at the key associated with this entry and rebalances the tree.
    ///
    /// # Safety
    ///
    /// The caller must ensure that the key returned by `item.key()` is equal to the key used to
    /// retrieve this entry.
    pub unsafe fn insert(self, item: T::Handle) -> Pin<&'tree mut T> {
        let mut ptr = T::into_ptr(item);

        unsafe {
            self.insert_raw(ptr);
            Pin::new_unchecked(ptr.as_mut())
        }
    }

    pub(crate) unsafe fn insert_raw(self, ptr: NonNull<T>) {
        debug_assert!(unsafe { <T::Key as Borrow<Q>>::borrow(ptr.as_ref().key()) == self.key });

        unsafe {
            match self.insert_as {
                InsertAs::Root => self.tree.insert_as_root(ptr),
                InsertAs::Child { parent, dir } => self.tree.insert_as_child(parent, dir, ptr),
            }
        }
    }
}

/// An entry for a key that already has an element in the tree.
pub struct OccupiedEntry<'tree, T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    pub(crate) tree: &'tree mut AvlTree<T>,
    pub(crate) node: NonNull<T>,
}

impl<'tree, T> OccupiedEntry<'tree, T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    /// Returns a reference to the item in the entry.
    pub fn get(&self) -> &'tree T {
        // SAFETY: `self.tree` is mutably borrowed for `'tree`
        unsafe { self.node.as_ref() }
    }

    /// Returns a pinned mutable reference to the item in the entry.
    ///
    /// # Safety
    ///
    /// The caller must ensure that neither the links nor the key of the mutably borrowed item are
    /// modified, as doing so may result in undefined behavior.
    pub unsafe fn get_mut(&mut self) -> Pin<&'tree mut T> {
        // SAFETY: `self.tree` is mutably borrowed for `'tree`, and `self.node` is guaranteed pinned
        // by contract with `Linked`.
        unsafe { Pin::new_unchecked(self.node.as_mut()) }
    }

    /// Puts `item` in place of the entry's item and returns the previous item.
    ///
    /// The tree shape and every balance are left as they were.
    ///
    /// # Safety
    ///
    /// The caller must ensure that `item`'s key is equivalent to the key of the existing item.
    pub unsafe fn insert(&mut self, item: T::Handle) -> T::Handle {
        unsafe { self.replace_raw(T::into_ptr(item)) }
    }

    pub(crate) unsafe fn replace_raw(&mut self, new_ptr: NonNull<T>) -> T::Handle {
        let old_ptr = self.node;

        // Point this entry at the new item.
        self.node = new_ptr;

        unsafe {
            // Read the old item's links.
            let old_links = self.tree.links(old_ptr);
            let balance = old_links.balance();
            let parent = old_links.parent();
            let left = old_links.left();
            let right = old_links.right();

            // Link the new item into the tree in the same position.
            self.tree.replace_child_or_set_root(parent, old_ptr, Some(new_ptr));
            self.tree.maybe_set_parent(left, Some(new_ptr));
            self.tree.maybe_set_parent(right, Some(new_ptr));

            let new_links = self.tree.links_mut(new_ptr);
            new_links.clear();
            new_links.set_parent(parent);
            new_links.set_left(left);
            new_links.set_right(right);
            new_links.set_balance(balance);

            // Deinit the old item's links.
            self.tree.links_mut(old_ptr).clear();

            T::from_ptr(old_ptr)
        }
    }

    /// Removes and returns the item pointed to by this entry.
    pub fn remove(self) -> T::Handle {
        unsafe { self.tree.remove_at(self.node) }
    }
}
