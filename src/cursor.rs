use core::{marker::PhantomData, pin::Pin, ptr::NonNull};

use crate::{AvlTree, Link, Links, TreeNode};

/// A read-only cursor over an [`AvlTree`].
///
/// The cursor sits either on an element or on a "ghost" position between the last element and
/// the first. Moving past either end lands on the ghost; moving off the ghost wraps around.
pub struct Cursor<'tree, T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    curs: CursorRaw<T>,
    phantom: PhantomData<&'tree AvlTree<T>>,
}

impl<'tree, T> Cursor<'tree, T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    pub(crate) fn first(tree: &'tree AvlTree<T>) -> Cursor<'tree, T> {
        Cursor {
            curs: CursorRaw::first(tree.into()),
            phantom: PhantomData,
        }
    }

    pub(crate) fn last(tree: &'tree AvlTree<T>) -> Cursor<'tree, T> {
        Cursor {
            curs: CursorRaw::last(tree.into()),
            phantom: PhantomData,
        }
    }

    /// Moves to the in-order successor, or onto/off the ghost position.
    pub fn move_next(&mut self) {
        unsafe { self.curs.move_next() }
    }

    /// Moves to the in-order predecessor, or onto/off the ghost position.
    pub fn move_prev(&mut self) {
        unsafe { self.curs.move_prev() }
    }

    /// Returns the current element, or `None` on the ghost position.
    pub fn get(&self) -> Option<&T> {
        unsafe { self.curs.get() }
    }

    /// Returns the element `move_next` would land on.
    pub fn peek_next(&self) -> Option<&T> {
        unsafe { self.curs.peek_next() }
    }

    /// Returns the element `move_prev` would land on.
    pub fn peek_prev(&self) -> Option<&T> {
        unsafe { self.curs.peek_prev() }
    }
}

/// A cursor over an [`AvlTree`] that can remove the element it points at.
///
/// Positions behave as for [`Cursor`].
pub struct CursorMut<'tree, T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    curs: CursorRaw<T>,
    phantom: PhantomData<&'tree mut AvlTree<T>>,
}

impl<'tree, T> CursorMut<'tree, T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    pub(crate) fn first(tree: &'tree mut AvlTree<T>) -> CursorMut<'tree, T> {
        CursorMut {
            curs: CursorRaw::first(tree.into()),
            phantom: PhantomData,
        }
    }

    pub(crate) fn last(tree: &'tree mut AvlTree<T>) -> CursorMut<'tree, T> {
        CursorMut {
            curs: CursorRaw::last(tree.into()),
            phantom: PhantomData,
        }
    }

    /// Returns a read-only cursor at the same position.
    ///
    /// `self` stays borrowed for as long as the returned cursor is alive.
    pub fn as_cursor(&self) -> Cursor<'_, T> {
        Cursor {
            curs: CursorRaw {
                tree: self.curs.tree,
                ptr: self.curs.ptr,
            },
            phantom: PhantomData,
        }
    }

    /// Moves to the in-order successor, or onto/off the ghost position.
    pub fn move_next(&mut self) {
        unsafe { self.curs.move_next() }
    }

    /// Moves to the in-order predecessor, or onto/off the ghost position.
    pub fn move_prev(&mut self) {
        unsafe { self.curs.move_prev() }
    }

    /// Returns the current element, or `None` on the ghost position.
    pub fn get(&self) -> Option<&T> {
        unsafe { self.curs.get() }
    }

    /// Returns the current element pinned and mutable, or `None` on the ghost position.
    ///
    /// # Safety
    ///
    /// The caller must not modify the element's links, nor change how its key compares to the
    /// keys of the other elements in the tree.
    pub unsafe fn get_mut(&mut self) -> Option<Pin<&mut T>> {
        unsafe { self.curs.get_mut() }
    }

    /// Returns the element `move_next` would land on.
    pub fn peek_next(&self) -> Option<&T> {
        unsafe { self.curs.peek_next() }
    }

    /// Returns the element `move_prev` would land on.
    pub fn peek_prev(&self) -> Option<&T> {
        unsafe { self.curs.peek_prev() }
    }

    /// Unlinks the current element, returns it, and moves to its successor.
    ///
    /// On the ghost position this returns `None` and changes nothing. Rebalancing never moves an
    /// element to a different in-order position, so the successor found beforehand stays valid.
    pub fn remove_current(&mut self) -> Option<T::Handle> {
        unsafe { self.curs.remove_current() }
    }

    /// Unlinks the current element, returns it, and moves to its predecessor.
    ///
    /// On the ghost position this returns `None` and changes nothing.
    pub fn remove_current_and_move_prev(&mut self) -> Option<T::Handle> {
        unsafe { self.curs.remove_current_and_move_prev() }
    }
}

struct CursorRaw<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    tree: NonNull<AvlTree<T>>,
    ptr: Link<T>,
}

impl<T> CursorRaw<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn first(tree: NonNull<AvlTree<T>>) -> CursorRaw<T> {
        CursorRaw {
            tree,
            ptr: unsafe { tree.as_ref().first_raw() },
        }
    }

    fn last(tree: NonNull<AvlTree<T>>) -> CursorRaw<T> {
        CursorRaw {
            tree,
            ptr: unsafe { tree.as_ref().last_raw() },
        }
    }

    // Position `move_next` lands on.
    unsafe fn next_ptr(&self) -> Link<T> {
        let tree = unsafe { self.tree.as_ref() };

        match self.ptr {
            Some(p) => unsafe { tree.successor_raw(p) },
            None => tree.first_raw(),
        }
    }

    // Position `move_prev` lands on.
    unsafe fn prev_ptr(&self) -> Link<T> {
        let tree = unsafe { self.tree.as_ref() };

        match self.ptr {
            Some(p) => unsafe { tree.predecessor_raw(p) },
            None => tree.last_raw(),
        }
    }

    unsafe fn move_next(&mut self) {
        self.ptr = unsafe { self.next_ptr() };
    }

    unsafe fn move_prev(&mut self) {
        self.ptr = unsafe { self.prev_ptr() };
    }

    unsafe fn get(&self) -> Option<&T> {
        self.ptr.map(|p| unsafe { p.as_ref() })
    }

    unsafe fn get_mut(&mut self) -> Option<Pin<&mut T>> {
        self.ptr
            .map(|mut p| unsafe { Pin::new_unchecked(p.as_mut()) })
    }

    unsafe fn peek_next(&self) -> Option<&T> {
        unsafe { self.next_ptr() }.map(|p| unsafe { p.as_ref() })
    }

    unsafe fn peek_prev(&self) -> Option<&T> {
        unsafe { self.prev_ptr() }.map(|p| unsafe { p.as_ref() })
    }

    unsafe fn remove_current(&mut self) -> Option<T::Handle> {
        let remove = self.ptr?;

        unsafe {
            self.move_next();
            Some(self.tree.as_mut().remove_at(remove))
        }
    }

    unsafe fn remove_current_and_move_prev(&mut self) -> Option<T::Handle> {
        let remove = self.ptr?;

        unsafe {
            self.move_prev();
            Some(self.tree.as_mut().remove_at(remove))
        }
    }
}
