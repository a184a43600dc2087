//! Intrusive red-black tree.
//!
//! The tree threads an [`RbLink`] embedded inside each element and orders
//! elements by a key read out of the element through the [`Keyed`] adapter.
//! Like the intrusive list, the tree owns no memory and never allocates:
//! inserting links the element's own hook, removing restores it to the
//! unlinked state.
//!
//! # Balancing
//!
//! The tree maintains the classic red-black invariants (red nodes have
//! black children, every root-to-leaf path crosses the same number of black
//! nodes), which bounds insert, remove, and find at O(log n) in the worst
//! case regardless of insertion order. Removal takes the node's address
//! directly; no key lookup is needed to unlink an element.
//!
//! # Usage Example
//!
//! ```rust
//! use intrusive::rbtree::{Keyed, RbLink, RbTree};
//!
//! struct Session {
//!     link: RbLink,
//!     id: u64,
//! }
//!
//! unsafe impl Keyed for Session {
//!     type Key = u64;
//!
//!     unsafe fn link(elem: *mut Self) -> *mut RbLink {
//!         unsafe { &raw mut (*elem).link }
//!     }
//!
//!     unsafe fn from_link(link: *mut RbLink) -> *mut Self {
//!         unsafe { link.byte_sub(core::mem::offset_of!(Session, link)).cast() }
//!     }
//!
//!     unsafe fn key(elem: *const Self) -> u64 {
//!         unsafe { (*elem).id }
//!     }
//! }
//!
//! let mut a = Session { link: RbLink::new(), id: 7 };
//! let mut b = Session { link: RbLink::new(), id: 3 };
//!
//! let mut index = RbTree::<Session>::new();
//! unsafe {
//!     assert!(index.insert(&raw mut a));
//!     assert!(index.insert(&raw mut b));
//!     assert!(!index.insert(&raw mut a)); // duplicate key rejected
//! }
//! assert_eq!(index.find(3), &raw mut b);
//! unsafe { index.remove(&raw mut b) };
//! assert!(index.find(3).is_null());
//! unsafe { index.remove(&raw mut a) };
//! ```

use core::{cmp::Ordering, marker::PhantomData, ptr};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Color {
    Red,
    Black,
}

/// The tree hook embedded in every element.
///
/// A freshly created link is unlinked; [`RbTree::remove`] restores that
/// state, so a hook can be reused across any number of insert/remove
/// cycles.
#[derive(Clone, Copy, Debug)]
pub struct RbLink {
    parent: *mut RbLink,
    left: *mut RbLink,
    right: *mut RbLink,
    color: Color,
}

impl RbLink {
    /// Creates an unlinked hook.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            parent: ptr::null_mut(),
            left: ptr::null_mut(),
            right: ptr::null_mut(),
            color: Color::Red,
        }
    }
}

impl Default for RbLink {
    fn default() -> Self {
        Self::new()
    }
}

/// Types that embed an [`RbLink`] and carry an ordering key.
///
/// # Safety
///
/// Implementations must guarantee that:
///
/// - [`link`](Self::link) returns a pointer to an `RbLink` stored inside
///   the element itself, and the same field for every call on the same
///   element
/// - [`from_link`](Self::from_link) is the exact inverse of `link`
/// - [`key`](Self::key) is stable while the element is linked into a tree
pub unsafe trait Keyed {
    /// The ordering key type.
    type Key: Ord + Copy;

    /// Projects an element pointer to its embedded hook.
    ///
    /// # Safety
    ///
    /// `elem` must point to a live element of this type.
    unsafe fn link(elem: *mut Self) -> *mut RbLink;

    /// Recovers the element pointer from its embedded hook.
    ///
    /// # Safety
    ///
    /// `link` must have been returned by [`Keyed::link`] for a live element
    /// of this type.
    unsafe fn from_link(link: *mut RbLink) -> *mut Self;

    /// Reads the element's ordering key.
    ///
    /// # Safety
    ///
    /// `elem` must point to a live element of this type.
    unsafe fn key(elem: *const Self) -> Self::Key;
}

/// An intrusive red-black tree of `T`, ordered by [`Keyed::key`].
///
/// # Safety contract
///
/// As with [`List`](crate::list::List), element lifetime belongs to the
/// caller: a linked element must stay valid, must not move, must keep its
/// key unchanged, and must not be linked into a second tree until removed.
pub struct RbTree<T> {
    root: *mut RbLink,
    _marker: PhantomData<*mut T>,
}

// A bare root pointer; thread-movability is governed by the caller's
// management of the linked elements.
unsafe impl<T> Send for RbTree<T> {}

impl<T> Default for RbTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RbTree<T> {
    /// Creates an empty tree.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            root: ptr::null_mut(),
            _marker: PhantomData,
        }
    }

    /// Returns `true` if the tree holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_null()
    }
}

impl<T: Keyed> RbTree<T> {
    /// Links `elem` into the tree.
    ///
    /// Returns `false`, touching no memory, when an element with an equal
    /// key is already present.
    ///
    /// # Safety
    ///
    /// The caller must ensure that:
    ///
    /// - `elem` points to a live element whose hook is not linked into any
    ///   tree
    /// - the element stays valid, in place, and key-stable until removed
    pub unsafe fn insert(&mut self, elem: *mut T) -> bool {
        unsafe {
            let key = T::key(elem.cast_const());

            // Descend to the empty slot the new node belongs in, keeping a
            // pointer to the slot itself so no side flag is needed.
            let mut parent: *mut RbLink = ptr::null_mut();
            let mut slot: *mut *mut RbLink = &raw mut self.root;
            while !(*slot).is_null() {
                parent = *slot;
                let parent_key = T::key(T::from_link(parent).cast_const());
                match key.cmp(&parent_key) {
                    Ordering::Less => slot = &raw mut (*parent).left,
                    Ordering::Greater => slot = &raw mut (*parent).right,
                    Ordering::Equal => return false,
                }
            }

            let node = T::link(elem);
            (*node).parent = parent;
            (*node).left = ptr::null_mut();
            (*node).right = ptr::null_mut();
            (*node).color = Color::Red;
            *slot = node;

            self.insert_fixup(node);
            true
        }
    }

    /// Returns the element whose key equals `key`, or null.
    #[must_use]
    pub fn find(&self, key: T::Key) -> *mut T {
        let mut cursor = self.root;
        while !cursor.is_null() {
            // Validity of linked elements is guaranteed by the insert
            // contract.
            unsafe {
                let elem = T::from_link(cursor);
                match key.cmp(&T::key(elem.cast_const())) {
                    Ordering::Less => cursor = (*cursor).left,
                    Ordering::Greater => cursor = (*cursor).right,
                    Ordering::Equal => return elem,
                }
            }
        }
        ptr::null_mut()
    }

    /// Unlinks `elem` from the tree in O(log n) and restores its hook to
    /// the unlinked state. No key lookup is performed.
    ///
    /// # Safety
    ///
    /// `elem` must currently be linked into *this* tree.
    pub unsafe fn remove(&mut self, elem: *mut T) {
        unsafe {
            let z = T::link(elem);
            let removed_color;
            let fixup_child;
            let fixup_parent;

            if (*z).left.is_null() {
                removed_color = (*z).color;
                fixup_child = (*z).right;
                fixup_parent = (*z).parent;
                self.transplant(z, (*z).right);
            } else if (*z).right.is_null() {
                removed_color = (*z).color;
                fixup_child = (*z).left;
                fixup_parent = (*z).parent;
                self.transplant(z, (*z).left);
            } else {
                // Two children: splice in the successor, the minimum of the
                // right subtree.
                let mut y = (*z).right;
                while !(*y).left.is_null() {
                    y = (*y).left;
                }
                removed_color = (*y).color;
                fixup_child = (*y).right;
                if ptr::eq((*y).parent, z) {
                    fixup_parent = y;
                } else {
                    fixup_parent = (*y).parent;
                    self.transplant(y, (*y).right);
                    (*y).right = (*z).right;
                    (*(*y).right).parent = y;
                }
                self.transplant(z, y);
                (*y).left = (*z).left;
                (*(*y).left).parent = y;
                (*y).color = (*z).color;
            }

            if removed_color == Color::Black {
                self.remove_fixup(fixup_child, fixup_parent);
            }

            *z = RbLink::new();
        }
    }

    /// Replaces the subtree rooted at `old` with the one rooted at `new`
    /// (which may be null).
    unsafe fn transplant(&mut self, old: *mut RbLink, new: *mut RbLink) {
        unsafe {
            let parent = (*old).parent;
            if parent.is_null() {
                self.root = new;
            } else if ptr::eq((*parent).left, old) {
                (*parent).left = new;
            } else {
                (*parent).right = new;
            }
            if !new.is_null() {
                (*new).parent = parent;
            }
        }
    }

    unsafe fn rotate_left(&mut self, x: *mut RbLink) {
        unsafe {
            let y = (*x).right;
            debug_assert!(!y.is_null());
            (*x).right = (*y).left;
            if !(*y).left.is_null() {
                (*(*y).left).parent = x;
            }
            (*y).parent = (*x).parent;
            if (*x).parent.is_null() {
                self.root = y;
            } else if ptr::eq((*(*x).parent).left, x) {
                (*(*x).parent).left = y;
            } else {
                (*(*x).parent).right = y;
            }
            (*y).left = x;
            (*x).parent = y;
        }
    }

    unsafe fn rotate_right(&mut self, x: *mut RbLink) {
        unsafe {
            let y = (*x).left;
            debug_assert!(!y.is_null());
            (*x).left = (*y).right;
            if !(*y).right.is_null() {
                (*(*y).right).parent = x;
            }
            (*y).parent = (*x).parent;
            if (*x).parent.is_null() {
                self.root = y;
            } else if ptr::eq((*(*x).parent).right, x) {
                (*(*x).parent).right = y;
            } else {
                (*(*x).parent).left = y;
            }
            (*y).right = x;
            (*x).parent = y;
        }
    }

    /// Restores the red-black invariants after linking a red `node`.
    unsafe fn insert_fixup(&mut self, mut node: *mut RbLink) {
        unsafe {
            while color((*node).parent) == Color::Red {
                let parent = (*node).parent;
                // The parent is red, so it cannot be the (black) root and
                // the grandparent exists.
                let grandparent = (*parent).parent;
                if ptr::eq((*grandparent).left, parent) {
                    let uncle = (*grandparent).right;
                    if color(uncle) == Color::Red {
                        (*parent).color = Color::Black;
                        (*uncle).color = Color::Black;
                        (*grandparent).color = Color::Red;
                        node = grandparent;
                    } else {
                        if ptr::eq((*parent).right, node) {
                            node = parent;
                            self.rotate_left(node);
                        }
                        let parent = (*node).parent;
                        let grandparent = (*parent).parent;
                        (*parent).color = Color::Black;
                        (*grandparent).color = Color::Red;
                        self.rotate_right(grandparent);
                    }
                } else {
                    let uncle = (*grandparent).left;
                    if color(uncle) == Color::Red {
                        (*parent).color = Color::Black;
                        (*uncle).color = Color::Black;
                        (*grandparent).color = Color::Red;
                        node = grandparent;
                    } else {
                        if ptr::eq((*parent).left, node) {
                            node = parent;
                            self.rotate_right(node);
                        }
                        let parent = (*node).parent;
                        let grandparent = (*parent).parent;
                        (*parent).color = Color::Black;
                        (*grandparent).color = Color::Red;
                        self.rotate_left(grandparent);
                    }
                }
            }
            (*self.root).color = Color::Black;
        }
    }

    /// Restores the red-black invariants after unlinking a black node.
    ///
    /// `node` is the child that replaced the removed node and may be null,
    /// which is why its parent travels alongside it.
    unsafe fn remove_fixup(&mut self, mut node: *mut RbLink, mut parent: *mut RbLink) {
        unsafe {
            while !ptr::eq(node, self.root) && color(node) == Color::Black {
                if ptr::eq((*parent).left, node) {
                    let mut sibling = (*parent).right;
                    debug_assert!(!sibling.is_null());
                    if color(sibling) == Color::Red {
                        (*sibling).color = Color::Black;
                        (*parent).color = Color::Red;
                        self.rotate_left(parent);
                        sibling = (*parent).right;
                    }
                    if color((*sibling).left) == Color::Black
                        && color((*sibling).right) == Color::Black
                    {
                        (*sibling).color = Color::Red;
                        node = parent;
                        parent = (*node).parent;
                    } else {
                        if color((*sibling).right) == Color::Black {
                            if !(*sibling).left.is_null() {
                                (*(*sibling).left).color = Color::Black;
                            }
                            (*sibling).color = Color::Red;
                            self.rotate_right(sibling);
                            sibling = (*parent).right;
                        }
                        (*sibling).color = (*parent).color;
                        (*parent).color = Color::Black;
                        if !(*sibling).right.is_null() {
                            (*(*sibling).right).color = Color::Black;
                        }
                        self.rotate_left(parent);
                        node = self.root;
                        parent = ptr::null_mut();
                    }
                } else {
                    let mut sibling = (*parent).left;
                    debug_assert!(!sibling.is_null());
                    if color(sibling) == Color::Red {
                        (*sibling).color = Color::Black;
                        (*parent).color = Color::Red;
                        self.rotate_right(parent);
                        sibling = (*parent).left;
                    }
                    if color((*sibling).right) == Color::Black
                        && color((*sibling).left) == Color::Black
                    {
                        (*sibling).color = Color::Red;
                        node = parent;
                        parent = (*node).parent;
                    } else {
                        if color((*sibling).left) == Color::Black {
                            if !(*sibling).right.is_null() {
                                (*(*sibling).right).color = Color::Black;
                            }
                            (*sibling).color = Color::Red;
                            self.rotate_left(sibling);
                            sibling = (*parent).left;
                        }
                        (*sibling).color = (*parent).color;
                        (*parent).color = Color::Black;
                        if !(*sibling).left.is_null() {
                            (*(*sibling).left).color = Color::Black;
                        }
                        self.rotate_right(parent);
                        node = self.root;
                        parent = ptr::null_mut();
                    }
                }
            }
            if !node.is_null() {
                (*node).color = Color::Black;
            }
        }
    }
}

/// Null links count as black.
fn color(node: *mut RbLink) -> Color {
    if node.is_null() {
        Color::Black
    } else {
        unsafe { (*node).color }
    }
}
