//! The backing memory capability.
//!
//! The slab allocator does not own any memory source of its own; it is
//! constructed over a [`BackingAllocator`] that satisfies large,
//! coarse-grained requests: a physical page allocator in a kernel, a
//! region carved out at boot in an embedded image, or the host heap in
//! tests.

/// A coarse-grained memory source the slab allocator draws arenas from.
///
/// # Safety
///
/// Implementations must guarantee that a successful [`allocate`] returns a
/// pointer to a region that:
///
/// - is valid for reads and writes for `size` bytes
/// - is aligned to at least 16 bytes
/// - stays valid and exclusive to the caller until passed back to
///   [`deallocate`] with the same `size`
///
/// Page-granular alignment is *not* required: the slab allocator never
/// masks a pointer to recover its arena (arena addresses are carried in
/// allocation records instead).
///
/// [`allocate`]: Self::allocate
/// [`deallocate`]: Self::deallocate
pub unsafe trait BackingAllocator {
    /// Allocates `size` bytes, or returns `None` when the source is
    /// exhausted.
    fn allocate(&self, size: usize) -> Option<*mut u8>;

    /// Returns a region previously obtained from [`allocate`](Self::allocate).
    ///
    /// The `size` passed here always equals the size of the original
    /// request; sources that track sizes themselves may ignore it.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate(size)` on this same
    /// source and must not be used afterwards.
    unsafe fn deallocate(&self, ptr: *mut u8, size: usize);
}

unsafe impl<B: BackingAllocator> BackingAllocator for &B {
    fn allocate(&self, size: usize) -> Option<*mut u8> {
        (**self).allocate(size)
    }

    unsafe fn deallocate(&self, ptr: *mut u8, size: usize) {
        unsafe { (**self).deallocate(ptr, size) }
    }
}
