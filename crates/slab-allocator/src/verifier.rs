//! The corruption-reporting capability.
//!
//! The allocator cannot return an error for a pointer it has never handed
//! out: such a pointer means the heap is corrupted or the caller freed
//! twice, and continuing would corrupt it further. The [`Verifier`]
//! capability decides what "fatal" means: the default traps, test
//! verifiers may record the event and return.

/// Fatal-condition hooks for the slab allocator.
///
/// Both hooks are associated functions so a verifier carries no state of
/// its own; a recording test verifier can keep its counters in statics.
/// The hooks must not call back into the allocator that invoked them.
pub trait Verifier {
    /// Invoked when a pointer passed to `free` or `allocation_size` is not
    /// a live allocation.
    ///
    /// If the hook returns, the operation becomes a no-op.
    fn double_free_or_corruption();

    /// Invoked when a configuration invariant that passed the compile-time
    /// checks is nonetheless violated at runtime.
    ///
    /// If the hook returns, the triggering allocation fails cleanly.
    fn invalid_config(message: &str);
}

/// The default verifier: halts on every hook.
pub struct TrapVerifier;

impl Verifier for TrapVerifier {
    fn double_free_or_corruption() {
        panic!("slab allocator: double free or heap corruption");
    }

    fn invalid_config(message: &str) {
        panic!("slab allocator: invalid configuration: {message}");
    }
}
