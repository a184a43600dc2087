//! A thread-safe slab allocator for freestanding environments.
//!
//! This crate implements a general-purpose memory allocator on top of a
//! coarse-grained backing memory source (typically a page allocator), the
//! kind of component that sits at the bottom of a kernel or embedded
//! runtime, where no hosted heap exists. It is `no_std`, never blocks
//! beyond short spin-held critical sections, and performs no allocation of
//! its own: all bookkeeping lives in intrusive structures overlaid on
//! memory obtained from the backing source.
//!
//! # Architecture
//!
//! Requests are routed by size into one of three strategies:
//!
//! 1. **Small**: a configurable table of `(block size, block count)`
//!    classes; each class maintains a pool of arenas carved into
//!    equal-size blocks.
//! 2. **Power-of-two**: a computed progression of classes between two
//!    configurable bounds, with a fixed arena payload per class.
//! 3. **Large**: requests above the power-of-two ceiling pass straight
//!    through to the backing allocator.
//!
//! Every allocation is described by a record stored in a separate pool of
//! *metadata pages*, kept away from user data. A red-black tree indexes
//! the records by block address, so [`free`](slab::SlabAllocator::free)
//! and [`allocation_size`](slab::SlabAllocator::allocation_size) resolve a
//! bare pointer in O(log n) without any header next to user memory.
//!
//! Arenas and metadata pages are created lazily on first demand and handed
//! back to the backing allocator the moment their last block is freed.
//!
//! # Concurrency
//!
//! Independent spin locks guard the address index, the metadata-page pool,
//! and each size class's arena pool, so operations on distinct size
//! classes proceed in parallel. The allocator is not reentrant: calling
//! back into it from a context that can preempt its own lock holder (or
//! from a verifier hook) deadlocks.
//!
//! # Usage Example
//!
//! ```rust
//! use slab_allocator::backing::BackingAllocator;
//! use slab_allocator::slab::SlabAllocator;
//!
//! struct HostBacking;
//!
//! unsafe impl BackingAllocator for HostBacking {
//!     fn allocate(&self, size: usize) -> Option<*mut u8> {
//!         let layout = core::alloc::Layout::from_size_align(size, 16).ok()?;
//!         let ptr = unsafe { std::alloc::alloc(layout) };
//!         (!ptr.is_null()).then_some(ptr)
//!     }
//!
//!     unsafe fn deallocate(&self, ptr: *mut u8, size: usize) {
//!         let layout = core::alloc::Layout::from_size_align(size, 16).unwrap();
//!         unsafe { std::alloc::dealloc(ptr, layout) };
//!     }
//! }
//!
//! let heap = SlabAllocator::<_>::new(HostBacking);
//!
//! let ptr = heap.allocate(100).unwrap();
//! assert_eq!(heap.allocation_size(ptr), 100);
//! unsafe { heap.free(ptr) };
//! ```

#![cfg_attr(not(test), no_std)]

mod arena;

pub mod backing;
pub mod config;
pub mod slab;
pub mod spinlock;
pub mod verifier;
