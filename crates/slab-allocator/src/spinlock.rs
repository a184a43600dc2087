//! Spin-based mutual exclusion.
//!
//! [`SpinMutex`] protects short critical sections by busy-waiting: there is
//! no suspension, no queueing, and no dependency on a scheduler, which is
//! what makes it usable inside an allocator that the scheduler itself may
//! depend on.
//!
//! Acquisition attempts an atomic exchange on the lock flag; while the
//! exchange fails, the waiter spins on plain loads with
//! [`core::hint::spin_loop`] (which lowers to `pause`/`wfe`-style
//! instructions where available) until the flag reads clear, then retries
//! the exchange. Release is a single store with release ordering performed
//! by the guard's `Drop`, on every exit path.
//!
//! # Limitations
//!
//! - **Not reentrant.** A thread that calls [`SpinMutex::lock`] while
//!   already holding the same lock spins forever.
//! - **Not interrupt-safe.** The lock must not be acquired from a context
//!   that can preempt its own holder on the same core; nothing here masks
//!   interrupts.

use core::{
    cell::UnsafeCell,
    fmt, hint,
    ops::{Deref, DerefMut},
    sync::atomic::{AtomicBool, Ordering},
};

/// A spin lock wrapping the value it protects.
///
/// Access to the inner value goes through the guard returned by
/// [`lock`](Self::lock), which releases the lock when dropped.
pub struct SpinMutex<T> {
    locked: AtomicBool,
    data: UnsafeCell<T>,
}

unsafe impl<T> Sync for SpinMutex<T> where T: Send {}

impl<T> Default for SpinMutex<T>
where
    T: Default,
{
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> fmt::Debug for SpinMutex<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("SpinMutex");
        match self.try_lock() {
            Some(guard) => d.field("data", &&*guard),
            None => d.field("data", &"<locked>"),
        };
        d.finish()
    }
}

impl<T> SpinMutex<T> {
    /// Creates an unlocked mutex protecting `data`.
    pub const fn new(data: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            data: UnsafeCell::new(data),
        }
    }

    /// Acquires the lock, spinning until it is available.
    pub fn lock(&self) -> SpinMutexGuard<'_, T> {
        while self.locked.swap(true, Ordering::Acquire) {
            // Spin on plain loads so contending cores fight over a shared
            // cache line only when the lock looks free.
            while self.locked.load(Ordering::Relaxed) {
                hint::spin_loop();
            }
        }

        SpinMutexGuard { mutex: self }
    }

    /// Acquires the lock only if it is free right now.
    pub fn try_lock(&self) -> Option<SpinMutexGuard<'_, T>> {
        if self.locked.swap(true, Ordering::Acquire) {
            return None;
        }

        Some(SpinMutexGuard { mutex: self })
    }

    /// Returns the inner value without locking.
    ///
    /// Safe because exclusive access to the mutex itself proves no guard
    /// exists.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    /// Returns a raw pointer to the inner value without locking.
    ///
    /// # Safety
    ///
    /// The caller must ensure no concurrent access through the lock while
    /// the pointer is in use.
    pub unsafe fn get_unsafe(&self) -> *mut T {
        self.data.get()
    }

    fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }
}

/// Scope-bound exclusive access to the value behind a [`SpinMutex`].
pub struct SpinMutexGuard<'a, T> {
    mutex: &'a SpinMutex<T>,
}

unsafe impl<T> Send for SpinMutexGuard<'_, T> where T: Send {}
unsafe impl<T> Sync for SpinMutexGuard<'_, T> where T: Sync {}

impl<T> Drop for SpinMutexGuard<'_, T> {
    fn drop(&mut self) {
        assert!(
            self.mutex.is_locked(),
            "SpinMutexGuard dropped without holding the lock"
        );
        self.mutex.locked.store(false, Ordering::Release);
    }
}

impl<T> Deref for SpinMutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.mutex.data.get() }
    }
}

impl<T> DerefMut for SpinMutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.mutex.data.get() }
    }
}

impl<T> SpinMutexGuard<'_, T> {
    /// Releases the lock explicitly.
    pub fn unlock(self) {
        let _ = self; // drop
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;

    #[test]
    fn test_guarded_mutation() {
        let lock = SpinMutex::new(1);
        {
            let mut guard = lock.lock();
            assert_eq!(*guard, 1);
            *guard += 1;
            assert_eq!(*guard, 2);
        }
        {
            let guard = lock.lock();
            assert_eq!(*guard, 2);
        }
    }

    #[test]
    fn test_try_lock_contention() {
        let lock = SpinMutex::new(0);
        let guard = lock.lock();
        assert!(lock.try_lock().is_none());
        guard.unlock();
        assert!(lock.try_lock().is_some());
    }

    #[test]
    fn test_get_mut_bypasses_lock() {
        let mut lock = SpinMutex::new(5);
        *lock.get_mut() = 7;
        assert_eq!(*lock.lock(), 7);
    }

    #[test]
    fn test_cross_thread_increment() {
        const THREADS: usize = 8;
        const ITERATIONS: usize = 10_000;

        let lock = Arc::new(SpinMutex::new(0_usize));
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let lock = Arc::clone(&lock);
                thread::spawn(move || {
                    for _ in 0..ITERATIONS {
                        *lock.lock() += 1;
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(*lock.lock(), THREADS * ITERATIONS);
    }

    #[test]
    fn test_debug_renders_locked_state() {
        let lock = SpinMutex::new(3);
        assert_eq!(format!("{lock:?}"), "SpinMutex { data: 3 }");
        let _guard = lock.lock();
        assert_eq!(format!("{lock:?}"), "SpinMutex { data: \"<locked>\" }");
    }
}
