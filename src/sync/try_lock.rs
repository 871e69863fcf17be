//! Non-blocking try-lock.
//!
//! A single atomic flag guards the value. Acquisition is one
//! compare-and-swap; failure is a normal outcome and callers drop their
//! work instead of waiting.

use std::cell::UnsafeCell;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};

/// A lock that can only be tried, never waited on.
pub struct TryLock<T> {
    locked: AtomicBool,
    value: UnsafeCell<T>,
}

// SAFETY: Access to the value is serialized by the `locked` flag
unsafe impl<T: Send> Send for TryLock<T> {}
unsafe impl<T: Send> Sync for TryLock<T> {}

impl<T> TryLock<T> {
    /// Create an unlocked lock.
    pub const fn new(value: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            value: UnsafeCell::new(value),
        }
    }

    /// Try to take the lock.
    ///
    /// Returns `None` immediately if another holder has it.
    pub fn try_lock(&self) -> Option<TryLockGuard<'_, T>> {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| TryLockGuard { lock: self })
    }

    /// Check if the lock is currently held.
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }

    /// Access the value through an exclusive borrow.
    pub fn get_mut(&mut self) -> &mut T {
        self.value.get_mut()
    }

    /// Raw pointer to the value, bypassing the flag.
    ///
    /// Dereferencing it is only sound while no guard exists and no other
    /// thread can take one.
    pub fn data_ptr(&self) -> *mut T {
        self.value.get()
    }

    /// Consume the lock and return the value.
    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}

/// Holder of a [`TryLock`]; releases it on drop.
pub struct TryLockGuard<'a, T> {
    lock: &'a TryLock<T>,
}

impl<T> Deref for TryLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: The guard proves exclusive access
        unsafe { &*self.lock.value.get() }
    }
}

impl<T> DerefMut for TryLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: The guard proves exclusive access
        unsafe { &mut *self.lock.value.get() }
    }
}

impl<T> Drop for TryLockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_second_try_fails_while_held() {
        let lock = TryLock::new(5u32);

        let guard = lock.try_lock().unwrap();
        assert!(lock.is_locked());
        assert!(lock.try_lock().is_none());
        drop(guard);

        assert!(!lock.is_locked());
        assert!(lock.try_lock().is_some());
    }

    #[test]
    fn test_guard_gives_mutable_access() {
        let lock = TryLock::new(Vec::new());
        lock.try_lock().unwrap().push(1);
        lock.try_lock().unwrap().push(2);
        assert_eq!(lock.into_inner(), vec![1, 2]);
    }

    #[test]
    fn test_contended_increments_are_never_lost() {
        let lock = Arc::new(TryLock::new(0u64));
        let acquired = Arc::new(std::sync::atomic::AtomicU64::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let lock = Arc::clone(&lock);
                let acquired = Arc::clone(&acquired);
                thread::spawn(move || {
                    for _ in 0..10_000 {
                        if let Some(mut guard) = lock.try_lock() {
                            *guard += 1;
                            acquired.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let value = *lock.try_lock().unwrap();
        assert_eq!(value, acquired.load(Ordering::Relaxed));
    }
}
