//! # Shared snapshot cell
//!
//! The estimation and control loops run on separate threads. The estimation
//! loop publishes its latest state into a [`SharedCell`] and the control loop
//! copies it out. Both sides only ever hold the lock for a plain copy.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::{Mutex, PoisonError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single value that can be stored and loaded from different threads.
///
/// There is no way to borrow the value, reads and writes are whole copies so
/// a reader never sees a partially written value.
#[derive(Debug, Default)]
pub struct SharedCell<T: Copy> {
    value: Mutex<T>
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<T: Copy> SharedCell<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: Mutex::new(value)
        }
    }

    /// Copy the current value out.
    ///
    /// A panic in another thread while it held the lock cannot leave a
    /// partial copy behind, so a poisoned lock still yields the last value.
    pub fn load(&self) -> T {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the current value.
    pub fn store(&self, value: T) {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = value;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[derive(Debug, Clone, Copy, Default, PartialEq)]
    struct Pair {
        a: u64,
        b: u64
    }

    #[test]
    fn test_no_torn_reads() {
        let cell = Arc::new(SharedCell::new(Pair::default()));

        let writer = {
            let cell = cell.clone();
            thread::spawn(move || {
                for i in 0..20_000u64 {
                    cell.store(Pair { a: i, b: i * 2 });
                }
            })
        };

        for _ in 0..20_000 {
            let p = cell.load();
            assert_eq!(p.b, p.a * 2);
        }

        writer.join().unwrap();
        assert_eq!(cell.load(), Pair { a: 19_999, b: 39_998 });
    }

    #[test]
    fn test_poisoned_lock_still_loads() {
        let cell = Arc::new(SharedCell::new(7u32));

        let c = cell.clone();
        let _ = thread::spawn(move || {
            let _guard = c.value.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert_eq!(cell.load(), 7);
        cell.store(8);
        assert_eq!(cell.load(), 8);
    }
}
