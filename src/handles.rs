//! Integer handles for transactions held across boundary calls.
//!
//! Slots are reused first-fit. A handle stays valid until freed; after
//! that every lookup fails with [`Error::InvalidHandle`] until the slot is
//! handed out again.

use crate::chain::PackedTransaction;
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

/// Maximum number of live entries in a table.
pub const HANDLE_CAPACITY: usize = 1024;

pub type Handle = i64;

type Slot<T> = Option<Arc<Mutex<T>>>;

/// A concurrency-safe slot map keyed by small integers.
#[derive(Debug)]
pub struct HandleTable<T> {
    slots: Mutex<Vec<Slot<T>>>,
    capacity: usize,
}

impl<T> Default for HandleTable<T> {
    fn default() -> Self {
        Self::with_capacity(HANDLE_CAPACITY)
    }
}

impl<T> HandleTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        HandleTable {
            slots: Mutex::new(Vec::new()),
            capacity,
        }
    }

    /// Store `value` in the lowest free slot.
    pub fn create(&self, value: T) -> Result<Handle> {
        let mut slots = self.slots.lock();
        let entry = Some(Arc::new(Mutex::new(value)));
        let index = match slots.iter().position(Option::is_none) {
            Some(index) => {
                slots[index] = entry;
                index
            }
            None if slots.len() < self.capacity => {
                slots.push(entry);
                slots.len() - 1
            }
            None => {
                warn!(capacity = self.capacity, "handle table is full");
                return Err(Error::NoRoom(self.capacity));
            }
        };
        debug!(handle = index, "allocated handle");
        Ok(index as Handle)
    }

    /// Shared access to the entry behind `handle`.
    pub fn get(&self, handle: Handle) -> Result<Arc<Mutex<T>>> {
        let slots = self.slots.lock();
        usize::try_from(handle)
            .ok()
            .and_then(|index| slots.get(index))
            .and_then(|slot| slot.clone())
            .ok_or(Error::InvalidHandle(handle))
    }

    /// Run `f` with exclusive access to the entry.
    ///
    /// The table lock is released before `f` runs, so work on different
    /// handles proceeds in parallel.
    pub fn with<R>(&self, handle: Handle, f: impl FnOnce(&mut T) -> Result<R>) -> Result<R> {
        let entry = self.get(handle)?;
        let mut guard = entry.lock();
        f(&mut *guard)
    }

    /// Release a handle. Unknown handles are ignored.
    pub fn free(&self, handle: Handle) {
        let mut slots = self.slots.lock();
        let Some(slot) = usize::try_from(handle)
            .ok()
            .and_then(|index| slots.get_mut(index))
        else {
            return;
        };
        if slot.take().is_some() {
            debug!(handle, "freed handle");
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.slots.lock().iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Process-wide table of in-flight transactions.
pub fn transactions() -> &'static HandleTable<PackedTransaction> {
    static TABLE: OnceLock<HandleTable<PackedTransaction>> = OnceLock::new();
    TABLE.get_or_init(HandleTable::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_lifecycle() {
        let table = HandleTable::new();
        let h = table.create(String::from("a")).unwrap();
        assert!(h >= 0);
        table.with(h, |s| {
            s.push('b');
            Ok(())
        })
        .unwrap();
        assert_eq!(*table.get(h).unwrap().lock(), "ab");

        table.free(h);
        assert!(matches!(table.get(h), Err(Error::InvalidHandle(_))));
        assert!(table.with(h, |_| Ok(())).is_err());
    }

    #[test]
    fn test_bad_handles() {
        let table: HandleTable<u8> = HandleTable::new();
        assert!(matches!(table.get(-1), Err(Error::InvalidHandle(-1))));
        assert!(table.get(0).is_err());
        assert!(table.get(i64::MAX).is_err());
        // freeing nonsense is a no-op
        table.free(-5);
        table.free(99);
        table.free(0);
    }

    #[test]
    fn test_first_fit_reuse() {
        let table = HandleTable::new();
        let handles: Vec<_> = (0..4).map(|i| table.create(i).unwrap()).collect();
        assert_eq!(handles, vec![0, 1, 2, 3]);

        table.free(2);
        table.free(1);
        assert_eq!(table.create(10).unwrap(), 1);
        assert_eq!(table.create(11).unwrap(), 2);
        assert_eq!(table.create(12).unwrap(), 4);
        assert_eq!(*table.get(1).unwrap().lock(), 10);
    }

    #[test]
    fn test_capacity() {
        let table = HandleTable::with_capacity(8);
        for i in 0..8 {
            table.create(i).unwrap();
        }
        assert!(matches!(table.create(8), Err(Error::NoRoom(8))));
        assert_eq!(table.len(), 8);

        table.free(5);
        assert_eq!(table.create(8).unwrap(), 5);
        assert!(table.create(9).is_err());
    }

    #[test]
    fn test_default_capacity() {
        let table = HandleTable::new();
        for i in 0..HANDLE_CAPACITY {
            table.create(i).unwrap();
        }
        assert!(matches!(table.create(0), Err(Error::NoRoom(HANDLE_CAPACITY))));
    }

    #[test]
    fn test_concurrent_creates_are_unique() {
        let table = Arc::new(HandleTable::new());
        let workers: Vec<_> = (0..8)
            .map(|_| {
                let table = Arc::clone(&table);
                thread::spawn(move || (0..50).map(|i| table.create(i).unwrap()).collect::<Vec<_>>())
            })
            .collect();
        let mut all: Vec<Handle> = workers
            .into_iter()
            .flat_map(|w| w.join().unwrap())
            .collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 400);
    }
}
