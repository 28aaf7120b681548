use std::{marker::PhantomData, num::NonZeroU64};

/// Nonzero handle to an item in a [`HandlePool`]. The handle is guaranteed to
/// be unique for the lifetime of the pool that created it.
///
/// It is typed for a modicum of safety, but it is still possible to use the
/// handle to manipulate objects in a different pool of the same type. The pool
/// will report such handles as invalid (or, worse, as some other live item),
/// so don't do that.
pub struct PoolHandle<T>(NonZeroU64, PhantomData<T>);

impl<T> Clone for PoolHandle<T> {
    fn clone(&self) -> Self {
        Self(self.0, PhantomData)
    }
}

impl<T> Copy for PoolHandle<T> {}

impl<T> PartialEq for PoolHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T> Eq for PoolHandle<T> {}

impl<T> std::fmt::Debug for PoolHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolHandle")
            .field("index", &self.index())
            .field("generation", &self.generation())
            .finish()
    }
}

impl<T> PoolHandle<T> {
    /// Reconstructs a handle from the value returned by [`PoolHandle::raw`].
    ///
    /// ## Returns
    ///
    /// `None` if `raw` is zero. Any other value produces a handle, though it
    /// may not refer to a live item in any pool.
    #[must_use]
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(|value| Self(value, PhantomData))
    }

    /// Converts the handle into its raw bit pattern. Never zero.
    #[must_use]
    pub fn raw(self) -> u64 {
        self.0.get()
    }

    fn new(index: u32, generation: u32) -> Self {
        // The slot index is stored offset by one so that no live handle ever
        // has a zero bit pattern, regardless of generation.
        let value = u64::from(generation) << 32 | u64::from(index + 1);

        // SAFETY: the low half of `value` is always at least 1.
        Self(unsafe { NonZeroU64::new_unchecked(value) }, PhantomData)
    }

    fn index(self) -> u32 {
        (self.0.get() as u32) - 1
    }

    fn generation(self) -> u32 {
        (self.0.get() >> 32) as u32
    }
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// An object pool that hands out generational handles, so that a handle to a
/// destroyed item can never alias an item that later reuses its slot.
pub struct HandlePool<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
}

impl<T> Default for HandlePool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> HandlePool<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Returns the number of live items in the pool.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inserts a new value into the pool and returns a handle to it.
    ///
    /// ## Panics
    ///
    /// This function will panic if the pool would exceed `u32::MAX` slots.
    #[must_use]
    pub fn insert(&mut self, value: T) -> PoolHandle<T> {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            PoolHandle::new(index, slot.generation)
        } else {
            let index = u32::try_from(self.slots.len()).expect("max u32::MAX slots!");
            self.slots.push(Slot {
                generation: 0,
                value: Some(value),
            });
            PoolHandle::new(index, 0)
        }
    }

    /// Returns a reference to the item identified by the given handle, or
    /// `None` if the handle is stale or from another pool.
    #[must_use]
    pub fn get(&self, handle: PoolHandle<T>) -> Option<&T> {
        self.slots
            .get(handle.index() as usize)
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.value.as_ref())
    }

    /// Returns a mutable reference to the item identified by the given handle,
    /// or `None` if the handle is stale or from another pool.
    #[must_use]
    pub fn get_mut(&mut self, handle: PoolHandle<T>) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index() as usize)
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.value.as_mut())
    }

    /// Returns true if the handle refers to a live item in this pool.
    #[must_use]
    pub fn contains(&self, handle: PoolHandle<T>) -> bool {
        self.get(handle).is_some()
    }

    /// Removes the value identified by the given handle from the pool.
    ///
    /// ## Returns
    ///
    /// The value if the handle is valid and `None` otherwise. Removing the
    /// same handle twice returns `None` the second time.
    pub fn remove(&mut self, handle: PoolHandle<T>) -> Option<T> {
        let slot = self
            .slots
            .get_mut(handle.index() as usize)
            .filter(|slot| slot.generation == handle.generation())?;

        let value = slot.value.take()?;

        // A slot whose generation counter has saturated is retired instead of
        // being returned to the free list.
        if slot.generation < u32::MAX {
            slot.generation += 1;
            self.free.push(handle.index());
        }

        Some(value)
    }

    /// Removes every item from the pool, invalidating all outstanding handles.
    pub fn clear(&mut self) {
        self.free.clear();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.value.take().is_some() && slot.generation < u32::MAX {
                slot.generation += 1;
            }
            if slot.generation < u32::MAX {
                self.free.push(index as u32);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_get_remove_one() {
        let mut pool = HandlePool::<u32>::new();

        let handle = pool.insert(42);
        assert_ne!(handle.raw(), 0);

        assert_eq!(pool.get(handle), Some(&42));
        assert_eq!(pool.get_mut(handle), Some(&mut 42));
        assert_eq!(pool.len(), 1);

        assert_eq!(pool.remove(handle), Some(42));
        assert!(!pool.contains(handle));
        assert!(pool.is_empty());
    }

    #[test]
    fn remove_twice() {
        let mut pool = HandlePool::<u32>::new();
        let handle = pool.insert(42);

        assert_eq!(pool.remove(handle), Some(42));
        assert_eq!(pool.remove(handle), None);

        let _ = pool.insert(43);
        assert_eq!(pool.remove(handle), None);
    }

    #[test]
    fn insert_remove_insert_get() {
        let mut pool = HandlePool::<u32>::new();

        let a = pool.insert(42);
        assert_eq!(pool.remove(a), Some(42));

        // The slot is reused, but the old handle must not resolve to the new
        // item.
        let b = pool.insert(43);
        assert_eq!(pool.get(a), None);
        assert_eq!(pool.get(b), Some(&43));
        assert_ne!(a, b);
    }

    #[test]
    fn raw_round_trip() {
        let mut pool = HandlePool::<u32>::new();
        let handle = pool.insert(7);

        let raw = handle.raw();
        let recovered = PoolHandle::<u32>::from_raw(raw).unwrap();
        assert_eq!(handle, recovered);
        assert_eq!(pool.get(recovered), Some(&7));

        assert_eq!(PoolHandle::<u32>::from_raw(0), None);
    }

    #[test]
    fn clear_invalidates_handles() {
        let mut pool = HandlePool::<u32>::new();

        let a = pool.insert(1);
        let b = pool.insert(2);

        pool.clear();
        assert!(pool.is_empty());
        assert!(!pool.contains(a));
        assert!(!pool.contains(b));

        let c = pool.insert(3);
        assert_eq!(pool.get(c), Some(&3));
        assert_eq!(pool.get(a), None);
    }

    #[test]
    fn handles_are_distinct() {
        let mut pool = HandlePool::<u32>::new();
        let mut handles = vec![];

        for i in 0..10 {
            handles.push(pool.insert(i));
        }

        for (i, handle) in handles.iter().enumerate() {
            assert_eq!(pool.get(*handle), Some(&(i as u32)));
            for other in &handles[i + 1..] {
                assert_ne!(handle, other);
            }
        }
    }
}
