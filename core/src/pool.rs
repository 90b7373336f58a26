//! Slot pool with stable integer ids.
//!
//! [`Pool<T>`] stores values in a flat vector of slots and hands out a
//! [`PoolId`] for each inserted value. Released slots are kept on a free list
//! and reused in LIFO order, so a frame that creates and drops the same number
//! of objects every frame keeps reusing the same ids.
//!
//! # Preconditions
//!
//! The pool does not carry generation counters. Using an id after it was
//! released (or releasing it twice) is a bug in the caller: `get` and
//! `release` panic when they see a dead slot, but once the slot has been
//! reused by a later [`Pool::add`] a stale id silently refers to the new value.
//!
//! # Example
//!
//! ```
//! use lilium_core::pool::Pool;
//!
//! let mut pool = Pool::new();
//! let a = pool.add("a");
//! let b = pool.add("b");
//! assert_eq!((a.index(), b.index()), (0, 1));
//!
//! pool.release(a);
//! let c = pool.add("c");
//! assert_eq!(c, a); // most recently freed slot comes back first
//! assert_eq!(*pool.get(c), "c");
//! ```

/// Identifier of a slot in a [`Pool`].
///
/// Ids are plain indices: they are ordered, hashable and cheap to copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PoolId(u32);

impl PoolId {
    /// Create an id from a raw slot index.
    pub const fn from_index(index: u32) -> Self {
        Self(index)
    }

    /// Returns the slot index of this id.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for PoolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A slot allocator producing stable [`PoolId`]s for live values.
#[derive(Debug, Clone)]
pub struct Pool<T> {
    /// Slot storage. `None` marks a released slot.
    slots: Vec<Option<T>>,
    /// Released slot indices (LIFO stack).
    free_list: Vec<u32>,
    /// Number of live values.
    count: usize,
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Pool<T> {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            count: 0,
        }
    }

    /// Create an empty pool with room for `capacity` slots.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            count: 0,
        }
    }

    /// Insert a value and return its id.
    ///
    /// Reuses the most recently released slot if there is one, otherwise
    /// appends a new slot.
    pub fn add(&mut self, value: T) -> PoolId {
        self.count += 1;
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            debug_assert!(slot.is_none(), "free list points at a live slot");
            *slot = Some(value);
            return PoolId(index);
        }

        let index = u32::try_from(self.slots.len()).expect("pool exceeded u32::MAX slots");
        self.slots.push(Some(value));
        PoolId(index)
    }

    /// Release a slot and return the value it held.
    ///
    /// # Panics
    ///
    /// Panics if `id` is out of range or already released.
    pub fn release(&mut self, id: PoolId) -> T {
        let value = self
            .slots
            .get_mut(id.index())
            .and_then(Option::take)
            .unwrap_or_else(|| panic!("Pool::release: slot {id} is not alive"));
        self.free_list.push(id.0);
        self.count -= 1;
        value
    }

    /// Get a reference to a live value.
    ///
    /// # Panics
    ///
    /// Panics if `id` is out of range or released.
    pub fn get(&self, id: PoolId) -> &T {
        self.try_get(id)
            .unwrap_or_else(|| panic!("Pool::get: slot {id} is not alive"))
    }

    /// Get a mutable reference to a live value.
    ///
    /// # Panics
    ///
    /// Panics if `id` is out of range or released.
    pub fn get_mut(&mut self, id: PoolId) -> &mut T {
        self.slots
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .unwrap_or_else(|| panic!("Pool::get_mut: slot {id} is not alive"))
    }

    /// Get a reference to a value, or `None` if the slot is not alive.
    pub fn try_get(&self, id: PoolId) -> Option<&T> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    /// Returns `true` if `id` refers to a live slot.
    pub fn contains(&self, id: PoolId) -> bool {
        self.try_get(id).is_some()
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` if the pool holds no live values.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Drop every value and forget all slots.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free_list.clear();
        self.count = 0;
    }

    /// Iterate live values in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (PoolId, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|value| (PoolId(index as u32), value)))
    }

    /// Iterate live values mutably in ascending id order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (PoolId, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_mut().map(|value| (PoolId(index as u32), value)))
    }

    /// Iterate the ids of live values in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = PoolId> + '_ {
        self.iter().map(|(id, _)| id)
    }
}

impl<T> std::ops::Index<PoolId> for Pool<T> {
    type Output = T;

    fn index(&self, id: PoolId) -> &T {
        self.get(id)
    }
}

impl<T> std::ops::IndexMut<PoolId> for Pool<T> {
    fn index_mut(&mut self, id: PoolId) -> &mut T {
        self.get_mut(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_returns_sequential_ids() {
        let mut pool = Pool::new();
        assert_eq!(pool.add('a').index(), 0);
        assert_eq!(pool.add('b').index(), 1);
        assert_eq!(pool.add('c').index(), 2);
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn test_released_slot_is_reused_first() {
        let mut pool = Pool::new();
        let a = pool.add('a');
        let b = pool.add('b');
        assert_eq!((a.index(), b.index()), (0, 1));

        assert_eq!(pool.release(a), 'a');
        let c = pool.add('c');
        let d = pool.add('d');

        assert_eq!(c.index(), 0);
        assert_eq!(d.index(), 2);
        assert_eq!(*pool.get(c), 'c');
        assert_eq!(*pool.get(b), 'b');
    }

    #[test]
    fn test_free_list_is_lifo() {
        let mut pool = Pool::new();
        let ids: Vec<_> = (0..4).map(|i| pool.add(i)).collect();
        pool.release(ids[1]);
        pool.release(ids[3]);

        assert_eq!(pool.add(10).index(), 3);
        assert_eq!(pool.add(11).index(), 1);
        assert_eq!(pool.add(12).index(), 4);
    }

    #[test]
    fn test_iter_skips_released_slots() {
        let mut pool = Pool::new();
        let a = pool.add(1);
        let b = pool.add(2);
        let c = pool.add(3);
        pool.release(b);

        let live: Vec<_> = pool.iter().map(|(id, v)| (id, *v)).collect();
        assert_eq!(live, vec![(a, 1), (c, 3)]);
        assert_eq!(pool.ids().collect::<Vec<_>>(), vec![a, c]);
    }

    #[test]
    fn test_iter_mut_updates_values() {
        let mut pool = Pool::new();
        pool.add(1);
        pool.add(2);
        for (_, value) in pool.iter_mut() {
            *value *= 10;
        }
        assert_eq!(pool.iter().map(|(_, v)| *v).sum::<i32>(), 30);
    }

    #[test]
    fn test_contains_and_len() {
        let mut pool = Pool::new();
        let a = pool.add("a");
        assert!(pool.contains(a));
        pool.release(a);
        assert!(!pool.contains(a));
        assert!(pool.is_empty());
        assert!(pool.try_get(a).is_none());
    }

    #[test]
    fn test_index_operators() {
        let mut pool = Pool::new();
        let a = pool.add(String::from("x"));
        pool[a].push('y');
        assert_eq!(pool[a], "xy");
    }

    #[test]
    fn test_clear_resets_ids() {
        let mut pool = Pool::new();
        pool.add(1);
        pool.add(2);
        pool.clear();
        assert!(pool.is_empty());
        assert_eq!(pool.add(3).index(), 0);
    }

    #[test]
    #[should_panic(expected = "not alive")]
    fn test_get_released_panics() {
        let mut pool = Pool::new();
        let a = pool.add(1);
        pool.release(a);
        pool.get(a);
    }

    #[test]
    #[should_panic(expected = "not alive")]
    fn test_double_release_panics() {
        let mut pool = Pool::new();
        let a = pool.add(1);
        pool.release(a);
        pool.release(a);
    }
}
