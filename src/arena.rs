//! Arena Cache — fixed-object slab allocator with stable, reusable slots.
//!
//! # Design
//!
//! The distilled design (see `SPEC_FULL.md` §5.A) describes a C-style arena
//! that grows by `realloc`, then walks a set of registered "holes" (raw
//! pointers into the arena, including tree edges stored *inside* it) and
//! patches every one of them by the base-address delta. That subtlety only
//! exists because the original represents tree edges as addresses.
//!
//! Here edges are `Idx`, a newtype over the slot's position in the backing
//! `Vec`. `Vec::push`/`Vec::reserve` may relocate the buffer, but an index is
//! not a pointer — it stays valid across a reallocation with no patching
//! step at all. This is the re-architecture the design notes recommend and
//! mandate: "model edges as indices... arena growth becomes a simple
//! `realloc` with no patching."
//!
//! What survives from the original contract:
//!
//! - a slot is either free or holds a fully-initialised `T`
//! - `alloc`/`dealloc`/`clear_all`/`nr_used` as named operations
//! - growth is unbounded in practice but can be made to fail (`try_alloc`)
//!   for the "arena growth failure" fatal error kind
//! - mutual exclusion across concurrent writers, via one `Mutex` per arena

use std::sync::Mutex;

/// An index into an [`Arena`]. Stable across growth; invalidated only by
/// `dealloc`/`clear_all` of the slot it names (the caller's responsibility,
/// exactly as the original "pointer valid until next alloc" contract was).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Idx(u32);

impl Idx {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Construct an `Idx` from a raw slot position. Used by callers that
    /// need to walk every assigned slot in allocation order (e.g. the
    /// frontier's arena-order drain) rather than follow tree edges.
    #[must_use]
    pub fn from_raw(raw: u32) -> Self {
        Idx(raw)
    }
}

enum Slot<T> {
    Free,
    Used(T),
}

/// A growable slab of `T`, addressed by stable [`Idx`] values.
pub struct Arena<T> {
    inner: Mutex<ArenaInner<T>>,
}

struct ArenaInner<T> {
    slots: Vec<Slot<T>>,
    free_list: Vec<u32>,
    assigned: usize,
    used: usize,
    max_capacity: Option<usize>,
}

impl<T> Arena<T> {
    /// Create an arena with `initial_count` pre-reserved (but unoccupied)
    /// slots. There is no `ctor`/`dtor` parameter as in the C design — `T`'s
    /// own `Drop` impl plays that role, and slots start empty rather than
    /// pre-constructed, since Rust has no notion of an allocated-but-
    /// uninitialized `T` that is safe to observe.
    #[must_use]
    pub fn new(initial_count: usize) -> Self {
        Self::with_max_capacity(initial_count, None)
    }

    /// As [`Arena::new`], but refuses to grow past `max_capacity` slots —
    /// this is what makes the "arena growth failure" fatal error kind
    /// reachable instead of theoretical.
    #[must_use]
    pub fn with_max_capacity(initial_count: usize, max_capacity: Option<usize>) -> Self {
        Self {
            inner: Mutex::new(ArenaInner {
                slots: Vec::with_capacity(initial_count),
                free_list: Vec::new(),
                assigned: 0,
                used: 0,
                max_capacity,
            }),
        }
    }

    /// Allocate a slot for `value`, growing the backing `Vec` if no slot is
    /// free. Returns `None` only if `max_capacity` is set and has been
    /// reached — the caller maps that to `ReaperError::ArenaGrowthFailure`.
    pub fn try_alloc(&self, value: T) -> Option<Idx> {
        let mut inner = self.inner.lock().expect("arena mutex poisoned");
        if let Some(free) = inner.free_list.pop() {
            inner.slots[free as usize] = Slot::Used(value);
            inner.used += 1;
            return Some(Idx(free));
        }
        if let Some(max) = inner.max_capacity {
            if inner.assigned >= max {
                return None;
            }
        }
        let idx = inner.assigned as u32;
        inner.slots.push(Slot::Used(value));
        inner.assigned += 1;
        inner.used += 1;
        Some(Idx(idx))
    }

    /// Allocate, panicking if capacity is exhausted. Used at call sites
    /// that have no bounded arena (the common case: link-record arenas are
    /// unbounded in practice, only header arenas are bounded per response).
    pub fn alloc(&self, value: T) -> Idx {
        self.try_alloc(value)
            .expect("arena allocation failed with no max_capacity set")
    }

    /// Drop the value at `idx` and return its slot to the free list.
    pub fn dealloc(&self, idx: Idx) {
        let mut inner = self.inner.lock().expect("arena mutex poisoned");
        let slot = &mut inner.slots[idx.index()];
        if matches!(slot, Slot::Used(_)) {
            *slot = Slot::Free;
            inner.free_list.push(idx.0);
            inner.used -= 1;
        }
    }

    /// Free every slot and reset the high-water mark, without shrinking the
    /// backing allocation — called between BFS generations.
    pub fn clear_all(&self) {
        let mut inner = self.inner.lock().expect("arena mutex poisoned");
        inner.slots.clear();
        inner.free_list.clear();
        inner.assigned = 0;
        inner.used = 0;
    }

    #[must_use]
    pub fn nr_used(&self) -> usize {
        self.inner.lock().expect("arena mutex poisoned").used
    }

    /// The high-water mark: one past the largest slot index ever assigned
    /// since the last `clear_all`. Lets a caller walk `0..high_water()` to
    /// visit every still-live slot in allocation order.
    #[must_use]
    pub fn high_water(&self) -> usize {
        self.inner.lock().expect("arena mutex poisoned").assigned
    }

    /// Run `f` with shared access to the slot at `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx` names a freed or out-of-range slot — callers only
    /// ever hold indices they (or a still-live tree edge) allocated.
    pub fn with<R>(&self, idx: Idx, f: impl FnOnce(&T) -> R) -> R {
        let inner = self.inner.lock().expect("arena mutex poisoned");
        match &inner.slots[idx.index()] {
            Slot::Used(v) => f(v),
            Slot::Free => panic!("use of freed arena slot {}", idx.0),
        }
    }

    /// Run `f` with exclusive access to the slot at `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx` names a freed or out-of-range slot.
    pub fn with_mut<R>(&self, idx: Idx, f: impl FnOnce(&mut T) -> R) -> R {
        let mut inner = self.inner.lock().expect("arena mutex poisoned");
        match &mut inner.slots[idx.index()] {
            Slot::Used(v) => f(v),
            Slot::Free => panic!("use of freed arena slot {}", idx.0),
        }
    }

    /// As `with`, but returns `None` instead of panicking for a freed or
    /// out-of-range slot — used when walking a `0..high_water()` range that
    /// may contain freed holes.
    pub fn try_with<R>(&self, idx: Idx, f: impl FnOnce(&T) -> R) -> Option<R> {
        let inner = self.inner.lock().expect("arena mutex poisoned");
        match inner.slots.get(idx.index()) {
            Some(Slot::Used(v)) => Some(f(v)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_returns_distinct_indices() {
        let arena: Arena<u32> = Arena::new(4);
        let a = arena.alloc(1);
        let b = arena.alloc(2);
        assert_ne!(a, b);
        assert_eq!(arena.nr_used(), 2);
    }

    #[test]
    fn dealloc_recycles_slot() {
        let arena: Arena<u32> = Arena::new(2);
        let a = arena.alloc(10);
        arena.dealloc(a);
        assert_eq!(arena.nr_used(), 0);
        let b = arena.alloc(20);
        // recycled from the free list, not a fresh high-water slot
        assert_eq!(a, b);
        assert_eq!(arena.nr_used(), 1);
    }

    #[test]
    fn clear_all_resets_without_dropping_capacity() {
        let arena: Arena<u32> = Arena::new(2);
        arena.alloc(1);
        arena.alloc(2);
        arena.clear_all();
        assert_eq!(arena.nr_used(), 0);
        let idx = arena.alloc(3);
        assert_eq!(idx.index(), 0);
    }

    #[test]
    fn grows_past_initial_capacity_with_stable_indices() {
        let arena: Arena<usize> = Arena::new(4);
        let mut idxs = Vec::new();
        for i in 0..10_000 {
            idxs.push(arena.alloc(i));
        }
        for (i, idx) in idxs.iter().enumerate() {
            arena.with(*idx, |v| assert_eq!(*v, i));
        }
    }

    #[test]
    fn try_alloc_respects_max_capacity() {
        let arena: Arena<u32> = Arena::with_max_capacity(1, Some(2));
        assert!(arena.try_alloc(1).is_some());
        assert!(arena.try_alloc(2).is_some());
        assert!(arena.try_alloc(3).is_none());
    }

    #[test]
    #[should_panic(expected = "use of freed arena slot")]
    fn with_panics_on_freed_slot() {
        let arena: Arena<u32> = Arena::new(1);
        let idx = arena.alloc(1);
        arena.dealloc(idx);
        arena.with(idx, |_| ());
    }
}
