use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Unique identifier with generation tracking to prevent stale references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct GenerationalId {
    pub index: usize,
    pub generation: u32,
}

impl GenerationalId {
    pub fn new(index: usize, generation: u32) -> Self {
        Self { index, generation }
    }
}

/// Lightweight handle contacts and arbiters hold instead of body references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct BodyHandle(pub GenerationalId);

impl BodyHandle {
    pub fn new(index: usize, generation: u32) -> Self {
        Self(GenerationalId::new(index, generation))
    }

    pub fn index(&self) -> usize {
        self.0.index
    }

    pub fn generation(&self) -> u32 {
        self.0.generation
    }

    pub fn is_null(&self) -> bool {
        self.0.index == usize::MAX
    }
}

impl Default for BodyHandle {
    fn default() -> Self {
        Self(GenerationalId::new(usize::MAX, 0))
    }
}

impl fmt::Display for BodyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Body({}v{})", self.index(), self.generation())
    }
}

/// Generational arena that hands out stable handles while preventing use-after-free.
///
/// Removed slots are recycled through a free list; the bumped generation makes
/// every handle to the old occupant resolve to `None`.
pub struct Arena<T> {
    items: Vec<Option<T>>,
    generations: Vec<u32>,
    free_list: VecDeque<usize>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            generations: Vec::new(),
            free_list: VecDeque::new(),
        }
    }

    /// Stores `item` and returns its handle. The closure form lets the item
    /// learn its own handle before being placed.
    pub fn insert_with(&mut self, build: impl FnOnce(BodyHandle) -> T) -> BodyHandle {
        if let Some(index) = self.free_list.pop_front() {
            let handle = BodyHandle::new(index, self.generations[index]);
            self.items[index] = Some(build(handle));
            return handle;
        }

        let index = self.items.len();
        let handle = BodyHandle::new(index, 0);
        self.items.push(Some(build(handle)));
        self.generations.push(0);
        handle
    }

    pub fn insert(&mut self, item: T) -> BodyHandle {
        self.insert_with(|_| item)
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.get(handle).is_some()
    }

    pub fn get(&self, handle: BodyHandle) -> Option<&T> {
        if self.is_valid(handle) {
            self.items.get(handle.index()).and_then(|slot| slot.as_ref())
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, handle: BodyHandle) -> Option<&mut T> {
        if self.is_valid(handle) {
            self.items.get_mut(handle.index()).and_then(|slot| slot.as_mut())
        } else {
            None
        }
    }

    /// Borrows two distinct entries mutably, in argument order.
    pub fn get2_mut(&mut self, a: BodyHandle, b: BodyHandle) -> Option<(&mut T, &mut T)> {
        if a.index() == b.index() {
            return None;
        }

        if !self.is_valid(a) || !self.is_valid(b) {
            return None;
        }

        let (first, second, flipped) = if a.index() < b.index() {
            (a, b, false)
        } else {
            (b, a, true)
        };

        let second_index = second.index();
        if second_index >= self.items.len() {
            return None;
        }

        let (left, right) = self.items.split_at_mut(second_index);
        let first_slot = left
            .get_mut(first.index())
            .and_then(|slot| slot.as_mut())?;
        let second_slot = right.get_mut(0).and_then(|slot| slot.as_mut())?;

        if flipped {
            Some((second_slot, first_slot))
        } else {
            Some((first_slot, second_slot))
        }
    }

    pub fn remove(&mut self, handle: BodyHandle) -> Option<T> {
        if !self.is_valid(handle) {
            return None;
        }
        let slot = self.items.get_mut(handle.index())?;
        if slot.is_some() {
            self.generations[handle.index()] = self.generations[handle.index()].wrapping_add(1);
            self.free_list.push_back(handle.index());
        }
        slot.take()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BodyHandle, &T)> + '_ {
        self.items.iter().enumerate().filter_map(|(index, slot)| {
            slot.as_ref()
                .map(|item| (BodyHandle::new(index, self.generations[index]), item))
        })
    }

    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.items.iter().filter_map(|slot| slot.as_ref())
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.items.iter_mut().filter_map(|slot| slot.as_mut())
    }

    #[cfg(feature = "parallel")]
    pub fn par_values_mut(&mut self) -> impl rayon::iter::ParallelIterator<Item = &mut T> + '_
    where
        T: Send,
    {
        use rayon::prelude::*;
        self.items.par_iter_mut().filter_map(|slot| slot.as_mut())
    }

    pub fn handles(&self) -> impl Iterator<Item = BodyHandle> + '_ {
        self.iter().map(|(handle, _)| handle)
    }

    pub fn len(&self) -> usize {
        self.items.len() - self.free_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_valid(&self, handle: BodyHandle) -> bool {
        self.generations
            .get(handle.index())
            .copied()
            .map(|gen| gen == handle.generation())
            .unwrap_or(false)
    }
}
