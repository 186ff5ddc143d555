//! Slot arena for navigation paths with generational handles.

use super::path::NavigationPath;

/// Stable reference to a pooled path. Stale once the path is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PathHandle {
    index: u32,
    generation: u32,
}

impl PathHandle {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    live: bool,
    path: NavigationPath,
}

/// Paths are deactivated and reused, never freed.
#[derive(Debug, Default)]
pub struct PathPool {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl PathPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a reset path from the free list, growing the pool if it is empty.
    pub fn acquire(&mut self) -> PathHandle {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot::default());
                (self.slots.len() - 1) as u32
            }
        };
        let slot = &mut self.slots[index as usize];
        slot.live = true;
        slot.path.reset();
        PathHandle {
            index,
            generation: slot.generation,
        }
    }

    /// Return a path to the pool. Stale handles are ignored.
    pub fn release(&mut self, handle: PathHandle) -> bool {
        let Some(slot) = self.slot_mut(handle) else {
            return false;
        };
        slot.live = false;
        slot.generation = slot.generation.wrapping_add(1);
        slot.path.reset();
        self.free.push(handle.index);
        true
    }

    pub fn is_valid(&self, handle: PathHandle) -> bool {
        self.get(handle).is_some()
    }

    pub fn get(&self, handle: PathHandle) -> Option<&NavigationPath> {
        self.slots
            .get(handle.index as usize)
            .filter(|s| s.live && s.generation == handle.generation)
            .map(|s| &s.path)
    }

    pub fn get_mut(&mut self, handle: PathHandle) -> Option<&mut NavigationPath> {
        self.slot_mut(handle).map(|s| &mut s.path)
    }

    fn slot_mut(&mut self, handle: PathHandle) -> Option<&mut Slot> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|s| s.live && s.generation == handle.generation)
    }

    /// Paths currently handed out.
    pub fn live_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}
