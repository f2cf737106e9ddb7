//! Generational slot pool. Handles detect use-after-destroy: a handle is
//! live only while its generation matches the slot's and the slot is
//! occupied. Generations are strictly monotonic per slot; a slot whose
//! generation reaches `u32::MAX` is retired and never reused.

/// `(index, generation)` pool handle. The default handle is never valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Handle {
    pub index: u32,
    pub generation: u32,
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

pub struct HandlePool<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
}

impl<T> Default for HandlePool<T> {
    fn default() -> Self {
        HandlePool {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }
}

impl<T> HandlePool<T> {
    pub fn new() -> HandlePool<T> {
        HandlePool::default()
    }

    /// Allocates a slot. Fresh slots hand out generation 1; reused slots
    /// bump their generation by one.
    pub fn create(&mut self, value: T) -> Handle {
        while let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            if slot.generation == u32::MAX {
                // Retired; should never have been queued.
                continue;
            }
            slot.generation += 1;
            slot.value = Some(value);
            self.live += 1;
            return Handle {
                index,
                generation: slot.generation,
            };
        }

        self.slots.push(Slot {
            generation: 1,
            value: Some(value),
        });
        self.live += 1;
        Handle {
            index: (self.slots.len() - 1) as u32,
            generation: 1,
        }
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.value.as_ref()
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.value.as_mut()
    }

    pub fn valid(&self, handle: Handle) -> bool {
        self.get(handle).is_some()
    }

    /// Frees the slot. Destroying a dead handle is a logged no-op.
    pub fn destroy(&mut self, handle: Handle) -> bool {
        let Some(slot) = self.slots.get_mut(handle.index as usize) else {
            log::warn!("pool: destroy with out-of-range handle");
            return false;
        };
        if slot.generation != handle.generation || slot.value.is_none() {
            log::warn!("pool: destroy of dead handle");
            return false;
        }
        slot.value = None;
        self.live -= 1;
        if slot.generation < u32::MAX {
            self.free.push(handle.index);
        }
        true
    }

    /// Live values.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn free_list_len(&self) -> usize {
        self.free.len()
    }

    /// Highest generation across all slots; zero for an empty pool.
    pub fn max_generation(&self) -> u32 {
        self.slots.iter().map(|s| s.generation).max().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.value.as_ref().map(|v| {
                (
                    Handle {
                        index: i as u32,
                        generation: slot.generation,
                    },
                    v,
                )
            })
        })
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.live = 0;
    }
}
