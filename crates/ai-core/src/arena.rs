//! Generational list arena.
//!
//! All per-agent working memory (node statuses, service timers, scratch values, leaf memory)
//! lives in lists owned by the host's `ListArena`. Agents only hold `ListHandle`s. A freed slot
//! bumps its generation, so any later access or second free through an old handle is reported
//! as `ListError::Stale` instead of touching someone else's list.

use core::fmt;
use core::marker::PhantomData;
use std::any::Any;

use crate::error::ListError;

pub struct ListHandle<T: 'static> {
    index: u32,
    generation: u32,
    _phantom: PhantomData<fn() -> T>,
}

impl<T: 'static> Copy for ListHandle<T> {}

impl<T: 'static> Clone for ListHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: 'static> PartialEq for ListHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T: 'static> Eq for ListHandle<T> {}

impl<T: 'static> fmt::Debug for ListHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ListHandle({}:{})", self.index, self.generation)
    }
}

impl<T: 'static> ListHandle<T> {
    const fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            _phantom: PhantomData,
        }
    }

    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

struct Slot {
    generation: u32,
    list: Option<Box<dyn Any>>,
}

#[derive(Default)]
pub struct ListArena {
    slots: Vec<Slot>,
    free_slots: Vec<u32>,
    allocations: u64,
    frees: u64,
}

impl fmt::Debug for ListArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListArena")
            .field("slots", &self.slots.len())
            .field("live", &self.live())
            .field("allocations", &self.allocations)
            .field("frees", &self.frees)
            .finish()
    }
}

impl ListArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate<T: 'static>(&mut self, capacity: usize) -> ListHandle<T> {
        self.insert(Vec::<T>::with_capacity(capacity))
    }

    pub fn allocate_filled<T: Clone + 'static>(&mut self, len: usize, value: T) -> ListHandle<T> {
        self.insert(vec![value; len])
    }

    pub fn allocate_with<T: 'static>(
        &mut self,
        len: usize,
        make: impl FnMut(usize) -> T,
    ) -> ListHandle<T> {
        self.insert((0..len).map(make).collect::<Vec<T>>())
    }

    fn insert<T: 'static>(&mut self, list: Vec<T>) -> ListHandle<T> {
        self.allocations = self.allocations.saturating_add(1);

        // LIFO reuse keeps handle assignment a pure function of the alloc/free sequence.
        if let Some(index) = self.free_slots.pop() {
            if let Some(slot) = self.slots.get_mut(index as usize) {
                slot.list = Some(Box::new(list));
                return ListHandle::new(index, slot.generation);
            }
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            list: Some(Box::new(list)),
        });
        ListHandle::new(index, 0)
    }

    pub fn free<T: 'static>(&mut self, handle: ListHandle<T>) -> Result<(), ListError> {
        let slot = self
            .slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .ok_or(ListError::Stale {
                index: handle.index,
                generation: handle.generation,
            })?;

        match slot.list.as_ref() {
            Some(list) if list.is::<Vec<T>>() => {}
            Some(_) => return Err(ListError::TypeMismatch { index: handle.index }),
            None => {
                return Err(ListError::Stale {
                    index: handle.index,
                    generation: handle.generation,
                })
            }
        }

        slot.list = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_slots.push(handle.index);
        self.frees = self.frees.saturating_add(1);
        Ok(())
    }

    pub fn get<T: 'static>(&self, handle: ListHandle<T>) -> Result<&Vec<T>, ListError> {
        let slot = self
            .slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.list.as_ref())
            .ok_or(ListError::Stale {
                index: handle.index,
                generation: handle.generation,
            })?;
        slot.downcast_ref::<Vec<T>>()
            .ok_or(ListError::TypeMismatch { index: handle.index })
    }

    pub fn get_mut<T: 'static>(&mut self, handle: ListHandle<T>) -> Result<&mut Vec<T>, ListError> {
        let slot = self
            .slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.list.as_mut())
            .ok_or(ListError::Stale {
                index: handle.index,
                generation: handle.generation,
            })?;
        slot.downcast_mut::<Vec<T>>()
            .ok_or(ListError::TypeMismatch { index: handle.index })
    }

    pub fn contains<T: 'static>(&self, handle: ListHandle<T>) -> bool {
        self.get(handle).is_ok()
    }

    /// Number of lists allocated and not yet freed.
    pub fn live(&self) -> usize {
        self.allocations.saturating_sub(self.frees) as usize
    }

    pub fn allocations(&self) -> u64 {
        self.allocations
    }

    pub fn frees(&self) -> u64 {
        self.frees
    }
}
