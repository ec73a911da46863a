//! Generation-checked arena of native handles.
//!
//! A context never frees a single value. Addresses are appended in
//! creation order and released all at once by [`HandlePool::drain`],
//! which also bumps the generation so every outstanding [`Handle`] stops
//! resolving.

use calcnum_binding::Ptr;

/// Index into a context's pool plus the generation it was issued in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

#[derive(Debug, Default)]
pub(crate) struct HandlePool {
    slots: Vec<Ptr>,
    generation: u32,
}

impl HandlePool {
    pub fn insert(&mut self, ptr: Ptr) -> Handle {
        let index = self.slots.len() as u32;
        self.slots.push(ptr);
        Handle {
            index,
            generation: self.generation,
        }
    }

    pub fn get(&self, handle: Handle) -> Option<Ptr> {
        if handle.generation != self.generation {
            return None;
        }
        self.slots.get(handle.index as usize).copied()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Remove the addresses registered after the first `len`, newest last.
    pub fn truncate(&mut self, len: usize) -> Vec<Ptr> {
        if len >= self.slots.len() {
            return Vec::new();
        }
        self.slots.split_off(len)
    }

    /// Take every address in creation order and start a new generation.
    pub fn drain(&mut self) -> Vec<Ptr> {
        self.generation = self.generation.wrapping_add(1);
        std::mem::take(&mut self.slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_resolve_until_drained() {
        let mut pool = HandlePool::default();
        let a = pool.insert(16);
        let b = pool.insert(48);
        assert_eq!(pool.get(a), Some(16));
        assert_eq!(pool.get(b), Some(48));

        let c = pool.insert(80);
        assert_eq!(pool.truncate(2), vec![80]);
        assert_eq!(pool.get(c), None);
        assert!(pool.truncate(5).is_empty());

        assert_eq!(pool.drain(), vec![16, 48]);
        assert_eq!(pool.get(a), None);
        assert_eq!(pool.len(), 0);
    }

    #[test]
    fn stale_handles_do_not_alias_new_slots() {
        let mut pool = HandlePool::default();
        let old = pool.insert(16);
        pool.drain();
        let new = pool.insert(32);
        assert_eq!(old.index(), new.index());
        assert_eq!(pool.get(old), None);
        assert_eq!(pool.get(new), Some(32));
        assert_eq!(new.generation(), pool.generation());
    }

    #[test]
    fn draining_an_empty_pool_still_advances() {
        let mut pool = HandlePool::default();
        assert!(pool.drain().is_empty());
        assert!(pool.drain().is_empty());
        assert_eq!(pool.generation(), 2);
    }
}
