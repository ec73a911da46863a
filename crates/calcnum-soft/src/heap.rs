//! Growable linear memory with a first-fit allocator.
//!
//! Memory grows in 64 KiB pages up to a configurable limit. Address `0`
//! is never handed out so it can stand for null.

use calcnum_binding::{BindingError, BindingResult, Ptr};
use std::collections::BTreeMap;

pub const PAGE_SIZE: usize = 64 * 1024;
const ALIGN: usize = 8;
const BASE: usize = ALIGN;

#[derive(Debug)]
pub(crate) struct LinearMemory {
    bytes: Vec<u8>,
    limit: usize,
    top: usize,
    live: BTreeMap<Ptr, usize>,
    free_blocks: BTreeMap<Ptr, usize>,
}

impl LinearMemory {
    pub fn new(limit: usize) -> Self {
        Self {
            bytes: vec![0; PAGE_SIZE.min(limit.max(BASE))],
            limit,
            top: BASE,
            live: BTreeMap::new(),
            free_blocks: BTreeMap::new(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    pub fn live_allocations(&self) -> usize {
        self.live.len()
    }

    pub fn live_bytes(&self) -> usize {
        self.live.values().sum()
    }

    pub fn malloc(&mut self, size: usize) -> BindingResult<Ptr> {
        let rounded = size.max(1).div_ceil(ALIGN) * ALIGN;

        let reusable = self
            .free_blocks
            .iter()
            .find(|&(_, &block)| block >= rounded)
            .map(|(&ptr, &block)| (ptr, block));
        if let Some((ptr, block)) = reusable {
            self.free_blocks.remove(&ptr);
            if block > rounded {
                self.free_blocks.insert(ptr + rounded as Ptr, block - rounded);
            }
            self.bytes[ptr as usize..ptr as usize + rounded].fill(0);
            self.live.insert(ptr, rounded);
            return Ok(ptr);
        }

        let new_top = self.top + rounded;
        if new_top > self.limit || new_top > Ptr::MAX as usize {
            return Err(BindingError::OutOfMemory { requested: size });
        }
        if new_top > self.bytes.len() {
            let pages = new_top.div_ceil(PAGE_SIZE);
            let grown = (pages * PAGE_SIZE).min(self.limit);
            tracing::trace!(from = self.bytes.len(), to = grown, "linear memory grown");
            self.bytes.resize(grown, 0);
        }
        let ptr = self.top as Ptr;
        self.top = new_top;
        self.live.insert(ptr, rounded);
        Ok(ptr)
    }

    pub fn free(&mut self, ptr: Ptr) {
        if ptr == 0 {
            return;
        }
        let Some(size) = self.live.remove(&ptr) else {
            tracing::warn!(ptr, "free of an address that is not allocated");
            return;
        };
        let mut start = ptr;
        let mut len = size;

        if let Some((&prev, &prev_len)) = self.free_blocks.range(..ptr).next_back() {
            if prev as usize + prev_len == ptr as usize {
                self.free_blocks.remove(&prev);
                start = prev;
                len += prev_len;
            }
        }
        let end = start as usize + len;
        if let Some(next_len) = self.free_blocks.remove(&(end as Ptr)) {
            len += next_len;
        }

        if start as usize + len == self.top {
            self.top = start as usize;
        } else {
            self.free_blocks.insert(start, len);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_is_never_returned() {
        let mut heap = LinearMemory::new(PAGE_SIZE);
        let ptr = heap.malloc(0).unwrap();
        assert_ne!(ptr, 0);
        assert_eq!(ptr as usize % ALIGN, 0);
    }

    #[test]
    fn freed_blocks_are_reused() {
        let mut heap = LinearMemory::new(4 * PAGE_SIZE);
        let a = heap.malloc(32).unwrap();
        let _b = heap.malloc(32).unwrap();
        heap.free(a);
        let c = heap.malloc(16).unwrap();
        assert_eq!(c, a);
        assert_eq!(heap.live_allocations(), 2);
    }

    #[test]
    fn freeing_the_top_block_shrinks_the_break() {
        let mut heap = LinearMemory::new(4 * PAGE_SIZE);
        let a = heap.malloc(24).unwrap();
        let b = heap.malloc(24).unwrap();
        heap.free(b);
        heap.free(a);
        assert_eq!(heap.live_allocations(), 0);
        assert_eq!(heap.malloc(8).unwrap(), a);
    }

    #[test]
    fn grows_across_pages_until_the_limit() {
        let mut heap = LinearMemory::new(2 * PAGE_SIZE);
        heap.malloc(PAGE_SIZE).unwrap();
        assert_eq!(heap.bytes().len(), 2 * PAGE_SIZE);
        let err = heap.malloc(PAGE_SIZE).unwrap_err();
        assert_eq!(err, BindingError::OutOfMemory { requested: PAGE_SIZE });
    }

    #[test]
    fn unknown_free_is_ignored() {
        let mut heap = LinearMemory::new(PAGE_SIZE);
        let a = heap.malloc(8).unwrap();
        heap.free(a + 1024);
        assert_eq!(heap.live_allocations(), 1);
    }
}
