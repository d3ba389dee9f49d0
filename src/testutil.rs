//! `FakePort`: an in-memory `MemoryPort` so the rest of the crate can be
//! exercised without a real macOS target process or task-port
//! entitlements.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::port::MemoryPort;
use crate::region::MemoryRegion;

#[derive(Default)]
pub struct FakePort {
    regions: RefCell<Vec<MemoryRegion>>,
    memory: RefCell<HashMap<usize, u8>>,
}

impl FakePort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_region(&self, region: MemoryRegion) {
        self.regions.borrow_mut().push(region);
    }

    pub fn unmap_region(&self, start: usize) {
        self.regions.borrow_mut().retain(|r| r.start != start);
    }

    fn covered(&self, addr: usize, len: usize, need_write: bool) -> bool {
        self.regions.borrow().iter().any(|r| {
            r.start <= addr
                && addr.saturating_add(len) <= r.end()
                && r.readable
                && (!need_write || r.writable)
        })
    }
}

impl MemoryPort for FakePort {
    fn regions(&self) -> Result<Vec<MemoryRegion>> {
        Ok(self.regions.borrow().clone())
    }

    fn read_into(&self, addr: usize, buf: &mut [u8]) -> Result<()> {
        if !self.covered(addr, buf.len(), false) {
            return Err(Error::Unreadable {
                addr,
                len: buf.len(),
            });
        }
        let mem = self.memory.borrow();
        for (i, slot) in buf.iter_mut().enumerate() {
            *slot = *mem.get(&(addr + i)).unwrap_or(&0);
        }
        Ok(())
    }

    fn write(&self, addr: usize, bytes: &[u8]) -> Result<()> {
        if !self.covered(addr, bytes.len(), true) {
            return Err(Error::Unwritable {
                addr,
                len: bytes.len(),
            });
        }
        let mut mem = self.memory.borrow_mut();
        for (i, b) in bytes.iter().enumerate() {
            mem.insert(addr + i, *b);
        }
        Ok(())
    }
}
