//! Region map: an ordered, point-in-time snapshot of a target's virtual
//! memory regions.

use crate::error::Result;
use crate::port::MemoryPort;

/// A single contiguous run of target virtual addresses with uniform
/// permissions, as reported by the OS memory port.
#[derive(Debug, Clone)]
pub struct MemoryRegion {
    pub start: usize,
    pub size: usize,
    pub readable: bool,
    pub writable: bool,
    pub executable: bool,
}

impl MemoryRegion {
    pub fn end(&self) -> usize {
        self.start.saturating_add(self.size)
    }

    pub fn contains(&self, addr: usize) -> bool {
        addr >= self.start && addr < self.end()
    }

    /// Human label derived from permissions, matching spec.md's
    /// `rwx`/`reserved`/`no-access` vocabulary.
    pub fn label(&self) -> String {
        if !self.readable && !self.writable && !self.executable {
            return "no-access".to_string();
        }
        let mut s = String::with_capacity(3);
        s.push(if self.readable { 'r' } else { '-' });
        s.push(if self.writable { 'w' } else { '-' });
        s.push(if self.executable { 'x' } else { '-' });
        s
    }

    /// A region is only a scan candidate when it is readable; `writable`
    /// and `executable` are carried for display only.
    pub fn is_scan_candidate(&self) -> bool {
        self.readable && self.size > 0
    }
}

/// Ordered snapshot of a target's memory regions, captured on attach or
/// refresh. Advisory: regions may vanish or change permission between
/// capture and use, which the scan engine tolerates (see `scanner`).
#[derive(Debug, Clone, Default)]
pub struct RegionMap {
    regions: Vec<MemoryRegion>,
}

impl RegionMap {
    pub fn empty() -> Self {
        Self { regions: Vec::new() }
    }

    /// Rebuild the map wholesale from the port's current region list.
    pub fn refresh(&mut self, port: &dyn MemoryPort) -> Result<()> {
        let mut regions = port.regions()?;
        regions.sort_by_key(|r| r.start);
        log::debug!("region map refreshed: {} region(s)", regions.len());
        self.regions = regions;
        Ok(())
    }

    pub fn regions(&self) -> &[MemoryRegion] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.regions.iter().map(|r| r.size as u64).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(start: usize, size: usize, r: bool, w: bool, x: bool) -> MemoryRegion {
        MemoryRegion {
            start,
            size,
            readable: r,
            writable: w,
            executable: x,
        }
    }

    #[test]
    fn label_reflects_permissions() {
        assert_eq!(region(0, 10, true, false, false).label(), "r--");
        assert_eq!(region(0, 10, true, true, true).label(), "rwx");
        assert_eq!(region(0, 10, false, false, false).label(), "no-access");
    }

    #[test]
    fn zero_sized_region_is_not_a_candidate() {
        assert!(!region(0, 0, true, true, true).is_scan_candidate());
    }

    #[test]
    fn unreadable_region_is_not_a_candidate() {
        assert!(!region(0, 10, false, true, true).is_scan_candidate());
    }

    #[test]
    fn contains_checks_half_open_range() {
        let r = region(0x1000, 0x10, true, true, false);
        assert!(r.contains(0x1000));
        assert!(r.contains(0x100f));
        assert!(!r.contains(0x1010));
    }
}
