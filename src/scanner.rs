//! Scan engine: first-scan over the whole region map, next-scan over a
//! prior result set.
//!
//! Scanning is stride-1 (unaligned) and reads each region in fixed-size
//! chunks with a `width - 1` byte overlap between consecutive chunks so
//! a match straddling a chunk boundary is never missed.

use crate::error::{Error, Result};
use crate::port::MemoryPort;
use crate::region::RegionMap;
use crate::value::{CompareOp, ValueType};

/// Candidates above this count are dropped; scanning still completes and
/// returns the truncated count, it does not fail.
pub const MAX_CANDIDATES: usize = 10_000;

const CHUNK_SIZE: usize = 1 << 20;

/// A self-describing hit: carries its own type and rendered form so a
/// result set stays interpretable on its own, independent of `ScanEngine`.
#[derive(Debug, Clone)]
pub struct ScanCandidate {
    pub address: usize,
    pub ty: ValueType,
    pub bytes: Vec<u8>,
    pub rendered: String,
}

impl ScanCandidate {
    fn new(address: usize, ty: ValueType, bytes: Vec<u8>) -> Self {
        let rendered = ty.render(&bytes);
        Self {
            address,
            ty,
            bytes,
            rendered,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScanSummary {
    pub count: usize,
    pub truncated: bool,
}

/// Holds the current result set and the type it was scanned as.
#[derive(Default)]
pub struct ScanEngine {
    value_type: Option<ValueType>,
    current: Vec<ScanCandidate>,
}

impl ScanEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value_type(&self) -> Option<ValueType> {
        self.value_type
    }

    pub fn results(&self) -> &[ScanCandidate] {
        &self.current
    }

    pub fn clear(&mut self) {
        self.value_type = None;
        self.current.clear();
    }

    /// Replace the result set wholesale, e.g. after `load`.
    pub fn load(&mut self, ty: ValueType, candidates: Vec<ScanCandidate>) {
        self.value_type = Some(ty);
        self.current = candidates;
    }

    /// First scan: walk every readable region and keep every address at
    /// which `op` holds against `literal`.
    pub fn first_scan(
        &mut self,
        regions: &RegionMap,
        port: &dyn MemoryPort,
        ty: ValueType,
        op: CompareOp,
        literal: &str,
    ) -> Result<ScanSummary> {
        if op.ignores_pattern() {
            return Err(Error::MissingArgument(
                "a first scan needs a value; changed/unchanged require a prior scan".to_string(),
            ));
        }
        if matches!(op, CompareOp::Gt | CompareOp::Lt) && !ty.supports_ordering() {
            return Err(Error::UnsupportedOp { op, ty });
        }
        let pattern = ty.parse(literal)?;
        let width = ty.width().unwrap_or(pattern.len());

        let mut found = Vec::new();
        let mut truncated = false;
        let mut chunk_buf = vec![0u8; CHUNK_SIZE];

        'regions: for region in regions.regions().iter().filter(|r| r.is_scan_candidate()) {
            if region.size < width {
                continue;
            }
            let mut offset = 0usize;
            while offset < region.size {
                let remaining = region.size - offset;
                let take = remaining.min(CHUNK_SIZE);
                if take < width {
                    break;
                }
                let chunk_addr = region.start + offset;
                let buf = &mut chunk_buf[..take];
                if let Err(e) = port.read_into(chunk_addr, buf) {
                    // the region may have been unmapped since the map was
                    // captured; skip this chunk rather than abort the scan
                    log::debug!("scan chunk read at {chunk_addr:#x} ({take} bytes) failed: {e}");
                    offset += take;
                    continue;
                }
                for i in 0..=(buf.len() - width) {
                    let slice = &buf[i..i + width];
                    if ty.compare(slice, &pattern, op)? {
                        if found.len() >= MAX_CANDIDATES {
                            truncated = true;
                            break 'regions;
                        }
                        found.push(ScanCandidate::new(chunk_addr + i, ty, slice.to_vec()));
                    }
                }
                if take == remaining {
                    break;
                }
                offset += take - (width - 1);
            }
        }

        self.value_type = Some(ty);
        self.current = found;
        Ok(ScanSummary {
            count: self.current.len(),
            truncated,
        })
    }

    /// Next scan: re-read every address from the current result set and
    /// keep the ones where `op` still holds, against either a fresh
    /// literal or (for changed/unchanged) the candidate's previous bytes.
    pub fn next_scan(
        &mut self,
        port: &dyn MemoryPort,
        ty: ValueType,
        op: CompareOp,
        literal: Option<&str>,
    ) -> Result<ScanSummary> {
        let current_ty = self.value_type.ok_or(Error::NoPriorResults)?;
        if current_ty != ty {
            return Err(Error::TypeMismatch {
                expected: current_ty,
                found: ty,
            });
        }
        if self.current.is_empty() {
            return Err(Error::NoPriorResults);
        }
        if matches!(op, CompareOp::Gt | CompareOp::Lt) && !ty.supports_ordering() {
            return Err(Error::UnsupportedOp { op, ty });
        }

        let pattern = if op.ignores_pattern() {
            None
        } else {
            let lit = literal.ok_or_else(|| Error::MissingArgument("value".to_string()))?;
            Some(ty.parse(lit)?)
        };

        let width = ty.width().unwrap_or_else(|| self.current[0].bytes.len());
        let previous = std::mem::take(&mut self.current);
        let mut next = Vec::new();
        let mut truncated = false;
        let mut buf = vec![0u8; width];

        for candidate in previous {
            if let Err(e) = port.read_into(candidate.address, &mut buf) {
                // address no longer resolves; it silently drops out of
                // the result set rather than failing the whole scan
                log::warn!("next-scan read at {:#x} failed, dropping candidate: {e}", candidate.address);
                continue;
            }
            let keep = match &pattern {
                Some(p) => ty.compare(&buf, p, op)?,
                None => ty.compare(&buf, &candidate.bytes, op)?,
            };
            if keep {
                if next.len() >= MAX_CANDIDATES {
                    truncated = true;
                    break;
                }
                next.push(ScanCandidate::new(candidate.address, ty, buf.clone()));
            }
        }

        self.current = next;
        Ok(ScanSummary {
            count: self.current.len(),
            truncated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakePort;

    fn rw_region(start: usize, size: usize) -> crate::region::MemoryRegion {
        crate::region::MemoryRegion {
            start,
            size,
            readable: true,
            writable: true,
            executable: false,
        }
    }

    #[test]
    fn first_scan_finds_exact_matches() {
        let port = FakePort::new();
        port.add_region(rw_region(0x1000, 0x100));
        port.write(0x1000 + 8, &42i32.to_ne_bytes()).unwrap();
        port.write(0x1000 + 40, &42i32.to_ne_bytes()).unwrap();

        let mut map = RegionMap::empty();
        map.refresh(&port).unwrap();

        let mut engine = ScanEngine::new();
        let summary = engine
            .first_scan(&map, &port, ValueType::Int, CompareOp::Eq, "42")
            .unwrap();
        assert_eq!(summary.count, 2);
        assert!(!summary.truncated);
    }

    #[test]
    fn next_scan_rejects_type_mismatch() {
        let port = FakePort::new();
        port.add_region(rw_region(0x1000, 0x10));
        let mut map = RegionMap::empty();
        map.refresh(&port).unwrap();

        let mut engine = ScanEngine::new();
        engine
            .first_scan(&map, &port, ValueType::Int, CompareOp::Eq, "0")
            .unwrap();
        let err = engine
            .next_scan(&port, ValueType::Short, CompareOp::Eq, Some("0"))
            .unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }

    #[test]
    fn next_scan_unchanged_keeps_only_stable_addresses() {
        let port = FakePort::new();
        port.add_region(rw_region(0x2000, 0x20));
        port.write(0x2000, &7i32.to_ne_bytes()).unwrap();
        port.write(0x2010, &7i32.to_ne_bytes()).unwrap();

        let mut map = RegionMap::empty();
        map.refresh(&port).unwrap();

        let mut engine = ScanEngine::new();
        engine
            .first_scan(&map, &port, ValueType::Int, CompareOp::Eq, "7")
            .unwrap();
        assert_eq!(engine.results().len(), 2);

        port.write(0x2010, &9i32.to_ne_bytes()).unwrap();
        let summary = engine
            .next_scan(&port, ValueType::Int, CompareOp::Unchanged, None)
            .unwrap();
        assert_eq!(summary.count, 1);
        assert_eq!(engine.results()[0].address, 0x2000);
    }

    #[test]
    fn first_scan_rejects_greater_than_for_string() {
        let port = FakePort::new();
        port.add_region(rw_region(0x4000, 0x10));
        let mut map = RegionMap::empty();
        map.refresh(&port).unwrap();

        let mut engine = ScanEngine::new();
        let err = engine
            .first_scan(&map, &port, ValueType::String, CompareOp::Gt, "A")
            .unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedOp {
                op: CompareOp::Gt,
                ty: ValueType::String
            }
        ));
    }

    #[test]
    fn candidates_carry_type_and_rendered_form() {
        let port = FakePort::new();
        port.add_region(rw_region(0x5000, 0x10));
        port.write(0x5000, &42i32.to_ne_bytes()).unwrap();

        let mut map = RegionMap::empty();
        map.refresh(&port).unwrap();

        let mut engine = ScanEngine::new();
        engine
            .first_scan(&map, &port, ValueType::Int, CompareOp::Eq, "42")
            .unwrap();
        let c = &engine.results()[0];
        assert_eq!(c.ty, ValueType::Int);
        assert_eq!(c.rendered, "42");
    }

    #[test]
    fn dangling_address_drops_out_of_next_scan() {
        let port = FakePort::new();
        port.add_region(rw_region(0x3000, 0x10));
        port.write(0x3000, &5i32.to_ne_bytes()).unwrap();

        let mut map = RegionMap::empty();
        map.refresh(&port).unwrap();
        let mut engine = ScanEngine::new();
        engine
            .first_scan(&map, &port, ValueType::Int, CompareOp::Eq, "5")
            .unwrap();

        port.unmap_region(0x3000);
        let summary = engine
            .next_scan(&port, ValueType::Int, CompareOp::Unchanged, None)
            .unwrap();
        assert_eq!(summary.count, 0);
    }
}
