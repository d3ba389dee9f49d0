//! Save/load for a scan result set.
//!
//! One line per candidate: `id,address,type,valuehex,rendered`, address
//! as a lowercase `0x`-prefixed hex literal, type as the `ValueType`
//! ordinal, valuehex as lowercase hex of the raw bytes, rendered as the
//! human-readable value at the time of saving (informational only —
//! loading never trusts it, only `valuehex`).

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::scanner::ScanCandidate;
use crate::value::ValueType;

const HEADER: &str = "# Format: ID,Address,Type,ValueHex,Rendered";

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn from_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}

pub fn save(path: &Path, ty: ValueType, candidates: &[ScanCandidate]) -> Result<()> {
    let mut file = File::create(path)?;
    writeln!(file, "{HEADER}")?;
    for (id, c) in candidates.iter().enumerate() {
        writeln!(
            file,
            "{id},0x{:x},{},{},{}",
            c.address,
            ty.ordinal(),
            to_hex(&c.bytes),
            c.rendered,
        )?;
    }
    Ok(())
}

pub fn load(path: &Path) -> Result<(ValueType, Vec<ScanCandidate>)> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut candidates = Vec::new();
    let mut value_type: Option<ValueType> = None;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line_no == 0 || line.starts_with('#') || line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.splitn(5, ',').collect();
        if fields.len() < 4 {
            return Err(Error::MalformedSaveFile {
                line: line_no + 1,
                reason: "expected at least 4 comma-separated fields".to_string(),
            });
        }
        let address = fields[1].trim_start_matches("0x");
        let address = usize::from_str_radix(address, 16).map_err(|_| Error::MalformedSaveFile {
            line: line_no + 1,
            reason: format!("bad address '{}'", fields[1]),
        })?;
        let ordinal: u8 = fields[2].parse().map_err(|_| Error::MalformedSaveFile {
            line: line_no + 1,
            reason: format!("bad type ordinal '{}'", fields[2]),
        })?;
        let ty = ValueType::from_ordinal(ordinal).map_err(|_| Error::MalformedSaveFile {
            line: line_no + 1,
            reason: format!("unknown type ordinal '{ordinal}'"),
        })?;
        if let Some(expected) = value_type {
            if expected != ty {
                return Err(Error::MalformedSaveFile {
                    line: line_no + 1,
                    reason: "mixed types within one save file".to_string(),
                });
            }
        } else {
            value_type = Some(ty);
        }
        let bytes = from_hex(fields[3]).ok_or_else(|| Error::MalformedSaveFile {
            line: line_no + 1,
            reason: format!("bad value hex '{}'", fields[3]),
        })?;
        let rendered = ty.render(&bytes);
        candidates.push(ScanCandidate {
            address,
            ty,
            bytes,
            rendered,
        });
    }

    let value_type = value_type.ok_or_else(|| Error::MalformedSaveFile {
        line: 0,
        reason: "file contains no result rows".to_string(),
    })?;
    Ok((value_type, candidates))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env::temp_dir;

    fn candidate(address: usize, ty: ValueType, bytes: Vec<u8>) -> ScanCandidate {
        let rendered = ty.render(&bytes);
        ScanCandidate {
            address,
            ty,
            bytes,
            rendered,
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let path = temp_dir().join(format!("memscan_persist_test_{}.csv", std::process::id()));
        let candidates = vec![
            candidate(0x1000, ValueType::Int, 42i32.to_ne_bytes().to_vec()),
            candidate(0x2000, ValueType::Int, 7i32.to_ne_bytes().to_vec()),
        ];
        save(&path, ValueType::Int, &candidates).unwrap();
        let (ty, loaded) = load(&path).unwrap();
        assert_eq!(ty, ValueType::Int);
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].address, 0x1000);
        assert_eq!(loaded[1].address, 0x2000);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn load_rejects_malformed_file() {
        let path = temp_dir().join(format!("memscan_persist_bad_{}.csv", std::process::id()));
        std::fs::write(&path, "# Format: ID,Address,Type,ValueHex,Rendered\nnotanumber\n").unwrap();
        assert!(load(&path).is_err());
        std::fs::remove_file(&path).ok();
    }
}
