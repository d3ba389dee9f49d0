//! Single-address operations: read, write, and watch (polling read with
//! cooperative cancellation).

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::port::MemoryPort;
use crate::value::ValueType;

/// Width to read for `ty` at a single address. Fixed types carry their
/// own width; `String` needs an explicit length since there is no
/// terminator convention to rely on in an arbitrary target.
fn resolve_width(ty: ValueType, len: Option<usize>) -> Result<usize> {
    match ty.width() {
        Some(w) => Ok(w),
        None => len.ok_or_else(|| {
            Error::MissingArgument("length (required for string reads)".to_string())
        }),
    }
}

pub fn read(port: &dyn MemoryPort, addr: usize, ty: ValueType, len: Option<usize>) -> Result<String> {
    let width = resolve_width(ty, len)?;
    let bytes = port.read(addr, width)?;
    Ok(ty.render(&bytes))
}

pub fn write(port: &dyn MemoryPort, addr: usize, ty: ValueType, literal: &str) -> Result<()> {
    let bytes = ty.parse(literal)?;
    port.write(addr, &bytes)
}

/// Re-reads `addr` and, if the bytes differ from `last`, renders both the
/// old and new values and updates `last` to the fresh bytes. Returns
/// `None` when nothing changed.
fn poll_once(
    port: &dyn MemoryPort,
    addr: usize,
    width: usize,
    ty: ValueType,
    last: &mut Vec<u8>,
) -> Result<Option<(String, String)>> {
    let fresh = port.read(addr, width)?;
    if fresh == *last {
        return Ok(None);
    }
    let old = ty.render(last);
    let new = ty.render(&fresh);
    *last = fresh;
    Ok(Some((old, new)))
}

/// Poll `addr` every `interval` until `cancel` is set, establishing a
/// baseline on the first read and calling `on_tick(old, new)` only when
/// the bytes change from the last printed value. A read failure ends the
/// watch rather than looping forever against a dead address.
pub fn watch<F>(
    port: &dyn MemoryPort,
    addr: usize,
    ty: ValueType,
    len: Option<usize>,
    interval: Duration,
    cancel: &AtomicBool,
    mut on_tick: F,
) -> Result<()>
where
    F: FnMut(&str, &str),
{
    let width = resolve_width(ty, len)?;
    let mut last = port.read(addr, width)?;
    while !cancel.load(Ordering::SeqCst) {
        std::thread::sleep(interval);
        if cancel.load(Ordering::SeqCst) {
            break;
        }
        if let Some((old, new)) = poll_once(port, addr, width, ty, &mut last)? {
            on_tick(&old, &new);
        }
    }
    Ok(())
}
