//! OS Memory Port: the sole boundary against the host's process-memory
//! facility. Everything above this module talks to a `dyn MemoryPort`,
//! never to mach2/libc directly, the same way the original scanner
//! confined `winapi`/libc calls to its per-OS `process`/`memmap` modules.

use crate::error::Result;
use crate::region::MemoryRegion;

/// A control handle to a target process's address space.
///
/// Implementations must release the underlying OS handle on `Drop`
/// (the macOS backend deallocates its Mach send right), so callers
/// never need to remember to close anything explicitly.
pub trait MemoryPort: Send {
    /// Enumerate the virtual address space in ascending address order.
    /// Stops at the first enumeration error and returns what was
    /// gathered so far.
    fn regions(&self) -> Result<Vec<MemoryRegion>>;

    /// Bulk read into a caller-provided buffer. Must fill the buffer
    /// exactly or fail; a torn/short read is a failure, not a partial
    /// success.
    fn read_into(&self, addr: usize, buf: &mut [u8]) -> Result<()>;

    /// Bulk read of exactly `len` bytes.
    fn read(&self, addr: usize, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_into(addr, &mut buf)?;
        Ok(buf)
    }

    /// Bulk write.
    fn write(&self, addr: usize, bytes: &[u8]) -> Result<()>;
}

#[cfg(target_os = "macos")]
mod imp {
    pub use crate::macos::port::MacPort as ConcretePort;
}

#[cfg(not(target_os = "macos"))]
compile_error!("memscan's OS memory port is implemented for macOS only");

/// Acquire a control handle to `pid`.
pub fn open(pid: u32) -> Result<Box<dyn MemoryPort>> {
    Ok(Box::new(imp::ConcretePort::open(pid)?))
}
