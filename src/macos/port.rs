//! `MacPort`: the Mach-based `MemoryPort` for macOS targets.
//!
//! Region enumeration uses `mach_vm_region` with the
//! `VM_REGION_BASIC_INFO_64` flavor, one call per region, walking
//! forward from the address the previous call returned. Reads and
//! writes go through `mach_vm_read_overwrite`/`mach_vm_write` directly
//! against the target's task port; there is no local buffering beyond
//! what the caller supplies.

use std::mem::MaybeUninit;

use libc::pid_t;
use mach2::kern_return::{kern_return_t, KERN_SUCCESS};
use mach2::mach_port::mach_port_deallocate;
use mach2::message::mach_msg_type_number_t;
use mach2::port::{mach_port_t, MACH_PORT_NULL};
use mach2::traps::mach_task_self;
use mach2::vm::{mach_vm_read_overwrite, mach_vm_region, mach_vm_write};
use mach2::vm_prot::{VM_PROT_EXECUTE, VM_PROT_READ, VM_PROT_WRITE};
use mach2::vm_region::{vm_region_basic_info_64, vm_region_info_t, VM_REGION_BASIC_INFO_64};
use mach2::vm_types::{mach_vm_address_t, mach_vm_size_t, vm_offset_t};

use crate::error::{Error, Result};
use crate::port::MemoryPort;
use crate::region::MemoryRegion;

// mach2 does not expose `task_for_pid`; the kernel trap is declared here
// the same way callers outside the crate declare Mach functions a given
// binding crate hasn't wrapped.
unsafe extern "C" {
    fn task_for_pid(target_tport: mach_port_t, pid: pid_t, t: *mut mach_port_t) -> kern_return_t;
}

pub struct MacPort {
    task: mach_port_t,
    pid: u32,
}

impl MacPort {
    pub fn open(pid: u32) -> Result<Self> {
        let mut task: mach_port_t = MACH_PORT_NULL;
        let kr = unsafe { task_for_pid(mach_task_self(), pid as pid_t, &mut task) };
        if kr != KERN_SUCCESS {
            // task_for_pid fails identically for "no such pid" and "pid
            // exists but we lack entitlement"; disambiguate with a
            // zero-signal kill, which never actually signals anything.
            let exists = unsafe { libc::kill(pid as pid_t, 0) } == 0
                || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM);
            return Err(if exists {
                Error::PermissionDenied { pid }
            } else {
                Error::NotFound { pid }
            });
        }
        log::debug!("opened task port for pid {pid}");
        Ok(Self { task, pid })
    }
}

impl Drop for MacPort {
    fn drop(&mut self) {
        log::debug!("closing task port for pid {}", self.pid);
        unsafe {
            mach_port_deallocate(mach_task_self(), self.task);
        }
    }
}

impl MemoryPort for MacPort {
    fn regions(&self) -> Result<Vec<MemoryRegion>> {
        let mut out = Vec::new();
        let mut address: mach_vm_address_t = 0;

        loop {
            let mut size: mach_vm_size_t = 0;
            let mut info = MaybeUninit::<vm_region_basic_info_64>::uninit();
            let mut info_count = (std::mem::size_of::<vm_region_basic_info_64>()
                / std::mem::size_of::<i32>()) as mach_msg_type_number_t;
            let mut object_name: mach_port_t = MACH_PORT_NULL;

            let kr = unsafe {
                mach_vm_region(
                    self.task,
                    &mut address,
                    &mut size,
                    VM_REGION_BASIC_INFO_64,
                    info.as_mut_ptr() as vm_region_info_t,
                    &mut info_count,
                    &mut object_name,
                )
            };

            // No more mappings above `address`; enumeration is done, not
            // failed.
            if kr != KERN_SUCCESS {
                break;
            }

            let info = unsafe { info.assume_init() };
            out.push(MemoryRegion {
                start: address as usize,
                size: size as usize,
                readable: info.protection & VM_PROT_READ != 0,
                writable: info.protection & VM_PROT_WRITE != 0,
                executable: info.protection & VM_PROT_EXECUTE != 0,
            });

            let next = address.checked_add(size);
            match next {
                Some(n) if n > address => address = n,
                _ => break,
            }
        }

        Ok(out)
    }

    fn read_into(&self, addr: usize, buf: &mut [u8]) -> Result<()> {
        let mut out_size: mach_vm_size_t = 0;
        let kr = unsafe {
            mach_vm_read_overwrite(
                self.task,
                addr as mach_vm_address_t,
                buf.len() as mach_vm_size_t,
                buf.as_mut_ptr() as mach_vm_address_t,
                &mut out_size,
            )
        };
        if kr != KERN_SUCCESS {
            return Err(Error::Unreadable {
                addr,
                len: buf.len(),
            });
        }
        if out_size as usize != buf.len() {
            return Err(Error::SizeMismatch {
                addr,
                expected: buf.len(),
                got: out_size as usize,
            });
        }
        Ok(())
    }

    fn write(&self, addr: usize, bytes: &[u8]) -> Result<()> {
        let kr = unsafe {
            mach_vm_write(
                self.task,
                addr as mach_vm_address_t,
                bytes.as_ptr() as vm_offset_t,
                bytes.len() as mach_msg_type_number_t,
            )
        };
        if kr != KERN_SUCCESS {
            return Err(Error::Unwritable {
                addr,
                len: bytes.len(),
            });
        }
        Ok(())
    }
}
