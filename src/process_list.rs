//! Process enumeration (`ps`) and name-based attach resolution, via the
//! BSD `sysctl(KERN_PROC_ALL)` table — the same table Activity Monitor
//! and `ps(1)` read, and the only process-listing facility macOS exposes
//! without walking launchd's job list.

use std::ffi::c_void;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
}

fn comm_to_string(comm: &[libc::c_char]) -> String {
    let bytes: Vec<u8> = comm
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// List every process visible to the caller's privilege level, sorted
/// by pid.
pub fn list() -> Result<Vec<ProcessInfo>> {
    let mut mib: [libc::c_int; 4] = [libc::CTL_KERN, libc::KERN_PROC, libc::KERN_PROC_ALL, 0];

    let mut size: libc::size_t = 0;
    let rc = unsafe {
        libc::sysctl(
            mib.as_mut_ptr(),
            4,
            std::ptr::null_mut(),
            &mut size,
            std::ptr::null_mut(),
            0,
        )
    };
    if rc != 0 {
        return Err(Error::EnumerationFailed);
    }

    let stride = std::mem::size_of::<libc::kinfo_proc>();
    let capacity = size / stride + 1;
    let mut buf: Vec<libc::kinfo_proc> = Vec::with_capacity(capacity);

    let rc = unsafe {
        libc::sysctl(
            mib.as_mut_ptr(),
            4,
            buf.as_mut_ptr() as *mut c_void,
            &mut size,
            std::ptr::null_mut(),
            0,
        )
    };
    if rc != 0 {
        return Err(Error::EnumerationFailed);
    }
    unsafe {
        buf.set_len(size / stride);
    }

    let mut out: Vec<ProcessInfo> = buf
        .iter()
        .filter(|p| p.kp_proc.p_pid > 0)
        .map(|p| ProcessInfo {
            pid: p.kp_proc.p_pid as u32,
            name: comm_to_string(&p.kp_proc.p_comm),
        })
        .collect();

    out.sort_by_key(|p| p.pid);
    Ok(out)
}

/// Resolve `needle` to a pid, matching a process name case-insensitively.
/// If several processes share the name the lowest pid wins, matching the
/// teacher's `find_process_by_name` "first match" convention.
pub fn resolve_name(needle: &str) -> Result<u32> {
    list()?
        .into_iter()
        .find(|p| p.name.eq_ignore_ascii_case(needle))
        .map(|p| p.pid)
        .ok_or_else(|| Error::NoSuchProcessName(needle.to_string()))
}
