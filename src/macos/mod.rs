//! macOS-specific backend for the OS Memory Port.
//!
//! This is the sole place in the crate that touches Mach traps and VM
//! calls directly, mirroring the isolation the original scanner's
//! `linux`/`windows` modules gave their respective OS APIs.

#![cfg(target_os = "macos")]

pub mod port;
