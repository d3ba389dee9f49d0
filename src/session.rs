//! Session façade: the lifecycle wrapper the REPL drives. Everything
//! that needs a live target goes through an `Attached` session; nothing
//! outside this module reaches into `port`/`regions`/`engine` directly.

use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::port::{self, MemoryPort};
use crate::region::RegionMap;
use crate::scanner::{ScanEngine, ScanSummary};
use crate::value::{CompareOp, ValueType};
use crate::{address, persist};

pub enum Session {
    Detached,
    Attached {
        pid: u32,
        name: String,
        port: Box<dyn MemoryPort>,
        regions: RegionMap,
        engine: ScanEngine,
    },
}

impl Default for Session {
    fn default() -> Self {
        Session::Detached
    }
}

impl Session {
    pub fn new() -> Self {
        Session::Detached
    }

    pub fn is_attached(&self) -> bool {
        matches!(self, Session::Attached { .. })
    }

    pub fn pid(&self) -> Option<u32> {
        match self {
            Session::Attached { pid, .. } => Some(*pid),
            Session::Detached => None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Session::Attached { name, .. } => Some(name.as_str()),
            Session::Detached => None,
        }
    }

    pub fn regions(&self) -> Result<&RegionMap> {
        match self {
            Session::Attached { regions, .. } => Ok(regions),
            Session::Detached => Err(Error::NotAttached),
        }
    }

    pub fn engine(&self) -> Result<&ScanEngine> {
        match self {
            Session::Attached { engine, .. } => Ok(engine),
            Session::Detached => Err(Error::NotAttached),
        }
    }

    pub fn engine_mut(&mut self) -> Result<&mut ScanEngine> {
        match self {
            Session::Attached { engine, .. } => Ok(engine),
            Session::Detached => Err(Error::NotAttached),
        }
    }

    pub fn port(&self) -> Result<&dyn MemoryPort> {
        match self {
            Session::Attached { port, .. } => Ok(port.as_ref()),
            Session::Detached => Err(Error::NotAttached),
        }
    }

    /// Acquire a control handle for `pid` and make it the active session.
    pub fn attach(&mut self, pid: u32, name: String) -> Result<()> {
        if let Session::Attached { pid: existing, .. } = self {
            return Err(Error::AlreadyAttached(*existing));
        }
        let port = port::open(pid)?;
        let mut regions = RegionMap::empty();
        regions.refresh(port.as_ref())?;
        log::info!("attached to pid {pid} ({name})");
        *self = Session::Attached {
            pid,
            name,
            port,
            regions,
            engine: ScanEngine::new(),
        };
        Ok(())
    }

    /// Attach with an already-constructed port, bypassing the OS lookup.
    /// Used by tests to attach a `FakePort`.
    pub fn attach_with_port(&mut self, pid: u32, name: String, port: Box<dyn MemoryPort>) -> Result<()> {
        if let Session::Attached { pid: existing, .. } = self {
            return Err(Error::AlreadyAttached(*existing));
        }
        let mut regions = RegionMap::empty();
        regions.refresh(port.as_ref())?;
        *self = Session::Attached {
            pid,
            name,
            port,
            regions,
            engine: ScanEngine::new(),
        };
        Ok(())
    }

    pub fn detach(&mut self) -> Result<()> {
        if !self.is_attached() {
            return Err(Error::NotAttached);
        }
        log::info!("detached from pid {}", self.pid().unwrap());
        *self = Session::Detached;
        Ok(())
    }

    pub fn refresh_regions(&mut self) -> Result<()> {
        match self {
            Session::Attached { port, regions, .. } => regions.refresh(port.as_ref()),
            Session::Detached => Err(Error::NotAttached),
        }
    }

    pub fn first_scan(
        &mut self,
        ty: ValueType,
        op: CompareOp,
        literal: &str,
    ) -> Result<ScanSummary> {
        match self {
            Session::Attached {
                port,
                regions,
                engine,
                ..
            } => {
                regions.refresh(port.as_ref())?;
                engine.first_scan(regions, port.as_ref(), ty, op, literal)
            }
            Session::Detached => Err(Error::NotAttached),
        }
    }

    pub fn next_scan(
        &mut self,
        ty: ValueType,
        op: CompareOp,
        literal: Option<&str>,
    ) -> Result<ScanSummary> {
        match self {
            Session::Attached { port, engine, .. } => engine.next_scan(port.as_ref(), ty, op, literal),
            Session::Detached => Err(Error::NotAttached),
        }
    }

    pub fn read_value(&self, addr: usize, ty: ValueType, len: Option<usize>) -> Result<String> {
        match self {
            Session::Attached { port, .. } => address::read(port.as_ref(), addr, ty, len),
            Session::Detached => Err(Error::NotAttached),
        }
    }

    pub fn write_value(&self, addr: usize, ty: ValueType, literal: &str) -> Result<()> {
        match self {
            Session::Attached { port, .. } => address::write(port.as_ref(), addr, ty, literal),
            Session::Detached => Err(Error::NotAttached),
        }
    }

    pub fn watch_value<F>(
        &self,
        addr: usize,
        ty: ValueType,
        len: Option<usize>,
        interval: Duration,
        cancel: &AtomicBool,
        on_tick: F,
    ) -> Result<()>
    where
        F: FnMut(&str, &str),
    {
        match self {
            Session::Attached { port, .. } => {
                address::watch(port.as_ref(), addr, ty, len, interval, cancel, on_tick)
            }
            Session::Detached => Err(Error::NotAttached),
        }
    }

    pub fn save_results(&self, path: &Path) -> Result<()> {
        match self {
            Session::Attached { engine, .. } => {
                let ty = engine.value_type().ok_or(Error::NoPriorResults)?;
                persist::save(path, ty, engine.results())
            }
            Session::Detached => Err(Error::NotAttached),
        }
    }

    pub fn load_results(&mut self, path: &Path) -> Result<usize> {
        let (ty, candidates) = persist::load(path)?;
        match self {
            Session::Attached { engine, .. } => {
                let count = candidates.len();
                engine.load(ty, candidates);
                Ok(count)
            }
            Session::Detached => Err(Error::NotAttached),
        }
    }
}
