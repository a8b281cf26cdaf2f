//! GPIB (and any other VISA-reachable) link, built on `visa-rs`.
//!
//! Needs a VISA implementation such as NI-VISA installed on the host, hence
//! the `gpib` feature gate.

use std::ffi::CString;
use std::io::{Read, Write};
use std::time::Duration;

use visa_rs::prelude::*;

use crate::error::ScopeError;
use crate::transport::{RxBuffer, Transport, TransportSettings};

const READ_CHUNK: usize = 4096;
const OPEN_TIMEOUT: Duration = Duration::from_secs(1);

pub struct VisaTransport {
    instr: Option<Instrument>,
    resource: String,
    terminator: Vec<u8>,
    timeout: Duration,
    rx: RxBuffer,
}

impl std::fmt::Debug for VisaTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisaTransport")
            .field("resource", &self.resource)
            .field("open", &self.instr.is_some())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn resource_id(resource: &str) -> Result<ResID, ScopeError> {
    CString::new(resource)
        .map(Into::into)
        .map_err(|_| ScopeError::invalid("VISA resource", resource, "a string without NUL bytes"))
}

fn apply_timeout(instr: &Instrument, timeout: Duration) -> Result<(), ScopeError> {
    let millis = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX);
    let attr = visa_rs::attribute::AttrTmoValue::new_checked(millis)
        .ok_or_else(|| ScopeError::invalid("timeout", format!("{timeout:?}"), "a VISA timeout"))?;
    instr.set_attr(attr)?;
    Ok(())
}

impl VisaTransport {
    /// Open `resource` through the default VISA resource manager and clear
    /// the instrument's status.
    pub fn open(resource: &str, settings: &TransportSettings) -> Result<Self, ScopeError> {
        settings.validate()?;

        let connection_failed = |e: visa_rs::Error| ScopeError::ConnectionFailed {
            address: resource.to_string(),
            reason: e.to_string(),
        };

        log::debug!("Opening VISA resource {}", resource);
        let rm = DefaultRM::new().map_err(connection_failed)?;
        let instr = rm
            .open(&resource_id(resource)?, AccessMode::NO_LOCK, OPEN_TIMEOUT)
            .map_err(connection_failed)?;
        apply_timeout(&instr, settings.timeout)?;

        Ok(Self {
            instr: Some(instr),
            resource: resource.to_string(),
            terminator: settings.terminator.clone(),
            timeout: settings.timeout,
            rx: RxBuffer::default(),
        })
    }

    /// Addresses of every instrument the VISA library can see.
    pub fn list_resources() -> Result<Vec<String>, ScopeError> {
        let rm = DefaultRM::new()?;
        let mut list = rm.find_res_list(&resource_id("?*INSTR")?)?;

        let mut resources = Vec::new();
        while let Some(resource) = list.find_next()? {
            resources.push(resource.to_string());
        }
        Ok(resources)
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }
}

/// One blocking driver read; a driver-side timeout counts as an empty poll.
fn read_chunk(instr: &mut Instrument, buf: &mut Vec<u8>) -> Result<usize, ScopeError> {
    let mut chunk = [0u8; READ_CHUNK];
    match instr.read(&mut chunk) {
        Ok(n) => {
            buf.extend_from_slice(&chunk[..n]);
            Ok(n)
        }
        Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
        Err(e) => Err(e.into()),
    }
}

impl Transport for VisaTransport {
    fn write_line(&mut self, text: &str) -> Result<(), ScopeError> {
        let mut line = Vec::with_capacity(text.len() + self.terminator.len());
        line.extend_from_slice(text.as_bytes());
        line.extend_from_slice(&self.terminator);

        let instr = self.instr.as_mut().ok_or(ScopeError::NotConnected)?;
        instr.write_all(&line)?;
        instr.flush()?;
        Ok(())
    }

    fn read_exact(&mut self, n: usize) -> Result<Vec<u8>, ScopeError> {
        let timeout = self.timeout;
        let instr = self.instr.as_mut().ok_or(ScopeError::NotConnected)?;
        self.rx.read_exact(n, timeout, |buf| read_chunk(instr, buf))
    }

    fn read_until_terminator(&mut self, min_bytes: usize) -> Result<Vec<u8>, ScopeError> {
        let timeout = self.timeout;
        let instr = self.instr.as_mut().ok_or(ScopeError::NotConnected)?;
        self.rx
            .read_until(&self.terminator, min_bytes, timeout, |buf| read_chunk(instr, buf))
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), ScopeError> {
        if let Some(instr) = &self.instr {
            apply_timeout(instr, timeout)?;
        }
        self.timeout = timeout;
        Ok(())
    }

    fn terminator(&self) -> &[u8] {
        &self.terminator
    }

    fn discard_input(&mut self) -> Result<(), ScopeError> {
        self.rx.clear();
        let instr = self.instr.as_ref().ok_or(ScopeError::NotConnected)?;
        instr.clear()?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), ScopeError> {
        if self.instr.take().is_some() {
            log::debug!("Closed VISA resource {}", self.resource);
        }
        self.rx.clear();
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.instr.is_some()
    }
}
