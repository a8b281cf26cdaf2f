use serialport::SerialPort;
use std::io::{Read, Write};
use std::thread;
use std::time::Duration;

use crate::error::ScopeError;
use crate::transport::{RxBuffer, Transport, TransportSettings};

/// RS-232 / USB-CDC link.
///
/// The port has no way to signal that data arrived, so reads poll the
/// input-waiting counter every `poll_interval` until the idle timeout runs
/// out.
pub struct SerialTransport {
    serial: Option<Box<dyn SerialPort>>,
    port_name: String,
    terminator: Vec<u8>,
    timeout: Duration,
    poll_interval: Duration,
    rx: RxBuffer,
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("port_name", &self.port_name)
            .field("open", &self.serial.is_some())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl SerialTransport {
    /// Open `port` at `settings.baud_rate` and flush stale input.
    pub fn open(port: &str, settings: &TransportSettings) -> Result<Self, ScopeError> {
        settings.validate()?;

        log::debug!("Opening serial port {} at {} baud", port, settings.baud_rate);
        let serial = serialport::new(port, settings.baud_rate)
            .timeout(settings.poll_interval)
            .open()
            .map_err(|e| ScopeError::ConnectionFailed {
                address: port.to_string(),
                reason: e.to_string(),
            })?;

        let mut transport = Self {
            serial: Some(serial),
            port_name: port.to_string(),
            terminator: settings.terminator.clone(),
            timeout: settings.timeout,
            poll_interval: settings.poll_interval,
            rx: RxBuffer::default(),
        };
        transport.discard_input()?;
        Ok(transport)
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>, ScopeError> {
        self.serial.as_mut().ok_or(ScopeError::NotConnected)
    }
}

/// Move whatever the port holds into `buf`, or nap for one poll interval.
fn poll_port(
    serial: &mut dyn SerialPort,
    poll_interval: Duration,
    buf: &mut Vec<u8>,
) -> Result<usize, ScopeError> {
    let waiting = serial.bytes_to_read()? as usize;
    if waiting == 0 {
        thread::sleep(poll_interval);
        return Ok(0);
    }

    let start = buf.len();
    buf.resize(start + waiting, 0);
    match serial.read(&mut buf[start..]) {
        Ok(n) => {
            buf.truncate(start + n);
            Ok(n)
        }
        Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
            buf.truncate(start);
            Ok(0)
        }
        Err(e) => {
            buf.truncate(start);
            Err(e.into())
        }
    }
}

impl Transport for SerialTransport {
    fn write_line(&mut self, text: &str) -> Result<(), ScopeError> {
        let mut line = Vec::with_capacity(text.len() + self.terminator.len());
        line.extend_from_slice(text.as_bytes());
        line.extend_from_slice(&self.terminator);

        let port = self.port()?;
        port.write_all(&line)?;
        port.flush()?;
        Ok(())
    }

    fn read_exact(&mut self, n: usize) -> Result<Vec<u8>, ScopeError> {
        let poll_interval = self.poll_interval;
        let timeout = self.timeout;
        let serial = self.serial.as_mut().ok_or(ScopeError::NotConnected)?;
        self.rx
            .read_exact(n, timeout, |buf| poll_port(&mut **serial, poll_interval, buf))
    }

    fn read_until_terminator(&mut self, min_bytes: usize) -> Result<Vec<u8>, ScopeError> {
        let poll_interval = self.poll_interval;
        let timeout = self.timeout;
        let serial = self.serial.as_mut().ok_or(ScopeError::NotConnected)?;
        self.rx.read_until(&self.terminator, min_bytes, timeout, |buf| {
            poll_port(&mut **serial, poll_interval, buf)
        })
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), ScopeError> {
        self.timeout = timeout;
        Ok(())
    }

    fn terminator(&self) -> &[u8] {
        &self.terminator
    }

    fn discard_input(&mut self) -> Result<(), ScopeError> {
        self.rx.clear();
        self.port()?.clear(serialport::ClearBuffer::Input)?;
        Ok(())
    }

    fn may_send_stray_byte(&self) -> bool {
        true
    }

    fn close(&mut self) -> Result<(), ScopeError> {
        if self.serial.take().is_some() {
            log::debug!("Closed serial port {}", self.port_name);
        }
        self.rx.clear();
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.serial.is_some()
    }
}
