use std::time::{Duration, Instant};

use crate::error::ScopeError;
use crate::line_protocol::find_terminator;

pub const DEFAULT_TERMINATOR: &[u8] = b"\r\n";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Byte-level link to one instrument.
///
/// Serial and VISA links look the same through this trait so the session
/// never needs to know which one it drives. Commands are strictly
/// half-duplex: after every write the caller drains the expected reply
/// before writing again.
///
/// Timeouts are idle timeouts: a read fails once no new byte has arrived
/// for [`Transport::timeout`].
pub trait Transport {
    /// Write `text` followed by the terminator. Never retried.
    fn write_line(&mut self, text: &str) -> Result<(), ScopeError>;

    /// Block until exactly `n` bytes were received.
    fn read_exact(&mut self, n: usize) -> Result<Vec<u8>, ScopeError>;

    /// Accumulate bytes until a terminator starting at or after `min_bytes`
    /// is found. The terminator is stripped from the returned bytes.
    ///
    /// Pass the declared payload length as `min_bytes` when the line carries
    /// binary data that may contain terminator bytes.
    fn read_until_terminator(&mut self, min_bytes: usize) -> Result<Vec<u8>, ScopeError>;

    fn timeout(&self) -> Duration;

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), ScopeError>;

    fn terminator(&self) -> &[u8];

    /// Drop everything received but not yet consumed.
    fn discard_input(&mut self) -> Result<(), ScopeError> {
        Ok(())
    }

    /// Whether curve replies on this link can carry one stray byte after
    /// the declared payload. Only serial links do.
    fn may_send_stray_byte(&self) -> bool {
        false
    }

    /// Release the link. Calling it again is a no-op.
    fn close(&mut self) -> Result<(), ScopeError>;

    fn is_open(&self) -> bool;

    /// Write `text`, then read one ASCII reply line.
    ///
    /// `timeout_override` applies to this exchange only; the previous
    /// timeout is restored whatever the outcome. Line ends inside the reply
    /// are normalized to `\n`.
    fn query(&mut self, text: &str, timeout_override: Option<Duration>) -> Result<String, ScopeError> {
        let bytes = match timeout_override {
            Some(timeout) => with_timeout(self, timeout, |t| {
                t.write_line(text)?;
                t.read_until_terminator(0)
            })?,
            None => {
                self.write_line(text)?;
                self.read_until_terminator(0)?
            }
        };

        let reply = String::from_utf8(bytes)
            .map_err(|_| ScopeError::protocol(format!("reply to '{text}' is not ASCII")))?;
        Ok(normalize_line_ends(&reply, self.terminator()))
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write_line(&mut self, text: &str) -> Result<(), ScopeError> {
        (**self).write_line(text)
    }

    fn read_exact(&mut self, n: usize) -> Result<Vec<u8>, ScopeError> {
        (**self).read_exact(n)
    }

    fn read_until_terminator(&mut self, min_bytes: usize) -> Result<Vec<u8>, ScopeError> {
        (**self).read_until_terminator(min_bytes)
    }

    fn timeout(&self) -> Duration {
        (**self).timeout()
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), ScopeError> {
        (**self).set_timeout(timeout)
    }

    fn terminator(&self) -> &[u8] {
        (**self).terminator()
    }

    fn discard_input(&mut self) -> Result<(), ScopeError> {
        (**self).discard_input()
    }

    fn may_send_stray_byte(&self) -> bool {
        (**self).may_send_stray_byte()
    }

    fn close(&mut self) -> Result<(), ScopeError> {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn query(&mut self, text: &str, timeout_override: Option<Duration>) -> Result<String, ScopeError> {
        (**self).query(text, timeout_override)
    }
}

/// Run `f` with the transport timeout set to `timeout`, then restore the
/// previous value even when `f` fails.
pub fn with_timeout<T, R, F>(transport: &mut T, timeout: Duration, f: F) -> Result<R, ScopeError>
where
    T: Transport + ?Sized,
    F: FnOnce(&mut T) -> Result<R, ScopeError>,
{
    let previous = transport.timeout();
    transport.set_timeout(timeout)?;
    let result = f(transport);
    let restored = transport.set_timeout(previous);
    match (result, restored) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) | (Err(e), _) => Err(e),
    }
}

fn normalize_line_ends(reply: &str, terminator: &[u8]) -> String {
    match std::str::from_utf8(terminator) {
        Ok(term) if !term.is_empty() && term != "\n" => reply.replace(term, "\n"),
        _ => reply.to_string(),
    }
}

/// Link parameters shared by every transport kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportSettings {
    pub timeout: Duration,
    pub terminator: Vec<u8>,
    /// Only used by serial links.
    pub baud_rate: u32,
    /// Only used by serial links, which have to poll for input.
    pub poll_interval: Duration,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            terminator: DEFAULT_TERMINATOR.to_vec(),
            baud_rate: crate::address::DEFAULT_BAUD_RATE,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl TransportSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_terminator(mut self, terminator: &[u8]) -> Self {
        self.terminator = terminator.to_vec();
        self
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn validate(&self) -> Result<(), ScopeError> {
        if self.terminator.is_empty() {
            return Err(ScopeError::invalid(
                "terminator",
                "",
                "a non-empty byte sequence",
            ));
        }
        if self.baud_rate == 0 {
            return Err(ScopeError::invalid("baud rate", self.baud_rate, "a positive baud rate"));
        }
        Ok(())
    }
}

/// Bytes received from a link and not yet handed out.
///
/// Both read primitives are built on a `fill` callback that appends whatever
/// the link has available and returns how many bytes it added (0 when
/// nothing arrived during that poll). A read fails with
/// [`ScopeError::Timeout`] once `idle_timeout` passes without progress,
/// measured on the monotonic clock.
#[derive(Debug, Default)]
pub(crate) struct RxBuffer {
    pending: Vec<u8>,
}

impl RxBuffer {
    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn clear(&mut self) {
        self.pending.clear();
    }

    pub(crate) fn read_exact<F>(
        &mut self,
        n: usize,
        idle_timeout: Duration,
        mut fill: F,
    ) -> Result<Vec<u8>, ScopeError>
    where
        F: FnMut(&mut Vec<u8>) -> Result<usize, ScopeError>,
    {
        let mut last_progress = Instant::now();
        while self.pending.len() < n {
            if fill(&mut self.pending)? > 0 {
                last_progress = Instant::now();
            } else if last_progress.elapsed() >= idle_timeout {
                return Err(ScopeError::Timeout {
                    timeout: idle_timeout,
                    received: self.pending.len(),
                });
            }
        }
        Ok(self.pending.drain(..n).collect())
    }

    pub(crate) fn read_until<F>(
        &mut self,
        terminator: &[u8],
        min_bytes: usize,
        idle_timeout: Duration,
        mut fill: F,
    ) -> Result<Vec<u8>, ScopeError>
    where
        F: FnMut(&mut Vec<u8>) -> Result<usize, ScopeError>,
    {
        let mut last_progress = Instant::now();
        let mut scan_from = min_bytes;
        loop {
            if let Some(pos) = find_terminator(&self.pending, terminator, scan_from) {
                let line = self.pending[..pos].to_vec();
                self.pending.drain(..pos + terminator.len());
                return Ok(line);
            }
            // A terminator may straddle the old end of the buffer.
            scan_from = min_bytes.max(
                self.pending
                    .len()
                    .saturating_sub(terminator.len().saturating_sub(1)),
            );

            if fill(&mut self.pending)? > 0 {
                last_progress = Instant::now();
            } else if last_progress.elapsed() >= idle_timeout {
                return Err(ScopeError::Timeout {
                    timeout: idle_timeout,
                    received: self.pending.len(),
                });
            }
        }
    }
}
