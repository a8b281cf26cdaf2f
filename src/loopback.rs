use std::collections::VecDeque;
use std::time::Duration;

use crate::error::ScopeError;
use crate::transport::{RxBuffer, Transport, DEFAULT_TERMINATOR, DEFAULT_TIMEOUT};

/// In-memory transport that replays scripted replies and records writes.
///
/// Each pushed reply becomes one chunk handed to the reader, the way bytes
/// trickle in from a real link. Once the script runs dry every read fails
/// with [`ScopeError::Timeout`] immediately, so a test never waits on the
/// wall clock.
///
/// It behaves like a serial link by default, stray trailing curve byte
/// included; see [`LoopbackTransport::like_gpib`].
///
/// ```rust
/// use tdsscope_rs::{LoopbackTransport, Transport};
///
/// let mut link = LoopbackTransport::new();
/// link.push_reply("ID TEK/TDS 210,CF:91.1CT FV:v2.12");
///
/// let reply = link.query("ID?", None)?;
/// assert_eq!(reply, "ID TEK/TDS 210,CF:91.1CT FV:v2.12");
/// assert_eq!(link.writes(), ["ID?"]);
/// # Ok::<(), tdsscope_rs::ScopeError>(())
/// ```
#[derive(Debug)]
pub struct LoopbackTransport {
    terminator: Vec<u8>,
    timeout: Duration,
    script: VecDeque<Vec<u8>>,
    rx: RxBuffer,
    writes: Vec<String>,
    timeout_changes: Vec<Duration>,
    stray_byte: bool,
    open: bool,
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self {
            terminator: DEFAULT_TERMINATOR.to_vec(),
            timeout: DEFAULT_TIMEOUT,
            script: VecDeque::new(),
            rx: RxBuffer::default(),
            writes: Vec::new(),
            timeout_changes: Vec::new(),
            stray_byte: true,
            open: true,
        }
    }

    pub fn with_terminator(mut self, terminator: &[u8]) -> Self {
        self.terminator = terminator.to_vec();
        self
    }

    /// Report no stray curve bytes, as a GPIB link does.
    pub fn like_gpib(mut self) -> Self {
        self.stray_byte = false;
        self
    }

    /// Queue an ASCII reply; the terminator is appended.
    pub fn push_reply(&mut self, reply: &str) -> &mut Self {
        let mut bytes = reply.as_bytes().to_vec();
        bytes.extend_from_slice(&self.terminator);
        self.script.push_back(bytes);
        self
    }

    /// Queue raw bytes exactly as given.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.script.push_back(bytes.to_vec());
        self
    }

    /// Every line written so far, without terminators, oldest first.
    pub fn writes(&self) -> &[String] {
        &self.writes
    }

    pub fn count_writes(&self, line: &str) -> usize {
        self.writes.iter().filter(|w| *w == line).count()
    }

    /// Every timeout passed to [`Transport::set_timeout`], oldest first.
    pub fn timeout_changes(&self) -> &[Duration] {
        &self.timeout_changes
    }

    /// Scripted bytes that were neither read nor discarded.
    pub fn pending_reply_bytes(&self) -> usize {
        self.rx.len() + self.script.iter().map(Vec::len).sum::<usize>()
    }

    fn ensure_open(&self) -> Result<(), ScopeError> {
        if self.open {
            Ok(())
        } else {
            Err(ScopeError::NotConnected)
        }
    }
}

fn replay(script: &mut VecDeque<Vec<u8>>, buf: &mut Vec<u8>) -> usize {
    script.pop_front().map_or(0, |chunk| {
        buf.extend_from_slice(&chunk);
        chunk.len()
    })
}

impl Transport for LoopbackTransport {
    fn write_line(&mut self, text: &str) -> Result<(), ScopeError> {
        self.ensure_open()?;
        self.writes.push(text.to_string());
        Ok(())
    }

    fn read_exact(&mut self, n: usize) -> Result<Vec<u8>, ScopeError> {
        self.ensure_open()?;
        let script = &mut self.script;
        self.rx
            .read_exact(n, Duration::ZERO, |buf| Ok(replay(script, buf)))
    }

    fn read_until_terminator(&mut self, min_bytes: usize) -> Result<Vec<u8>, ScopeError> {
        self.ensure_open()?;
        let script = &mut self.script;
        self.rx
            .read_until(&self.terminator, min_bytes, Duration::ZERO, |buf| {
                Ok(replay(script, buf))
            })
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), ScopeError> {
        self.timeout_changes.push(timeout);
        self.timeout = timeout;
        Ok(())
    }

    fn terminator(&self) -> &[u8] {
        &self.terminator
    }

    fn discard_input(&mut self) -> Result<(), ScopeError> {
        self.rx.clear();
        self.script.clear();
        Ok(())
    }

    fn may_send_stray_byte(&self) -> bool {
        self.stray_byte
    }

    fn close(&mut self) -> Result<(), ScopeError> {
        self.open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
