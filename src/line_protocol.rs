//! Framing of the instrument's replies.
//!
//! Most replies are ASCII lines closed by the transport terminator. The one
//! exception is the answer to `CURV?`, which embeds a length-prefixed binary
//! block in the otherwise text-oriented stream:
//!
//! ```text
//! :CURVE #45000<5000 payload bytes>\r\n
//!         ^^^^^
//!         |`--- 4 length digits follow: "5000"
//!         `---- '#' starts the block
//! ```
//!
//! The payload may contain the terminator bytes, so it is read with
//! [`Transport::read_exact`] using the declared length and never by scanning.

use crate::error::ScopeError;
use crate::transport::Transport;

/// Longest header token accepted in front of the `#` block marker.
const MAX_HEADER_LEN: usize = 32;

/// Position of the first `terminator` at or after `from`.
pub fn find_terminator(buf: &[u8], terminator: &[u8], from: usize) -> Option<usize> {
    if terminator.is_empty() || from >= buf.len() {
        return None;
    }
    buf[from..]
        .windows(terminator.len())
        .position(|window| window == terminator)
        .map(|pos| pos + from)
}

/// A received curve block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurveBlock {
    /// Exactly the number of bytes the block header declared.
    pub payload: Vec<u8>,
    /// Bytes found between the declared payload and the terminator.
    pub trailing: Vec<u8>,
}

impl CurveBlock {
    /// Payload followed by any trailing bytes, as seen on the wire.
    pub fn into_bytes(self) -> Vec<u8> {
        let mut bytes = self.payload;
        bytes.extend(self.trailing);
        bytes
    }
}

/// Check the ASCII token that precedes `#`.
///
/// With `HEAD ON` the instrument sends `:CURVE ` (or the short form), with
/// `HEAD OFF` nothing at all. Anything else means the stream is out of step.
pub fn check_curve_header(token: &[u8]) -> Result<(), ScopeError> {
    let text = std::str::from_utf8(token)
        .map_err(|_| ScopeError::protocol("curve header is not ASCII"))?;
    let name = text.trim().trim_start_matches(':');
    if name.is_empty() || name.eq_ignore_ascii_case("CURVE") || name.eq_ignore_ascii_case("CURV")
    {
        Ok(())
    } else {
        Err(ScopeError::protocol(format!(
            "unexpected curve header '{}'",
            text.trim()
        )))
    }
}

/// Parse the digit count byte and the length digits of a `#<n><len>` field.
pub fn parse_block_length(digit_count: u8, digits: &[u8]) -> Result<usize, ScopeError> {
    let count = match digit_count {
        b'1'..=b'9' => usize::from(digit_count - b'0'),
        other => {
            return Err(ScopeError::protocol(format!(
                "invalid block digit count '{}'",
                char::from(other).escape_default()
            )))
        }
    };
    if digits.len() != count {
        return Err(ScopeError::protocol(format!(
            "block header announced {count} length digits, got {}",
            digits.len()
        )));
    }
    if !digits.iter().all(u8::is_ascii_digit) {
        return Err(ScopeError::protocol(format!(
            "non-numeric block length '{}'",
            String::from_utf8_lossy(digits)
        )));
    }
    digits.iter().try_fold(0usize, |acc, d| {
        acc.checked_mul(10)
            .and_then(|acc| acc.checked_add(usize::from(d - b'0')))
            .ok_or_else(|| ScopeError::protocol("block length overflows"))
    })
}

/// Read one complete curve reply from `transport`, including its terminator.
pub fn read_curve_block<T: Transport + ?Sized>(transport: &mut T) -> Result<CurveBlock, ScopeError> {
    let mut token = Vec::new();
    loop {
        let byte = transport.read_exact(1)?[0];
        if byte == b'#' {
            break;
        }
        token.push(byte);
        if token.len() > MAX_HEADER_LEN {
            return Err(ScopeError::protocol(format!(
                "no block marker within {MAX_HEADER_LEN} bytes of header '{}'",
                String::from_utf8_lossy(&token)
            )));
        }
    }
    check_curve_header(&token)?;

    let digit_count = transport.read_exact(1)?[0];
    let digits = match digit_count {
        b'1'..=b'9' => transport.read_exact(usize::from(digit_count - b'0'))?,
        _ => Vec::new(),
    };
    let len = parse_block_length(digit_count, &digits)?;

    let payload = transport.read_exact(len)?;
    let trailing = match transport.read_until_terminator(0) {
        Ok(trailing) => trailing,
        // The terminator was swallowed as payload: the block is short.
        Err(ScopeError::Timeout { .. }) if payload.ends_with(transport.terminator()) => {
            return Err(ScopeError::protocol(format!(
                "curve block ended before its declared {len} bytes"
            )));
        }
        Err(e) => return Err(e),
    };
    if !trailing.is_empty() {
        log::debug!(
            "Curve block of {} bytes followed by {} extra bytes",
            len,
            trailing.len()
        );
    }

    Ok(CurveBlock { payload, trailing })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loopback::LoopbackTransport;

    fn curve_reply(header: &str, payload: &[u8]) -> Vec<u8> {
        let mut bytes = header.as_bytes().to_vec();
        bytes.extend_from_slice(payload);
        bytes.extend_from_slice(b"\r\n");
        bytes
    }

    #[test]
    fn finds_terminator_from_offset() {
        let buf = b"ab\r\ncd\r\n";
        assert_eq!(find_terminator(buf, b"\r\n", 0), Some(2));
        assert_eq!(find_terminator(buf, b"\r\n", 3), Some(6));
        assert_eq!(find_terminator(buf, b"\r\n", 8), None);
        assert_eq!(find_terminator(buf, b"", 0), None);
    }

    #[test]
    fn parses_block_lengths() {
        assert_eq!(parse_block_length(b'4', b"5000").unwrap(), 5000);
        assert_eq!(parse_block_length(b'4', b"2500").unwrap(), 2500);
        assert!(parse_block_length(b'0', b"").is_err());
        assert!(parse_block_length(b'x', b"").is_err());
        assert!(parse_block_length(b'4', b"50").is_err());
        assert!(parse_block_length(b'2', b"5a").is_err());
    }

    #[test]
    fn accepts_known_headers_only() {
        assert!(check_curve_header(b":CURVE ").is_ok());
        assert!(check_curve_header(b"CURV ").is_ok());
        assert!(check_curve_header(b"").is_ok());
        assert!(matches!(
            check_curve_header(b":WFMPRE:XINCR "),
            Err(ScopeError::ProtocolFormat(_))
        ));
    }

    #[test]
    fn reads_payload_that_contains_terminator_bytes() {
        // Every fourth sample pair looks like a line end.
        let payload: Vec<u8> = (0..5000)
            .map(|i| match i % 4 {
                0 => b'\r',
                1 => b'\n',
                _ => (i % 251) as u8,
            })
            .collect();

        let mut transport = LoopbackTransport::new();
        transport.push_bytes(&curve_reply(":CURVE #45000", &payload));

        let block = read_curve_block(&mut transport).unwrap();
        assert_eq!(block.payload, payload);
        assert!(block.trailing.is_empty());
        assert_eq!(transport.pending_reply_bytes(), 0);
    }

    #[test]
    fn keeps_bytes_beyond_the_declared_length() {
        let mut payload = vec![7u8; 5000];
        payload.push(0x42);

        let mut transport = LoopbackTransport::new();
        transport.push_bytes(&curve_reply(":CURVE #45000", &payload));

        let block = read_curve_block(&mut transport).unwrap();
        assert_eq!(block.payload.len(), 5000);
        assert_eq!(block.trailing, vec![0x42]);
        assert_eq!(block.into_bytes().len(), 5001);
    }

    #[test]
    fn rejects_wrong_header_token() {
        let mut transport = LoopbackTransport::new();
        transport.push_bytes(&curve_reply(":DATA #15", b"12345"));

        assert!(matches!(
            read_curve_block(&mut transport),
            Err(ScopeError::ProtocolFormat(_))
        ));
    }

    #[test]
    fn missing_block_marker_is_a_format_error() {
        let mut transport = LoopbackTransport::new();
        transport.push_bytes(&[b'x'; 64]);

        assert!(matches!(
            read_curve_block(&mut transport),
            Err(ScopeError::ProtocolFormat(_))
        ));
    }

    #[test]
    fn block_shorter_than_declared_is_a_format_error() {
        let mut transport = LoopbackTransport::new();
        transport.push_bytes(&curve_reply(":CURVE #45000", &[0u8; 4998]));

        assert!(matches!(
            read_curve_block(&mut transport),
            Err(ScopeError::ProtocolFormat(_))
        ));
    }

    #[test]
    fn truncated_payload_times_out() {
        let mut transport = LoopbackTransport::new();
        transport.push_bytes(b":CURVE #42500");
        transport.push_bytes(&[1u8; 100]);

        assert!(matches!(
            read_curve_block(&mut transport),
            Err(ScopeError::Timeout { .. })
        ));
    }
}
