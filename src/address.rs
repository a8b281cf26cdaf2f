use std::fmt;
use std::str::FromStr;

use crate::error::ScopeError;

/// Baud rate used when a serial address does not name one.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Where an instrument lives, tagged with the kind of link that reaches it.
///
/// The textual form always carries an explicit tag:
///
/// - `serial:/dev/ttyUSB0` or `serial:COM1@19200`
/// - `visa:GPIB0::1::INSTR` (`gpib:` is accepted as an alias)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InstrumentAddress {
    Serial { port: String, baud_rate: u32 },
    Visa { resource: String },
}

impl InstrumentAddress {
    pub fn serial(port: &str, baud_rate: u32) -> Result<Self, ScopeError> {
        if port.trim().is_empty() {
            return Err(ScopeError::invalid("serial port", port, "a port name"));
        }
        if baud_rate == 0 {
            return Err(ScopeError::invalid("baud rate", baud_rate, "a positive baud rate"));
        }
        Ok(Self::Serial {
            port: port.trim().to_string(),
            baud_rate,
        })
    }

    pub fn visa(resource: &str) -> Result<Self, ScopeError> {
        let resource = resource.trim();
        let well_formed = resource.contains("::")
            && resource
                .rsplit("::")
                .next()
                .is_some_and(|class| class.eq_ignore_ascii_case("INSTR"));
        if !well_formed {
            return Err(ScopeError::invalid(
                "VISA resource",
                resource,
                "a resource like GPIB0::1::INSTR",
            ));
        }
        Ok(Self::Visa {
            resource: resource.to_string(),
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Serial { .. } => "serial",
            Self::Visa { .. } => "visa",
        }
    }
}

impl FromStr for InstrumentAddress {
    type Err = ScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (tag, rest) = s.split_once(':').ok_or_else(|| {
            ScopeError::invalid("address", s, "serial:<port>[@baud] or visa:<resource>")
        })?;

        match tag.trim().to_ascii_lowercase().as_str() {
            "serial" => match rest.rsplit_once('@') {
                Some((port, baud)) => {
                    let baud_rate = baud
                        .trim()
                        .parse()
                        .map_err(|_| ScopeError::invalid("baud rate", baud, "an integer"))?;
                    Self::serial(port, baud_rate)
                }
                None => Self::serial(rest, DEFAULT_BAUD_RATE),
            },
            "visa" | "gpib" => Self::visa(rest),
            _ => Err(ScopeError::invalid(
                "address kind",
                tag,
                "'serial' or 'visa'",
            )),
        }
    }
}

impl fmt::Display for InstrumentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serial { port, baud_rate } => write!(f, "serial:{port}@{baud_rate}"),
            Self::Visa { resource } => write!(f, "visa:{resource}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_serial_addresses() {
        let addr: InstrumentAddress = "serial:/dev/ttyUSB0".parse().unwrap();
        assert_eq!(
            addr,
            InstrumentAddress::Serial {
                port: "/dev/ttyUSB0".to_string(),
                baud_rate: DEFAULT_BAUD_RATE
            }
        );

        let addr: InstrumentAddress = "serial:COM1@19200".parse().unwrap();
        assert_eq!(addr.to_string(), "serial:COM1@19200");
    }

    #[test]
    fn parses_visa_resources() {
        let addr: InstrumentAddress = "gpib:GPIB0::1::INSTR".parse().unwrap();
        assert_eq!(addr.kind(), "visa");
        assert_eq!(addr.to_string(), "visa:GPIB0::1::INSTR");
    }

    #[test]
    fn rejects_untagged_or_malformed_addresses() {
        // Every address names its link kind; a bare port name is rejected.
        assert!(matches!(
            "COM1".parse::<InstrumentAddress>(),
            Err(ScopeError::InvalidArgument { .. })
        ));
        assert!("tcp:10.0.0.1".parse::<InstrumentAddress>().is_err());
        assert!("visa:GPIB0".parse::<InstrumentAddress>().is_err());
        assert!("serial:COM1@fast".parse::<InstrumentAddress>().is_err());
        assert!("serial:COM1@0".parse::<InstrumentAddress>().is_err());
        assert!("serial:".parse::<InstrumentAddress>().is_err());
    }
}
