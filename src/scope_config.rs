//! Typed settings for the groups the instrument lets us configure.
//!
//! Every field is optional: `None` means "leave it as it is", and only the
//! fields that are `Some` end up on the wire. The same records come back
//! from the read-back queries, with the fields the reply carried filled in.

use std::fmt;
use std::str::FromStr;

use crate::error::ScopeError;

macro_rules! token_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal, $expected:literal {
            $($variant:ident => $token:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Token sent to and received from the instrument.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $token),+
                }
            }
        }

        impl FromStr for $name {
            type Err = ScopeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let token = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(token))
                    .ok_or_else(|| ScopeError::invalid($label, token, $expected))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

token_enum! {
    /// Input channel of a two-channel instrument.
    Channel, "channel", "CH1 or CH2" {
        Ch1 => "CH1",
        Ch2 => "CH2",
    }
}

impl Channel {
    pub fn number(&self) -> u8 {
        match self {
            Self::Ch1 => 1,
            Self::Ch2 => 2,
        }
    }
}

token_enum! {
    Coupling, "coupling", "DC, AC or GND" {
        Dc => "DC",
        Ac => "AC",
        Gnd => "GND",
    }
}

token_enum! {
    TriggerMode, "trigger mode", "NORMAL or AUTO" {
        Normal => "NORMAL",
        Auto => "AUTO",
    }
}

token_enum! {
    TriggerType, "trigger type", "EDGE or VIDEO" {
        Edge => "EDGE",
        Video => "VIDEO",
    }
}

token_enum! {
    EdgeCoupling, "edge coupling", "AC, DC, NOISEREJ, HFREJ or NJREJ" {
        Ac => "AC",
        Dc => "DC",
        NoiseReject => "NOISEREJ",
        HfReject => "HFREJ",
        NjReject => "NJREJ",
    }
}

token_enum! {
    Slope, "slope", "RISE or FALL" {
        Rise => "RISE",
        Fall => "FALL",
    }
}

/// Probe attenuation factor the channel compensates for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeAttenuation {
    X1,
    X10,
    X100,
    X1000,
}

impl ProbeAttenuation {
    pub fn factor(&self) -> u32 {
        match self {
            Self::X1 => 1,
            Self::X10 => 10,
            Self::X100 => 100,
            Self::X1000 => 1000,
        }
    }
}

impl TryFrom<u32> for ProbeAttenuation {
    type Error = ScopeError;

    fn try_from(factor: u32) -> Result<Self, Self::Error> {
        match factor {
            1 => Ok(Self::X1),
            10 => Ok(Self::X10),
            100 => Ok(Self::X100),
            1000 => Ok(Self::X1000),
            other => Err(ScopeError::invalid("probe", other, "1, 10, 100 or 1000")),
        }
    }
}

impl FromStr for ProbeAttenuation {
    type Err = ScopeError;

    /// Accepts `10` as well as the instrument's `1.0E1`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: f64 = s
            .trim()
            .parse()
            .map_err(|_| ScopeError::invalid("probe", s.trim(), "1, 10, 100 or 1000"))?;
        if !(value.is_finite() && value >= 1.0 && value <= 1000.0 && value.fract() == 0.0) {
            return Err(ScopeError::invalid("probe", s.trim(), "1, 10, 100 or 1000"));
        }
        Self::try_from(value as u32)
    }
}

impl fmt::Display for ProbeAttenuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.factor())
    }
}

/// Vertical settings of one channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelConfig {
    pub probe: Option<ProbeAttenuation>,
    /// Volts per division.
    pub scale: Option<f64>,
    /// Vertical offset in divisions.
    pub position: Option<f64>,
    pub coupling: Option<Coupling>,
    /// 20 MHz bandwidth limit.
    pub bandwidth_limit: Option<bool>,
}

impl ChannelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn probe(mut self, probe: ProbeAttenuation) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn scale(mut self, volts_per_div: f64) -> Self {
        self.scale = Some(volts_per_div);
        self
    }

    pub fn position(mut self, divisions: f64) -> Self {
        self.position = Some(divisions);
        self
    }

    pub fn coupling(mut self, coupling: Coupling) -> Self {
        self.coupling = Some(coupling);
        self
    }

    pub fn bandwidth_limit(mut self, on: bool) -> Self {
        self.bandwidth_limit = Some(on);
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Horizontal settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimebaseConfig {
    /// Trigger point offset in seconds.
    pub position: Option<f64>,
    /// Seconds per division.
    pub scale: Option<f64>,
}

impl TimebaseConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(mut self, seconds: f64) -> Self {
        self.position = Some(seconds);
        self
    }

    pub fn scale(mut self, seconds_per_div: f64) -> Self {
        self.scale = Some(seconds_per_div);
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Main trigger settings, including the edge sub-group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriggerConfig {
    pub mode: Option<TriggerMode>,
    pub kind: Option<TriggerType>,
    /// Trigger level in volts.
    pub level: Option<f64>,
    pub edge_coupling: Option<EdgeCoupling>,
    pub edge_slope: Option<Slope>,
}

impl TriggerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(mut self, mode: TriggerMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn kind(mut self, kind: TriggerType) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn level(mut self, volts: f64) -> Self {
        self.level = Some(volts);
        self
    }

    pub fn edge_coupling(mut self, coupling: EdgeCoupling) -> Self {
        self.edge_coupling = Some(coupling);
        self
    }

    pub fn edge_slope(mut self, slope: Slope) -> Self {
        self.edge_slope = Some(slope);
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tokens_case_insensitively() {
        assert_eq!("dc".parse::<Coupling>().unwrap(), Coupling::Dc);
        assert_eq!(" NOISEREJ ".parse::<EdgeCoupling>().unwrap(), EdgeCoupling::NoiseReject);
        assert_eq!("Fall".parse::<Slope>().unwrap(), Slope::Fall);
        assert_eq!("ch2".parse::<Channel>().unwrap(), Channel::Ch2);
    }

    #[test]
    fn rejects_tokens_outside_the_option_set() {
        let err = "XYZ".parse::<Coupling>().unwrap_err();
        assert!(matches!(
            err,
            ScopeError::InvalidArgument { name: "coupling", .. }
        ));
        assert!("SINGLE".parse::<TriggerMode>().is_err());
        assert!("CH3".parse::<Channel>().is_err());
    }

    #[test]
    fn probe_factors() {
        assert_eq!(ProbeAttenuation::try_from(100).unwrap(), ProbeAttenuation::X100);
        assert!(ProbeAttenuation::try_from(5).is_err());
        assert_eq!("1.0E1".parse::<ProbeAttenuation>().unwrap(), ProbeAttenuation::X10);
        assert_eq!("1000".parse::<ProbeAttenuation>().unwrap(), ProbeAttenuation::X1000);
        assert!("2.5".parse::<ProbeAttenuation>().is_err());
        assert!("abc".parse::<ProbeAttenuation>().is_err());
    }

    #[test]
    fn builders_fill_only_what_was_set() {
        let config = ChannelConfig::new().scale(0.5);
        assert_eq!(config.scale, Some(0.5));
        assert!(config.probe.is_none());
        assert!(!config.is_empty());
        assert!(TriggerConfig::new().is_empty());
        assert!(TimebaseConfig::default().is_empty());
    }
}
