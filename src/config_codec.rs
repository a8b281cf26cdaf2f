//! Both directions of the ASCII configuration dialect.
//!
//! Inbound, replies look like
//! `:WFMPRE:XINCR 4.0E-6;:WFMPRE:XZERO -5.0E-3` (or, for compound queries
//! answered by a single header, `:CH1:SCALE 1.0E0;POSITION 0.0E0`). Each
//! field is split on the first blank and its logical key is the last
//! colon-separated segment of the name, whatever the length of the prefix.
//!
//! Outbound, each settable group becomes one colon-rooted command built
//! only from the fields that are present.

use crate::error::ScopeError;
use crate::scope_config::{
    Channel, ChannelConfig, Coupling, EdgeCoupling, ProbeAttenuation, Slope, TimebaseConfig,
    TriggerConfig, TriggerMode, TriggerType,
};

/// A field name in short and long SCPI form, e.g. `SCA` / `SCALE`.
#[derive(Debug, Clone, Copy)]
pub struct Mnemonic {
    pub short: &'static str,
    pub long: &'static str,
}

impl Mnemonic {
    pub const fn new(short: &'static str, long: &'static str) -> Self {
        Self { short, long }
    }

    /// `key` names this field in any abbreviation between short and long.
    pub fn matches(&self, key: &str) -> bool {
        let key = key.to_ascii_uppercase();
        key.starts_with(self.short) && self.long.starts_with(key.as_str())
    }
}

const PROBE: Mnemonic = Mnemonic::new("PRO", "PROBE");
const SCALE: Mnemonic = Mnemonic::new("SCA", "SCALE");
const POSITION: Mnemonic = Mnemonic::new("POS", "POSITION");
const COUPLING: Mnemonic = Mnemonic::new("COUP", "COUPLING");
const BANDWIDTH: Mnemonic = Mnemonic::new("BAN", "BANDWIDTH");
const MODE: Mnemonic = Mnemonic::new("MOD", "MODE");
const TYPE: Mnemonic = Mnemonic::new("TYP", "TYPE");
const LEVEL: Mnemonic = Mnemonic::new("LEV", "LEVEL");
const SLOPE: Mnemonic = Mnemonic::new("SLO", "SLOPE");

/// One `name value` field of a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyField {
    /// Header as sent, e.g. `:WFMPRE:XINCR`.
    pub name: String,
    /// Last segment of the header, e.g. `XINCR`.
    pub key: String,
    pub value: String,
}

/// Tokenized key-value reply. Values stay text until a consumer casts them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyFields {
    fields: Vec<ReplyField>,
}

impl ReplyFields {
    pub fn parse(reply: &str) -> Result<Self, ScopeError> {
        let reply = reply.trim();
        let body = reply.strip_suffix(';').unwrap_or(reply);
        if body.is_empty() {
            return Err(ScopeError::protocol("empty reply"));
        }

        let fields = body
            .split(';')
            .map(|field| {
                let field = field.trim();
                let (name, value) = field
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| ScopeError::protocol(format!("field '{field}' has no value")))?;
                let key = name
                    .rsplit(':')
                    .next()
                    .filter(|key| !key.is_empty())
                    .ok_or_else(|| ScopeError::protocol(format!("field '{field}' has no name")))?;
                Ok(ReplyField {
                    name: name.to_string(),
                    key: key.to_ascii_uppercase(),
                    value: value.trim().to_string(),
                })
            })
            .collect::<Result<Vec<_>, ScopeError>>()?;

        Ok(Self { fields })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReplyField> {
        self.fields.iter()
    }

    pub fn find(&self, mnemonic: Mnemonic) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| mnemonic.matches(&f.key))
            .map(|f| f.value.as_str())
    }

    pub fn require(&self, mnemonic: Mnemonic) -> Result<&str, ScopeError> {
        self.find(mnemonic)
            .ok_or_else(|| ScopeError::protocol(format!("reply lacks field {}", mnemonic.long)))
    }

    pub fn require_f64(&self, mnemonic: Mnemonic) -> Result<f64, ScopeError> {
        let value = self.require(mnemonic)?;
        parse_f64(mnemonic.long, value)
    }
}

fn parse_f64(name: &str, value: &str) -> Result<f64, ScopeError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ScopeError::protocol(format!("{name} value '{value}' is not a number")))
}

/// Inbound values are the instrument's fault, not the caller's.
fn inbound<T>(result: Result<T, ScopeError>) -> Result<T, ScopeError> {
    result.map_err(|e| match e {
        ScopeError::InvalidArgument { name, value, .. } => {
            ScopeError::protocol(format!("unexpected {name} '{value}' in reply"))
        }
        other => other,
    })
}

fn parse_switch(value: &str) -> Result<bool, ScopeError> {
    match value.trim().to_ascii_uppercase().as_str() {
        "ON" | "1" => Ok(true),
        "OFF" | "0" => Ok(false),
        other => Err(ScopeError::protocol(format!("unexpected switch state '{other}'"))),
    }
}

/// Strip the echoed `ID` header from an identification reply.
pub fn parse_identity(reply: &str) -> Result<String, ScopeError> {
    let reply = reply.trim();
    let identity = reply
        .strip_prefix("ID ")
        .or_else(|| reply.strip_prefix(":ID "))
        .unwrap_or(reply)
        .trim();
    if identity.is_empty() {
        return Err(ScopeError::protocol("empty identification reply"));
    }
    Ok(identity.to_string())
}

/// Format a value the way the instrument prints numbers: `2.00E-02`.
pub fn format_scpi_float(value: f64) -> String {
    let formatted = format!("{value:.2E}");
    match formatted.split_once('E') {
        Some((mantissa, exponent)) => match exponent.parse::<i32>() {
            Ok(exponent) => {
                let sign = if exponent < 0 { '-' } else { '+' };
                format!("{mantissa}E{sign}{:02}", exponent.unsigned_abs())
            }
            Err(_) => formatted,
        },
        None => formatted,
    }
}

fn finite(name: &'static str, value: f64) -> Result<f64, ScopeError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ScopeError::invalid(name, value, "a finite number"))
    }
}

fn positive(name: &'static str, value: f64) -> Result<f64, ScopeError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ScopeError::invalid(name, value, "a positive number"))
    }
}

fn on_off(on: bool) -> &'static str {
    if on {
        "ON"
    } else {
        "OFF"
    }
}

/// `CH1:PRO 10;SCA 2.00E-02;...`, or `None` when nothing is set.
///
/// Every value is validated before any part of the command is built.
pub fn encode_channel(channel: Channel, config: &ChannelConfig) -> Result<Option<String>, ScopeError> {
    if config.is_empty() {
        return Ok(None);
    }
    let mut parts = Vec::new();
    if let Some(probe) = config.probe {
        parts.push(format!("PRO {}", probe.factor()));
    }
    if let Some(scale) = config.scale {
        parts.push(format!("SCA {}", format_scpi_float(positive("scale", scale)?)));
    }
    if let Some(position) = config.position {
        parts.push(format!("POS {}", format_scpi_float(finite("position", position)?)));
    }
    if let Some(coupling) = config.coupling {
        parts.push(format!("COUP {}", coupling.as_str()));
    }
    if let Some(on) = config.bandwidth_limit {
        parts.push(format!("BAN {}", on_off(on)));
    }

    Ok(Some(format!("{}:{}", channel.as_str(), parts.join(";"))))
}

/// `HOR:POS 0.00E+00;SCA 5.00E-04`, or `None` when nothing is set.
pub fn encode_timebase(config: &TimebaseConfig) -> Result<Option<String>, ScopeError> {
    if config.is_empty() {
        return Ok(None);
    }
    let mut parts = Vec::new();
    if let Some(position) = config.position {
        parts.push(format!("POS {}", format_scpi_float(finite("horizontal position", position)?)));
    }
    if let Some(scale) = config.scale {
        parts.push(format!("SCA {}", format_scpi_float(positive("horizontal scale", scale)?)));
    }

    Ok(Some(format!("HOR:{}", parts.join(";"))))
}

/// Main trigger settings, with the edge settings appended as their own
/// root-anchored segment: `TRIG:MAI:MOD AUTO;:TRIG:MAI:EDGE:SLO RISE`.
pub fn encode_trigger(config: &TriggerConfig) -> Result<Option<String>, ScopeError> {
    if config.is_empty() {
        return Ok(None);
    }
    let mut main = Vec::new();
    if let Some(mode) = config.mode {
        main.push(format!("MOD {}", mode.as_str()));
    }
    if let Some(kind) = config.kind {
        main.push(format!("TYP {}", kind.as_str()));
    }
    if let Some(level) = config.level {
        main.push(format!("LEV {}", format_scpi_float(finite("trigger level", level)?)));
    }

    let mut edge = Vec::new();
    if let Some(coupling) = config.edge_coupling {
        edge.push(format!("COUP {}", coupling.as_str()));
    }
    if let Some(slope) = config.edge_slope {
        edge.push(format!("SLO {}", slope.as_str()));
    }

    let segments: Vec<String> = [("TRIG:MAI:", main), ("TRIG:MAI:EDGE:", edge)]
        .into_iter()
        .filter(|(_, parts)| !parts.is_empty())
        .map(|(prefix, parts)| format!("{prefix}{}", parts.join(";")))
        .collect();

    Ok(Some(segments.join(";:")))
}

pub fn channel_query(channel: Channel) -> String {
    format!("{}:PRO?;SCA?;POS?;COUP?;BAN?", channel.as_str())
}

pub const TIMEBASE_QUERY: &str = "HOR:POS?;SCA?";

pub const TRIGGER_QUERY: &str = "TRIG:MAI:MOD?;TYP?;LEV?;EDGE:COUP?;SLO?";

pub fn decode_channel(reply: &str) -> Result<ChannelConfig, ScopeError> {
    let fields = ReplyFields::parse(reply)?;
    let mut config = ChannelConfig::new();

    if let Some(value) = fields.find(PROBE) {
        config.probe = Some(inbound(value.parse::<ProbeAttenuation>())?);
    }
    if let Some(value) = fields.find(SCALE) {
        config.scale = Some(parse_f64(SCALE.long, value)?);
    }
    if let Some(value) = fields.find(POSITION) {
        config.position = Some(parse_f64(POSITION.long, value)?);
    }
    if let Some(value) = fields.find(COUPLING) {
        config.coupling = Some(inbound(value.parse::<Coupling>())?);
    }
    if let Some(value) = fields.find(BANDWIDTH) {
        config.bandwidth_limit = Some(parse_switch(value)?);
    }

    Ok(config)
}

pub fn decode_timebase(reply: &str) -> Result<TimebaseConfig, ScopeError> {
    let fields = ReplyFields::parse(reply)?;
    Ok(TimebaseConfig {
        position: fields
            .find(POSITION)
            .map(|v| parse_f64(POSITION.long, v))
            .transpose()?,
        scale: fields
            .find(SCALE)
            .map(|v| parse_f64(SCALE.long, v))
            .transpose()?,
    })
}

pub fn decode_trigger(reply: &str) -> Result<TriggerConfig, ScopeError> {
    let fields = ReplyFields::parse(reply)?;
    Ok(TriggerConfig {
        mode: fields
            .find(MODE)
            .map(|v| inbound(v.parse::<TriggerMode>()))
            .transpose()?,
        kind: fields
            .find(TYPE)
            .map(|v| inbound(v.parse::<TriggerType>()))
            .transpose()?,
        level: fields
            .find(LEVEL)
            .map(|v| parse_f64(LEVEL.long, v))
            .transpose()?,
        edge_coupling: fields
            .find(COUPLING)
            .map(|v| inbound(v.parse::<EdgeCoupling>()))
            .transpose()?,
        edge_slope: fields
            .find(SLOPE)
            .map(|v| inbound(v.parse::<Slope>()))
            .transpose()?,
    })
}
