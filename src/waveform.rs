use polars::prelude::*;

use crate::config_codec::{Mnemonic, ReplyFields};
use crate::error::ScopeError;
use crate::scope_config::Channel;

/// Record length of the instrument family. Not configurable.
pub const SAMPLE_COUNT: usize = 2500;

pub const TIME_COLUMN_NAME: &str = "time";

/// Query for the five scaling parameters of the selected source.
pub const PREAMBLE_QUERY: &str = "WFMPRe:XINCR?;XZERO?;YMULT?;YZERO?;YOFF?";

const XINCR: Mnemonic = Mnemonic::new("XIN", "XINCR");
const XZERO: Mnemonic = Mnemonic::new("XZE", "XZERO");
const YMULT: Mnemonic = Mnemonic::new("YMU", "YMULT");
const YZERO: Mnemonic = Mnemonic::new("YZE", "YZERO");
const YOFF: Mnemonic = Mnemonic::new("YOF", "YOFF");

/// Bytes per transferred sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleWidth {
    /// One signed byte per sample. Roughly twice as fast to transfer.
    Fast,
    /// Signed big-endian 16-bit samples.
    Full,
}

impl SampleWidth {
    pub fn bytes(&self) -> usize {
        match self {
            Self::Fast => 1,
            Self::Full => 2,
        }
    }

    pub fn from_fast_mode(fast: bool) -> Self {
        if fast {
            Self::Fast
        } else {
            Self::Full
        }
    }
}

/// Scaling parameters of one channel in one acquisition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preamble {
    /// Seconds between samples.
    pub x_increment: f64,
    /// Time of the first sample.
    pub x_zero: f64,
    /// Volts per digitizer level.
    pub y_multiplier: f64,
    pub y_zero: f64,
    /// Digitizer level that corresponds to `y_zero`.
    pub y_offset: f64,
}

impl Preamble {
    pub fn parse(reply: &str) -> Result<Self, ScopeError> {
        let fields = ReplyFields::parse(reply)?;
        if fields.len() != 5 {
            return Err(ScopeError::protocol(format!(
                "preamble has {} fields, expected 5",
                fields.len()
            )));
        }

        let preamble = Self {
            x_increment: fields.require_f64(XINCR)?,
            x_zero: fields.require_f64(XZERO)?,
            y_multiplier: fields.require_f64(YMULT)?,
            y_zero: fields.require_f64(YZERO)?,
            y_offset: fields.require_f64(YOFF)?,
        };
        if preamble.x_increment <= 0.0 {
            return Err(ScopeError::protocol(format!(
                "non-positive XINCR {}",
                preamble.x_increment
            )));
        }
        Ok(preamble)
    }

    /// `(raw - YOFF) * YMULT` for every sample.
    pub fn calibrate(&self, raw: &[i16]) -> Vec<f64> {
        raw.iter()
            .map(|&r| (f64::from(r) - self.y_offset) * self.y_multiplier)
            .collect()
    }

    /// `XZERO + i * XINCR` for `i` in `0..count`.
    pub fn time_axis(&self, count: usize) -> Vec<f64> {
        (0..count)
            .map(|i| self.x_zero + i as f64 * self.x_increment)
            .collect()
    }

    pub fn same_timebase(&self, other: &Self) -> bool {
        self.x_increment == other.x_increment && self.x_zero == other.x_zero
    }
}

/// Turn a curve payload into raw digitizer levels.
///
/// The payload must hold exactly `sample_count * width` bytes. With
/// `allow_stray_byte`, set for serial links which sometimes deliver one
/// extra trailing byte, that byte is dropped; any other mismatch is a
/// format error.
pub fn decode_samples(
    payload: &[u8],
    width: SampleWidth,
    sample_count: usize,
    allow_stray_byte: bool,
) -> Result<Vec<i16>, ScopeError> {
    let expected = sample_count * width.bytes();
    let payload = match payload.len() {
        len if len == expected => payload,
        len if allow_stray_byte && len == expected + 1 => {
            log::warn!("Curve payload has one byte too many, dropping it");
            &payload[..expected]
        }
        len => {
            return Err(ScopeError::protocol(format!(
                "curve payload has {len} bytes, expected {expected}"
            )))
        }
    };

    let samples = match width {
        SampleWidth::Fast => payload
            .iter()
            .map(|&b| i16::from(i8::from_be_bytes([b])))
            .collect(),
        SampleWidth::Full => payload
            .chunks_exact(2)
            .map(|pair| i16::from_be_bytes([pair[0], pair[1]]))
            .collect(),
    };
    Ok(samples)
}

/// Calibrated samples of one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    pub channel: Channel,
    pub volts: Vec<f64>,
}

/// Result of one waveform read: a time axis shared by every trace.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub time: Vec<f64>,
    pub traces: Vec<Trace>,
}

impl Waveform {
    pub fn trace(&self, channel: Channel) -> Option<&Trace> {
        self.traces.iter().find(|t| t.channel == channel)
    }

    /// `(time, volts)` pairs of one channel.
    pub fn points(&self, channel: Channel) -> Option<impl Iterator<Item = (f64, f64)> + '_> {
        self.trace(channel)
            .map(|trace| self.time.iter().copied().zip(trace.volts.iter().copied()))
    }

    /// One `time` column plus one column per channel, named `CH1`, `CH2`.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let mut columns: Vec<Column> = Vec::with_capacity(self.traces.len() + 1);
        columns.push(Series::new(TIME_COLUMN_NAME.into(), self.time.as_slice()).into());
        for trace in &self.traces {
            columns.push(Series::new(trace.channel.as_str().into(), trace.volts.as_slice()).into());
        }
        DataFrame::new(columns)
    }
}
