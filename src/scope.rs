use std::fmt;
use std::time::Duration;

use crate::address::InstrumentAddress;
use crate::config_codec::{self, TIMEBASE_QUERY, TRIGGER_QUERY};
use crate::error::ScopeError;
use crate::line_protocol::read_curve_block;
use crate::scope_config::{Channel, ChannelConfig, TimebaseConfig, TriggerConfig};
use crate::scope_connector::ScopeConnector;
use crate::transport::{with_timeout, Transport, TransportSettings};
use crate::waveform::{
    decode_samples, Preamble, SampleWidth, Trace, Waveform, PREAMBLE_QUERY, SAMPLE_COUNT,
};

/// Curve downloads over 9600 baud take seconds, so they get their own bound.
pub const DEFAULT_CURVE_TIMEOUT: Duration = Duration::from_secs(10);

const FREEZE: &str = "ACQ:STATE 0";
const UNFREEZE: &str = "ACQ:STATE 1";

/// Points in a session where the trace sink is told what is happening.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent<'a> {
    Freeze,
    ConfigureEncoding { width: SampleWidth },
    ChannelRequest { channel: Channel },
    ChannelDecoded { channel: Channel, samples: usize },
    Unfreeze { after_error: bool },
    ConfigSent { command: &'a str },
}

impl fmt::Display for SessionEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Freeze => write!(f, "freezing acquisition"),
            Self::ConfigureEncoding { width } => {
                write!(f, "requesting {}-byte signed binary samples", width.bytes())
            }
            Self::ChannelRequest { channel } => write!(f, "requesting {channel} curve"),
            Self::ChannelDecoded { channel, samples } => {
                write!(f, "decoded {samples} samples from {channel}")
            }
            Self::Unfreeze { after_error: false } => write!(f, "resuming acquisition"),
            Self::Unfreeze { after_error: true } => {
                write!(f, "resuming acquisition after failed read")
            }
            Self::ConfigSent { command } => write!(f, "sent '{command}'"),
        }
    }
}

/// Receives the session's trace points.
pub trait TraceSink {
    fn trace(&self, event: &SessionEvent<'_>);
}

/// Forwards trace points to the `log` facade at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTraceSink;

impl TraceSink for LogTraceSink {
    fn trace(&self, event: &SessionEvent<'_>) {
        log::debug!("{event}");
    }
}

/// What a configuration call put on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Sent(String),
    /// Every field was absent; zero bytes were written.
    NothingToSend,
}

/// A session with one oscilloscope over one exclusively owned transport.
///
/// The instrument stays the source of truth: configuration is never
/// cached, every read-back goes to the wire.
pub struct Scope<T: Transport> {
    transport: T,
    trace: Box<dyn TraceSink>,
    curve_timeout: Duration,
}

impl<T: Transport + fmt::Debug> fmt::Debug for Scope<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("transport", &self.transport)
            .field("curve_timeout", &self.curve_timeout)
            .finish_non_exhaustive()
    }
}

impl Scope<Box<dyn Transport>> {
    /// Open the link named by `address` and initialize the instrument.
    pub fn connect(
        address: &InstrumentAddress,
        settings: &TransportSettings,
    ) -> Result<Self, ScopeError> {
        let transport = ScopeConnector::open(address, settings)?;
        Self::new(transport)
    }
}

impl<T: Transport> Scope<T> {
    /// Take over `transport`, clear the instrument status and turn on
    /// response headers, which reply parsing relies on.
    pub fn new(transport: T) -> Result<Self, ScopeError> {
        Self::with_trace_sink(transport, Box::new(LogTraceSink))
    }

    pub fn with_trace_sink(transport: T, trace: Box<dyn TraceSink>) -> Result<Self, ScopeError> {
        let mut scope = Self {
            transport,
            trace,
            curve_timeout: DEFAULT_CURVE_TIMEOUT,
        };

        log::debug!("Clearing status and turning on headers");
        scope.transport.write_line("*CLS")?;
        scope.transport.write_line("HEAD ON")?;
        Ok(scope)
    }

    pub fn set_curve_timeout(&mut self, timeout: Duration) {
        self.curve_timeout = timeout;
    }

    pub fn curve_timeout(&self) -> Duration {
        self.curve_timeout
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Identification string without the echoed `ID` header.
    pub fn identify(&mut self) -> Result<String, ScopeError> {
        let reply = self.transport.query("ID?", None)?;
        let identity = config_codec::parse_identity(&reply)?;
        log::debug!("Instrument identity: {}", identity);
        Ok(identity)
    }

    pub fn configure_channel(
        &mut self,
        channel: Channel,
        config: &ChannelConfig,
    ) -> Result<CommandOutcome, ScopeError> {
        let command = config_codec::encode_channel(channel, config)?;
        self.send_config(command)
    }

    pub fn configure_timebase(&mut self, config: &TimebaseConfig) -> Result<CommandOutcome, ScopeError> {
        let command = config_codec::encode_timebase(config)?;
        self.send_config(command)
    }

    pub fn configure_trigger(&mut self, config: &TriggerConfig) -> Result<CommandOutcome, ScopeError> {
        let command = config_codec::encode_trigger(config)?;
        self.send_config(command)
    }

    fn send_config(&mut self, command: Option<String>) -> Result<CommandOutcome, ScopeError> {
        match command {
            Some(command) => {
                self.transport.write_line(&command)?;
                self.trace.trace(&SessionEvent::ConfigSent { command: &command });
                Ok(CommandOutcome::Sent(command))
            }
            None => Ok(CommandOutcome::NothingToSend),
        }
    }

    pub fn channel_config(&mut self, channel: Channel) -> Result<ChannelConfig, ScopeError> {
        let reply = self.transport.query(&config_codec::channel_query(channel), None)?;
        config_codec::decode_channel(&reply)
    }

    pub fn timebase_config(&mut self) -> Result<TimebaseConfig, ScopeError> {
        let reply = self.transport.query(TIMEBASE_QUERY, None)?;
        config_codec::decode_timebase(&reply)
    }

    pub fn trigger_config(&mut self) -> Result<TriggerConfig, ScopeError> {
        let reply = self.transport.query(TRIGGER_QUERY, None)?;
        config_codec::decode_trigger(&reply)
    }

    /// Download the current record of `channels`.
    ///
    /// Acquisition is halted for the transfer and restarted afterwards on
    /// every path, including failures. Channels are read in CH1, CH2 order
    /// whatever order they were given in; duplicates are read once.
    pub fn read_waveform(
        &mut self,
        channels: &[Channel],
        width: SampleWidth,
    ) -> Result<Waveform, ScopeError> {
        if channels.is_empty() {
            return Err(ScopeError::invalid("channels", "none", "at least one channel"));
        }
        let mut channels = channels.to_vec();
        channels.sort_by_key(Channel::number);
        channels.dedup();

        let _span = tracing::debug_span!("read_waveform", ?channels, bytes = width.bytes()).entered();

        let outcome = self.acquire(&channels, width);

        if let Err(e) = &outcome {
            log::warn!("Waveform read failed: {}", e);
            if let Err(discard_err) = self.transport.discard_input() {
                log::warn!("Could not discard pending input: {}", discard_err);
            }
        }

        self.trace.trace(&SessionEvent::Unfreeze {
            after_error: outcome.is_err(),
        });
        let unfrozen = self.transport.write_line(UNFREEZE);

        match (outcome, unfrozen) {
            (Ok(waveform), Ok(())) => Ok(waveform),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), unfrozen) => {
                if let Err(unfreeze_err) = unfrozen {
                    log::warn!("Could not resume acquisition: {}", unfreeze_err);
                }
                Err(e)
            }
        }
    }

    fn acquire(&mut self, channels: &[Channel], width: SampleWidth) -> Result<Waveform, ScopeError> {
        // Replies are parsed by header, so make sure headers are still on.
        self.transport.write_line("HEAD ON")?;

        self.trace.trace(&SessionEvent::Freeze);
        self.transport.write_line(FREEZE)?;

        self.trace.trace(&SessionEvent::ConfigureEncoding { width });
        self.transport.write_line("DAT:ENC RIB")?;
        self.transport.write_line(&format!("DAT:WID {}", width.bytes()))?;
        self.transport.write_line("DAT:STAR 1")?;
        self.transport.write_line(&format!("DAT:STOP {SAMPLE_COUNT}"))?;

        let mut traces = Vec::with_capacity(channels.len());
        let mut timebase: Option<Preamble> = None;

        for &channel in channels {
            let (preamble, volts) = self.read_channel(channel, width)?;

            if let Some(first) = &timebase {
                if !first.same_timebase(&preamble) {
                    return Err(ScopeError::protocol(format!(
                        "{channel} timebase (XZERO {}, XINCR {}) differs from earlier channel (XZERO {}, XINCR {})",
                        preamble.x_zero, preamble.x_increment, first.x_zero, first.x_increment
                    )));
                }
            }
            timebase = Some(preamble);
            traces.push(Trace { channel, volts });
        }

        let preamble =
            timebase.ok_or_else(|| ScopeError::invalid("channels", "none", "at least one channel"))?;
        Ok(Waveform {
            time: preamble.time_axis(SAMPLE_COUNT),
            traces,
        })
    }

    fn read_channel(
        &mut self,
        channel: Channel,
        width: SampleWidth,
    ) -> Result<(Preamble, Vec<f64>), ScopeError> {
        let _span = tracing::debug_span!("read_channel", %channel).entered();

        self.trace.trace(&SessionEvent::ChannelRequest { channel });
        self.transport.write_line(&format!("DAT:SOU {channel}"))?;

        let reply = self.transport.query(PREAMBLE_QUERY, None)?;
        let preamble = Preamble::parse(&reply)?;

        let block = {
            #[cfg(feature = "cpu-profiling")]
            let _zone = tracy_client::Client::running()
                .map(|client| client.span(tracy_client::span_location!("curve download"), 0));

            with_timeout(&mut self.transport, self.curve_timeout, |t| {
                t.write_line("CURV?")?;
                read_curve_block(t)
            })?
        };

        let allow_stray_byte = self.transport.may_send_stray_byte();
        let raw = decode_samples(&block.into_bytes(), width, SAMPLE_COUNT, allow_stray_byte)?;
        let volts = preamble.calibrate(&raw);
        self.trace.trace(&SessionEvent::ChannelDecoded {
            channel,
            samples: volts.len(),
        });

        Ok((preamble, volts))
    }

    /// Release the transport.
    pub fn close(mut self) -> Result<(), ScopeError> {
        self.transport.close()
    }

    pub fn into_transport(self) -> T {
        self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loopback::LoopbackTransport;
    use crate::scope_config::{Coupling, ProbeAttenuation, Slope, TriggerMode};
    use std::cell::RefCell;
    use std::rc::Rc;

    const PREAMBLE: &str =
        ":WFMPRE:XINCR 1.0E-6;:WFMPRE:XZERO -2.5E-3;:WFMPRE:YMULT 4.0E-2;:WFMPRE:YZERO 0.0E0;:WFMPRE:YOFF 1.0E1";

    const SETUP: [&str; 2] = ["*CLS", "HEAD ON"];

    fn scope() -> Scope<LoopbackTransport> {
        Scope::new(LoopbackTransport::new()).unwrap()
    }

    fn curve(declared: usize, payload: &[u8]) -> Vec<u8> {
        let len = declared.to_string();
        let mut bytes = format!(":CURVE #{}{}", len.len(), len).into_bytes();
        bytes.extend_from_slice(payload);
        bytes.extend_from_slice(b"\r\n");
        bytes
    }

    fn push_channel(link: &mut LoopbackTransport, preamble: &str, payload: &[u8]) {
        link.push_reply(preamble);
        link.push_bytes(&curve(payload.len(), payload));
    }

    #[derive(Default, Clone)]
    struct Recorder(Rc<RefCell<Vec<String>>>);

    impl TraceSink for Recorder {
        fn trace(&self, event: &SessionEvent<'_>) {
            self.0.borrow_mut().push(format!("{event:?}"));
        }
    }

    #[test]
    fn new_session_clears_status_and_enables_headers() {
        let scope = scope();
        assert_eq!(scope.transport().writes(), SETUP);
    }

    #[test]
    fn reads_single_channel_in_fast_mode() {
        let mut scope = scope();
        let payload = vec![35u8; SAMPLE_COUNT];
        scope.transport.push_reply(PREAMBLE);
        scope.transport.push_bytes(&curve(SAMPLE_COUNT, &payload));

        let waveform = scope.read_waveform(&[Channel::Ch1], SampleWidth::Fast).unwrap();

        assert_eq!(waveform.time.len(), SAMPLE_COUNT);
        assert_eq!(waveform.time[0], -0.0025);
        let trace = waveform.trace(Channel::Ch1).unwrap();
        assert_eq!(trace.volts.len(), SAMPLE_COUNT);
        assert!(trace.volts.iter().all(|v| (v - 1.0).abs() < 1e-12));
        assert!(waveform.trace(Channel::Ch2).is_none());

        let expected: Vec<&str> = SETUP
            .into_iter()
            .chain([
                "HEAD ON",
                "ACQ:STATE 0",
                "DAT:ENC RIB",
                "DAT:WID 1",
                "DAT:STAR 1",
                "DAT:STOP 2500",
                "DAT:SOU CH1",
                PREAMBLE_QUERY,
                "CURV?",
                "ACQ:STATE 1",
            ])
            .collect();
        assert_eq!(scope.transport.writes(), expected);
        assert_eq!(scope.transport.pending_reply_bytes(), 0);
    }

    #[test]
    fn reads_both_channels_in_fixed_order_with_full_width() {
        let mut scope = scope();
        let ch1: Vec<u8> = (0..SAMPLE_COUNT).flat_map(|_| 35i16.to_be_bytes()).collect();
        let ch2: Vec<u8> = (0..SAMPLE_COUNT).flat_map(|_| (-15i16).to_be_bytes()).collect();
        push_channel(&mut scope.transport, PREAMBLE, &ch1);
        push_channel(&mut scope.transport, PREAMBLE, &ch2);

        let waveform = scope
            .read_waveform(&[Channel::Ch2, Channel::Ch1, Channel::Ch2], SampleWidth::Full)
            .unwrap();

        let order: Vec<Channel> = waveform.traces.iter().map(|t| t.channel).collect();
        assert_eq!(order, [Channel::Ch1, Channel::Ch2]);
        assert!((waveform.trace(Channel::Ch1).unwrap().volts[0] - 1.0).abs() < 1e-12);
        assert!((waveform.trace(Channel::Ch2).unwrap().volts[2499] + 1.0).abs() < 1e-12);
        assert_eq!(scope.transport.count_writes("DAT:WID 2"), 1);
        assert_eq!(scope.transport.count_writes("CURV?"), 2);
        assert_eq!(scope.transport.count_writes("ACQ:STATE 1"), 1);
    }

    #[test]
    fn tolerates_one_extra_trailing_byte() {
        let mut scope = scope();
        let mut payload = vec![10u8; 5000];
        payload.push(0x00);
        scope.transport.push_reply(PREAMBLE);
        scope.transport.push_bytes(&curve(5000, &payload));

        let waveform = scope.read_waveform(&[Channel::Ch1], SampleWidth::Full).unwrap();
        assert_eq!(waveform.traces[0].volts.len(), SAMPLE_COUNT);
    }

    #[test]
    fn stray_byte_is_rejected_on_gpib_links() {
        let mut scope = Scope::new(LoopbackTransport::new().like_gpib()).unwrap();
        let mut payload = vec![10u8; 5000];
        payload.push(0x00);
        scope.transport.push_reply(PREAMBLE);
        scope.transport.push_bytes(&curve(5000, &payload));

        let err = scope
            .read_waveform(&[Channel::Ch1], SampleWidth::Full)
            .unwrap_err();

        assert!(matches!(err, ScopeError::ProtocolFormat(_)));
        assert_eq!(scope.transport.count_writes("ACQ:STATE 1"), 1);
    }

    #[test]
    fn block_shorter_than_its_header_fails_and_still_unfreezes() {
        let mut scope = scope();
        scope.transport.push_reply(PREAMBLE);
        scope.transport.push_bytes(&curve(5000, &[0u8; 4998]));

        let err = scope
            .read_waveform(&[Channel::Ch1], SampleWidth::Full)
            .unwrap_err();

        assert!(matches!(err, ScopeError::ProtocolFormat(_)));
        assert_eq!(scope.transport.count_writes("ACQ:STATE 1"), 1);
        assert_eq!(scope.transport.writes().last().unwrap(), "ACQ:STATE 1");
    }

    #[test]
    fn headers_are_turned_on_for_every_read() {
        let mut scope = scope();
        push_channel(&mut scope.transport, PREAMBLE, &[0u8; SAMPLE_COUNT]);
        push_channel(&mut scope.transport, PREAMBLE, &[0u8; SAMPLE_COUNT]);

        scope.read_waveform(&[Channel::Ch1], SampleWidth::Fast).unwrap();
        scope.read_waveform(&[Channel::Ch2], SampleWidth::Fast).unwrap();

        assert_eq!(scope.transport.count_writes("HEAD ON"), 3);
    }

    #[test]
    fn short_curve_block_fails_and_still_unfreezes() {
        let mut scope = scope();
        scope.transport.push_reply(PREAMBLE);
        scope.transport.push_bytes(&curve(4998, &[0u8; 4998]));

        let err = scope
            .read_waveform(&[Channel::Ch1], SampleWidth::Full)
            .unwrap_err();

        assert!(matches!(err, ScopeError::ProtocolFormat(_)));
        assert_eq!(scope.transport.count_writes("ACQ:STATE 1"), 1);
        assert_eq!(scope.transport.writes().last().unwrap(), "ACQ:STATE 1");
    }

    #[test]
    fn failure_on_second_channel_unfreezes_exactly_once() {
        let mut scope = scope();
        push_channel(&mut scope.transport, PREAMBLE, &[0u8; SAMPLE_COUNT]);
        scope.transport.push_reply(":WFMPRE:XINCR garbage");

        let err = scope
            .read_waveform(&[Channel::Ch1, Channel::Ch2], SampleWidth::Fast)
            .unwrap_err();

        assert!(matches!(err, ScopeError::ProtocolFormat(_)));
        assert_eq!(scope.transport.count_writes("ACQ:STATE 1"), 1);
        assert_eq!(scope.transport.count_writes("CURV?"), 1);
    }

    #[test]
    fn timeout_is_reported_and_acquisition_resumed() {
        let mut scope = scope();
        scope.transport.push_reply(PREAMBLE);

        let err = scope
            .read_waveform(&[Channel::Ch1], SampleWidth::Fast)
            .unwrap_err();

        assert!(matches!(err, ScopeError::Timeout { .. }));
        assert!(err.is_recoverable());
        assert_eq!(scope.transport.count_writes("ACQ:STATE 1"), 1);
    }

    #[test]
    fn disagreeing_timebases_fail_loudly() {
        let other = PREAMBLE.replace("XZERO -2.5E-3", "XZERO -5.0E-3");
        let mut scope = scope();
        push_channel(&mut scope.transport, PREAMBLE, &[0u8; SAMPLE_COUNT]);
        push_channel(&mut scope.transport, &other, &[0u8; SAMPLE_COUNT]);

        let err = scope
            .read_waveform(&[Channel::Ch1, Channel::Ch2], SampleWidth::Fast)
            .unwrap_err();

        assert!(matches!(err, ScopeError::ProtocolFormat(_)));
        assert_eq!(scope.transport.count_writes("ACQ:STATE 1"), 1);
    }

    #[test]
    fn curve_download_uses_the_curve_timeout() {
        let mut scope = scope();
        scope.set_curve_timeout(Duration::from_secs(30));
        let default_timeout = scope.transport.timeout();
        push_channel(&mut scope.transport, PREAMBLE, &[0u8; SAMPLE_COUNT]);

        scope.read_waveform(&[Channel::Ch1], SampleWidth::Fast).unwrap();

        assert_eq!(
            scope.transport.timeout_changes(),
            [Duration::from_secs(30), default_timeout]
        );
    }

    #[test]
    fn no_channels_is_rejected_before_any_write() {
        let mut scope = scope();
        let err = scope.read_waveform(&[], SampleWidth::Fast).unwrap_err();
        assert!(matches!(err, ScopeError::InvalidArgument { .. }));
        assert_eq!(scope.transport.writes(), SETUP);
    }

    #[test]
    fn trace_points_follow_the_read_sequence() {
        let recorder = Recorder::default();
        let mut link = LoopbackTransport::new();
        push_channel(&mut link, PREAMBLE, &[0u8; SAMPLE_COUNT]);
        let mut scope = Scope::with_trace_sink(link, Box::new(recorder.clone())).unwrap();

        scope.read_waveform(&[Channel::Ch1], SampleWidth::Fast).unwrap();

        let events = recorder.0.borrow();
        assert_eq!(
            *events,
            [
                "Freeze",
                "ConfigureEncoding { width: Fast }",
                "ChannelRequest { channel: Ch1 }",
                "ChannelDecoded { channel: Ch1, samples: 2500 }",
                "Unfreeze { after_error: false }",
            ]
        );
    }

    #[test]
    fn partial_channel_config_sends_only_present_fields() {
        let mut scope = scope();
        let outcome = scope
            .configure_channel(Channel::Ch1, &ChannelConfig::new().scale(2.0e-2))
            .unwrap();

        assert_eq!(outcome, CommandOutcome::Sent("CH1:SCA 2.00E-02".to_string()));
        assert_eq!(scope.transport.writes().last().unwrap(), "CH1:SCA 2.00E-02");
    }

    #[test]
    fn empty_config_writes_nothing() {
        let mut scope = scope();
        assert_eq!(
            scope.configure_channel(Channel::Ch2, &ChannelConfig::new()).unwrap(),
            CommandOutcome::NothingToSend
        );
        assert_eq!(
            scope.configure_trigger(&TriggerConfig::new()).unwrap(),
            CommandOutcome::NothingToSend
        );
        assert_eq!(scope.transport.writes(), SETUP);
    }

    #[test]
    fn invalid_enumerated_input_writes_nothing() {
        let mut scope = scope();

        let coupling = "XYZ".parse::<Coupling>();
        assert!(matches!(coupling, Err(ScopeError::InvalidArgument { .. })));

        let err = scope
            .configure_channel(
                Channel::Ch1,
                &ChannelConfig::new().coupling(Coupling::Ac).scale(f64::NAN),
            )
            .unwrap_err();
        assert!(matches!(err, ScopeError::InvalidArgument { .. }));
        assert_eq!(scope.transport.writes(), SETUP);
    }

    #[test]
    fn reads_configuration_back() {
        let mut scope = scope();
        scope
            .transport
            .push_reply(":CH2:PROBE 1.0E1;:CH2:SCALE 2.0E-2;:CH2:POSITION 0.0E0;:CH2:COUPLING AC;:CH2:BANDWIDTH ON");
        scope
            .transport
            .push_reply(":TRIGGER:MAIN:MODE NORMAL;:TRIGGER:MAIN:TYPE EDGE;:TRIGGER:MAIN:LEVEL 5.0E-1;:TRIGGER:MAIN:EDGE:COUPLING DC;:TRIGGER:MAIN:EDGE:SLOPE RISE");

        let channel = scope.channel_config(Channel::Ch2).unwrap();
        assert_eq!(channel.probe, Some(ProbeAttenuation::X10));
        assert_eq!(channel.scale, Some(0.02));
        assert_eq!(channel.coupling, Some(Coupling::Ac));
        assert_eq!(channel.bandwidth_limit, Some(true));

        let trigger = scope.trigger_config().unwrap();
        assert_eq!(trigger.mode, Some(TriggerMode::Normal));
        assert_eq!(trigger.level, Some(0.5));
        assert_eq!(trigger.edge_slope, Some(Slope::Rise));

        assert!(scope
            .transport
            .writes()
            .contains(&"CH2:PRO?;SCA?;POS?;COUP?;BAN?".to_string()));
    }

    #[test]
    fn identifies_instrument() {
        let mut scope = scope();
        scope.transport.push_reply("ID TEK/TDS 210,CF:91.1CT FV:v2.12 TDS2CM:CMV:v1.04");
        assert_eq!(
            scope.identify().unwrap(),
            "TEK/TDS 210,CF:91.1CT FV:v2.12 TDS2CM:CMV:v1.04"
        );
    }

    #[test]
    fn close_releases_the_transport() {
        let scope = scope();
        let mut link = scope.into_transport();
        assert!(link.is_open());
        link.close().unwrap();
        assert!(!link.is_open());
    }
}
