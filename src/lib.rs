//! # TDSScope RS
//!
//! A Rust library for configuring Tektronix TDS-family oscilloscopes and
//! downloading calibrated waveforms over a serial line or GPIB.
//!
//! ## Features
//!
//! - **Two transports, one interface**: `serialport` for RS-232 and USB
//!   adapters, `visa-rs` for GPIB behind the `gpib` feature
//! - **Binary curve framing**: `#<n><len>` blocks read by declared length,
//!   so payload bytes that look like line ends are never mistaken for one
//! - **Safe acquisition**: waveform reads halt acquisition and always
//!   restart it, even when the transfer fails
//! - **Typed configuration**: channel, timebase and trigger settings with
//!   validation before anything reaches the wire
//! - **DataFrame output**: waveforms convert to `polars` frames
//!
//! ## Examples
//!
//! ### Reading a Waveform
//!
//! ```rust,no_run
//! use tdsscope_rs::{Channel, InstrumentAddress, SampleWidth, Scope, TransportSettings};
//!
//! let address: InstrumentAddress = "serial:/dev/ttyUSB0@9600".parse()?;
//! let mut scope = Scope::connect(&address, &TransportSettings::default())?;
//! println!("Connected to {}", scope.identify()?);
//!
//! let waveform = scope.read_waveform(&[Channel::Ch1, Channel::Ch2], SampleWidth::Fast)?;
//! let df = waveform.to_dataframe()?;
//! println!("{df}");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ### Configuring Channels and Trigger
//!
//! ```rust
//! use tdsscope_rs::{Channel, ChannelConfig, Coupling, LoopbackTransport, Scope, Slope, TriggerConfig};
//!
//! let mut scope = Scope::new(LoopbackTransport::new())?;
//!
//! scope.configure_channel(Channel::Ch1, &ChannelConfig::new().scale(2.0e-2).coupling(Coupling::Dc))?;
//! scope.configure_trigger(&TriggerConfig::new().level(0.5).edge_slope(Slope::Fall))?;
//!
//! assert_eq!(scope.transport().writes()[2], "CH1:SCA 2.00E-02;COUP DC");
//! assert_eq!(scope.transport().writes()[3], "TRIG:MAI:LEV 5.00E-01;:TRIG:MAI:EDGE:SLO FALL");
//! # Ok::<(), tdsscope_rs::ScopeError>(())
//! ```
//!
//! ### Device Discovery
//!
//! ```rust,no_run
//! use tdsscope_rs::ScopeConnector;
//!
//! for device in ScopeConnector::available_devices()? {
//!     println!("{}  {}", device.address, device.description);
//! }
//! # Ok::<(), tdsscope_rs::ScopeError>(())
//! ```

pub mod address;
pub mod config_codec;
pub mod error;
pub mod line_protocol;
pub mod loopback;
pub mod scope;
pub mod scope_config;
pub mod scope_connector;
pub mod serial_transport;
pub mod transport;
#[cfg(feature = "gpib")]
pub mod visa_transport;
pub mod waveform;

// Re-export the main types for convenience
pub use address::InstrumentAddress;
pub use error::ScopeError;
pub use transport::{Transport, TransportSettings};

pub use loopback::LoopbackTransport;
pub use serial_transport::SerialTransport;
#[cfg(feature = "gpib")]
pub use visa_transport::VisaTransport;

pub use scope_config::{
    Channel, ChannelConfig, Coupling, EdgeCoupling, ProbeAttenuation, Slope, TimebaseConfig,
    TriggerConfig, TriggerMode, TriggerType,
};

pub use scope::{CommandOutcome, LogTraceSink, Scope, SessionEvent, TraceSink};
pub use scope_connector::{DiscoveredDevice, ScopeConnector};
pub use waveform::{SampleWidth, Trace, Waveform};
