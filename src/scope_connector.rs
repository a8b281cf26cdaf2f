use crate::address::{InstrumentAddress, DEFAULT_BAUD_RATE};
use crate::error::ScopeError;
use crate::serial_transport::SerialTransport;
use crate::transport::{Transport, TransportSettings};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    pub address: InstrumentAddress,
    /// Whatever the host reports about the port or resource.
    pub description: String,
}

impl DiscoveredDevice {
    pub fn new(address: InstrumentAddress, description: String) -> Self {
        Self {
            address,
            description,
        }
    }
}

/// Picks the transport that matches an address and enumerates candidates.
pub struct ScopeConnector;

impl ScopeConnector {
    /// Open the link named by `address`.
    ///
    /// A baud rate carried by a serial address wins over the one in
    /// `settings`.
    pub fn open(
        address: &InstrumentAddress,
        settings: &TransportSettings,
    ) -> Result<Box<dyn Transport>, ScopeError> {
        log::debug!("Connecting to {}", address);
        match address {
            InstrumentAddress::Serial { port, baud_rate } => {
                let settings = settings.clone().with_baud_rate(*baud_rate);
                let transport = SerialTransport::open(port, &settings)?;
                log::debug!("Serial link on {} ready", transport.port_name());
                Ok(Box::new(transport))
            }
            InstrumentAddress::Visa { resource } => Self::open_visa(resource, settings),
        }
    }

    #[cfg(feature = "gpib")]
    fn open_visa(
        resource: &str,
        settings: &TransportSettings,
    ) -> Result<Box<dyn Transport>, ScopeError> {
        let transport = crate::visa_transport::VisaTransport::open(resource, settings)?;
        log::debug!("VISA link on {} ready", transport.resource());
        Ok(Box::new(transport))
    }

    #[cfg(not(feature = "gpib"))]
    fn open_visa(
        resource: &str,
        _settings: &TransportSettings,
    ) -> Result<Box<dyn Transport>, ScopeError> {
        Err(ScopeError::ConnectionFailed {
            address: resource.to_string(),
            reason: "built without the 'gpib' feature".to_string(),
        })
    }

    /// Every serial port on the host, plus every VISA instrument when built
    /// with the `gpib` feature.
    ///
    /// Serial ports cannot be told apart from other equipment without
    /// talking to them, so all of them are listed.
    pub fn available_devices() -> Result<Vec<DiscoveredDevice>, ScopeError> {
        let mut devices: Vec<DiscoveredDevice> = serialport::available_ports()?
            .into_iter()
            .map(|port| {
                let description = describe_port(&port.port_type);
                DiscoveredDevice::new(
                    InstrumentAddress::Serial {
                        port: port.port_name,
                        baud_rate: DEFAULT_BAUD_RATE,
                    },
                    description,
                )
            })
            .collect();

        devices.extend(visa_devices());

        log::debug!("Found {} candidate devices", devices.len());
        Ok(devices)
    }
}

#[cfg(feature = "gpib")]
fn visa_devices() -> Vec<DiscoveredDevice> {
    match crate::visa_transport::VisaTransport::list_resources() {
        Ok(resources) => resources
            .into_iter()
            .map(|resource| {
                DiscoveredDevice::new(
                    InstrumentAddress::Visa { resource },
                    "VISA instrument".to_string(),
                )
            })
            .collect(),
        Err(e) => {
            log::warn!("VISA enumeration failed: {}", e);
            Vec::new()
        }
    }
}

#[cfg(not(feature = "gpib"))]
fn visa_devices() -> Vec<DiscoveredDevice> {
    Vec::new()
}

fn describe_port(port_type: &serialport::SerialPortType) -> String {
    match port_type {
        serialport::SerialPortType::UsbPort(usb) => {
            let product = usb.product.as_deref().unwrap_or("USB serial");
            format!("{product} ({:04x}:{:04x})", usb.vid, usb.pid)
        }
        serialport::SerialPortType::PciPort => "PCI serial port".to_string(),
        serialport::SerialPortType::BluetoothPort => "Bluetooth serial port".to_string(),
        serialport::SerialPortType::Unknown => "serial port".to_string(),
    }
}
