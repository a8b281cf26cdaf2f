// Device discovery example
//
// Lists every serial port (and VISA instrument, with the `gpib` feature)
// that could host an oscilloscope, then optionally asks one for its identity.

use clap::Parser;
use tdsscope_rs::{InstrumentAddress, Scope, ScopeConnector, TransportSettings};

#[derive(Parser)]
#[command(name = "list_devices")]
#[command(about = "List candidate oscilloscope connections")]
struct Args {
    /// Query the identity of this address after listing, e.g. serial:/dev/ttyUSB0
    #[arg(short, long)]
    identify: Option<InstrumentAddress>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    println!("TDS Oscilloscope Discovery");
    println!("==========================\n");

    let devices = ScopeConnector::available_devices()?;
    if devices.is_empty() {
        println!("No serial ports or VISA instruments found.");
    }
    for (i, device) in devices.iter().enumerate() {
        println!("  {}. {}  ({})", i + 1, device.address, device.description);
    }

    if let Some(address) = args.identify {
        println!("\nAsking {address} to identify itself...");
        let mut scope = Scope::connect(&address, &TransportSettings::default())?;
        println!("✓ {}", scope.identify()?);
        scope.close()?;
    }

    Ok(())
}
