// Configuration example
//
// Applies channel, timebase and trigger settings given on the command line,
// then reads them back from the instrument.

use clap::Parser;
use tdsscope_rs::{
    Channel, ChannelConfig, Coupling, EdgeCoupling, InstrumentAddress, ProbeAttenuation, Scope,
    Slope, TimebaseConfig, TransportSettings, TriggerConfig, TriggerMode, TriggerType,
};

#[derive(Parser)]
#[command(name = "configure")]
#[command(about = "Configure a TDS oscilloscope and print the resulting settings")]
struct Args {
    /// Instrument address, e.g. serial:/dev/ttyUSB0
    address: InstrumentAddress,

    /// Channel the vertical settings apply to
    #[arg(long, default_value = "CH1")]
    channel: Channel,

    /// Probe attenuation (1, 10, 100 or 1000)
    #[arg(long)]
    probe: Option<ProbeAttenuation>,

    /// Volts per division
    #[arg(long)]
    volts_per_div: Option<f64>,

    /// Vertical position in divisions
    #[arg(long, allow_hyphen_values = true)]
    position: Option<f64>,

    /// DC, AC or GND
    #[arg(long)]
    coupling: Option<Coupling>,

    /// Turn the 20 MHz bandwidth limit on or off
    #[arg(long)]
    bandwidth_limit: Option<bool>,

    /// Seconds per division
    #[arg(long)]
    seconds_per_div: Option<f64>,

    /// Horizontal trigger offset in seconds
    #[arg(long, allow_hyphen_values = true)]
    horizontal_position: Option<f64>,

    /// NORMAL or AUTO
    #[arg(long)]
    trigger_mode: Option<TriggerMode>,

    /// EDGE or VIDEO
    #[arg(long)]
    trigger_type: Option<TriggerType>,

    /// Trigger level in volts
    #[arg(long, allow_hyphen_values = true)]
    trigger_level: Option<f64>,

    /// AC, DC, NOISEREJ, HFREJ or NJREJ
    #[arg(long)]
    edge_coupling: Option<EdgeCoupling>,

    /// RISE or FALL
    #[arg(long)]
    slope: Option<Slope>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let channel = ChannelConfig {
        probe: args.probe,
        scale: args.volts_per_div,
        position: args.position,
        coupling: args.coupling,
        bandwidth_limit: args.bandwidth_limit,
    };
    let timebase = TimebaseConfig {
        position: args.horizontal_position,
        scale: args.seconds_per_div,
    };
    let trigger = TriggerConfig {
        mode: args.trigger_mode,
        kind: args.trigger_type,
        level: args.trigger_level,
        edge_coupling: args.edge_coupling,
        edge_slope: args.slope,
    };

    let mut scope = Scope::connect(&args.address, &TransportSettings::default())?;

    println!("{:?}", scope.configure_channel(args.channel, &channel)?);
    println!("{:?}", scope.configure_timebase(&timebase)?);
    println!("{:?}", scope.configure_trigger(&trigger)?);

    println!("\n{}: {:#?}", args.channel, scope.channel_config(args.channel)?);
    println!("Timebase: {:#?}", scope.timebase_config()?);
    println!("Trigger: {:#?}", scope.trigger_config()?);

    scope.close()?;
    Ok(())
}
