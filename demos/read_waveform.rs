// Waveform download example
//
// Reads the current record of one or both channels and prints it as a
// polars DataFrame, optionally repeating as fast as the link allows.

use clap::Parser;
use std::time::{Duration, Instant};
use tdsscope_rs::{Channel, InstrumentAddress, SampleWidth, Scope, TransportSettings};

#[derive(Parser)]
#[command(name = "read_waveform")]
#[command(about = "Download waveforms from a TDS oscilloscope")]
#[command(long_about = "Halts acquisition, downloads the 2500-point record of the selected channels and resumes acquisition. Use --count to measure transfer throughput.")]
struct Args {
    /// Instrument address, e.g. serial:/dev/ttyUSB0@9600 or visa:GPIB0::1::INSTR
    address: InstrumentAddress,

    /// Channels to read
    #[arg(short, long, value_delimiter = ',', default_value = "CH1")]
    channels: Vec<Channel>,

    /// Transfer 16-bit samples instead of 8-bit ones
    #[arg(short, long)]
    full: bool,

    /// Number of consecutive reads
    #[arg(short = 'n', long, default_value_t = 1)]
    count: u32,

    /// Curve download timeout in seconds
    #[arg(long, default_value_t = 10)]
    curve_timeout: u64,

    /// Enable verbose logging
    #[arg(short, long, help = "Show debug information and detailed logs")]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::init();
    }

    let width = SampleWidth::from_fast_mode(!args.full);
    let mut scope = Scope::connect(&args.address, &TransportSettings::default())?;
    scope.set_curve_timeout(Duration::from_secs(args.curve_timeout));
    println!("✓ Connected to {}", scope.identify()?);

    let start = Instant::now();
    for i in 1..=args.count {
        match scope.read_waveform(&args.channels, width) {
            Ok(waveform) => {
                if args.count == 1 {
                    println!("{}", waveform.to_dataframe()?);
                } else {
                    let elapsed = start.elapsed().as_secs_f64();
                    println!(
                        "[{i}/{}] {} traces | {:.2} reads/s",
                        args.count,
                        waveform.traces.len(),
                        f64::from(i) / elapsed
                    );
                }
            }
            Err(e) if e.is_recoverable() => {
                eprintln!("Read {i} failed: {e}, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }

    scope.close()?;
    Ok(())
}
