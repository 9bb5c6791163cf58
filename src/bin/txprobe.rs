use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Parser;

use txprobe::{ports, Session, SessionOptions};

/// Reads channel configuration records from a transmitter over serial.
#[derive(Parser)]
#[command(name = "txprobe", version)]
struct Args {
    /// Serial port to open, skipping the interactive port selection.
    #[arg(short, long)]
    port: Option<String>,

    /// Prefix raw data lines with the time they were received (UTC).
    #[arg(long)]
    timestamps: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    eprintln!("txprobe (v{})", env!("CARGO_PKG_VERSION"));

    ctrlc::set_handler(|| {
        // Blocking terminal reads can't be woken up, so just leave. The OS
        // closes the port for us.
        println!();
        std::process::exit(0);
    })
    .context("Failed to install Ctrl-C handler")?;

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout();

    let path = match args.port {
        Some(path) => path,
        None => {
            let ports = ports::available_ports().context("Failed to list serial ports")?;
            ports::print_ports(&ports, &mut out)?;
            ports::prompt_for_port(&ports, &mut input, &mut out)
                .context("Invalid port selection")?
        }
    };

    let device = txprobe::open_device(&path)
        .with_context(|| format!("Failed to open serial port: {path}"))?;
    let mut session = Session::new(
        device,
        SessionOptions {
            timestamps: args.timestamps,
        },
    );
    session.run(&mut input, &mut out)?;
    out.flush()?;
    Ok(())
}
