use std::{
    path::PathBuf,
    process::ExitCode,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use anyhow::{Context, Result, bail};
use clap::Parser;
use fugit::MillisDurationU32;
use goodwe_rs485_probe::{
    channel::{Channel, ChannelConfig, DEFAULT_BAUD_RATE, DEFAULT_PORT},
    delay::InterruptibleDelay,
    error::Error,
    logging,
    port::{available_port_names, open_serial},
    sequencer::Sequencer,
    types::{DEFAULT_ATTEMPTS, RunPlan},
};
use inquire::Select;
use log::Log;

const EPILOG: &str = "\
Examples:
  # Test with default settings (assumes /dev/ttyUSB0)
  rs485-probe

  # Specify custom serial port
  rs485-probe --port /dev/ttyUSB1

  # Change baud rate (not recommended - use 9600 for Goodwe)
  rs485-probe --baudrate 19200

  # Specify custom log file
  rs485-probe --log-file /var/log/rs485_test.log

Note: Make sure you have proper permissions to access the serial port.
You may need to add your user to the 'dialout' group or run with sudo.";

/// RS485 communication test for the Goodwe GW3000SS inverter
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None, after_help = EPILOG)]
struct Args {
    /// Serial port path
    #[arg(short, long, env = "RS485_PORT", default_value = DEFAULT_PORT)]
    port: String,

    /// Baud rate
    #[arg(short, long, default_value_t = DEFAULT_BAUD_RATE)]
    baudrate: u32,

    /// Log file path, appended to on every run
    #[arg(short, long, default_value = "rs485_test.log")]
    log_file: PathBuf,

    /// Sends per phase
    #[arg(long, default_value_t = DEFAULT_ATTEMPTS, value_parser = clap::value_parser!(u32).range(1..))]
    attempts: u32,

    /// Milliseconds between sends within a phase
    #[arg(long, default_value_t = 2000)]
    interval_ms: u32,

    /// Print the serial ports found on this machine and exit
    #[arg(long)]
    list_ports: bool,

    /// Pick the serial port from a list instead of using --port
    #[arg(long, conflicts_with = "port")]
    select: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(code) => code,
        Err(err) => {
            log::error!("Fatal error: {:#}", err);
            println!("\nFATAL ERROR: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    if args.list_ports {
        for name in available_port_names()? {
            println!("{}", name);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let port = if args.select {
        select_port()?
    } else {
        args.port
    };

    let (level, logger) = logging::build_dispatch(&args.log_file)
        .with_context(|| format!("Failed to open log file {}", args.log_file.display()))?;
    let logger: &'static dyn Log = Box::leak(logger);
    log::set_logger(logger)?;
    log::set_max_level(level);

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = Arc::clone(&running);
    ctrlc::set_handler(move || handler_flag.store(false, Ordering::SeqCst))
        .context("Failed to set Ctrl+C handler")?;

    let config = ChannelConfig::new(port, args.baudrate);
    let channel = match Channel::open(&config, logger, open_serial) {
        Ok(channel) => channel,
        Err(Error::Connection { port, cause }) => {
            log::error!("Failed to connect to {}: {}", port, cause);
            print_connection_help(&port);
            return Ok(ExitCode::FAILURE);
        }
        Err(err) => bail!(err.to_string()),
    };

    let plan = RunPlan {
        attempts: args.attempts,
        interval: MillisDurationU32::millis(args.interval_ms),
        ..RunPlan::default()
    };
    let delay = InterruptibleDelay::new(Arc::clone(&running));
    let mut sequencer = Sequencer::new(channel, delay, logger)
        .with_plan(plan)
        .with_running_flag(running);

    let completed = sequencer.run_all();
    logger.flush();

    Ok(if completed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn select_port() -> Result<String> {
    let ports = available_port_names()?;
    if ports.is_empty() {
        bail!("No serial ports found!");
    }
    Ok(Select::new("Select a serial port:", ports).prompt()?)
}

fn print_connection_help(port: &str) {
    println!("\nERROR: Failed to connect to {}", port);
    println!("Please check:");
    println!("  1. The device is connected");
    println!("  2. The port path is correct");
    println!("  3. You have proper permissions (try: sudo usermod -a -G dialout $USER)");
    println!("  4. No other program is using the port");
}
