//! Stimulator Link Check Tool
//!
//! Takes remote control of a Magstim unit, prints its status and settings,
//! and optionally sets the power level, then hands control back.
//!
//! Usage:
//!   cargo run --example stim_check -- [OPTIONS] [PORT]
//!
//! Options:
//!   --port PORT       Serial port (default: first available)
//!   --config FILE     Load connection settings from a JSON file
//!   --power LEVEL     Set the power level (0-100) before reading settings
//!   --paired          Configure BiStim paired pulses instead of simultaneous discharge
//!   --hold SECS       Keep remote control for a while before disconnecting
//!   --list            List serial ports and exit
//!
//! Set RUST_LOG=tmslink_core=trace to see every frame on the link.

use std::time::Duration;
use tmslink_core::protocol::list_ports;
use tmslink_core::{LinkConfig, Stimulator, StimulatorConfig};

fn main() {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().collect();

    let mut port_name: Option<String> = None;
    let mut config_file: Option<String> = None;
    let mut power: Option<u32> = None;
    let mut simultaneous_discharge = true;
    let mut hold_secs = 0u64;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" | "-p" => {
                i += 1;
                if i < args.len() {
                    port_name = Some(args[i].clone());
                }
            }
            "--config" | "-c" => {
                i += 1;
                if i < args.len() {
                    config_file = Some(args[i].clone());
                }
            }
            "--power" => {
                i += 1;
                if i < args.len() {
                    power = args[i].parse().ok();
                }
            }
            "--paired" => {
                simultaneous_discharge = false;
            }
            "--hold" => {
                i += 1;
                if i < args.len() {
                    hold_secs = args[i].parse().unwrap_or(0);
                }
            }
            "--list" | "-l" => {
                print_ports();
                return;
            }
            "--help" | "-h" => {
                print_help();
                return;
            }
            arg if !arg.starts_with('-') => {
                port_name = Some(arg.to_string());
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
            }
        }
        i += 1;
    }

    let mut link = match &config_file {
        Some(path) => match LinkConfig::from_file(path) {
            Ok(link) => link,
            Err(e) => {
                eprintln!("❌ Failed to load {}: {}", path, e);
                return;
            }
        },
        None => LinkConfig::default(),
    };
    if let Some(name) = port_name {
        link.port_name = name;
    }
    if link.port_name.is_empty() {
        match list_ports().into_iter().next() {
            Some(port) => link.port_name = port.name,
            None => {
                eprintln!("❌ No serial ports found");
                return;
            }
        }
    }

    println!("Configuration:");
    println!("  Port:              {}", link.port_name);
    println!("  Baud rate:         {}", link.baud_rate);
    println!("  Reply timeout:     {}ms", link.reply_timeout_ms);
    println!("  Keepalive:         {}ms", link.keepalive_interval_ms);
    println!("  Simultaneous:      {}", simultaneous_discharge);
    println!();

    let config = StimulatorConfig {
        link,
        simultaneous_discharge,
    };
    let mut stim = match Stimulator::connect(&config) {
        Ok(stim) => stim,
        Err(e) => {
            eprintln!("❌ Failed to connect: {}", e);
            eprintln!("   Make sure the unit is on and you have permission (dialout group)");
            return;
        }
    };
    println!("✓ Remote control established");

    if let Some(level) = power {
        match stim.set_power(level) {
            Ok(_) => println!("✓ Power set to {}", level),
            Err(e) => eprintln!("❌ Failed to set power: {}", e),
        }
    }

    match stim.settings() {
        Ok(settings) => {
            println!();
            println!("Settings:");
            println!("  Power A:           {}", settings.power_a);
            println!("  Power B:           {}", settings.power_b);
            println!("  Pulse interval:    {}", settings.pulse_interval);
        }
        Err(e) => eprintln!("❌ Failed to read settings: {}", e),
    }

    if let Some(status) = stim.status() {
        println!();
        println!("Status:");
        for (field, value) in status.fields() {
            println!("  {:<18} {}", format!("{}:", field), value);
        }
    }

    if hold_secs > 0 {
        println!();
        println!("Holding remote control for {}s...", hold_secs);
        std::thread::sleep(Duration::from_secs(hold_secs));
        println!("✓ Link alive: {}", stim.session().is_running());
    }

    match stim.disconnect() {
        Ok(()) => println!("✓ Remote control released"),
        Err(e) => eprintln!("⚠ Disconnect reported: {}", e),
    }
}

fn print_ports() {
    let ports = list_ports();
    if ports.is_empty() {
        println!("No serial ports found");
        return;
    }
    for port in ports {
        match (port.vid, port.pid) {
            (Some(vid), Some(pid)) => println!(
                "  {}  [{:04x}:{:04x}] {}",
                port.name,
                vid,
                pid,
                port.product.unwrap_or_default()
            ),
            _ => println!("  {}", port.name),
        }
    }
}

fn print_help() {
    println!("Stimulator Link Check Tool");
    println!();
    println!("Usage: stim_check [OPTIONS] [PORT]");
    println!();
    println!("Options:");
    println!("  --port, -p PORT     Serial port (default: first available)");
    println!("  --config, -c FILE   Load connection settings from JSON");
    println!("  --power LEVEL       Set power level (0-100)");
    println!("  --paired            BiStim paired pulses instead of simultaneous discharge");
    println!("  --hold SECS         Keep remote control for SECS seconds");
    println!("  --list, -l          List serial ports and exit");
    println!("  --help, -h          Show this help");
}
