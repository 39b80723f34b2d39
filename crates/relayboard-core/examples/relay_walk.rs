//! Relay Board Walk-Through
//!
//! Opens a board, reports its name, GPIO levels and ADC readings, then
//! walks a single energized relay across every channel.
//!
//! Usage:
//!   cargo run --example relay_walk -- [OPTIONS] [PORT]
//!
//! Options:
//!   --port PORT       Serial port (default: /dev/ttyACM0)
//!   --relays N        Number of relays on the board (default: 16)
//!   --config FILE     Load board settings from a JSON file
//!   --delay MS        Time each relay stays on (default: 250)

use anyhow::Context;
use relayboard_core::pins::PIN_MAP;
use relayboard_core::prelude::*;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut port_name = "/dev/ttyACM0".to_string();
    let mut relay_count = 16usize;
    let mut config_path: Option<String> = None;
    let mut delay_ms = 250u64;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" | "-p" => {
                i += 1;
                if i < args.len() {
                    port_name = args[i].clone();
                }
            }
            "--relays" | "-r" => {
                i += 1;
                if i < args.len() {
                    relay_count = args[i].parse().context("--relays expects a number")?;
                }
            }
            "--config" | "-c" => {
                i += 1;
                config_path = args.get(i).cloned();
            }
            "--delay" | "-d" => {
                i += 1;
                if i < args.len() {
                    delay_ms = args[i].parse().unwrap_or(250);
                }
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            other if !other.starts_with('-') => {
                port_name = other.to_string();
            }
            other => {
                anyhow::bail!("unknown option {}", other);
            }
        }
        i += 1;
    }

    let config = match config_path {
        Some(path) => BoardConfig::load(&path).with_context(|| format!("loading {}", path))?,
        None => BoardConfig::new(port_name, relay_count),
    };

    let mut board = Board::try_open(config).context("opening relay board")?;
    if !board.clear_buffer()? {
        tracing::warn!("line still noisy, continuing anyway");
    }

    println!("Device name: {}", board.get_device_name()?);

    println!("Pin  GPIO  Level  ADC");
    for mapping in PIN_MAP.iter() {
        let level = board.read_gpio(u32::from(mapping.gpio))?;
        let adc = match mapping.adc {
            Some(channel) => format!("{:.3} V", board.read_adc_volts(u32::from(channel))?),
            None => "-".to_string(),
        };
        println!(
            "{:>3}  {:>4}  {:>5}  {}",
            mapping.pin,
            mapping.gpio,
            if level { "high" } else { "low" },
            adc
        );
    }

    let original = board.get_relays()?;
    println!("Relays on: {:?}", original.active());

    for relay in 0..board.relay_count() {
        let mut state = RelayState::all_off(board.relay_count());
        state.set(relay, true);
        board.set_relays(&state)?;
        std::thread::sleep(Duration::from_millis(delay_ms));
    }

    board.set_relays(&original)?;
    board.close()?;
    Ok(())
}

fn print_help() {
    println!("Relay Board Walk-Through");
    println!();
    println!("Usage: relay_walk [OPTIONS] [PORT]");
    println!();
    println!("Options:");
    println!("  --port, -p PORT     Serial port (default: /dev/ttyACM0)");
    println!("  --relays, -r N      Number of relays on the board (default: 16)");
    println!("  --config, -c FILE   Load board settings from a JSON file");
    println!("  --delay, -d MS      Time each relay stays on (default: 250)");
}
