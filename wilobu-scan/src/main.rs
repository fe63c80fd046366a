//! BLE bench tool for Wilobu devices
//!
//! Scans for Wilobu beacons and checks that they re-advertise after a
//! central disconnects.

use clap::{Parser, Subcommand};
use wilobu_scan::ble;

#[derive(Parser)]
#[command(name = "wilobu-scan")]
#[command(about = "BLE bench tool for Wilobu devices")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan for Wilobu devices
    Scan {
        /// Scan duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
        /// Show every device, not only those advertising the Wilobu service
        #[arg(short, long)]
        all: bool,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Connect and disconnect repeatedly, checking the device re-advertises each time
    Cycle {
        /// Device name or address to connect to
        #[arg(short, long)]
        device: Option<String>,
        /// Number of connect/disconnect rounds
        #[arg(short, long, default_value = "3")]
        rounds: u32,
        /// Seconds to wait for each advertisement
        #[arg(long, default_value = "5")]
        duration: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let adapter = ble::get_adapter().await?;

    match cli.command {
        Commands::Scan { duration, all, json } => {
            if !json {
                println!("Scanning for Wilobu devices ({} seconds)...", duration);
            }

            let devices = ble::scan(&adapter, duration, all).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&devices)?);
                return Ok(());
            }

            println!("\nFound {} devices:", devices.len());
            for device in &devices {
                let rssi = device
                    .rssi
                    .map(|r| format!("{} dBm", r))
                    .unwrap_or_else(|| "N/A".to_string());
                let marker = if device.is_wilobu() { " [WILOBU]" } else { "" };

                println!("  {} ({}) RSSI: {}{}", device.name, device.address, rssi, marker);
            }
        }
        Commands::Cycle {
            device,
            rounds,
            duration,
        } => {
            let name = ble::cycle(&adapter, device.as_deref(), rounds, duration).await?;
            println!("{} re-advertised after {} disconnect(s)", name, rounds);
        }
    }

    Ok(())
}
