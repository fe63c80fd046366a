//! Wilobu BLE beacon for ESP32
//!
//! Advertises as `Wilobu-XXXX` (last two MAC octets) with the Wilobu service
//! UUID so the companion app can find it, and re-advertises whenever the app
//! disconnects.

mod ble;

use log::*;
use wilobu_proto::SERVICE_UUID;

fn main() {
    // Initialize ESP-IDF
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    info!("Wilobu firmware v{}", env!("CARGO_PKG_VERSION"));
    info!("Initializing...");

    if let Err(e) = run() {
        // No recovery below this layer, start over
        error!("BLE startup failed: {:?}", e);
        restart_device();
    }
}

fn run() -> anyhow::Result<()> {
    let mut stack = ble::NimbleStack::take();
    let controller = wilobu_mcu::boot(&mut stack)?;

    info!("-------------------------------------------");
    info!("   WILOBU ACTIVE: {}", controller.identity().name());
    info!("   UUID: {}", SERVICE_UUID);
    info!("-------------------------------------------");

    // TODO: GPS and sensor acquisition go here once the hardware lands
    loop {
        std::thread::sleep(controller.idle_interval());
    }
}

/// Restart the device
fn restart_device() -> ! {
    info!("Restarting in 1 second...");
    std::thread::sleep(std::time::Duration::from_secs(1));
    unsafe {
        esp_idf_svc::sys::esp_restart();
    }
}
