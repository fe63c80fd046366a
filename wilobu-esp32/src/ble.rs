//! NimBLE implementation of the Wilobu BLE stack traits
//!
//! Advertises the Wilobu service UUID in the primary packet and the device
//! name in the scan response. Advertising restarts are owned by the
//! controller, so the server's own re-advertise on disconnect is turned off.

use std::sync::Arc;

use esp32_nimble::{
    enums::{PowerLevel, PowerType},
    utilities::{mutex::Mutex, BleUuid},
    BLEAdvertising, BLEDevice, BLEError,
};
use log::*;
use wilobu_mcu::{Advertiser, AdvertisingPlan, BleStack, ConnectionEvents};

/// NimBLE stores 128-bit UUIDs little-endian
fn ble_uuid(uuid: u128) -> BleUuid {
    BleUuid::from_uuid128(uuid.to_le_bytes())
}

/// Advertising handle shared with the disconnect callback
#[derive(Clone, Copy)]
pub struct NimbleAdvertiser(&'static Mutex<BLEAdvertising>);

impl Advertiser for NimbleAdvertiser {
    type Error = BLEError;

    fn start(&self) -> Result<(), BLEError> {
        self.0.lock().start()
    }
}

/// The NimBLE host, taken once at boot
pub struct NimbleStack {
    device: &'static mut BLEDevice,
}

impl NimbleStack {
    /// Initialize the NimBLE host. Panics inside esp32-nimble if the radio
    /// cannot be brought up, which ends in a chip reset.
    pub fn take() -> Self {
        let device = BLEDevice::take();
        device.get_server().advertise_on_disconnect(false);
        Self { device }
    }
}

impl BleStack for NimbleStack {
    type Error = BLEError;
    type Advertiser = NimbleAdvertiser;

    fn hardware_address(&self) -> Result<String, BLEError> {
        Ok(self.device.get_addr()?.to_string())
    }

    fn set_max_tx_power(&mut self) -> Result<(), BLEError> {
        self.device.set_power(PowerType::Default, PowerLevel::P9)
    }

    fn set_device_name(&mut self, name: &str) -> Result<(), BLEError> {
        BLEDevice::set_device_name(name)
    }

    fn add_service(&mut self, uuid: u128) -> Result<(), BLEError> {
        // No characteristics yet, the service only has to exist
        let _service = self.device.get_server().create_service(ble_uuid(uuid));
        Ok(())
    }

    fn set_connection_events(
        &mut self,
        events: Arc<dyn ConnectionEvents>,
    ) -> Result<(), BLEError> {
        let server = self.device.get_server();

        let on_connect = events.clone();
        server.on_connect(move |_server, desc| {
            debug!("BLE client connected, handle {}", desc.conn_handle());
            on_connect.on_connect();
        });

        server.on_disconnect(move |_desc, reason| {
            debug!("BLE client disconnected: {:?}", reason);
            events.on_disconnect();
        });

        Ok(())
    }

    fn configure_advertising(&mut self, plan: &AdvertisingPlan) -> Result<(), BLEError> {
        let mut advertising = self.device.get_advertising().lock();

        // Raw payloads: set_data would clear the scan response whenever the
        // primary packet fits on its own
        advertising.scan_response(true);
        advertising.set_raw_data(&plan.adv_data())?;
        advertising.set_raw_scan_response_data(&plan.scan_response_data())?;

        Ok(())
    }

    fn advertiser(&self) -> NimbleAdvertiser {
        NimbleAdvertiser(self.device.get_advertising())
    }
}
