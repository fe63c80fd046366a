//! BLE stack traits for the Wilobu beacon
//!
//! Protocol constants (service UUID, name prefix) are in wilobu_proto::ble.
//! This module provides the seams an MCU BLE stack plugs into.

use std::fmt::Debug;
use std::sync::Arc;

// Re-export protocol constants for convenience
pub use wilobu_proto::ble::{DEVICE_NAME_PREFIX, SERVICE_UUID, SERVICE_UUID_U128};
use wilobu_proto::DeviceIdentity;

/// Largest legacy advertising or scan-response payload
pub const MAX_AD_LEN: usize = 31;

/// AD type codes (Bluetooth Core Supplement, part A)
pub mod ad_type {
    pub const FLAGS: u8 = 0x01;
    pub const COMPLETE_128_BIT_UUIDS: u8 = 0x07;
    pub const SHORTENED_LOCAL_NAME: u8 = 0x08;
    pub const COMPLETE_LOCAL_NAME: u8 = 0x09;
}

/// LE General Discoverable, BR/EDR not supported
const DISCOVERABLE_FLAGS: u8 = 0x06;

fn push_field(buf: &mut Vec<u8>, ad_type: u8, value: &[u8]) {
    buf.push(value.len() as u8 + 1);
    buf.push(ad_type);
    buf.extend_from_slice(value);
}

/// What goes into the advertising and scan-response packets
///
/// The service UUID rides in the primary packet so scanners can filter on it.
/// The name goes into the scan response, leaving room for the 128-bit UUID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisingPlan {
    pub service_uuid: u128,
    pub scan_response_name: String,
}

impl AdvertisingPlan {
    pub fn for_identity(identity: &DeviceIdentity) -> Self {
        Self {
            service_uuid: SERVICE_UUID_U128,
            scan_response_name: identity.name().to_string(),
        }
    }

    /// Primary packet: flags and the complete 128-bit service UUID list
    pub fn adv_data(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(MAX_AD_LEN);
        push_field(&mut buf, ad_type::FLAGS, &[DISCOVERABLE_FLAGS]);
        // AD fields carry UUIDs little-endian
        push_field(
            &mut buf,
            ad_type::COMPLETE_128_BIT_UUIDS,
            &self.service_uuid.to_le_bytes(),
        );
        buf
    }

    /// Scan response: the local name, shortened if it cannot fit
    pub fn scan_response_data(&self) -> Vec<u8> {
        let name = self.scan_response_name.as_bytes();
        let room = MAX_AD_LEN - 2;

        let mut buf = Vec::with_capacity(MAX_AD_LEN);
        if name.len() <= room {
            push_field(&mut buf, ad_type::COMPLETE_LOCAL_NAME, name);
        } else {
            push_field(&mut buf, ad_type::SHORTENED_LOCAL_NAME, &name[..room]);
        }
        buf
    }
}

/// Connection callbacks delivered by the BLE stack
///
/// The stack calls these from its own task, at any time relative to the
/// main loop.
pub trait ConnectionEvents: Send + Sync {
    fn on_connect(&self);

    fn on_disconnect(&self);
}

/// Handle that (re)starts advertising
///
/// Shared with the disconnect callback, so `start` takes `&self`.
pub trait Advertiser: Send + Sync {
    /// Error type for advertising operations
    type Error: Debug;

    /// Start advertising with the configured plan
    fn start(&self) -> Result<(), Self::Error>;
}

/// Trait for BLE stack implementations
///
/// MCU-specific crates implement this trait using their BLE stack. A stack
/// does not resume advertising by itself after a peer disconnects; the
/// registered `ConnectionEvents` owns that restart.
pub trait BleStack {
    /// Error type for BLE operations
    type Error: Debug;

    type Advertiser: Advertiser<Error = Self::Error> + 'static;

    /// Radio hardware address as `AA:BB:CC:DD:EE:FF`
    fn hardware_address(&self) -> Result<String, Self::Error>;

    /// Highest transmit power the radio supports, favoring discovery over battery
    fn set_max_tx_power(&mut self) -> Result<(), Self::Error>;

    /// GAP device name reported by the Device Name characteristic
    fn set_device_name(&mut self, name: &str) -> Result<(), Self::Error>;

    /// Register and start a primary GATT service
    fn add_service(&mut self, uuid: u128) -> Result<(), Self::Error>;

    fn set_connection_events(
        &mut self,
        events: Arc<dyn ConnectionEvents>,
    ) -> Result<(), Self::Error>;

    /// Load `plan.adv_data()` and `plan.scan_response_data()` as the
    /// advertising and scan-response payloads
    fn configure_advertising(&mut self, plan: &AdvertisingPlan) -> Result<(), Self::Error>;

    fn advertiser(&self) -> Self::Advertiser;
}
