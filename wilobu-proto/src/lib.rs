//! Wilobu advertisement contract
//!
//! Shared by the firmware and the host-side tools: the service UUID the
//! companion app filters on, the advertised name format, and the derivation
//! of a device name from the radio's hardware address.

pub mod ble;
pub mod identity;

pub use ble::{DEVICE_NAME_PREFIX, SERVICE_UUID, SERVICE_UUID_U128, SHORT_ID_LEN, parse_device_name};
pub use identity::{AddressError, DeviceIdentity, HardwareAddress, short_id};
