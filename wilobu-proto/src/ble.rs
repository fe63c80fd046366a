//! BLE advertisement constants for Wilobu devices
//!
//! The service UUID must match the companion app's scan filter exactly. It is
//! not negotiable at runtime.

/// BLE Service UUID: 0000ffaa-0000-1000-8000-00805f9b34fb
pub const SERVICE_UUID: &str = "0000ffaa-0000-1000-8000-00805f9b34fb";

/// Same UUID as [`SERVICE_UUID`], for stacks that take the numeric form
pub const SERVICE_UUID_U128: u128 = 0x0000ffaa_0000_1000_8000_00805f9b34fb;

/// Prefix of every advertised device name
pub const DEVICE_NAME_PREFIX: &str = "Wilobu-";

/// Number of hex digits after the prefix
pub const SHORT_ID_LEN: usize = 4;

/// Extract the short id from an advertised name like `Wilobu-EEFF`
///
/// Returns `None` unless the name is the prefix followed by exactly four
/// uppercase hex digits.
pub fn parse_device_name(name: &str) -> Option<&str> {
    let short_id = name.strip_prefix(DEVICE_NAME_PREFIX)?;
    let well_formed = short_id.len() == SHORT_ID_LEN
        && short_id
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b));
    well_formed.then_some(short_id)
}
