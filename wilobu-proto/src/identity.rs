//! Device identity derived from the radio hardware address

use std::fmt;
use std::str::FromStr;

use crate::ble::DEVICE_NAME_PREFIX;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("hardware address has {0} octets, expected 6")]
    OctetCount(usize),
    #[error("invalid octet {0:?} in hardware address")]
    InvalidOctet(String),
}

/// 48-bit radio address, most significant octet first (display order)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HardwareAddress([u8; 6]);

impl HardwareAddress {
    pub fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Last two octets as four uppercase hex digits
    pub fn short_id(&self) -> String {
        format!("{:02X}{:02X}", self.0[4], self.0[5])
    }
}

/// Accepts exactly `AA:BB:CC:DD:EE:FF`, either case.
impl FromStr for HardwareAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 6 {
            return Err(AddressError::OctetCount(parts.len()));
        }

        let mut octets = [0u8; 6];
        for (octet, part) in octets.iter_mut().zip(&parts) {
            // from_str_radix alone would let "+F" through
            if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(AddressError::InvalidOctet(part.to_string()));
            }
            *octet = u8::from_str_radix(part, 16)
                .map_err(|_| AddressError::InvalidOctet(part.to_string()))?;
        }

        Ok(Self(octets))
    }
}

impl fmt::Display for HardwareAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

/// Short id for an address string, e.g. `AA:BB:CC:DD:EE:FF` -> `EEFF`
pub fn short_id(address: &str) -> Result<String, AddressError> {
    Ok(address.parse::<HardwareAddress>()?.short_id())
}

/// Name the device advertises for its whole uptime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    address: HardwareAddress,
    name: String,
}

impl DeviceIdentity {
    pub fn new(address: HardwareAddress) -> Self {
        let name = format!("{}{}", DEVICE_NAME_PREFIX, address.short_id());
        Self { address, name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn short_id(&self) -> &str {
        &self.name[DEVICE_NAME_PREFIX.len()..]
    }

    pub fn address(&self) -> HardwareAddress {
        self.address
    }
}

impl FromStr for DeviceIdentity {
    type Err = AddressError;

    fn from_str(address: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(address.parse()?))
    }
}
