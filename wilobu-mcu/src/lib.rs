//! Wilobu MCU Library
//!
//! Traits and the connection controller for the Wilobu beacon firmware.
//!
//! This crate provides:
//! - Traits the BLE stack implements (`BleStack`, `Advertiser`)
//! - The `ConnectionEvents` callbacks the stack delivers
//! - `Controller`, which owns the connection flag and re-advertises on disconnect
//! - `boot`, the startup sequence from hardware address to advertising
//!
//! # MCU implementations
//! - ESP32 (NimBLE): see `wilobu-esp32`

pub mod ble;
pub mod controller;

#[cfg(test)]
mod fake;

pub use ble::*;
pub use controller::*;
