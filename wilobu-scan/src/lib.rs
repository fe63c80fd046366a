//! Wilobu BLE bench tool
//!
//! Finds Wilobu devices the way the companion app does (scan filtered on the
//! service UUID) and checks that a device comes back to advertising after a
//! central disconnects from it.
//!
//! # Example
//!
//! ```ignore
//! use wilobu_scan::ble;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), wilobu_scan::ble::ScanError> {
//!     let adapter = ble::get_adapter().await?;
//!
//!     for device in ble::scan(&adapter, 5, false).await? {
//!         println!("{} ({})", device.name, device.address);
//!     }
//!
//!     // Connect, disconnect and wait for re-advertising, three times
//!     ble::cycle(&adapter, None, 3, 5).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod ble;
