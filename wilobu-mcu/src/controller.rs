//! Advertisement controller and connection state tracking

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::*;
use wilobu_proto::{AddressError, DeviceIdentity, HardwareAddress};

use crate::ble::{Advertiser, AdvertisingPlan, BleStack, ConnectionEvents, SERVICE_UUID_U128};

/// Idle sleep of the main loop while a peer is connected
pub const IDLE_CONNECTED: Duration = Duration::from_secs(1);

/// Idle sleep of the main loop while advertising
pub const IDLE_ADVERTISING: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

#[derive(thiserror::Error, Debug)]
pub enum BootError<E: Debug> {
    #[error("BLE stack error: {0:?}")]
    Stack(E),
    #[error(transparent)]
    Address(#[from] AddressError),
}

/// Owns the device identity, the advertising handle and the connection flag
///
/// The flag is written only by the `ConnectionEvents` callbacks.
pub struct Controller<A> {
    identity: DeviceIdentity,
    advertiser: A,
    connected: AtomicBool,
}

impl<A: Advertiser> Controller<A> {
    pub fn new(identity: DeviceIdentity, advertiser: A) -> Self {
        Self {
            identity,
            advertiser,
            connected: AtomicBool::new(false),
        }
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn state(&self) -> ConnectionState {
        if self.is_connected() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    /// How long the main loop should sleep before polling again
    pub fn idle_interval(&self) -> Duration {
        match self.state() {
            ConnectionState::Connected => IDLE_CONNECTED,
            ConnectionState::Disconnected => IDLE_ADVERTISING,
        }
    }

    pub fn start_advertising(&self) -> Result<(), A::Error> {
        self.advertiser.start()
    }
}

impl<A: Advertiser> ConnectionEvents for Controller<A> {
    fn on_connect(&self) {
        self.connected.store(true, Ordering::Release);
        info!(">> Companion app connected");
    }

    fn on_disconnect(&self) {
        self.connected.store(false, Ordering::Release);
        info!(">> Companion app disconnected, restarting advertising...");

        // The stack stays silent after a disconnect until told otherwise
        if let Err(e) = self.advertiser.start() {
            error!("Failed to restart advertising: {:?}", e);
        }
    }
}

/// Bring the radio up: derive the name, configure advertising, start it
///
/// Returns the controller registered as the stack's connection callbacks.
/// Any error here is fatal for the firmware.
pub fn boot<S: BleStack>(
    stack: &mut S,
) -> Result<Arc<Controller<S::Advertiser>>, BootError<S::Error>> {
    let address: HardwareAddress = stack
        .hardware_address()
        .map_err(BootError::Stack)?
        .parse()?;
    let identity = DeviceIdentity::new(address);
    debug!("Hardware address {} -> {}", address, identity.name());

    let plan = AdvertisingPlan::for_identity(&identity);

    stack.set_max_tx_power().map_err(BootError::Stack)?;
    stack
        .set_device_name(identity.name())
        .map_err(BootError::Stack)?;

    let controller = Arc::new(Controller::new(identity, stack.advertiser()));
    stack
        .set_connection_events(controller.clone())
        .map_err(BootError::Stack)?;

    stack.add_service(SERVICE_UUID_U128).map_err(BootError::Stack)?;
    stack.configure_advertising(&plan).map_err(BootError::Stack)?;

    controller.start_advertising().map_err(BootError::Stack)?;
    info!("BLE advertising started as '{}'", controller.identity().name());

    Ok(controller)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{Call, FakeStack};
    use proptest::prelude::*;

    fn booted() -> (FakeStack, Arc<Controller<crate::fake::FakeAdvertiser>>) {
        let mut stack = FakeStack::new("AA:BB:CC:DD:EE:FF");
        let controller = boot(&mut stack).unwrap();
        (stack, controller)
    }

    #[test]
    fn boot_configures_and_starts_advertising() {
        let (stack, controller) = booted();

        assert_eq!(controller.identity().name(), "Wilobu-EEFF");
        assert_eq!(controller.state(), ConnectionState::Disconnected);

        let plan = AdvertisingPlan {
            service_uuid: SERVICE_UUID_U128,
            scan_response_name: "Wilobu-EEFF".to_string(),
        };
        assert_eq!(
            stack.calls(),
            vec![
                Call::SetMaxTxPower,
                Call::SetDeviceName("Wilobu-EEFF".to_string()),
                Call::SetConnectionEvents,
                Call::AddService(SERVICE_UUID_U128),
                Call::ConfigureAdvertising {
                    adv_data: plan.adv_data(),
                    scan_response: plan.scan_response_data(),
                },
                Call::StartAdvertising,
            ]
        );
    }

    #[test]
    fn name_only_in_scan_response() {
        let (stack, _controller) = booted();

        let (adv_data, scan_response) = stack
            .calls()
            .into_iter()
            .find_map(|call| match call {
                Call::ConfigureAdvertising {
                    adv_data,
                    scan_response,
                } => Some((adv_data, scan_response)),
                _ => None,
            })
            .unwrap();

        assert!(adv_data.ends_with(&SERVICE_UUID_U128.to_le_bytes()));
        assert!(!adv_data.windows(11).any(|w| w == b"Wilobu-EEFF"));
        assert!(scan_response.ends_with(b"Wilobu-EEFF"));
        assert!(adv_data.len() <= crate::ble::MAX_AD_LEN);
        assert!(scan_response.len() <= crate::ble::MAX_AD_LEN);
    }

    #[test]
    fn connect_disconnect_cycle() {
        let (stack, controller) = booted();
        assert_eq!(stack.advertising_starts(), 1);

        stack.connect();
        assert!(controller.is_connected());
        assert_eq!(stack.advertising_starts(), 1);

        stack.disconnect();
        assert!(!controller.is_connected());
        assert_eq!(stack.advertising_starts(), 2);

        stack.connect();
        assert!(controller.is_connected());
        assert_eq!(stack.advertising_starts(), 2);
    }

    #[test]
    fn idle_interval_follows_connection() {
        let (stack, controller) = booted();
        assert_eq!(controller.idle_interval(), Duration::from_secs(2));

        stack.connect();
        assert_eq!(controller.idle_interval(), Duration::from_secs(1));

        stack.disconnect();
        assert_eq!(controller.idle_interval(), Duration::from_secs(2));
    }

    #[test]
    fn failed_restart_still_clears_flag() {
        let (stack, controller) = booted();
        stack.connect();

        stack.fail_advertising(true);
        stack.disconnect();

        assert!(!controller.is_connected());
        assert_eq!(stack.advertising_starts(), 2);
    }

    #[test]
    fn malformed_address_aborts_boot() {
        let mut stack = FakeStack::new("AA:BB:CC");
        let err = boot(&mut stack).err().unwrap();

        assert!(matches!(err, BootError::Address(AddressError::OctetCount(3))));
        assert!(stack.calls().is_empty());
        assert_eq!(stack.advertising_starts(), 0);
    }

    #[test]
    fn stack_failure_aborts_boot() {
        let mut stack = FakeStack::new("AA:BB:CC:DD:EE:FF");
        stack.fail_advertising(true);

        let err = boot(&mut stack).err().unwrap();
        assert!(matches!(err, BootError::Stack(_)));
    }

    proptest! {
        #[test]
        fn flag_tracks_last_event(events in proptest::collection::vec(any::<bool>(), 0..64)) {
            let (stack, controller) = booted();
            let mut expected_starts = 1;

            for &connect in &events {
                if connect {
                    stack.connect();
                } else {
                    stack.disconnect();
                    expected_starts += 1;
                }
                prop_assert_eq!(controller.is_connected(), connect);
                prop_assert_eq!(stack.advertising_starts(), expected_starts);
            }

            prop_assert_eq!(controller.is_connected(), events.last().copied().unwrap_or(false));
        }
    }
}
