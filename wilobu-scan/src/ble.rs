//! BLE client for finding Wilobu devices
//!
//! Provides functions to scan for Wilobu devices and to exercise their
//! connect / disconnect / re-advertise cycle.

use btleplug::api::{
    Central, CentralEvent, Manager as _, Peripheral as _, PeripheralProperties, ScanFilter,
};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use futures::StreamExt;
use std::future::Future;
use log::*;
use std::time::Duration;
use uuid::Uuid;

use wilobu_proto::{SERVICE_UUID_U128, parse_device_name};

#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    #[error(transparent)]
    Btle(#[from] btleplug::Error),
    #[error("no Bluetooth adapter found")]
    NoAdapter,
    #[error(
        "no Wilobu device found{}",
        .0.as_deref().map(|t| format!(" matching {t:?}")).unwrap_or_default()
    )]
    NotFound(Option<String>),
    #[error("{0} does not expose the Wilobu service")]
    ServiceMissing(String),
    #[error("{name} did not advertise again after disconnect (round {round})")]
    NotReadvertised { name: String, round: u32 },
}

/// The service UUID the companion app filters on
pub fn service_uuid() -> Uuid {
    Uuid::from_u128(SERVICE_UUID_U128)
}

/// A device seen during a scan
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct WilobuDevice {
    pub name: String,
    pub address: String,
    pub rssi: Option<i16>,
    /// `XXXX` from a `Wilobu-XXXX` name
    pub short_id: Option<String>,
    /// Service UUID was in the advertisement
    pub advertises_service: bool,
}

impl WilobuDevice {
    pub fn from_advertisement(
        name: Option<String>,
        address: String,
        rssi: Option<i16>,
        services: &[Uuid],
    ) -> Self {
        let short_id = name.as_deref().and_then(parse_device_name).map(str::to_string);
        Self {
            name: name.unwrap_or_else(|| "Unknown".to_string()),
            address,
            rssi,
            short_id,
            advertises_service: services.contains(&service_uuid()),
        }
    }

    /// Either half of the advertisement contract is enough to recognise one.
    /// The name only arrives with the scan response.
    pub fn is_wilobu(&self) -> bool {
        self.advertises_service || self.short_id.is_some()
    }

    /// Match by name or address fragment, or any Wilobu device when no target is given
    pub fn matches(&self, target: Option<&str>) -> bool {
        match target {
            Some(t) => self.name.contains(t) || self.address.contains(t),
            None => self.is_wilobu(),
        }
    }
}

fn scan_filter(all: bool) -> ScanFilter {
    if all {
        ScanFilter::default()
    } else {
        ScanFilter {
            services: vec![service_uuid()],
        }
    }
}

/// Get the default Bluetooth adapter
pub async fn get_adapter() -> Result<Adapter, ScanError> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;
    adapters.into_iter().next().ok_or(ScanError::NoAdapter)
}

async fn describe(peripheral: &Peripheral) -> Result<Option<WilobuDevice>, ScanError> {
    Ok(peripheral.properties().await?.map(|props| {
        WilobuDevice::from_advertisement(
            props.local_name,
            peripheral.address().to_string(),
            props.rssi,
            &props.services,
        )
    }))
}

/// Scan for BLE devices
///
/// Filters on the Wilobu service UUID unless `all` is set. With `all`,
/// non-Wilobu devices are returned too; check `is_wilobu()`.
pub async fn scan(
    adapter: &Adapter,
    duration_secs: u64,
    all: bool,
) -> Result<Vec<WilobuDevice>, ScanError> {
    adapter.start_scan(scan_filter(all)).await?;
    tokio::time::sleep(Duration::from_secs(duration_secs)).await;

    let mut devices = Vec::new();
    for peripheral in adapter.peripherals().await? {
        if let Some(device) = describe(&peripheral).await? {
            devices.push(device);
        }
    }

    adapter.stop_scan().await?;
    Ok(devices)
}

/// Find a Wilobu device by name/address pattern, or find any Wilobu device
pub async fn find_device(
    adapter: &Adapter,
    target: Option<&str>,
    duration_secs: u64,
) -> Result<(Peripheral, WilobuDevice), ScanError> {
    adapter.start_scan(scan_filter(false)).await?;
    tokio::time::sleep(Duration::from_secs(duration_secs)).await;

    for peripheral in adapter.peripherals().await? {
        if let Some(device) = describe(&peripheral).await? {
            if device.matches(target) {
                adapter.stop_scan().await?;
                debug!("Found device: {} ({})", device.name, device.address);
                return Ok((peripheral, device));
            }
        }
    }

    adapter.stop_scan().await?;
    Err(ScanError::NotFound(target.map(str::to_string)))
}

/// Properties as refreshed by an advertisement carrying the service
fn shows_service(props: &PeripheralProperties) -> bool {
    props.rssi.is_some() && props.services.contains(&service_uuid())
}

async fn next_advertisement(
    adapter: &Adapter,
    events: &mut (impl futures::Stream<Item = CentralEvent> + Unpin),
    id: &PeripheralId,
) -> Result<bool, ScanError> {
    while let Some(event) = events.next().await {
        match event {
            CentralEvent::ServicesAdvertisement { id: seen, services } if &seen == id => {
                if services.contains(&service_uuid()) {
                    return Ok(true);
                }
            }
            CentralEvent::DeviceDiscovered(seen) if &seen == id => {
                let props = adapter.peripheral(&seen).await?.properties().await?;
                if props.as_ref().is_some_and(shows_service) {
                    return Ok(true);
                }
            }
            _ => {}
        }
    }
    Ok(false)
}

/// Wait for a fresh advertisement from `id`
///
/// `DeviceUpdated` is ignored: BlueZ raises it for property changes that
/// follow a disconnect, without any advertisement on air.
async fn wait_for_advertisement(
    adapter: &Adapter,
    id: &PeripheralId,
    duration_secs: u64,
) -> Result<bool, ScanError> {
    let mut events = adapter.events().await?;
    adapter.start_scan(scan_filter(false)).await?;

    let seen = tokio::time::timeout(
        Duration::from_secs(duration_secs),
        next_advertisement(adapter, &mut events, id),
    )
    .await
    .unwrap_or(Ok(false));

    adapter.stop_scan().await?;
    seen
}

/// Wait for the disconnect whatever `discovered` holds, so a failed service
/// discovery never leaves the device connected and silent
async fn settle_connection<T, E>(
    discovered: Result<T, E>,
    disconnect: impl Future<Output = Result<(), E>>,
) -> Result<T, E> {
    let disconnected = disconnect.await;
    let value = discovered?;
    disconnected?;
    Ok(value)
}

/// Connect, check the service, disconnect, and wait for the device to
/// advertise again, `rounds` times
///
/// Returns the name of the device that was cycled.
pub async fn cycle(
    adapter: &Adapter,
    target: Option<&str>,
    rounds: u32,
    duration_secs: u64,
) -> Result<String, ScanError> {
    let (peripheral, device) = find_device(adapter, target, duration_secs).await?;

    for round in 1..=rounds {
        info!("Round {}: connecting to {}", round, device.name);
        peripheral.connect().await?;

        let discovered = peripheral.discover_services().await.map(|()| {
            peripheral
                .services()
                .iter()
                .any(|service| service.uuid == service_uuid())
        });
        let has_service = settle_connection(discovered, peripheral.disconnect()).await?;
        info!("Round {}: disconnected", round);

        if !has_service {
            return Err(ScanError::ServiceMissing(device.name));
        }

        if !wait_for_advertisement(adapter, &peripheral.id(), duration_secs).await? {
            return Err(ScanError::NotReadvertised {
                name: device.name,
                round,
            });
        }
        info!("Round {}: {} is advertising again", round, device.name);
    }

    Ok(device.name)
}
