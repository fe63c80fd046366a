//! In-memory BLE stack that records every call, for tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::ble::{Advertiser, AdvertisingPlan, BleStack, ConnectionEvents};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SetMaxTxPower,
    SetDeviceName(String),
    AddService(u128),
    SetConnectionEvents,
    /// Payloads as they would be loaded into the controller
    ConfigureAdvertising {
        adv_data: Vec<u8>,
        scan_response: Vec<u8>,
    },
    StartAdvertising,
}

#[derive(Debug, PartialEq, Eq)]
pub struct FakeError(pub &'static str);

#[derive(Default)]
struct Shared {
    calls: Mutex<Vec<Call>>,
    starts: AtomicUsize,
    fail_start: AtomicBool,
}

impl Shared {
    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[derive(Clone)]
pub struct FakeAdvertiser {
    shared: Arc<Shared>,
}

impl Advertiser for FakeAdvertiser {
    type Error = FakeError;

    fn start(&self) -> Result<(), FakeError> {
        self.shared.record(Call::StartAdvertising);
        self.shared.starts.fetch_add(1, Ordering::SeqCst);
        if self.shared.fail_start.load(Ordering::SeqCst) {
            return Err(FakeError("radio busy"));
        }
        Ok(())
    }
}

pub struct FakeStack {
    address: String,
    shared: Arc<Shared>,
    events: Option<Arc<dyn ConnectionEvents>>,
}

impl FakeStack {
    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
            shared: Arc::default(),
            events: None,
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.shared.calls.lock().unwrap().clone()
    }

    /// Attempts to start advertising, failed ones included
    pub fn advertising_starts(&self) -> usize {
        self.shared.starts.load(Ordering::SeqCst)
    }

    pub fn fail_advertising(&self, fail: bool) {
        self.shared.fail_start.store(fail, Ordering::SeqCst);
    }

    /// Deliver a peer connect the way the stack's host task would
    pub fn connect(&self) {
        self.events.as_ref().expect("no callbacks registered").on_connect();
    }

    pub fn disconnect(&self) {
        self.events.as_ref().expect("no callbacks registered").on_disconnect();
    }
}

impl BleStack for FakeStack {
    type Error = FakeError;
    type Advertiser = FakeAdvertiser;

    fn hardware_address(&self) -> Result<String, FakeError> {
        Ok(self.address.clone())
    }

    fn set_max_tx_power(&mut self) -> Result<(), FakeError> {
        self.shared.record(Call::SetMaxTxPower);
        Ok(())
    }

    fn set_device_name(&mut self, name: &str) -> Result<(), FakeError> {
        self.shared.record(Call::SetDeviceName(name.to_string()));
        Ok(())
    }

    fn add_service(&mut self, uuid: u128) -> Result<(), FakeError> {
        self.shared.record(Call::AddService(uuid));
        Ok(())
    }

    fn set_connection_events(
        &mut self,
        events: Arc<dyn ConnectionEvents>,
    ) -> Result<(), FakeError> {
        self.shared.record(Call::SetConnectionEvents);
        self.events = Some(events);
        Ok(())
    }

    fn configure_advertising(&mut self, plan: &AdvertisingPlan) -> Result<(), FakeError> {
        self.shared.record(Call::ConfigureAdvertising {
            adv_data: plan.adv_data(),
            scan_response: plan.scan_response_data(),
        });
        Ok(())
    }

    fn advertiser(&self) -> FakeAdvertiser {
        FakeAdvertiser {
            shared: self.shared.clone(),
        }
    }
}
