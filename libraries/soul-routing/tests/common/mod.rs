//! Test doubles for the routing reconciler

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;
use soul_routing::{
    AudioDevice, AudioPlatform, DeviceClass, DeviceSwitcher, MemoryPreferenceStore,
    PlatformError, PlatformResult, RoutingConfig, RoutingReconciler, RoutingState,
    StoredPreference,
};

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

pub const HEADPHONES_ADDRESS: &str = "AA:BB:CC:DD:EE:FF";

pub fn headphones() -> AudioDevice {
    AudioDevice::new(HEADPHONES_ADDRESS, "Headphones X", DeviceClass::BluetoothA2dp)
}

pub fn wired_headset() -> AudioDevice {
    AudioDevice::new("wired-3", "Wired headset", DeviceClass::WiredHeadset)
}

pub fn usb_dac() -> AudioDevice {
    AudioDevice::new("usb-11", "USB DAC", DeviceClass::Usb)
}

pub fn speaker() -> AudioDevice {
    AudioDevice::new("speaker-2", "Phone speaker", DeviceClass::Speaker)
}

pub fn sco_headset() -> AudioDevice {
    AudioDevice::new("11:22:33:44:55:66", "Car kit", DeviceClass::BluetoothSco)
}

struct PlatformState {
    script: VecDeque<RoutingState>,
    current: RoutingState,
    wired_connected: bool,
    paired: Vec<String>,
    paired_lookup_fails: bool,
    failing_observations: usize,
}

/// Platform whose live route follows a script, one entry per observation
///
/// The last scripted route sticks once the script runs out.
pub struct FakePlatform {
    state: Mutex<PlatformState>,
    observations: AtomicUsize,
    panicking_observations: AtomicUsize,
}

impl FakePlatform {
    pub fn new(current: RoutingState) -> Self {
        Self {
            state: Mutex::new(PlatformState {
                script: VecDeque::new(),
                current,
                wired_connected: false,
                paired: Vec::new(),
                paired_lookup_fails: false,
                failing_observations: 0,
            }),
            observations: AtomicUsize::new(0),
            panicking_observations: AtomicUsize::new(0),
        }
    }

    pub fn scripted(routes: &[RoutingState]) -> Self {
        let platform = Self::new(RoutingState::Speaker);
        platform.state.lock().unwrap().script = routes.iter().copied().collect();
        platform
    }

    pub fn with_wired_connected(self, connected: bool) -> Self {
        self.state.lock().unwrap().wired_connected = connected;
        self
    }

    pub fn with_paired(self, address: &str) -> Self {
        self.state.lock().unwrap().paired.push(address.to_string());
        self
    }

    pub fn with_paired_lookup_failing(self) -> Self {
        self.state.lock().unwrap().paired_lookup_fails = true;
        self
    }

    /// Make the next `count` observations fail
    pub fn fail_next_observations(&self, count: usize) {
        self.state.lock().unwrap().failing_observations = count;
    }

    /// Make the next `count` observations panic
    ///
    /// The panic happens before the state lock is taken, so the fake stays
    /// usable afterwards.
    pub fn panic_next_observations(&self, count: usize) {
        self.panicking_observations.store(count, Ordering::SeqCst);
    }

    /// Number of route observations attempted
    pub fn observations(&self) -> usize {
        self.observations.load(Ordering::SeqCst)
    }

    fn current(&self) -> RoutingState {
        self.state.lock().unwrap().current
    }
}

impl AudioPlatform for FakePlatform {
    // First query of every observation, so it advances the script
    fn is_bluetooth_a2dp_on(&self) -> PlatformResult<bool> {
        self.observations.fetch_add(1, Ordering::SeqCst);

        let panicking = self
            .panicking_observations
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if panicking.is_ok() {
            panic!("audio service crashed");
        }

        let mut state = self.state.lock().unwrap();
        if state.failing_observations > 0 {
            state.failing_observations -= 1;
            return Err(PlatformError::ServiceUnavailable("audio"));
        }
        if let Some(next) = state.script.pop_front() {
            state.current = next;
        }
        Ok(state.current == RoutingState::BluetoothA2dp)
    }

    fn is_bluetooth_sco_on(&self) -> PlatformResult<bool> {
        Ok(self.current() == RoutingState::BluetoothSco)
    }

    fn is_speakerphone_on(&self) -> PlatformResult<bool> {
        Ok(self.current() == RoutingState::Speaker)
    }

    fn output_devices(&self) -> PlatformResult<Vec<AudioDevice>> {
        let state = self.state.lock().unwrap();
        let mut devices = vec![speaker()];
        if state.wired_connected || state.current == RoutingState::Wired {
            devices.push(wired_headset());
        }
        Ok(devices)
    }

    fn paired_bluetooth_addresses(&self) -> PlatformResult<Vec<String>> {
        let state = self.state.lock().unwrap();
        if state.paired_lookup_fails {
            return Err(PlatformError::QueryFailed("bluetooth adapter off".to_string()));
        }
        Ok(state.paired.clone())
    }
}

/// Switcher that records every attempt and answers with a fixed result
pub struct RecordingSwitcher {
    succeed: bool,
    delay: Option<Duration>,
    attempts: Mutex<Vec<AudioDevice>>,
}

impl RecordingSwitcher {
    pub fn succeeding() -> Self {
        Self {
            succeed: true,
            delay: None,
            attempts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            succeed: false,
            delay: None,
            attempts: Mutex::new(Vec::new()),
        }
    }

    /// Take `delay` to answer each switch request
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn attempts(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    pub fn last_attempt(&self) -> Option<AudioDevice> {
        self.attempts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl DeviceSwitcher for RecordingSwitcher {
    async fn switch_to_device(&self, device: &AudioDevice) -> bool {
        self.attempts.lock().unwrap().push(device.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.succeed
    }
}

pub struct Harness {
    pub reconciler: RoutingReconciler,
    pub store: Arc<MemoryPreferenceStore>,
    pub switcher: Arc<RecordingSwitcher>,
    pub platform: Arc<FakePlatform>,
}

/// Reconciler with default timing over the given doubles
pub fn harness(platform: FakePlatform, switcher: RecordingSwitcher) -> Harness {
    harness_with_store(platform, switcher, MemoryPreferenceStore::new())
}

/// Same as [`harness`], with `device` already stored but not monitored
pub fn harness_with_stored(
    platform: FakePlatform,
    switcher: RecordingSwitcher,
    device: &AudioDevice,
) -> Harness {
    let store = MemoryPreferenceStore::with_preference(StoredPreference::from_device(device));
    harness_with_store(platform, switcher, store)
}

/// Reconciler with custom timing and `device` already stored
pub fn harness_with_config(
    platform: FakePlatform,
    switcher: RecordingSwitcher,
    device: &AudioDevice,
    config: RoutingConfig,
) -> Harness {
    let store = MemoryPreferenceStore::with_preference(StoredPreference::from_device(device));
    build_harness(platform, switcher, store, config)
}

fn harness_with_store(
    platform: FakePlatform,
    switcher: RecordingSwitcher,
    store: MemoryPreferenceStore,
) -> Harness {
    build_harness(platform, switcher, store, RoutingConfig::default())
}

fn build_harness(
    platform: FakePlatform,
    switcher: RecordingSwitcher,
    store: MemoryPreferenceStore,
    config: RoutingConfig,
) -> Harness {
    init_tracing();

    let store = Arc::new(store);
    let switcher = Arc::new(switcher);
    let platform = Arc::new(platform);

    let reconciler = RoutingReconciler::new(
        store.clone(),
        switcher.clone(),
        platform.clone(),
        config,
    )
    .expect("Failed to create reconciler");

    Harness {
        reconciler,
        store,
        switcher,
        platform,
    }
}
