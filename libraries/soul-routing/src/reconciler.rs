//! Routing reconciler
//!
//! Holds the user's preferred output device and, while a preference exists,
//! runs a background check that compares the live route with the route the
//! preference implies. On drift it switches back; if switching fails and the
//! device is gone for good, the preference is dropped.
//!
//! # State
//!
//! ```text
//!            set_preference / start_monitoring / on_resume
//!   Idle  ─────────────────────────────────────────────────▶  Monitoring
//!         ◀─────────────────────────────────────────────────
//!     clear_preference / stop_monitoring / on_suspend / device unavailable
//! ```
//!
//! All transitions go through one lock, so two concurrent starts spawn one
//! task and a stop is never lost. Stopping is cooperative: the task exits at
//! its next wait point and a check already running is allowed to finish.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::RoutingConfig;
use crate::error::{CheckError, PlatformError, Result, RoutingError};
use crate::events::{ClearReason, RoutingEvent};
use crate::platform::{AudioPlatform, DeviceSwitcher};
use crate::store::{PreferenceStore, StoredPreference};
use crate::types::{AudioDevice, DeviceClass, RoutingState};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Result of one reconciliation check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No enabled preference is stored
    NoPreference,
    /// Live route matches the preference
    InSync,
    /// Route had drifted and was switched back
    Corrected,
    /// Switch failed, device still reachable; next check retries
    RetryPending,
    /// Switch failed and the device is gone; preference erased
    PreferenceCleared,
}

enum MonitorState {
    Idle,
    Monitoring(MonitorHandle),
}

struct MonitorHandle {
    generation: u64,
    device_id: String,
    stop_tx: watch::Sender<bool>,
    // Dropping detaches the task; it exits once it sees the stop signal.
    task: JoinHandle<()>,
}

struct Inner {
    store: Arc<dyn PreferenceStore>,
    switcher: Arc<dyn DeviceSwitcher>,
    platform: Arc<dyn AudioPlatform>,
    config: RoutingConfig,
    state: Mutex<MonitorState>,
    next_generation: AtomicU64,
    events: broadcast::Sender<RoutingEvent>,
    runtime: Handle,
}

/// Keeps audio routed to the user's preferred output device
pub struct RoutingReconciler {
    inner: Arc<Inner>,
}

impl RoutingReconciler {
    /// Create a reconciler on the current tokio runtime
    ///
    /// Starts idle; call [`apply_stored_preference`](Self::apply_stored_preference)
    /// or [`start_monitoring`](Self::start_monitoring) to pick up a stored
    /// preference.
    pub fn new(
        store: Arc<dyn PreferenceStore>,
        switcher: Arc<dyn DeviceSwitcher>,
        platform: Arc<dyn AudioPlatform>,
        config: RoutingConfig,
    ) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| RoutingError::Config(format!("No tokio runtime available: {}", e)))?;

        Self::with_runtime(store, switcher, platform, config, runtime)
    }

    /// Create a reconciler that spawns its monitoring task on `runtime`
    pub fn with_runtime(
        store: Arc<dyn PreferenceStore>,
        switcher: Arc<dyn DeviceSwitcher>,
        platform: Arc<dyn AudioPlatform>,
        config: RoutingConfig,
        runtime: Handle,
    ) -> Result<Self> {
        config.validate()?;

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            inner: Arc::new(Inner {
                store,
                switcher,
                platform,
                config,
                state: Mutex::new(MonitorState::Idle),
                next_generation: AtomicU64::new(1),
                events,
                runtime,
            }),
        })
    }

    /// Subscribe to routing events
    pub fn subscribe(&self) -> broadcast::Receiver<RoutingEvent> {
        self.inner.events.subscribe()
    }

    /// Store `device` as the preferred output and monitor it
    ///
    /// Replaces any previous preference. On a store error nothing changes.
    pub fn set_preference(&self, device: &AudioDevice) -> Result<()> {
        let mut state = self.inner.lock_state();

        self.inner.store.save(&StoredPreference::from_device(device))?;
        info!(
            "Routing preference set: {} ({}, {})",
            device.name, device.id, device.class
        );
        self.inner.emit(RoutingEvent::PreferenceChanged {
            device_id: device.id.clone(),
            device_name: device.name.clone(),
            class: device.class,
        });

        self.inner.stop_locked(&mut state);
        Inner::start_locked(&self.inner, &mut state);
        Ok(())
    }

    /// The stored preferred device, if any
    ///
    /// Returns `None` when nothing is stored, the preference is disabled, the
    /// stored class is unknown, or the store cannot be read.
    pub fn preference(&self) -> Option<AudioDevice> {
        self.inner.load_preference()
    }

    /// Erase the preference and stop monitoring
    pub fn clear_preference(&self) {
        self.inner.clear(ClearReason::Requested, None);
    }

    /// Begin background checks for the stored preference
    ///
    /// No-op when already monitoring or when no preference is stored.
    pub fn start_monitoring(&self) {
        let mut state = self.inner.lock_state();
        Inner::start_locked(&self.inner, &mut state);
    }

    /// Stop background checks, keeping the preference
    pub fn stop_monitoring(&self) {
        let mut state = self.inner.lock_state();
        self.inner.stop_locked(&mut state);
    }

    /// Whether the background check is running
    pub fn is_monitoring(&self) -> bool {
        matches!(
            &*self.inner.lock_state(),
            MonitorState::Monitoring(handle) if !handle.task.is_finished()
        )
    }

    /// Switch to the stored preference once, after the platform settles
    ///
    /// Meant for startup. Starts monitoring only if the switch succeeds.
    /// Returns whether the preference was applied.
    pub async fn apply_stored_preference(&self) -> bool {
        tokio::time::sleep(self.inner.config.settle_delay()).await;

        let Some(device) = self.inner.load_preference() else {
            debug!("No stored routing preference to apply");
            return false;
        };

        if self.inner.switcher.switch_to_device(&device).await {
            info!("Applied stored routing preference: {} ({})", device.name, device.id);
            self.start_monitoring();
            true
        } else {
            warn!(
                "Failed to apply stored routing preference: {} ({})",
                device.name, device.id
            );
            false
        }
    }

    /// Run one reconciliation check now, outside the schedule
    pub async fn check_now(&self) -> std::result::Result<TickOutcome, CheckError> {
        let Some(device) = self.inner.load_preference() else {
            return Ok(TickOutcome::NoPreference);
        };

        self.inner.check(&device, None).await
    }

    /// App moved to the background
    pub fn on_suspend(&self) {
        self.stop_monitoring();
    }

    /// App returned to the foreground
    pub fn on_resume(&self) {
        self.start_monitoring();
    }

    /// The user signed out; their preference goes with them
    pub fn on_logout(&self) {
        self.inner.clear(ClearReason::Logout, None);
    }
}

impl Drop for RoutingReconciler {
    fn drop(&mut self) {
        let mut state = self.inner.lock_state();
        self.inner.stop_locked(&mut state);
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: RoutingEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn load_preference(&self) -> Option<AudioDevice> {
        match self.store.load() {
            Ok(Some(stored)) => {
                let device = stored.to_device();
                if device.is_none() && stored.enabled {
                    warn!(
                        "Ignoring routing preference with unknown device class '{}'",
                        stored.device_class
                    );
                }
                device
            }
            Ok(None) => None,
            Err(e) => {
                error!("Failed to read routing preference: {}", e);
                None
            }
        }
    }

    fn start_locked(this: &Arc<Self>, state: &mut MonitorState) {
        if let MonitorState::Monitoring(handle) = state {
            if !handle.task.is_finished() {
                return;
            }
            warn!("Routing monitor for {} exited unexpectedly, restarting", handle.device_id);
            *state = MonitorState::Idle;
        }

        let Some(device) = this.load_preference() else {
            debug!("No routing preference, not monitoring");
            return;
        };

        let generation = this.next_generation.fetch_add(1, Ordering::Relaxed);
        let (stop_tx, stop_rx) = watch::channel(false);
        let device_id = device.id.clone();

        let task = this.runtime.spawn(run_monitor(
            Arc::clone(this),
            device,
            stop_rx,
            generation,
        ));

        info!("Routing monitor started for {}", device_id);
        this.emit(RoutingEvent::MonitoringStarted {
            device_id: device_id.clone(),
        });

        *state = MonitorState::Monitoring(MonitorHandle {
            generation,
            device_id,
            stop_tx,
            task,
        });
    }

    fn stop_locked(&self, state: &mut MonitorState) {
        if let MonitorState::Monitoring(handle) = std::mem::replace(state, MonitorState::Idle) {
            // Receiver is gone if the task already exited
            let _ = handle.stop_tx.send(true);
            info!("Routing monitor stopped for {}", handle.device_id);
            self.emit(RoutingEvent::MonitoringStopped);
        }
    }

    /// Erase the preference
    ///
    /// With `generation` set, only clears if that monitor is still the
    /// current one, so a check finishing after a restart cannot erase the
    /// newer preference.
    fn clear(&self, reason: ClearReason, generation: Option<u64>) {
        let mut state = self.lock_state();

        if let Some(generation) = generation {
            match &*state {
                MonitorState::Monitoring(handle) if handle.generation == generation => {}
                _ => {
                    debug!("Monitor {} superseded, keeping preference", generation);
                    return;
                }
            }
        }

        self.stop_locked(&mut state);

        if let Err(e) = self.store.clear() {
            error!("Failed to clear routing preference: {}", e);
        }

        info!("Routing preference cleared ({:?})", reason);
        self.emit(RoutingEvent::PreferenceCleared { reason });
    }

    fn observe(&self) -> std::result::Result<RoutingState, PlatformError> {
        Ok(RoutingState::resolve(self.platform.routing_signals()?))
    }

    /// Whether a device that refused a switch can still be reached
    fn is_available(&self, device: &AudioDevice) -> std::result::Result<bool, PlatformError> {
        match device.class {
            DeviceClass::Speaker => Ok(true),
            DeviceClass::WiredHeadset | DeviceClass::Usb => self.platform.is_wired_present(),
            DeviceClass::BluetoothA2dp => {
                let Some(address) = device.bluetooth_address() else {
                    return Ok(false);
                };
                match self.platform.is_bluetooth_paired(address) {
                    Ok(paired) => Ok(paired),
                    Err(e) => {
                        warn!("Bluetooth pairing lookup failed for {}: {}", address, e);
                        Ok(false)
                    }
                }
            }
            DeviceClass::BluetoothSco => Ok(false),
        }
    }

    async fn check(
        &self,
        device: &AudioDevice,
        generation: Option<u64>,
    ) -> std::result::Result<TickOutcome, CheckError> {
        let observed = self.observe()?;
        let expected = RoutingState::expected_for(device.class);

        if observed == expected {
            debug!("Routing in sync: {}", observed);
            return Ok(TickOutcome::InSync);
        }

        info!(
            "Routing drifted to {} (expected {}), re-applying {}",
            observed, expected, device.name
        );

        if self.switcher.switch_to_device(device).await {
            self.emit(RoutingEvent::RouteCorrected {
                device_id: device.id.clone(),
                observed,
                expected,
            });
            return Ok(TickOutcome::Corrected);
        }

        if self.is_available(device)? {
            warn!("Switch to {} failed, device still available; retrying", device.name);
            self.emit(RoutingEvent::CorrectionFailed {
                device_id: device.id.clone(),
                observed,
                expected,
            });
            Ok(TickOutcome::RetryPending)
        } else {
            warn!("Switch to {} failed and device is unavailable", device.name);
            self.clear(ClearReason::DeviceUnavailable, generation);
            Ok(TickOutcome::PreferenceCleared)
        }
    }
}

async fn run_monitor(
    inner: Arc<Inner>,
    device: AudioDevice,
    mut stop_rx: watch::Receiver<bool>,
    generation: u64,
) {
    let mut delay = inner.config.check_interval();

    loop {
        tokio::select! {
            () = tokio::time::sleep(delay) => {}
            _ = stop_rx.changed() => break,
        }

        if *stop_rx.borrow() {
            break;
        }

        // Each check runs as its own task so a panicking collaborator only
        // fails this tick.
        let check = tokio::spawn({
            let inner = Arc::clone(&inner);
            let device = device.clone();
            async move { inner.check(&device, Some(generation)).await }
        });

        let result = match check.await {
            Ok(result) => result,
            Err(e) => Err(CheckError::Panicked(e.to_string())),
        };

        delay = match result {
            Ok(outcome) => {
                debug!("Routing check for {}: {:?}", device.id, outcome);
                inner.config.check_interval()
            }
            Err(e) => {
                warn!("Routing check failed: {}", e);
                inner.config.backoff_interval()
            }
        };
    }

    debug!("Routing monitor {} exited", generation);
}
