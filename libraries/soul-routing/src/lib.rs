//! Soul Player - Audio Output Routing
//!
//! Keeps mobile playback on the output device the user picked.
//!
//! The user selects an output (speaker, wired headset, USB, Bluetooth) and
//! the platform is free to move audio elsewhere afterwards: a headset is
//! unplugged and replugged, a call grabs the Bluetooth link, the OS picks a
//! different default. [`RoutingReconciler`] persists the choice and, while it
//! exists, periodically compares the live route with the expected one and
//! switches back when they differ. A device that refuses the switch and can
//! no longer be found drops the preference.
//!
//! # Architecture
//!
//! `soul-routing` carries no platform code. The mobile bridge supplies:
//! - [`AudioPlatform`]: live routing flags and device lists
//! - [`DeviceSwitcher`]: the actual route change
//! - [`PreferenceStore`]: persistence (or use [`JsonFilePreferenceStore`])
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use soul_routing::{
//!     AudioDevice, AudioPlatform, DeviceClass, DeviceSwitcher, MemoryPreferenceStore,
//!     RoutingConfig, RoutingReconciler,
//! };
//!
//! # async fn example(
//! #     platform: Arc<dyn AudioPlatform>,
//! #     switcher: Arc<dyn DeviceSwitcher>,
//! # ) -> soul_routing::Result<()> {
//! let reconciler = RoutingReconciler::new(
//!     Arc::new(MemoryPreferenceStore::new()),
//!     switcher,
//!     platform,
//!     RoutingConfig::default(),
//! )?;
//!
//! // At startup: re-apply whatever the user picked last time
//! reconciler.apply_stored_preference().await;
//!
//! // User picks their headphones
//! let headphones = AudioDevice::new("AA:BB:CC:DD:EE:FF", "Headphones X", DeviceClass::BluetoothA2dp);
//! reconciler.set_preference(&headphones)?;
//!
//! // Lifecycle
//! reconciler.on_suspend();
//! reconciler.on_resume();
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod config;
mod error;
pub mod events;
pub mod platform;
mod reconciler;
pub mod store;
pub mod types;

// Public exports
pub use config::RoutingConfig;
pub use error::{CheckError, PlatformError, Result, RoutingError};
pub use events::{ClearReason, RoutingEvent};
pub use platform::{AudioPlatform, DeviceSwitcher, PlatformResult};
pub use reconciler::{RoutingReconciler, TickOutcome};
pub use store::{JsonFilePreferenceStore, MemoryPreferenceStore, PreferenceStore, StoredPreference};
pub use types::{AudioDevice, DeviceClass, RoutingSignals, RoutingState};
