//! Platform audio services used by the reconciler
//!
//! The mobile bridge implements these over the OS audio and Bluetooth
//! services. Everything here is queried live; nothing is cached.

use async_trait::async_trait;

use crate::error::PlatformError;
use crate::types::{AudioDevice, RoutingSignals};

/// Result type for platform queries
pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

/// Performs the actual route change
#[async_trait]
pub trait DeviceSwitcher: Send + Sync {
    /// Route audio output to `device`
    ///
    /// Returns `true` if the platform accepted the change.
    async fn switch_to_device(&self, device: &AudioDevice) -> bool;
}

/// Live audio routing queries
pub trait AudioPlatform: Send + Sync {
    /// Is audio going to a Bluetooth A2DP device?
    fn is_bluetooth_a2dp_on(&self) -> PlatformResult<bool>;

    /// Is a Bluetooth SCO link active?
    fn is_bluetooth_sco_on(&self) -> PlatformResult<bool>;

    /// Is the speakerphone forced on?
    fn is_speakerphone_on(&self) -> PlatformResult<bool>;

    /// Currently attached output devices
    fn output_devices(&self) -> PlatformResult<Vec<AudioDevice>>;

    /// Hardware addresses of paired Bluetooth devices
    fn paired_bluetooth_addresses(&self) -> PlatformResult<Vec<String>>;

    /// Is a wired or USB output connected right now?
    fn is_wired_present(&self) -> PlatformResult<bool> {
        Ok(self
            .output_devices()?
            .iter()
            .any(|device| device.connected && device.class.is_wired()))
    }

    /// Is `address` among the paired Bluetooth devices?
    fn is_bluetooth_paired(&self, address: &str) -> PlatformResult<bool> {
        Ok(self
            .paired_bluetooth_addresses()?
            .iter()
            .any(|paired| paired.eq_ignore_ascii_case(address)))
    }

    /// Sample every signal that feeds the observed route
    fn routing_signals(&self) -> PlatformResult<RoutingSignals> {
        Ok(RoutingSignals {
            bluetooth_a2dp_on: self.is_bluetooth_a2dp_on()?,
            bluetooth_sco_on: self.is_bluetooth_sco_on()?,
            speakerphone_on: self.is_speakerphone_on()?,
            wired_present: self.is_wired_present()?,
        })
    }
}
