//! Routing preference persistence
//!
//! A single-slot key-value record holding the user's preferred output device.
//! The device class is kept as its raw persisted name so that a malformed
//! value reaches [`StoredPreference::to_device`] and is treated as "no
//! preference" instead of failing the read.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::{Result, RoutingError};
use crate::types::{AudioDevice, DeviceClass};

/// Persisted routing preference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPreference {
    /// Device identifier
    pub device_id: String,

    /// Device class enumeration name (e.g., "BLUETOOTH_A2DP")
    pub device_class: String,

    /// Device display name
    pub device_name: String,

    /// Hardware address, recorded for Bluetooth devices
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_address: Option<String>,

    /// Whether the preference is in effect
    #[serde(default)]
    pub enabled: bool,
}

impl StoredPreference {
    /// Build an enabled preference from a device
    pub fn from_device(device: &AudioDevice) -> Self {
        Self {
            device_id: device.id.clone(),
            device_class: device.class.as_str().to_string(),
            device_name: device.name.clone(),
            device_address: device.address.clone(),
            enabled: true,
        }
    }

    /// Reconstruct the device identity
    ///
    /// Returns `None` when disabled or when the class name is unknown.
    pub fn to_device(&self) -> Option<AudioDevice> {
        if !self.enabled {
            return None;
        }

        let class = DeviceClass::from_str(&self.device_class)?;

        Some(AudioDevice {
            id: self.device_id.clone(),
            name: self.device_name.clone(),
            class,
            address: self.device_address.clone(),
            connected: false,
            active: false,
        })
    }
}

/// Storage for the routing preference
///
/// Implemented by the platform bridge (shared preferences on Android) and by
/// the stores in this module.
///
/// Methods are called synchronously, including from the monitor task on a
/// tokio worker when an unavailable device clears the preference. Keep them
/// short: a single small read or write, no network.
pub trait PreferenceStore: Send + Sync {
    /// Read the stored preference, `None` if nothing is stored
    fn load(&self) -> Result<Option<StoredPreference>>;

    /// Replace the stored preference
    fn save(&self, preference: &StoredPreference) -> Result<()>;

    /// Erase the stored preference
    fn clear(&self) -> Result<()>;
}

/// In-memory preference store
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    slot: Mutex<Option<StoredPreference>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding `preference`
    pub fn with_preference(preference: StoredPreference) -> Self {
        Self {
            slot: Mutex::new(Some(preference)),
        }
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load(&self) -> Result<Option<StoredPreference>> {
        Ok(self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save(&self, preference: &StoredPreference) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(preference.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take();
        Ok(())
    }
}

/// Preference store backed by a JSON file
///
/// A missing file means nothing is stored. Writes go to a sibling temp file
/// that is then renamed over the target.
///
/// Uses blocking `std::fs` calls. The record is a few hundred bytes and is
/// only written on user selection or when the device disappears, so the
/// worker thread is held for one small local file operation at most.
#[derive(Debug)]
pub struct JsonFilePreferenceStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFilePreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl PreferenceStore for JsonFilePreferenceStore {
    fn load(&self) -> Result<Option<StoredPreference>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let preference = serde_json::from_str(&contents)?;
        Ok(Some(preference))
    }

    fn save(&self, preference: &StoredPreference) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(preference)?;
        let temp = self.temp_path();
        std::fs::write(&temp, json)?;
        std::fs::rename(&temp, &self.path).map_err(|e| {
            RoutingError::store(format!(
                "Failed to replace {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
