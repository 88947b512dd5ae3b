//! Audio output device and routing types

use serde::{Deserialize, Serialize};

/// Coarse category of an audio output device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceClass {
    /// Built-in loudspeaker
    Speaker,
    /// Wired headset or headphones (3.5mm jack)
    WiredHeadset,
    /// USB audio interface or USB headset
    #[serde(rename = "USB_DEVICE")]
    Usb,
    /// Bluetooth media profile (A2DP)
    BluetoothA2dp,
    /// Bluetooth voice profile (SCO)
    BluetoothSco,
}

impl DeviceClass {
    /// All device classes
    pub const ALL: [DeviceClass; 5] = [
        Self::Speaker,
        Self::WiredHeadset,
        Self::Usb,
        Self::BluetoothA2dp,
        Self::BluetoothSco,
    ];

    /// Persisted enumeration name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Speaker => "SPEAKER",
            Self::WiredHeadset => "WIRED_HEADSET",
            Self::Usb => "USB_DEVICE",
            Self::BluetoothA2dp => "BLUETOOTH_A2DP",
            Self::BluetoothSco => "BLUETOOTH_SCO",
        }
    }

    /// Parse from the persisted enumeration name
    ///
    /// Matching is exact; anything else is an unknown class.
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "SPEAKER" => Some(Self::Speaker),
            "WIRED_HEADSET" => Some(Self::WiredHeadset),
            "USB_DEVICE" => Some(Self::Usb),
            "BLUETOOTH_A2DP" => Some(Self::BluetoothA2dp),
            "BLUETOOTH_SCO" => Some(Self::BluetoothSco),
            _ => None,
        }
    }

    /// Whether the class is carried over Bluetooth
    #[must_use]
    pub fn is_bluetooth(&self) -> bool {
        matches!(self, Self::BluetoothA2dp | Self::BluetoothSco)
    }

    /// Whether the device plugs in by cable (USB audio counts as wired)
    #[must_use]
    pub fn is_wired(&self) -> bool {
        matches!(self, Self::WiredHeadset | Self::Usb)
    }
}

impl std::fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An audio output device as reported by device discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioDevice {
    /// Stable identifier of the physical device
    pub id: String,

    /// Display name (e.g., "Headphones X", "Phone speaker")
    pub name: String,

    /// Device class
    pub class: DeviceClass,

    /// Hardware address, Bluetooth devices only
    pub address: Option<String>,

    /// Is the device currently connected?
    pub connected: bool,

    /// Is audio currently routed to this device?
    pub active: bool,
}

impl AudioDevice {
    /// Create a connected, inactive device without a hardware address
    pub fn new(id: impl Into<String>, name: impl Into<String>, class: DeviceClass) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            class,
            address: None,
            connected: true,
            active: false,
        }
    }

    /// Set the hardware address
    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Address used for Bluetooth pairing lookups
    ///
    /// Bluetooth device ids are hardware addresses, so the id stands in when
    /// no explicit address was recorded.
    pub fn bluetooth_address(&self) -> Option<&str> {
        if !self.class.is_bluetooth() {
            return None;
        }
        Some(self.address.as_deref().unwrap_or(&self.id))
    }
}

/// Actual output route of the platform, derived from live queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoutingState {
    /// Built-in loudspeaker
    Speaker,
    /// Wired or USB output
    Wired,
    /// Bluetooth A2DP
    BluetoothA2dp,
    /// Bluetooth SCO
    BluetoothSco,
}

impl RoutingState {
    /// Route the platform should report while `class` is the preferred device
    ///
    /// SCO has no dedicated expectation and falls back to the speaker.
    #[must_use]
    pub fn expected_for(class: DeviceClass) -> Self {
        match class {
            DeviceClass::Speaker => Self::Speaker,
            DeviceClass::BluetoothA2dp => Self::BluetoothA2dp,
            DeviceClass::WiredHeadset | DeviceClass::Usb => Self::Wired,
            DeviceClass::BluetoothSco => Self::Speaker,
        }
    }

    /// Resolve the route from live signals
    ///
    /// Precedence: A2DP, SCO, speakerphone, wired, then speaker.
    #[must_use]
    pub fn resolve(signals: RoutingSignals) -> Self {
        if signals.bluetooth_a2dp_on {
            Self::BluetoothA2dp
        } else if signals.bluetooth_sco_on {
            Self::BluetoothSco
        } else if signals.speakerphone_on {
            Self::Speaker
        } else if signals.wired_present {
            Self::Wired
        } else {
            Self::Speaker
        }
    }
}

impl std::fmt::Display for RoutingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Speaker => "SPEAKER",
            Self::Wired => "WIRED",
            Self::BluetoothA2dp => "BLUETOOTH_A2DP",
            Self::BluetoothSco => "BLUETOOTH_SCO",
        };
        f.write_str(name)
    }
}

/// Live platform signals sampled for one check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoutingSignals {
    pub bluetooth_a2dp_on: bool,
    pub bluetooth_sco_on: bool,
    pub speakerphone_on: bool,
    pub wired_present: bool,
}
