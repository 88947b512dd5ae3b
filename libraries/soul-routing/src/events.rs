//! Routing events
//!
//! Broadcast to any subscriber (UI, diagnostics) as the reconciler changes
//! state. Sending never blocks and is skipped when nobody listens.

use serde::{Deserialize, Serialize};

use crate::types::{DeviceClass, RoutingState};

/// Events emitted by the routing reconciler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutingEvent {
    /// A new preferred device was stored
    PreferenceChanged {
        device_id: String,
        device_name: String,
        class: DeviceClass,
    },

    /// The preference was erased
    PreferenceCleared {
        reason: ClearReason,
    },

    /// Background checks started
    MonitoringStarted {
        device_id: String,
    },

    /// Background checks stopped
    MonitoringStopped,

    /// The route had drifted and was switched back
    RouteCorrected {
        device_id: String,
        observed: RoutingState,
        expected: RoutingState,
    },

    /// Switching back failed but the device is still reachable
    CorrectionFailed {
        device_id: String,
        observed: RoutingState,
        expected: RoutingState,
    },
}

/// Why a preference was cleared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearReason {
    /// Explicit clear request
    Requested,
    /// The user signed out
    Logout,
    /// The preferred device can no longer be reached
    DeviceUnavailable,
}
