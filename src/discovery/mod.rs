// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Home Assistant MQTT discovery for PDU outlets.
//!
//! Each outlet is exposed as a `switch` entity with three topics under
//! `homeassistant/switch/<uid>/`:
//!
//! | Topic    | Direction | Payload                         |
//! |----------|-----------|---------------------------------|
//! | `config` | out       | [`SwitchConfig`] as JSON        |
//! | `state`  | out       | `ON` or `OFF`                   |
//! | `set`    | in        | `ON` switches on, anything else off |
//!
//! The `uid` is `apc_<serial>_<position>`, with the serial lower-cased and the
//! zero-based outlet position, so it is stable across polls and restarts.
//!
//! # Examples
//!
//! ```
//! use apc2mqtt::discovery::{SwitchTopics, unique_id};
//!
//! let uid = unique_id("AB1234", 0);
//! assert_eq!(uid, "apc_ab1234_0");
//!
//! let topics = SwitchTopics::new(&uid);
//! assert_eq!(topics.config, "homeassistant/switch/apc_ab1234_0/config");
//! assert_eq!(topics.set, "homeassistant/switch/apc_ab1234_0/set");
//! ```

use serde::Serialize;

use crate::error::ParseError;
use crate::state::{DeviceState, Outlet};

/// Root of all discovery topics.
pub const DISCOVERY_PREFIX: &str = "homeassistant";

/// Entity component the outlets are announced as.
pub const COMPONENT: &str = "switch";

/// Prefix of every outlet's unique identifier.
pub const UNIQUE_ID_PREFIX: &str = "apc";

/// Manufacturer reported in the device block.
pub const MANUFACTURER: &str = "APC";

/// Returns the unique identifier of the outlet at zero-based `position` on
/// the device with serial number `serial`.
#[must_use]
pub fn unique_id(serial: &str, position: usize) -> String {
    format!(
        "{UNIQUE_ID_PREFIX}_{}_{position}",
        serial.to_lowercase()
    )
}

/// Topics of one switch entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchTopics {
    /// Discovery descriptor topic.
    pub config: String,
    /// Current value topic.
    pub state: String,
    /// Command topic.
    pub set: String,
}

impl SwitchTopics {
    /// Builds the topics for `unique_id`.
    #[must_use]
    pub fn new(unique_id: &str) -> Self {
        let base = format!("{DISCOVERY_PREFIX}/{COMPONENT}/{unique_id}");
        Self {
            config: format!("{base}/config"),
            state: format!("{base}/state"),
            set: format!("{base}/set"),
        }
    }
}

/// Device block shared by every outlet of one PDU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// PDU display name.
    pub name: String,
    /// Serial number, as reported by the device.
    pub identifiers: String,
    /// Model number.
    pub model: String,
    /// Always [`MANUFACTURER`].
    pub manufacturer: String,
}

impl DeviceInfo {
    /// Builds the device block from a snapshot.
    #[must_use]
    pub fn from_state(state: &DeviceState) -> Self {
        Self {
            name: state.name().to_string(),
            identifiers: state.serial().to_string(),
            model: state.model().to_string(),
            manufacturer: MANUFACTURER.to_string(),
        }
    }
}

/// Discovery descriptor published on an outlet's `config` topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwitchConfig {
    /// Outlet name.
    pub name: String,
    /// Topic Home Assistant publishes commands on.
    pub command_topic: String,
    /// Topic carrying the current value.
    pub state_topic: String,
    /// Stable entity identifier.
    pub unique_id: String,
    /// Owning PDU.
    pub device: DeviceInfo,
}

impl SwitchConfig {
    /// Builds the descriptor for the outlet at `position` of `state`.
    #[must_use]
    pub fn new(state: &DeviceState, position: usize, outlet: &Outlet) -> Self {
        let unique_id = unique_id(state.serial(), position);
        let topics = SwitchTopics::new(&unique_id);
        Self {
            name: outlet.name().to_string(),
            command_topic: topics.set,
            state_topic: topics.state,
            unique_id,
            device: DeviceInfo::from_state(state),
        }
    }

    /// Serializes the descriptor as a JSON payload.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Json` if serialization fails.
    pub fn to_payload(&self) -> Result<Vec<u8>, ParseError> {
        Ok(serde_json::to_vec(self)?)
    }
}
