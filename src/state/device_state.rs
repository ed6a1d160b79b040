// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polled PDU state.

use crate::types::PowerState;

/// One switchable outlet as last read from the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outlet {
    name: String,
    state: PowerState,
}

impl Outlet {
    /// Creates an outlet.
    #[must_use]
    pub fn new(name: impl Into<String>, state: PowerState) -> Self {
        Self {
            name: name.into(),
            state,
        }
    }

    /// Returns the label configured on the device.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the power state.
    #[must_use]
    pub fn state(&self) -> PowerState {
        self.state
    }
}

/// Snapshot of a PDU produced by one poll cycle.
///
/// Snapshots are never updated in place; each poll builds a new one. The
/// outlet list is positional: the outlet at position `i` is controlled
/// through address `i + 1` (see [`crate::types::OutletIndex::from_position`]).
///
/// # Examples
///
/// ```
/// use apc2mqtt::state::{DeviceState, Outlet};
/// use apc2mqtt::types::PowerState;
///
/// let state = DeviceState::new(
///     "rack-a",
///     "AB1234",
///     "AP7900",
///     vec![Outlet::new("Lamp", PowerState::Off)],
/// );
/// assert_eq!(state.outlets().len(), 1);
/// assert_eq!(state.outlet(0).map(|o| o.name()), Some("Lamp"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceState {
    /// PDU display name.
    name: String,
    /// Serial number; stable, used as the device key.
    serial: String,
    /// Model number.
    model: String,
    outlets: Vec<Outlet>,
}

impl DeviceState {
    /// Creates a snapshot.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        serial: impl Into<String>,
        model: impl Into<String>,
        outlets: Vec<Outlet>,
    ) -> Self {
        Self {
            name: name.into(),
            serial: serial.into(),
            model: model.into(),
            outlets,
        }
    }

    /// Returns the PDU display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the serial number.
    #[must_use]
    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// Returns the model number.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the outlets in device order.
    #[must_use]
    pub fn outlets(&self) -> &[Outlet] {
        &self.outlets
    }

    /// Returns the outlet at a zero-based position.
    #[must_use]
    pub fn outlet(&self, position: usize) -> Option<&Outlet> {
        self.outlets.get(position)
    }
}
