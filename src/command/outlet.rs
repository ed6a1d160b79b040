// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Outlet power command.

use std::fmt;

use crate::types::{OutletIndex, PowerState};

/// Request to switch one outlet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutletCommand {
    outlet: OutletIndex,
    state: PowerState,
}

impl OutletCommand {
    /// Creates a command.
    #[must_use]
    pub const fn new(outlet: OutletIndex, state: PowerState) -> Self {
        Self { outlet, state }
    }

    /// Decodes a command message payload for `outlet`.
    ///
    /// See [`PowerState::from_payload`]: only `ON` switches on.
    #[must_use]
    pub fn from_payload(outlet: OutletIndex, payload: &[u8]) -> Self {
        Self::new(outlet, PowerState::from_payload(payload))
    }

    /// Returns the addressed outlet.
    #[must_use]
    pub const fn outlet(&self) -> OutletIndex {
        self.outlet
    }

    /// Returns the desired power state.
    #[must_use]
    pub const fn state(&self) -> PowerState {
        self.state
    }
}

impl fmt::Display for OutletCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "outlet {} {}", self.outlet, self.state)
    }
}
