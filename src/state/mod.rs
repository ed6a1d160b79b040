// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! PDU state snapshots.
//!
//! A [`DeviceState`] is what one poll cycle read from a PDU: its identity and
//! the ordered list of its [`Outlet`]s.

mod device_state;

pub use device_state::{DeviceState, Outlet};
