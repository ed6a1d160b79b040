// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types for outlet control.
//!
//! - [`PowerState`] - On/Off, with its bus and device encodings
//! - [`OutletIndex`] - 1-based outlet control address

mod power;

pub use power::{OutletIndex, PowerState};
