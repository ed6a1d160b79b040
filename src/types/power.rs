// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Power-related types for PDU outlets.
//!
//! An outlet's power state has three spellings depending on who is looking at
//! it: the bus tokens `ON`/`OFF`, the value read back from the outlet control
//! table (`1` means on), and the tri-state code written to that table
//! (`1` = on, `2` = off; the device reserves further codes for reboot
//! sequences we never send).

use std::fmt;

use crate::error::ValueError;

/// Represents the power state of an outlet.
///
/// # Examples
///
/// ```
/// use apc2mqtt::types::PowerState;
///
/// assert_eq!(PowerState::On.as_str(), "ON");
/// assert_eq!(PowerState::from_payload(b"ON"), PowerState::On);
/// assert_eq!(PowerState::from_payload(b"on"), PowerState::Off);
/// assert_eq!(PowerState::Off.control_code(), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PowerState {
    /// Power is off.
    #[default]
    Off,
    /// Power is on.
    On,
}

impl PowerState {
    /// Returns the token published on the state topic.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::On => "ON",
        }
    }

    /// Decodes a command payload.
    ///
    /// Only the exact bytes `ON` switch an outlet on; every other payload,
    /// including `on`, `1` and the empty payload, means off.
    #[must_use]
    pub fn from_payload(payload: &[u8]) -> Self {
        if payload == Self::On.as_str().as_bytes() {
            Self::On
        } else {
            Self::Off
        }
    }

    /// Returns the code written to the outlet control table.
    #[must_use]
    pub const fn control_code(&self) -> i64 {
        match self {
            Self::On => 1,
            Self::Off => 2,
        }
    }

    /// Interprets a value read from the outlet control table.
    ///
    /// `1` is on; anything else the device reports (off, reboot in progress,
    /// pending on/off) is treated as off.
    #[must_use]
    pub const fn from_control_code(code: i64) -> Self {
        if code == 1 { Self::On } else { Self::Off }
    }

    /// Returns `true` if this is [`PowerState::On`].
    #[must_use]
    pub const fn is_on(&self) -> bool {
        matches!(self, Self::On)
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<bool> for PowerState {
    fn from(value: bool) -> Self {
        if value { Self::On } else { Self::Off }
    }
}

/// Control address of an outlet on the PDU.
///
/// Outlets are addressed from 1. The outlet at zero-based position `i` of a
/// polled outlet list has address `i + 1`.
///
/// # Examples
///
/// ```
/// use apc2mqtt::types::OutletIndex;
///
/// let idx = OutletIndex::from_position(0);
/// assert_eq!(idx.value(), 1);
/// assert_eq!(idx.position(), 0);
///
/// assert!(OutletIndex::new(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutletIndex(u32);

impl OutletIndex {
    /// Creates an outlet index from a control address.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidOutletIndex` if `index` is 0.
    pub fn new(index: u32) -> Result<Self, ValueError> {
        if index == 0 {
            return Err(ValueError::InvalidOutletIndex(index));
        }
        Ok(Self(index))
    }

    /// Creates the index for the outlet at a zero-based list position.
    #[must_use]
    pub fn from_position(position: usize) -> Self {
        // Safe: PDUs have a few dozen outlets at most
        #[allow(clippy::cast_possible_truncation)]
        let index = (position + 1) as u32;
        Self(index)
    }

    /// Returns the control address.
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }

    /// Returns the zero-based list position.
    #[must_use]
    pub const fn position(&self) -> usize {
        (self.0 - 1) as usize
    }
}

impl fmt::Display for OutletIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
