// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Objects of the APC `PowerNet-MIB` read and written by the bridge.
//!
//! `snmptranslate -m PowerNet-MIB -Pu -Tso` lists the full tree.

use crate::protocol::ObjectId;
use crate::types::OutletIndex;

/// `sPDUMasterConfigPDUName.0`: PDU display name.
pub const PDU_NAME: &[u64] = &[1, 3, 6, 1, 4, 1, 318, 1, 1, 4, 3, 3, 0];

/// `sPDUIdentSerialNumber.0`.
pub const SERIAL_NUMBER: &[u64] = &[1, 3, 6, 1, 4, 1, 318, 1, 1, 4, 1, 5, 0];

/// `sPDUIdentModelNumber.0`.
pub const MODEL_NUMBER: &[u64] = &[1, 3, 6, 1, 4, 1, 318, 1, 1, 4, 1, 4, 0];

/// `sPDUOutletName`: one row per outlet.
pub const OUTLET_NAME: &[u64] = &[1, 3, 6, 1, 4, 1, 318, 1, 1, 4, 5, 2, 1, 3];

/// `sPDUOutletCtl`: one row per outlet, read and written.
pub const OUTLET_CTL: &[u64] = &[1, 3, 6, 1, 4, 1, 318, 1, 1, 4, 4, 2, 1, 3];

/// Returns the control object for one outlet, `sPDUOutletCtl.<index>`.
#[must_use]
pub fn outlet_control(outlet: OutletIndex) -> ObjectId {
    ObjectId::from(OUTLET_CTL).child(u64::from(outlet.value()))
}
