// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Single poll and command operations against a connected PDU.

use crate::command::OutletCommand;
use crate::error::{CommandError, ParseError, PollError};
use crate::protocol::{DeviceTransport, ObjectId, SnmpValue};
use crate::state::{DeviceState, Outlet};
use crate::types::PowerState;

use super::mib;

/// Reads a complete [`DeviceState`] from the device.
///
/// Performs three scalar reads (name, serial, model) and then walks the
/// outlet name table and the outlet control table. Any failure discards
/// everything read so far.
///
/// # Errors
///
/// Returns `PollError` naming the phase that failed, or
/// `PollError::Malformed` if the device answered with unexpected types or
/// tables of different lengths.
pub async fn fetch_state<T: DeviceTransport>(transport: &mut T) -> Result<DeviceState, PollError> {
    let name = read_text(transport, mib::PDU_NAME, "sPDUMasterConfigPDUName").await?;
    let serial = read_text(transport, mib::SERIAL_NUMBER, "sPDUIdentSerialNumber").await?;
    let model = read_text(transport, mib::MODEL_NUMBER, "sPDUIdentModelNumber").await?;

    let names = transport
        .walk(&ObjectId::from(mib::OUTLET_NAME))
        .await
        .map_err(PollError::OutletNames)?;
    let states = transport
        .walk(&ObjectId::from(mib::OUTLET_CTL))
        .await
        .map_err(PollError::OutletStates)?;

    if names.len() != states.len() {
        return Err(ParseError::OutletTableMismatch {
            names: names.len(),
            states: states.len(),
        }
        .into());
    }

    let outlets = names
        .into_iter()
        .zip(states)
        .map(|((name_oid, name), (_, state))| {
            let name = name.as_text().ok_or_else(|| ParseError::UnexpectedValue {
                field: name_oid.to_string(),
                value: name.to_string(),
            })?;
            let state = state
                .as_integer()
                .map_or(PowerState::Off, PowerState::from_control_code);
            Ok(Outlet::new(name, state))
        })
        .collect::<Result<Vec<_>, ParseError>>()?;

    Ok(DeviceState::new(name, serial, model, outlets))
}

/// Writes one outlet command to the device.
///
/// # Errors
///
/// Returns `CommandError` if the write fails or the device rejects it.
pub async fn apply_command<T: DeviceTransport>(
    transport: &mut T,
    command: OutletCommand,
) -> Result<(), CommandError> {
    let oid = mib::outlet_control(command.outlet());
    transport
        .set(&oid, SnmpValue::Integer(command.state().control_code()))
        .await
        .map_err(|source| CommandError {
            outlet: command.outlet(),
            source,
        })
}

async fn read_text<T: DeviceTransport>(
    transport: &mut T,
    arcs: &[u64],
    field: &str,
) -> Result<String, PollError> {
    let value = transport
        .get(&ObjectId::from(arcs))
        .await
        .map_err(PollError::Identity)?;
    value.as_text().ok_or_else(|| {
        ParseError::UnexpectedValue {
            field: field.to_string(),
            value: value.to_string(),
        }
        .into()
    })
}
