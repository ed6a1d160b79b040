// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-outlet subscription handler.

use tokio::sync::mpsc;

use crate::protocol::MessageHandler;
use crate::types::OutletIndex;

use super::OutletCommand;

/// Turns messages on one outlet's `set` topic into commands for its session.
///
/// The sink is bound to one target's command queue and one outlet when it is
/// created; routing never looks anything up at delivery time.
#[derive(Debug, Clone)]
pub struct CommandSink {
    commands: mpsc::UnboundedSender<OutletCommand>,
    outlet: OutletIndex,
}

impl CommandSink {
    /// Creates a sink for `outlet` feeding `commands`.
    #[must_use]
    pub fn new(commands: mpsc::UnboundedSender<OutletCommand>, outlet: OutletIndex) -> Self {
        Self { commands, outlet }
    }

    /// Returns the outlet this sink addresses.
    #[must_use]
    pub fn outlet(&self) -> OutletIndex {
        self.outlet
    }
}

impl MessageHandler for CommandSink {
    fn handle(&self, payload: &[u8]) {
        let command = OutletCommand::from_payload(self.outlet, payload);
        tracing::debug!(command = %command, "Received outlet command");
        if self.commands.send(command).is_err() {
            tracing::warn!(command = %command, "Dropping command, session has stopped");
        }
    }
}
