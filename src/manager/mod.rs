// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-target wiring between a device session and the bus.
//!
//! A [`TargetSupervisor`] owns everything belonging to one PDU: the
//! [`DeviceSession`], the state channel it reports on, the command queue it
//! reads from, and the [`Reconciler`] holding the last announced snapshot.
//! Nothing here is shared with other targets except the bus handle.
//!
//! ```text
//! DeviceSession --DeviceState--> Reconciler --Action--> Bus
//!       ^                                                |
//!       +------------- OutletCommand <-- CommandSink <---+
//! ```

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::Instrument;

use crate::command::{CommandSink, OutletCommand};
use crate::protocol::{Bus, Connector};
use crate::reconcile::{Action, Reconciler};
use crate::session::{DeviceSession, SessionConfig};

/// Drives one target for the lifetime of the process.
///
/// # Examples
///
/// ```no_run
/// use apc2mqtt::manager::TargetSupervisor;
/// use apc2mqtt::protocol::{MqttBroker, SnmpConnector};
///
/// # async fn example() -> apc2mqtt::Result<()> {
/// let broker = MqttBroker::builder().host("broker.lan").build().await?;
/// let supervisor = TargetSupervisor::new(SnmpConnector::new("pdu1.lan", 161), broker);
/// supervisor.run().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TargetSupervisor<C: Connector, B: Bus> {
    connector: C,
    bus: B,
    session: SessionConfig,
}

impl<C: Connector, B: Bus> TargetSupervisor<C, B> {
    /// Creates a supervisor for the device reached through `connector`.
    #[must_use]
    pub fn new(connector: C, bus: B) -> Self {
        Self {
            connector,
            bus,
            session: SessionConfig::default(),
        }
    }

    /// Overrides the session timing.
    #[must_use]
    pub fn with_session_config(mut self, config: SessionConfig) -> Self {
        self.session = config;
        self
    }

    /// Runs the target.
    ///
    /// Spawns the device session and processes every snapshot it emits, in
    /// order, exactly once. Only returns if the session task dies.
    pub async fn run(self) {
        let (state_tx, mut states) = mpsc::channel(1);
        let (command_tx, commands) = mpsc::unbounded_channel();

        let session = DeviceSession::new(self.connector, self.session, state_tx, commands);
        let mut connection = session.connection_state();
        let session_task = tokio::spawn(session.run().in_current_span());

        tokio::spawn(
            async move {
                while connection.changed().await.is_ok() {
                    let state = *connection.borrow_and_update();
                    tracing::debug!(state = ?state, "Connection state changed");
                }
            }
            .in_current_span(),
        );

        let mut reconciler = Reconciler::new();
        while let Some(state) = states.recv().await {
            tracing::trace!(outlets = state.outlets().len(), "Received PDU state");
            for action in reconciler.observe(state) {
                execute(&self.bus, &command_tx, action).await;
            }
        }

        if let Err(e) = session_task.await {
            tracing::error!(error = %e, "Device session terminated");
        }
    }
}

/// Performs one action on the bus. Failures are logged and skipped.
async fn execute<B: Bus>(
    bus: &B,
    commands: &mpsc::UnboundedSender<OutletCommand>,
    action: Action,
) {
    match action {
        Action::Announce { topic, config } => {
            let payload = match config.to_payload() {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::error!(topic = %topic, error = %e, "Failed to encode discovery descriptor");
                    return;
                }
            };
            tracing::info!(topic = %topic, name = %config.name, "Announcing outlet");
            if let Err(e) = bus.publish(&topic, payload).await {
                tracing::warn!(topic = %topic, error = %e, "Failed to publish discovery descriptor");
            }
        }
        Action::Subscribe { topic, outlet } => {
            let sink = Arc::new(CommandSink::new(commands.clone(), outlet));
            if let Err(e) = bus.subscribe(&topic, sink).await {
                tracing::warn!(topic = %topic, error = %e, "Failed to subscribe to command topic");
            }
        }
        Action::PublishValue { topic, state } => {
            if let Err(e) = bus.publish(&topic, state.as_str().as_bytes().to_vec()).await {
                tracing::warn!(topic = %topic, error = %e, "Failed to publish outlet state");
            }
        }
    }
}
