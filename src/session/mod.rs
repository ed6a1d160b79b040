// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Long-lived connection to one PDU.
//!
//! A [`DeviceSession`] owns the device transport and is the only code that
//! talks to it. It alternates between two states:
//!
//! - **Disconnected**: open a connection; on failure wait
//!   [`SessionConfig::reconnect_delay`] and try again, forever.
//! - **Connected**: wait for either the next poll tick or the next queued
//!   command and handle whichever arrives first. Device I/O is never
//!   interleaved.
//!
//! A failed poll drops the connection and starts over with a fresh one. A
//! failed command is logged and the connection is kept.

pub mod mib;
mod poll;

pub use poll::{apply_command, fetch_state};

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{self, MissedTickBehavior};

use crate::command::OutletCommand;
use crate::error::ConnectError;
use crate::protocol::Connector;
use crate::state::DeviceState;

/// Default interval between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default wait between failed connection attempts.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Timing of a [`DeviceSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Interval between polls while connected.
    pub poll_interval: Duration,
    /// Wait between connection attempts.
    pub reconnect_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

/// Connection state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No connection; waiting to retry.
    #[default]
    Disconnected,
    /// A connection attempt is in progress.
    Connecting,
    /// Connected and polling.
    Connected,
}

impl ConnectionState {
    /// Returns true if the session is connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// How a connected period ended.
enum Served {
    /// The connection is unusable; open a new one.
    Lost,
    /// Nobody consumes states any more.
    Orphaned,
}

/// Poll/command loop for one device.
///
/// # Examples
///
/// ```no_run
/// use apc2mqtt::protocol::SnmpConnector;
/// use apc2mqtt::session::{DeviceSession, SessionConfig};
///
/// # async fn example() {
/// let (state_tx, mut states) = tokio::sync::mpsc::channel(1);
/// let (_command_tx, commands) = tokio::sync::mpsc::unbounded_channel();
///
/// let connector = SnmpConnector::new("pdu1.lan", 161);
/// let session = DeviceSession::new(connector, SessionConfig::default(), state_tx, commands);
/// tokio::spawn(session.run());
///
/// while let Some(state) = states.recv().await {
///     println!("{} has {} outlets", state.name(), state.outlets().len());
/// }
/// # }
/// ```
pub struct DeviceSession<C: Connector> {
    connector: C,
    config: SessionConfig,
    states: mpsc::Sender<DeviceState>,
    commands: mpsc::UnboundedReceiver<OutletCommand>,
    commands_closed: bool,
    connection: watch::Sender<ConnectionState>,
}

impl<C: Connector> DeviceSession<C> {
    /// Creates a session.
    ///
    /// Every successful poll is sent on `states`; the send waits for room, so
    /// a slow consumer delays polling instead of losing snapshots. Commands
    /// are read from `commands`.
    #[must_use]
    pub fn new(
        connector: C,
        config: SessionConfig,
        states: mpsc::Sender<DeviceState>,
        commands: mpsc::UnboundedReceiver<OutletCommand>,
    ) -> Self {
        let (connection, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            connector,
            config,
            states,
            commands,
            commands_closed: false,
            connection,
        }
    }

    /// Returns a receiver tracking the connection state.
    #[must_use]
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.connection.subscribe()
    }

    /// Runs the session.
    ///
    /// Returns only once the state receiver has been dropped.
    pub async fn run(mut self) {
        loop {
            let transport = self.connect().await;
            match self.serve(transport).await {
                Served::Lost => {}
                Served::Orphaned => {
                    tracing::debug!(device = %self.connector.target(), "State receiver dropped, stopping session");
                    self.set_state(ConnectionState::Disconnected);
                    return;
                }
            }
        }
    }

    async fn connect(&mut self) -> C::Transport {
        loop {
            self.set_state(ConnectionState::Connecting);
            match self.connector.connect().await {
                Ok(transport) => {
                    tracing::info!(device = %self.connector.target(), "Connected to PDU");
                    self.set_state(ConnectionState::Connected);
                    return transport;
                }
                Err(source) => {
                    let err = ConnectError {
                        target: self.connector.target().to_string(),
                        source,
                    };
                    tracing::warn!(
                        error = %err,
                        retry_in = ?self.config.reconnect_delay,
                        "Connection failed"
                    );
                    self.set_state(ConnectionState::Disconnected);
                    time::sleep(self.config.reconnect_delay).await;
                }
            }
        }
    }

    async fn serve(&mut self, mut transport: C::Transport) -> Served {
        let mut ticker = time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match fetch_state(&mut transport).await {
                        Ok(state) => {
                            if self.states.send(state).await.is_err() {
                                return Served::Orphaned;
                            }
                        }
                        Err(err) => {
                            tracing::warn!(
                                device = %self.connector.target(),
                                error = %err,
                                "Poll failed, reconnecting"
                            );
                            self.set_state(ConnectionState::Disconnected);
                            return Served::Lost;
                        }
                    }
                }
                command = self.commands.recv(), if !self.commands_closed => {
                    let Some(command) = command else {
                        tracing::debug!(device = %self.connector.target(), "Command queue closed");
                        self.commands_closed = true;
                        continue;
                    };
                    match apply_command(&mut transport, command).await {
                        Ok(()) => tracing::debug!(command = %command, "Applied command"),
                        Err(err) => tracing::warn!(error = %err, "Command failed"),
                    }
                }
            }
        }
    }

    fn set_state(&self, state: ConnectionState) {
        self.connection.send_replace(state);
    }
}

impl<C: Connector + std::fmt::Debug> std::fmt::Debug for DeviceSession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("connector", &self.connector)
            .field("config", &self.config)
            .field("connection", &*self.connection.borrow())
            .finish_non_exhaustive()
    }
}
