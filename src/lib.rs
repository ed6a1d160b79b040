// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `apc2mqtt` - bridges APC switched PDUs to Home Assistant over MQTT.
//!
//! Every configured PDU is polled over SNMP once a second. Each of its
//! outlets is announced as a Home Assistant `switch` through MQTT discovery,
//! its state is published on every poll, and commands received on its `set`
//! topic are written back to the PDU.
//!
//! # Architecture
//!
//! | Module       | Role                                                       |
//! |--------------|------------------------------------------------------------|
//! | [`session`]  | Owns one PDU connection: reconnect, poll, apply commands   |
//! | [`reconcile`]| Decides what to announce, subscribe and publish per poll   |
//! | [`manager`]  | Wires one session to the bus                               |
//! | [`discovery`]| Topics, unique identifiers and discovery descriptors       |
//! | [`protocol`] | Device and bus seams, SNMP and MQTT implementations        |
//! | [`bridge`]   | One broker connection, one supervisor per target           |
//!
//! # Features
//!
//! - `snmp` (default): SNMPv1 device transport
//! - `mqtt` (default): MQTT bus
//!
//! # Quick Start
//!
//! ```no_run
//! use apc2mqtt::bridge::{Bridge, BuildInfo};
//! use apc2mqtt::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> apc2mqtt::Result<()> {
//!     let config = Config::load("config.toml".as_ref())?;
//!     Bridge::new(config, BuildInfo::CURRENT).run().await;
//!     Ok(())
//! }
//! ```
//!
//! # Driving a target by hand
//!
//! ```no_run
//! use apc2mqtt::manager::TargetSupervisor;
//! use apc2mqtt::protocol::{MqttBroker, SnmpConnector};
//! use apc2mqtt::session::SessionConfig;
//! use std::time::Duration;
//!
//! # async fn example() -> apc2mqtt::Result<()> {
//! let broker = MqttBroker::builder()
//!     .host("192.168.1.50")
//!     .credentials("user", "password")
//!     .build()
//!     .await?;
//!
//! let connector = SnmpConnector::new("192.168.1.20", 161).with_community("private");
//! let session = SessionConfig {
//!     poll_interval: Duration::from_secs(5),
//!     ..SessionConfig::default()
//! };
//!
//! TargetSupervisor::new(connector, broker)
//!     .with_session_config(session)
//!     .run()
//!     .await;
//! # Ok(())
//! # }
//! ```

#[cfg(all(feature = "snmp", feature = "mqtt"))]
pub mod bridge;
pub mod command;
pub mod config;
pub mod discovery;
pub mod error;
pub mod manager;
pub mod protocol;
pub mod reconcile;
pub mod session;
pub mod state;
pub mod types;

pub use command::{CommandSink, OutletCommand};
pub use config::Config;
pub use error::{
    CommandError, ConfigError, ConnectError, Error, ParseError, PollError, ProtocolError, Result,
    ValueError,
};
pub use manager::TargetSupervisor;
#[cfg(feature = "mqtt")]
pub use protocol::{MqttBroker, MqttBrokerBuilder, MqttBrokerConfig};
pub use protocol::{Bus, Connector, DeviceTransport, MessageHandler, ObjectId, SnmpValue};
#[cfg(feature = "snmp")]
pub use protocol::{SnmpClient, SnmpConnector};
pub use reconcile::{Action, Reconciler};
pub use session::{ConnectionState, DeviceSession, SessionConfig};
pub use state::{DeviceState, Outlet};
pub use types::{OutletIndex, PowerState};
