// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Protocol seams and their concrete clients.
//!
//! The bridge talks to two kinds of peers, each behind a trait so the session
//! and supervisor logic can be exercised without a network:
//!
//! - the PDU, through a [`Connector`] that yields a [`DeviceTransport`]
//!   (`get`, `walk`, `set` on numeric object identifiers)
//! - the message bus, through a [`Bus`] (`publish`, `subscribe`)
//!
//! # Implementations
//!
//! - [`SnmpConnector`] / [`SnmpClient`]: SNMPv1 over UDP (feature `snmp`)
//! - [`MqttBroker`]: a shared MQTT connection (feature `mqtt`)

#[cfg(feature = "mqtt")]
mod mqtt_broker;
mod oid;
#[cfg(feature = "snmp")]
pub mod snmp;
mod topic_router;

#[cfg(feature = "mqtt")]
pub use mqtt_broker::{MqttBroker, MqttBrokerBuilder, MqttBrokerConfig};
pub use oid::ObjectId;
#[cfg(feature = "snmp")]
pub use snmp::{SnmpClient, SnmpConnector};
pub use topic_router::TopicRouter;

use std::future::Future;
use std::sync::Arc;

use crate::error::ProtocolError;

/// A value read from or written to the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnmpValue {
    /// An `INTEGER`.
    Integer(i64),
    /// An `OCTET STRING`; display strings on APC PDUs are ASCII.
    OctetString(Vec<u8>),
    /// `NULL`.
    Null,
    /// The agent has nothing past the requested object.
    EndOfView,
    /// Any other type, kept only for diagnostics.
    Other(String),
}

impl SnmpValue {
    /// Returns the integer, if this is one.
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the octet string decoded as (lossy) UTF-8, if this is one.
    #[must_use]
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::OctetString(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
            _ => None,
        }
    }
}

impl std::fmt::Display for SnmpValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "INTEGER {value}"),
            Self::OctetString(bytes) => write!(f, "STRING {:?}", String::from_utf8_lossy(bytes)),
            Self::Null => write!(f, "NULL"),
            Self::EndOfView => write!(f, "endOfMibView"),
            Self::Other(desc) => write!(f, "{desc}"),
        }
    }
}

/// An open connection to one device.
///
/// Every method takes `&mut self`: a transport is owned by exactly one
/// session, which never has two requests in flight.
pub trait DeviceTransport: Send {
    /// Reads a single scalar object.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` on transport failure, timeout, or a non-zero
    /// error status.
    fn get(
        &mut self,
        oid: &ObjectId,
    ) -> impl Future<Output = Result<SnmpValue, ProtocolError>> + Send;

    /// Reads every object strictly below `base`, in device order.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if any request of the walk fails.
    fn walk(
        &mut self,
        base: &ObjectId,
    ) -> impl Future<Output = Result<Vec<(ObjectId, SnmpValue)>, ProtocolError>> + Send;

    /// Writes a single object.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` on transport failure, timeout, or when the
    /// device rejects the write.
    fn set(
        &mut self,
        oid: &ObjectId,
        value: SnmpValue,
    ) -> impl Future<Output = Result<(), ProtocolError>> + Send;
}

/// Opens connections to one device.
pub trait Connector: Send + Sync + 'static {
    /// The connection type produced.
    type Transport: DeviceTransport;

    /// Opens a fresh connection.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the device cannot be reached.
    fn connect(&self) -> impl Future<Output = Result<Self::Transport, ProtocolError>> + Send;

    /// Describes the device for log messages (usually `host:port`).
    fn target(&self) -> &str;
}

/// Receives messages published on a subscribed topic.
///
/// Handlers run on the bus dispatcher and must not block.
pub trait MessageHandler: Send + Sync {
    /// Handles one inbound message.
    fn handle(&self, payload: &[u8]);
}

impl<F> MessageHandler for F
where
    F: Fn(&[u8]) + Send + Sync,
{
    fn handle(&self, payload: &[u8]) {
        self(payload);
    }
}

/// The message bus.
///
/// Implementations are cheap to clone and safe to use from every target's
/// task at once.
pub trait Bus: Clone + Send + Sync + 'static {
    /// Publishes `payload` on `topic`.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the message cannot be queued.
    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), ProtocolError>> + Send;

    /// Registers `handler` for messages on `topic`.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the subscription cannot be requested.
    fn subscribe(
        &self,
        topic: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> impl Future<Output = Result<(), ProtocolError>> + Send;
}
