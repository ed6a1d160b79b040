// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for `apc2mqtt`.
//!
//! Besides the usual value/protocol/parse/config errors, the device session
//! classifies its failures into three kinds with different consequences:
//!
//! - [`ConnectError`]: the device could not be reached; retried after a fixed
//!   backoff, forever.
//! - [`PollError`]: reading state from a connected device failed; the
//!   connection is abandoned and rebuilt from scratch.
//! - [`CommandError`]: writing an outlet state failed; logged, the connection
//!   is kept.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::OutletIndex;

/// The main error type for this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Error occurred while talking to the device or the broker.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Error occurred while interpreting device data.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Configuration could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// A device could not be reached.
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// A poll cycle failed.
    #[error(transparent)]
    Poll(#[from] PollError),

    /// An outlet command failed.
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Errors related to value validation and constraints.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// Outlet control addresses start at 1.
    #[error("invalid outlet index: {0} (outlets are numbered from 1)")]
    InvalidOutletIndex(u32),

    /// An object identifier string could not be parsed.
    #[error("invalid object identifier: {0}")]
    InvalidObjectId(String),
}

/// Errors related to protocol communication (SNMP/MQTT).
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// SNMP request failed below the protocol level.
    #[error("SNMP error: {0}")]
    Snmp(String),

    /// The agent answered with a non-zero error status.
    #[error("SNMP error status {status} at index {index}")]
    ErrorStatus {
        /// The SNMP error-status field.
        status: u32,
        /// The SNMP error-index field.
        index: u32,
    },

    /// MQTT client request failed.
    #[cfg(feature = "mqtt")]
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// Connection to the peer failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Request timed out.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// Invalid address or identifier.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Internal channel was closed.
    #[error("channel closed: {0}")]
    ChannelClosed(String),
}

/// Errors related to interpreting values read from a device.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A value had a different type than the MIB defines.
    #[error("unexpected value for {field}: {value}")]
    UnexpectedValue {
        /// The object that was read.
        field: String,
        /// Description of what came back.
        value: String,
    },

    /// The outlet name and outlet state tables disagree.
    #[error("outlet table mismatch: {names} names, {states} states")]
    OutletTableMismatch {
        /// Number of rows in the name table.
        names: usize,
        /// Number of rows in the control table.
        states: usize,
    },
}

/// Errors related to loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The path that was read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or does not match the schema.
    #[error("failed to decode config: {0}")]
    Toml(#[from] toml::de::Error),

    /// A field has an unusable value.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// The offending field.
        field: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// A device could not be reached. Retryable.
#[derive(Debug, Error)]
#[error("error connecting to SNMP target {target}: {source}")]
pub struct ConnectError {
    /// The device address, for logs.
    pub target: String,
    /// What went wrong.
    #[source]
    pub source: ProtocolError,
}

/// Reading state from a connected device failed. Forces a reconnect.
#[derive(Debug, Error)]
pub enum PollError {
    /// Reading the name, serial or model failed.
    #[error("get PDU info: {0}")]
    Identity(#[source] ProtocolError),

    /// Walking the outlet name table failed.
    #[error("walk PDU outlet names: {0}")]
    OutletNames(#[source] ProtocolError),

    /// Walking the outlet control table failed.
    #[error("walk PDU outlet states: {0}")]
    OutletStates(#[source] ProtocolError),

    /// The device answered, but not with something we understand.
    #[error("malformed PDU state: {0}")]
    Malformed(#[from] ParseError),
}

/// Writing an outlet state failed. The connection is kept.
#[derive(Debug, Error)]
#[error("setting outlet {outlet} state: {source}")]
pub struct CommandError {
    /// The outlet the command addressed.
    pub outlet: OutletIndex,
    /// What went wrong.
    #[source]
    pub source: ProtocolError,
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
