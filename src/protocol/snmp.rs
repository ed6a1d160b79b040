// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! SNMPv1 client for APC PDUs.
//!
//! Each request is bounded by a timeout and retried a fixed number of times
//! before it is reported as failed. Walks are a sequence of `GetNext`
//! requests.

use std::time::Duration;

use snmp2::{AsyncSession, Oid, Pdu, Value};

use crate::error::ProtocolError;

use super::{Connector, DeviceTransport, ObjectId, SnmpValue};

/// Default UDP port of an SNMP agent.
pub const DEFAULT_PORT: u16 = 161;

/// Default community string; APC ships `private` as the read-write community.
pub const DEFAULT_COMMUNITY: &str = "private";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Default number of retries after a timed-out request.
pub const DEFAULT_RETRIES: u32 = 3;

/// SNMPv1 error status `noSuchName`, which v1 agents use to end a walk.
const NO_SUCH_NAME: u32 = 2;

/// Opens [`SnmpClient`] sessions to one PDU.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use apc2mqtt::protocol::{Connector, SnmpConnector};
///
/// let connector = SnmpConnector::new("pdu-rack-a.lan", 161)
///     .with_community("private")
///     .with_timeout(Duration::from_secs(2))
///     .with_retries(3);
/// assert_eq!(connector.target(), "pdu-rack-a.lan:161");
/// ```
#[derive(Debug, Clone)]
pub struct SnmpConnector {
    host: String,
    port: u16,
    community: String,
    timeout: Duration,
    retries: u32,
    target: String,
}

impl SnmpConnector {
    /// Creates a connector with default community, timeout and retries.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let host = host.into();
        let target = format!("{host}:{port}");
        Self {
            host,
            port,
            community: DEFAULT_COMMUNITY.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
            target,
        }
    }

    /// Sets the community string.
    #[must_use]
    pub fn with_community(mut self, community: impl Into<String>) -> Self {
        self.community = community.into();
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets how many times a timed-out request is retried.
    #[must_use]
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }
}

impl Connector for SnmpConnector {
    type Transport = SnmpClient;

    async fn connect(&self) -> Result<SnmpClient, ProtocolError> {
        tracing::info!(device = %self.target, "Opening SNMP connection");

        let open = AsyncSession::new_v1(
            (self.host.as_str(), self.port),
            self.community.as_bytes(),
            0,
        );
        let session = tokio::time::timeout(self.timeout, open)
            .await
            .map_err(|_| ProtocolError::Timeout(millis(self.timeout)))?
            .map_err(|e| ProtocolError::ConnectionFailed(e.to_string()))?;

        Ok(SnmpClient {
            session,
            timeout: self.timeout,
            retries: self.retries,
        })
    }

    fn target(&self) -> &str {
        &self.target
    }
}

/// An SNMPv1 session with one PDU.
pub struct SnmpClient {
    session: AsyncSession,
    timeout: Duration,
    retries: u32,
}

impl std::fmt::Debug for SnmpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnmpClient")
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .finish_non_exhaustive()
    }
}

enum Request<'a> {
    Get(&'a Oid<'static>),
    GetNext(&'a Oid<'static>),
    Set(&'a Oid<'static>, &'a SnmpValue),
}

/// Owned copy of a response PDU.
struct Response {
    error_status: u32,
    error_index: u32,
    varbinds: Vec<(ObjectId, SnmpValue)>,
}

impl Response {
    fn from_pdu(pdu: Pdu<'_>) -> Self {
        let error_status = pdu.error_status;
        let error_index = pdu.error_index;
        let varbinds = pdu
            .varbinds
            .map(|(oid, value)| (object_id(&oid), owned_value(value)))
            .collect();
        Self {
            error_status,
            error_index,
            varbinds,
        }
    }

    fn check(&self) -> Result<(), ProtocolError> {
        if self.error_status == 0 {
            Ok(())
        } else {
            Err(ProtocolError::ErrorStatus {
                status: self.error_status,
                index: self.error_index,
            })
        }
    }
}

impl SnmpClient {
    /// Sends one request, retrying on timeout.
    async fn exchange(&mut self, request: &Request<'_>) -> Result<Response, ProtocolError> {
        let timeout = self.timeout;
        let mut attempt = 0;

        loop {
            let session = &mut self.session;
            let outcome = tokio::time::timeout(timeout, async {
                let pdu = match request {
                    Request::Get(oid) => session.get(oid).await,
                    Request::GetNext(oid) => session.getnext(oid).await,
                    Request::Set(oid, value) => {
                        let value = to_snmp_value(value)?;
                        session.set(&[(*oid, value)]).await
                    }
                };
                pdu.map(Response::from_pdu)
                    .map_err(|e| ProtocolError::Snmp(format!("{e:?}")))
            })
            .await;

            match outcome {
                Ok(result) => return result,
                Err(_) if attempt < self.retries => {
                    attempt += 1;
                    tracing::debug!(attempt, "SNMP request timed out, retrying");
                }
                Err(_) => return Err(ProtocolError::Timeout(millis(timeout))),
            }
        }
    }
}

impl DeviceTransport for SnmpClient {
    async fn get(&mut self, oid: &ObjectId) -> Result<SnmpValue, ProtocolError> {
        let snmp_oid = to_snmp_oid(oid)?;
        let response = self.exchange(&Request::Get(&snmp_oid)).await?;
        response.check()?;
        response
            .varbinds
            .into_iter()
            .next()
            .map(|(_, value)| value)
            .ok_or_else(|| ProtocolError::Snmp(format!("empty response for {oid}")))
    }

    async fn walk(&mut self, base: &ObjectId) -> Result<Vec<(ObjectId, SnmpValue)>, ProtocolError> {
        let mut rows = Vec::new();
        let mut cursor = base.clone();

        loop {
            let snmp_oid = to_snmp_oid(&cursor)?;
            let response = self.exchange(&Request::GetNext(&snmp_oid)).await?;
            if response.error_status == NO_SUCH_NAME {
                break;
            }
            response.check()?;

            let Some((next, value)) = response.varbinds.into_iter().next() else {
                break;
            };
            if value == SnmpValue::EndOfView || !next.starts_with(base) || next == *base {
                break;
            }
            if next <= cursor {
                return Err(ProtocolError::Snmp(format!(
                    "walk of {base} did not advance past {cursor}"
                )));
            }

            rows.push((next.clone(), value));
            cursor = next;
        }

        tracing::trace!(base = %base, rows = rows.len(), "SNMP walk complete");
        Ok(rows)
    }

    async fn set(&mut self, oid: &ObjectId, value: SnmpValue) -> Result<(), ProtocolError> {
        let snmp_oid = to_snmp_oid(oid)?;
        let response = self.exchange(&Request::Set(&snmp_oid, &value)).await?;
        response.check()
    }
}

fn to_snmp_oid(oid: &ObjectId) -> Result<Oid<'static>, ProtocolError> {
    Oid::from(oid.arcs()).map_err(|e| ProtocolError::InvalidAddress(format!("{oid}: {e:?}")))
}

fn to_snmp_value(value: &SnmpValue) -> Result<Value<'_>, ProtocolError> {
    match value {
        SnmpValue::Integer(v) => Ok(Value::Integer(*v)),
        SnmpValue::OctetString(bytes) => Ok(Value::OctetString(bytes)),
        SnmpValue::Null => Ok(Value::Null),
        other => Err(ProtocolError::Snmp(format!("cannot write {other}"))),
    }
}

fn object_id(oid: &Oid<'_>) -> ObjectId {
    ObjectId::new(
        oid.iter()
            .map(|arcs| arcs.collect::<Vec<u64>>())
            .unwrap_or_default(),
    )
}

fn owned_value(value: Value<'_>) -> SnmpValue {
    match value {
        Value::Integer(v) => SnmpValue::Integer(v),
        Value::OctetString(bytes) => SnmpValue::OctetString(bytes.to_vec()),
        Value::Null => SnmpValue::Null,
        Value::EndOfMibView | Value::NoSuchObject | Value::NoSuchInstance => SnmpValue::EndOfView,
        other => SnmpValue::Other(format!("{other:?}")),
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
