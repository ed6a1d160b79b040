// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory PDU and bus shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;

use apc2mqtt::error::ProtocolError;
use apc2mqtt::protocol::{Bus, Connector, DeviceTransport, MessageHandler, ObjectId, SnmpValue};
use apc2mqtt::session::mib;

/// A device request as seen by the fake, tagged with the connection it used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Get(ObjectId),
    Walk(ObjectId),
    Set(ObjectId, SnmpValue),
}

#[derive(Debug, Default)]
struct PduInner {
    serial: String,
    outlets: Vec<(String, i64)>,
    connect_failures: usize,
    state_walk_failures: usize,
    reject_sets: bool,
    connects: usize,
    ops: Vec<(usize, Op)>,
}

/// A simulated PDU. Clones share the same device.
#[derive(Debug, Clone)]
pub struct FakePdu {
    inner: Arc<Mutex<PduInner>>,
    target: String,
}

impl FakePdu {
    pub fn new(serial: &str, outlets: &[(&str, bool)]) -> Self {
        let outlets = outlets
            .iter()
            .map(|(name, on)| ((*name).to_string(), if *on { 1 } else { 2 }))
            .collect();
        Self {
            inner: Arc::new(Mutex::new(PduInner {
                serial: serial.to_string(),
                outlets,
                ..PduInner::default()
            })),
            target: "pdu.test:161".to_string(),
        }
    }

    /// Fails the next `n` connection attempts.
    pub fn fail_connects(&self, n: usize) {
        self.inner.lock().connect_failures = n;
    }

    /// Fails the next `n` walks of the outlet control table.
    pub fn fail_state_walks(&self, n: usize) {
        self.inner.lock().state_walk_failures = n;
    }

    pub fn reject_sets(&self, reject: bool) {
        self.inner.lock().reject_sets = reject;
    }

    pub fn set_outlet(&self, position: usize, on: bool) {
        self.inner.lock().outlets[position].1 = if on { 1 } else { 2 };
    }

    pub fn add_outlet(&self, name: &str, on: bool) {
        self.inner
            .lock()
            .outlets
            .push((name.to_string(), if on { 1 } else { 2 }));
    }

    pub fn rename_outlet(&self, position: usize, name: &str) {
        self.inner.lock().outlets[position].0 = name.to_string();
    }

    pub fn connects(&self) -> usize {
        self.inner.lock().connects
    }

    pub fn ops(&self) -> Vec<(usize, Op)> {
        self.inner.lock().ops.clone()
    }

    pub fn sets(&self) -> Vec<(ObjectId, SnmpValue)> {
        self.inner
            .lock()
            .ops
            .iter()
            .filter_map(|(_, op)| match op {
                Op::Set(oid, value) => Some((oid.clone(), value.clone())),
                _ => None,
            })
            .collect()
    }
}

impl Connector for FakePdu {
    type Transport = FakeTransport;

    async fn connect(&self) -> Result<FakeTransport, ProtocolError> {
        let mut inner = self.inner.lock();
        if inner.connect_failures > 0 {
            inner.connect_failures -= 1;
            return Err(ProtocolError::ConnectionFailed("unreachable".to_string()));
        }
        inner.connects += 1;
        Ok(FakeTransport {
            pdu: Arc::clone(&self.inner),
            connection: inner.connects,
        })
    }

    fn target(&self) -> &str {
        &self.target
    }
}

/// One connection to a [`FakePdu`].
#[derive(Debug)]
pub struct FakeTransport {
    pdu: Arc<Mutex<PduInner>>,
    connection: usize,
}

fn text(value: &str) -> SnmpValue {
    SnmpValue::OctetString(value.as_bytes().to_vec())
}

impl DeviceTransport for FakeTransport {
    async fn get(&mut self, oid: &ObjectId) -> Result<SnmpValue, ProtocolError> {
        let mut pdu = self.pdu.lock();
        pdu.ops.push((self.connection, Op::Get(oid.clone())));
        if *oid == ObjectId::from(mib::PDU_NAME) {
            Ok(text("rack-a"))
        } else if *oid == ObjectId::from(mib::SERIAL_NUMBER) {
            Ok(text(&pdu.serial))
        } else if *oid == ObjectId::from(mib::MODEL_NUMBER) {
            Ok(text("AP7900"))
        } else {
            Err(ProtocolError::ErrorStatus {
                status: 2,
                index: 1,
            })
        }
    }

    async fn walk(&mut self, base: &ObjectId) -> Result<Vec<(ObjectId, SnmpValue)>, ProtocolError> {
        let mut pdu = self.pdu.lock();
        pdu.ops.push((self.connection, Op::Walk(base.clone())));

        if *base == ObjectId::from(mib::OUTLET_NAME) {
            Ok(pdu
                .outlets
                .iter()
                .enumerate()
                .map(|(i, (name, _))| (base.child(i as u64 + 1), text(name)))
                .collect())
        } else if *base == ObjectId::from(mib::OUTLET_CTL) {
            if pdu.state_walk_failures > 0 {
                pdu.state_walk_failures -= 1;
                return Err(ProtocolError::Timeout(2000));
            }
            Ok(pdu
                .outlets
                .iter()
                .enumerate()
                .map(|(i, (_, code))| (base.child(i as u64 + 1), SnmpValue::Integer(*code)))
                .collect())
        } else {
            Ok(Vec::new())
        }
    }

    async fn set(&mut self, oid: &ObjectId, value: SnmpValue) -> Result<(), ProtocolError> {
        let mut pdu = self.pdu.lock();
        pdu.ops.push((self.connection, Op::Set(oid.clone(), value.clone())));
        if pdu.reject_sets {
            return Err(ProtocolError::ErrorStatus {
                status: 3,
                index: 1,
            });
        }

        let ctl = ObjectId::from(mib::OUTLET_CTL);
        let row = oid
            .starts_with(&ctl)
            .then(|| oid.arcs().last().copied())
            .flatten()
            .and_then(|row| usize::try_from(row).ok())
            .filter(|row| (1..=pdu.outlets.len()).contains(row));
        match (row, value.as_integer()) {
            (Some(row), Some(code)) => {
                pdu.outlets[row - 1].1 = code;
                Ok(())
            }
            _ => Err(ProtocolError::ErrorStatus {
                status: 2,
                index: 1,
            }),
        }
    }
}

#[derive(Default)]
struct BusInner {
    published: Vec<(String, Vec<u8>)>,
    subscriptions: Vec<(String, Arc<dyn MessageHandler>)>,
    fail_publishes: usize,
}

/// A recording message bus. Clones share the same recordings.
#[derive(Clone, Default)]
pub struct FakeBus {
    inner: Arc<Mutex<BusInner>>,
}

impl FakeBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the next `n` publishes.
    pub fn fail_publishes(&self, n: usize) {
        self.inner.lock().fail_publishes = n;
    }

    pub fn published(&self) -> Vec<(String, String)> {
        self.inner
            .lock()
            .published
            .iter()
            .map(|(topic, payload)| (topic.clone(), String::from_utf8_lossy(payload).into_owned()))
            .collect()
    }

    pub fn published_to(&self, suffix: &str) -> Vec<(String, String)> {
        self.published()
            .into_iter()
            .filter(|(topic, _)| topic.ends_with(suffix))
            .collect()
    }

    pub fn subscribed_topics(&self) -> Vec<String> {
        self.inner
            .lock()
            .subscriptions
            .iter()
            .map(|(topic, _)| topic.clone())
            .collect()
    }

    /// Delivers an inbound message to every handler subscribed to `topic`.
    pub fn deliver(&self, topic: &str, payload: &[u8]) -> usize {
        let handlers: Vec<_> = self
            .inner
            .lock()
            .subscriptions
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, handler)| Arc::clone(handler))
            .collect();
        for handler in &handlers {
            handler.handle(payload);
        }
        handlers.len()
    }
}

impl Bus for FakeBus {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), ProtocolError> {
        let mut inner = self.inner.lock();
        if inner.fail_publishes > 0 {
            inner.fail_publishes -= 1;
            return Err(ProtocolError::ChannelClosed("bus offline".to_string()));
        }
        inner.published.push((topic.to_string(), payload));
        Ok(())
    }

    async fn subscribe(
        &self,
        topic: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), ProtocolError> {
        self.inner
            .lock()
            .subscriptions
            .push((topic.to_string(), handler));
        Ok(())
    }
}
