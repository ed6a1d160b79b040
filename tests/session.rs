// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device session state machine tests against an in-memory PDU.

mod common;

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use apc2mqtt::command::OutletCommand;
use apc2mqtt::protocol::{ObjectId, SnmpValue};
use apc2mqtt::session::{ConnectionState, DeviceSession, SessionConfig, mib};
use apc2mqtt::state::DeviceState;
use apc2mqtt::types::{OutletIndex, PowerState};

use common::{FakePdu, Op};

struct Harness {
    states: mpsc::Receiver<DeviceState>,
    commands: mpsc::UnboundedSender<OutletCommand>,
    connection: tokio::sync::watch::Receiver<ConnectionState>,
    task: tokio::task::JoinHandle<()>,
}

fn start(pdu: &FakePdu) -> Harness {
    let (state_tx, states) = mpsc::channel(1);
    let (commands, command_rx) = mpsc::unbounded_channel();
    let session = DeviceSession::new(pdu.clone(), SessionConfig::default(), state_tx, command_rx);
    let connection = session.connection_state();
    let task = tokio::spawn(session.run());
    Harness {
        states,
        commands,
        connection,
        task,
    }
}

fn states_of(state: &DeviceState) -> Vec<PowerState> {
    state.outlets().iter().map(|o| o.state()).collect()
}

fn outlet(n: u32) -> OutletIndex {
    OutletIndex::new(n).unwrap()
}

#[tokio::test(start_paused = true)]
async fn first_poll_happens_on_connect() {
    let pdu = FakePdu::new("AB1234", &[("Lamp", false), ("Heater", true)]);
    let mut h = start(&pdu);
    let started = Instant::now();

    let state = h.states.recv().await.unwrap();

    assert!(started.elapsed() < Duration::from_millis(1));
    assert_eq!(state.serial(), "AB1234");
    assert_eq!(states_of(&state), vec![PowerState::Off, PowerState::On]);
    assert_eq!(*h.connection.borrow(), ConnectionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn polls_once_per_interval() {
    let pdu = FakePdu::new("AB1234", &[("Lamp", false)]);
    let mut h = start(&pdu);

    h.states.recv().await.unwrap();
    let started = Instant::now();
    h.states.recv().await.unwrap();
    h.states.recv().await.unwrap();

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(2), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_secs(3), "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn connect_failures_back_off_and_retry() {
    let pdu = FakePdu::new("AB1234", &[("Lamp", false)]);
    pdu.fail_connects(2);
    let started = Instant::now();
    let mut h = start(&pdu);

    h.states.recv().await.unwrap();

    assert!(started.elapsed() >= Duration::from_secs(10));
    assert_eq!(pdu.connects(), 1);
}

#[tokio::test(start_paused = true)]
async fn poll_error_reconnects_and_refetches_everything() {
    let pdu = FakePdu::new("AB1234", &[("Lamp", false), ("Heater", true)]);
    let mut h = start(&pdu);

    h.states.recv().await.unwrap();
    pdu.fail_state_walks(1);
    pdu.set_outlet(0, true);

    let state = h.states.recv().await.unwrap();

    assert_eq!(pdu.connects(), 2);
    assert_eq!(states_of(&state), vec![PowerState::On, PowerState::On]);

    let second: Vec<Op> = pdu
        .ops()
        .into_iter()
        .filter(|(conn, _)| *conn == 2)
        .map(|(_, op)| op)
        .collect();
    assert_eq!(
        second,
        vec![
            Op::Get(ObjectId::from(mib::PDU_NAME)),
            Op::Get(ObjectId::from(mib::SERIAL_NUMBER)),
            Op::Get(ObjectId::from(mib::MODEL_NUMBER)),
            Op::Walk(ObjectId::from(mib::OUTLET_NAME)),
            Op::Walk(ObjectId::from(mib::OUTLET_CTL)),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn stays_disconnected_while_unreachable() {
    let pdu = FakePdu::new("AB1234", &[("Lamp", false)]);
    pdu.fail_connects(usize::MAX);
    let mut h = start(&pdu);

    tokio::time::sleep(Duration::from_secs(12)).await;

    assert_eq!(*h.connection.borrow(), ConnectionState::Disconnected);
    assert!(h.states.try_recv().is_err());
    assert_eq!(pdu.connects(), 0);
}

#[tokio::test(start_paused = true)]
async fn commands_are_written_with_control_codes() {
    let pdu = FakePdu::new("AB1234", &[("Lamp", false), ("Heater", true)]);
    let mut h = start(&pdu);

    h.states.recv().await.unwrap();
    h.commands
        .send(OutletCommand::new(outlet(1), PowerState::On))
        .unwrap();
    h.commands
        .send(OutletCommand::new(outlet(2), PowerState::Off))
        .unwrap();

    let state = h.states.recv().await.unwrap();

    assert_eq!(states_of(&state), vec![PowerState::On, PowerState::Off]);
    assert_eq!(
        pdu.sets(),
        vec![
            (ObjectId::from(mib::OUTLET_CTL).child(1), SnmpValue::Integer(1)),
            (ObjectId::from(mib::OUTLET_CTL).child(2), SnmpValue::Integer(2)),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn command_error_keeps_connection_and_polling() {
    let pdu = FakePdu::new("AB1234", &[("Lamp", false)]);
    pdu.reject_sets(true);
    let mut h = start(&pdu);

    h.states.recv().await.unwrap();
    h.commands
        .send(OutletCommand::new(outlet(1), PowerState::On))
        .unwrap();

    let state = h.states.recv().await.unwrap();
    h.states.recv().await.unwrap();

    assert_eq!(states_of(&state), vec![PowerState::Off]);
    assert_eq!(pdu.sets().len(), 1);
    assert_eq!(pdu.connects(), 1);
    assert_eq!(*h.connection.borrow(), ConnectionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn keeps_polling_without_command_senders() {
    let pdu = FakePdu::new("AB1234", &[("Lamp", false)]);
    let Harness {
        mut states,
        commands,
        task,
        ..
    } = start(&pdu);
    drop(commands);

    for _ in 0..3 {
        states.recv().await.unwrap();
    }
    assert!(!task.is_finished());
}

#[tokio::test(start_paused = true)]
async fn stops_when_state_receiver_dropped() {
    let pdu = FakePdu::new("AB1234", &[("Lamp", false)]);
    let Harness {
        states,
        task,
        connection,
        ..
    } = start(&pdu);
    drop(states);

    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("session should stop")
        .unwrap();
    assert_eq!(*connection.borrow(), ConnectionState::Disconnected);
}
