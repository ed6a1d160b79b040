// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Outlet commands and their delivery from the bus to a PDU session.
//!
//! A command message arrives on an outlet's `set` topic, is decoded into an
//! [`OutletCommand`] by that outlet's [`CommandSink`], and is queued for the
//! owning session, which writes it to the device exactly once.
//!
//! # Examples
//!
//! ```
//! use apc2mqtt::command::{CommandSink, OutletCommand};
//! use apc2mqtt::protocol::MessageHandler;
//! use apc2mqtt::types::{OutletIndex, PowerState};
//!
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//! let sink = CommandSink::new(tx, OutletIndex::new(2).unwrap());
//!
//! sink.handle(b"ON");
//!
//! let cmd = rx.try_recv().unwrap();
//! assert_eq!(cmd, OutletCommand::new(OutletIndex::new(2).unwrap(), PowerState::On));
//! ```

mod outlet;
mod sink;

pub use outlet::OutletCommand;
pub use sink::CommandSink;
