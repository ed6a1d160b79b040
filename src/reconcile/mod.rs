// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Turning device snapshots into bus actions.
//!
//! For every outlet of a new snapshot, in outlet order:
//!
//! 1. [`Action::Announce`] if there is no previous snapshot, or the outlet at
//!    the same position had a different name (or did not exist).
//! 2. [`Action::Subscribe`] only if there is no previous snapshot, or the
//!    previous one had no outlets.
//! 3. [`Action::PublishValue`] always.
//!
//! Outlets are compared strictly by position; nothing is re-keyed by name and
//! outlets that disappear are not withdrawn.

use crate::discovery::{SwitchConfig, SwitchTopics, unique_id};
use crate::state::DeviceState;
use crate::types::{OutletIndex, PowerState};

/// Something to do on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Publish a discovery descriptor.
    Announce {
        /// The outlet's `config` topic.
        topic: String,
        /// The descriptor.
        config: SwitchConfig,
    },
    /// Start listening for commands to an outlet.
    Subscribe {
        /// The outlet's `set` topic.
        topic: String,
        /// Control address the commands are for.
        outlet: OutletIndex,
    },
    /// Publish an outlet's current value.
    PublishValue {
        /// The outlet's `state` topic.
        topic: String,
        /// Value to publish.
        state: PowerState,
    },
}

/// Computes the actions for `current` given the previously announced
/// snapshot of the same device.
#[must_use]
pub fn reconcile(previous: Option<&DeviceState>, current: &DeviceState) -> Vec<Action> {
    let mut actions = Vec::with_capacity(current.outlets().len() * 3);
    // A snapshot without outlets subscribed to nothing.
    let subscribed = previous.is_some_and(|prev| !prev.outlets().is_empty());

    for (position, outlet) in current.outlets().iter().enumerate() {
        let topics = SwitchTopics::new(&unique_id(current.serial(), position));

        let renamed = previous
            .and_then(|prev| prev.outlet(position))
            .is_none_or(|prev| prev.name() != outlet.name());
        if renamed {
            actions.push(Action::Announce {
                topic: topics.config,
                config: SwitchConfig::new(current, position, outlet),
            });
        }

        if !subscribed {
            actions.push(Action::Subscribe {
                topic: topics.set,
                outlet: OutletIndex::from_position(position),
            });
        }

        actions.push(Action::PublishValue {
            topic: topics.state,
            state: outlet.state(),
        });
    }

    actions
}

/// Holds the last announced snapshot of one device.
#[derive(Debug, Default)]
pub struct Reconciler {
    last: Option<DeviceState>,
}

impl Reconciler {
    /// Creates a reconciler that has seen nothing yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconciles `state` against the last snapshot and then replaces it.
    pub fn observe(&mut self, state: DeviceState) -> Vec<Action> {
        let actions = reconcile(self.last.as_ref(), &state);
        self.last = Some(state);
        actions
    }

    /// Returns the last snapshot, if any.
    #[must_use]
    pub fn last(&self) -> Option<&DeviceState> {
        self.last.as_ref()
    }
}
