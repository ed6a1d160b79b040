// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Routing of inbound MQTT messages to subscription handlers.
//!
//! # Architecture
//!
//! ```text
//! MQTT Message: homeassistant/switch/apc_ab1234_0/set → ON
//!                     ↓
//!             TopicRouter.route()
//!                     ↓
//!     Lookup exact topic in handlers
//!                     ↓
//!           handler.handle(b"ON")
//!                     ↓
//!     OutletCommand queued for the PDU session
//! ```
//!
//! The router also remembers every registered topic so the broker can
//! re-subscribe them after a reconnect.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::MessageHandler;

/// Routes MQTT messages to the handlers registered for their topic.
#[derive(Default)]
pub struct TopicRouter {
    handlers: RwLock<HashMap<String, Vec<Arc<dyn MessageHandler>>>>,
}

impl TopicRouter {
    /// Creates a new empty topic router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a handler for an exact topic.
    ///
    /// Several handlers may share a topic; each receives every message.
    pub fn register(&self, topic: impl Into<String>, handler: Arc<dyn MessageHandler>) {
        let topic = topic.into();
        tracing::debug!(topic = %topic, "Registering topic handler");
        self.handlers.write().entry(topic).or_default().push(handler);
    }

    /// Delivers a message to the handlers registered for `topic`.
    ///
    /// Returns `true` if at least one handler received it.
    pub fn route(&self, topic: &str, payload: &[u8]) -> bool {
        // Clone out of the lock so handlers never run under it.
        let handlers = {
            let map = self.handlers.read();
            match map.get(topic) {
                Some(handlers) => handlers.clone(),
                None => Vec::new(),
            }
        };

        if handlers.is_empty() {
            tracing::trace!(topic = %topic, "No handler for topic");
            return false;
        }

        for handler in &handlers {
            handler.handle(payload);
        }
        true
    }

    /// Returns every registered topic.
    #[must_use]
    pub fn topics(&self) -> Vec<String> {
        self.handlers.read().keys().cloned().collect()
    }

    /// Returns the number of registered topics.
    #[must_use]
    pub fn topic_count(&self) -> usize {
        self.handlers.read().len()
    }
}

impl std::fmt::Debug for TopicRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopicRouter")
            .field("topics", &self.topic_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting_handler(counter: &Arc<AtomicU32>) -> Arc<dyn MessageHandler> {
        let counter = Arc::clone(counter);
        Arc::new(move |_payload: &[u8]| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn router_register_and_route() {
        let router = TopicRouter::new();
        let counter = Arc::new(AtomicU32::new(0));

        router.register("homeassistant/switch/apc_x_0/set", counting_handler(&counter));
        assert_eq!(router.topic_count(), 1);

        assert!(router.route("homeassistant/switch/apc_x_0/set", b"ON"));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn router_unregistered_topic() {
        let router = TopicRouter::new();
        assert!(!router.route("homeassistant/switch/unknown/set", b"ON"));
    }

    #[test]
    fn router_matches_exact_topic_only() {
        let router = TopicRouter::new();
        let counter = Arc::new(AtomicU32::new(0));
        router.register("a/b/set", counting_handler(&counter));

        assert!(!router.route("a/b", b"ON"));
        assert!(!router.route("a/b/set/extra", b"ON"));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn router_multiple_topics() {
        let router = TopicRouter::new();
        let counter1 = Arc::new(AtomicU32::new(0));
        let counter2 = Arc::new(AtomicU32::new(0));
        router.register("outlet1/set", counting_handler(&counter1));
        router.register("outlet2/set", counting_handler(&counter2));

        router.route("outlet1/set", b"ON");
        assert_eq!(counter1.load(Ordering::SeqCst), 1);
        assert_eq!(counter2.load(Ordering::SeqCst), 0);

        router.route("outlet2/set", b"OFF");
        assert_eq!(counter1.load(Ordering::SeqCst), 1);
        assert_eq!(counter2.load(Ordering::SeqCst), 1);

        let mut topics = router.topics();
        topics.sort();
        assert_eq!(topics, vec!["outlet1/set", "outlet2/set"]);
    }

    #[test]
    fn router_shared_topic_fans_out() {
        let router = TopicRouter::new();
        let counter = Arc::new(AtomicU32::new(0));
        router.register("t", counting_handler(&counter));
        router.register("t", counting_handler(&counter));

        router.route("t", b"ON");
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(router.topic_count(), 1);
    }
}
