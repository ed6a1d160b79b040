// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT broker connection shared by every PDU target.
//!
//! The broker owns one `rumqttc` client and the task that drives its event
//! loop. Inbound publishes are dispatched through a [`TopicRouter`]. When the
//! connection drops the event loop waits a fixed delay and reconnects,
//! forever, and re-subscribes every registered topic once the broker accepts
//! the new session.
//!
//! # Examples
//!
//! ```no_run
//! use apc2mqtt::protocol::{Bus, MqttBroker};
//!
//! # async fn example() -> Result<(), apc2mqtt::error::ProtocolError> {
//! let broker = MqttBroker::builder()
//!     .host("10.0.0.2")
//!     .credentials("bridge", "secret")
//!     .build()
//!     .await?;
//!
//! broker
//!     .publish("homeassistant/switch/apc_ab1234_0/state", b"ON".to_vec())
//!     .await?;
//!
//! broker.disconnect().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::sync::watch;

use crate::error::ProtocolError;

use super::{Bus, MessageHandler, TopicRouter};

/// Default MQTT client identifier.
pub const DEFAULT_CLIENT_ID: &str = "apc2mqtt";

/// Capacity of the client's outgoing request queue.
const REQUEST_CAPACITY: usize = 64;

/// Settings of a broker connection.
#[derive(Debug, Clone)]
pub struct MqttBrokerConfig {
    host: String,
    port: u16,
    credentials: Option<(String, String)>,
    client_id: String,
    keep_alive: Duration,
    connection_timeout: Duration,
    reconnect_delay: Duration,
}

impl Default for MqttBrokerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 1883,
            credentials: None,
            client_id: DEFAULT_CLIENT_ID.to_string(),
            keep_alive: Duration::from_secs(30),
            connection_timeout: Duration::from_secs(5),
            reconnect_delay: Duration::from_secs(5),
        }
    }
}

impl MqttBrokerConfig {
    /// Translates the settings into client options.
    fn options(&self) -> Result<MqttOptions, ProtocolError> {
        if self.host.trim().is_empty() {
            return Err(ProtocolError::InvalidAddress(
                "MQTT broker host is empty".to_string(),
            ));
        }

        let mut options = MqttOptions::new(&self.client_id, &self.host, self.port);
        options
            .set_keep_alive(self.keep_alive)
            .set_clean_session(true);
        if let Some((user, pass)) = &self.credentials {
            options.set_credentials(user, pass);
        }
        Ok(options)
    }
}

/// An MQTT broker connection that can be shared across PDU targets.
///
/// Cloning is cheap; every clone publishes through the same client and
/// shares one subscription table.
#[derive(Clone)]
pub struct MqttBroker {
    shared: Arc<Shared>,
}

struct Shared {
    client: AsyncClient,
    router: TopicRouter,
    config: MqttBrokerConfig,
    /// True between a `ConnAck` and the next connection error.
    online: watch::Sender<bool>,
    /// Set by `disconnect`; stops the event loop task.
    closed: AtomicBool,
}

impl MqttBroker {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> MqttBrokerBuilder {
        MqttBrokerBuilder::default()
    }

    /// Connects with `config` and waits for the broker to accept the session.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::InvalidAddress` if no host is set, or
    /// `ProtocolError::ConnectionFailed` if the broker does not accept the
    /// session within the connection timeout.
    pub async fn connect(config: MqttBrokerConfig) -> Result<Self, ProtocolError> {
        let options = config.options()?;
        let (client, event_loop) = AsyncClient::new(options, REQUEST_CAPACITY);
        let (broker, mut online_rx) = Self::with_client(client, config);

        let pump = EventPump {
            event_loop,
            broker: broker.clone(),
            accepted_once: false,
        };
        let pump_task = tokio::spawn(pump.run());

        let timeout = broker.shared.config.connection_timeout;
        let accepted = tokio::time::timeout(timeout, online_rx.wait_for(|online| *online))
            .await
            .is_ok_and(|seen| seen.is_ok());
        if accepted {
            tracing::info!(
                host = %broker.host(),
                port = broker.port(),
                "Connected to MQTT broker"
            );
            return Ok(broker);
        }

        pump_task.abort();
        Err(ProtocolError::ConnectionFailed(format!(
            "no CONNACK from {}:{} within {timeout:?}",
            broker.host(),
            broker.port()
        )))
    }

    fn with_client(
        client: AsyncClient,
        config: MqttBrokerConfig,
    ) -> (Self, watch::Receiver<bool>) {
        let (online, online_rx) = watch::channel(false);
        let broker = Self {
            shared: Arc::new(Shared {
                client,
                router: TopicRouter::new(),
                config,
                online,
                closed: AtomicBool::new(false),
            }),
        };
        (broker, online_rx)
    }

    /// Returns whether the broker session is currently up.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        *self.shared.online.borrow()
    }

    /// Returns the broker host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.shared.config.host
    }

    /// Returns the broker port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.shared.config.port
    }

    /// Returns whether a username and password are sent.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        self.shared.config.credentials.is_some()
    }

    /// Returns the number of topics with registered handlers.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.shared.router.topic_count()
    }

    /// Closes the session and stops reconnecting.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::Mqtt` if the request cannot be queued.
    pub async fn disconnect(&self) -> Result<(), ProtocolError> {
        tracing::info!(host = %self.host(), port = self.port(), "Disconnecting from MQTT broker");
        self.shared.closed.store(true, Ordering::Release);
        self.shared.client.disconnect().await?;
        self.shared.online.send_replace(false);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Re-requests every registered subscription on a new session.
    ///
    /// The requests are queued from their own task: the request queue may be
    /// full of publishes made while offline, and it only drains while the
    /// event loop keeps polling.
    fn resubscribe_all(&self) -> tokio::task::JoinHandle<()> {
        let client = self.shared.client.clone();
        let topics = self.shared.router.topics();
        tokio::spawn(async move {
            for topic in topics {
                match client.subscribe(&topic, QoS::AtMostOnce).await {
                    Ok(()) => tracing::debug!(topic = %topic, "Re-subscribed"),
                    Err(e) => {
                        tracing::warn!(topic = %topic, error = %e, "Failed to re-subscribe");
                    }
                }
            }
        })
    }
}

impl Bus for MqttBroker {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), ProtocolError> {
        tracing::trace!(topic = %topic, bytes = payload.len(), "Publishing");
        self.shared
            .client
            .publish(topic, QoS::AtMostOnce, false, payload)
            .await?;
        Ok(())
    }

    async fn subscribe(
        &self,
        topic: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), ProtocolError> {
        // Registered first so a failed request is retried on the next reconnect.
        self.shared.router.register(topic, handler);
        self.shared
            .client
            .subscribe(topic, QoS::AtMostOnce)
            .await?;
        tracing::debug!(topic = %topic, "Subscribed");
        Ok(())
    }
}

impl std::fmt::Debug for MqttBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttBroker")
            .field("host", &self.host())
            .field("port", &self.port())
            .field("client_id", &self.shared.config.client_id)
            .field("online", &self.is_connected())
            .finish_non_exhaustive()
    }
}

/// Drives the `rumqttc` event loop for one broker.
///
/// Polling an `EventLoop` again after an error makes it reconnect, so an
/// error only pauses the pump for the reconnect delay.
struct EventPump {
    event_loop: EventLoop,
    broker: MqttBroker,
    accepted_once: bool,
}

impl EventPump {
    async fn run(mut self) {
        let delay = self.broker.shared.config.reconnect_delay;

        while !self.broker.is_closed() {
            match self.event_loop.poll().await {
                Ok(Event::Incoming(packet)) => self.on_packet(packet),
                Ok(Event::Outgoing(_)) => {}
                Err(e) => {
                    if self.broker.is_closed() {
                        break;
                    }
                    self.broker.shared.online.send_replace(false);
                    tracing::warn!(error = %e, retry_in = ?delay, "MQTT connection error");
                    tokio::time::sleep(delay).await;
                }
            }
        }

        tracing::debug!("MQTT event loop stopped");
    }

    fn on_packet(&mut self, packet: Packet) {
        match packet {
            Packet::ConnAck(ack) => {
                tracing::debug!(?ack, "MQTT session accepted");
                if self.accepted_once {
                    tracing::info!("Reconnected to MQTT broker");
                    self.broker.resubscribe_all();
                }
                self.accepted_once = true;
                self.broker.shared.online.send_replace(true);
            }
            Packet::Publish(message) => {
                tracing::debug!(
                    topic = %message.topic,
                    payload = %String::from_utf8_lossy(&message.payload),
                    "Received MQTT message"
                );
                if !self.broker.shared.router.route(&message.topic, &message.payload) {
                    tracing::trace!(topic = %message.topic, "No handler for topic");
                }
            }
            Packet::SubAck(ack) => tracing::trace!(?ack, "Subscription acknowledged"),
            Packet::Disconnect => {
                tracing::info!("MQTT broker closed the session");
                self.broker.shared.online.send_replace(false);
            }
            _ => {}
        }
    }
}

/// Builder for [`MqttBroker`].
///
/// # Examples
///
/// ```no_run
/// use apc2mqtt::protocol::MqttBroker;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), apc2mqtt::error::ProtocolError> {
/// let broker = MqttBroker::builder()
///     .host("broker.lan")
///     .port(1883)
///     .client_id("apc2mqtt-rack-a")
///     .reconnect_delay(Duration::from_secs(10))
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MqttBrokerBuilder {
    config: MqttBrokerConfig,
}

impl MqttBrokerBuilder {
    /// Sets the broker host.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Sets the broker port (default: 1883).
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Sets the username and password.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.credentials = Some((username.into(), password.into()));
        self
    }

    /// Sets the client identifier (default: `apc2mqtt`).
    #[must_use]
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.config.client_id = client_id.into();
        self
    }

    /// Sets the keep-alive interval (default: 30 s).
    #[must_use]
    pub fn keep_alive(mut self, interval: Duration) -> Self {
        self.config.keep_alive = interval;
        self
    }

    /// Sets how long to wait for the first `CONNACK` (default: 5 s).
    #[must_use]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.config.connection_timeout = timeout;
        self
    }

    /// Sets the wait between reconnection attempts (default: 5 s).
    #[must_use]
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.config.reconnect_delay = delay;
        self
    }

    /// Returns the settings collected so far.
    #[must_use]
    pub fn config(&self) -> &MqttBrokerConfig {
        &self.config
    }

    /// Connects to the broker.
    ///
    /// # Errors
    ///
    /// See [`MqttBroker::connect`].
    pub async fn build(self) -> Result<MqttBroker, ProtocolError> {
        MqttBroker::connect(self.config).await
    }
}
