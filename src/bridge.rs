// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Process-level wiring: one broker connection, one supervisor per target.

use std::fmt;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::Instrument;

use crate::config::Config;
use crate::manager::TargetSupervisor;
use crate::protocol::MqttBroker;

/// Wait between failed broker connection attempts.
pub const BROKER_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Name and version of the running build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildInfo {
    /// Package name.
    pub name: &'static str,
    /// Package version.
    pub version: &'static str,
}

impl BuildInfo {
    /// Build info of this crate.
    pub const CURRENT: Self = Self::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    /// Creates build info.
    #[must_use]
    pub const fn new(name: &'static str, version: &'static str) -> Self {
        Self { name, version }
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

/// The running bridge.
#[derive(Debug)]
pub struct Bridge {
    config: Config,
    build: BuildInfo,
}

impl Bridge {
    /// Creates a bridge for a loaded configuration.
    #[must_use]
    pub fn new(config: Config, build: BuildInfo) -> Self {
        Self { config, build }
    }

    /// Runs until every target has stopped, which in practice is never.
    pub async fn run(self) {
        tracing::info!(name = self.build.name, version = self.build.version, "Starting version");

        let broker = self.connect_broker().await;

        if self.config.targets.is_empty() {
            tracing::warn!("No targets configured");
        }

        let mut supervisors = JoinSet::new();
        for target in &self.config.targets {
            let span = tracing::info_span!("target", device = %target.address());
            let supervisor = TargetSupervisor::new(target.connector(), broker.clone());
            supervisors.spawn(supervisor.run().instrument(span));
        }

        while let Some(result) = supervisors.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Target supervisor failed");
            }
        }
    }

    async fn connect_broker(&self) -> MqttBroker {
        let mqtt = &self.config.mqtt;
        let span = tracing::info_span!("broker", host = %mqtt.host, port = mqtt.port);
        retry_every(BROKER_RETRY_DELAY, || {
            let mut builder = MqttBroker::builder()
                .host(mqtt.host.clone())
                .port(mqtt.port)
                .client_id(mqtt.client_id.clone());
            if let Some((user, pass)) = mqtt.credentials() {
                builder = builder.credentials(user, pass);
            }
            builder.build()
        })
        .instrument(span)
        .await
    }
}

/// Runs `attempt` until it succeeds, sleeping `delay` after every failure.
async fn retry_every<T, E, F, Fut>(delay: Duration, mut attempt: F) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    loop {
        match attempt().await {
            Ok(value) => return value,
            Err(e) => {
                tracing::warn!(error = %e, retry_in = ?delay, "Failed to connect to MQTT broker");
                tokio::time::sleep(delay).await;
            }
        }
    }
}
