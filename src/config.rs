// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bridge configuration file.
//!
//! ```toml
//! [mqtt]
//! host = "broker.lan"
//! port = 1883
//! user = "bridge"
//! pass = "secret"
//!
//! [[targets]]
//! host = "pdu1.lan"
//!
//! [[targets]]
//! host = "pdu2.lan"
//! port = 1161
//! community = "private"
//! timeout_ms = 2000
//! retries = 3
//! ```
//!
//! Keys are also accepted capitalised (`MQTT`, `Targets`, `Host`, `Port`,
//! `User`, `Pass`).
//!
//! A missing or empty `user` disables broker authentication. A `pass` given
//! without a `user` is never sent; loading such a file logs a warning.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

fn default_mqtt_port() -> u16 {
    1883
}

fn default_client_id() -> String {
    "apc2mqtt".to_string()
}

fn default_snmp_port() -> u16 {
    161
}

fn default_community() -> String {
    "private".to_string()
}

fn default_timeout_ms() -> u64 {
    2000
}

fn default_retries() -> u32 {
    3
}

/// Whole configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Broker connection.
    #[serde(alias = "MQTT")]
    pub mqtt: MqttConfig,
    /// PDUs to bridge.
    #[serde(default, alias = "Targets")]
    pub targets: Vec<TargetConfig>,
}

/// Broker connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MqttConfig {
    #[serde(alias = "Host")]
    pub host: String,
    #[serde(default = "default_mqtt_port", alias = "Port")]
    pub port: u16,
    #[serde(default, alias = "User")]
    pub user: Option<String>,
    #[serde(default, alias = "Pass")]
    pub pass: Option<String>,
    #[serde(default = "default_client_id", alias = "ClientID")]
    pub client_id: String,
}

impl MqttConfig {
    /// Returns the username and password, if a username is set.
    ///
    /// Empty strings count as unset.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let user = self.user.as_deref().filter(|u| !u.is_empty())?;
        Some((user, self.pass.as_deref().unwrap_or_default()))
    }

    /// Returns whether a password is set that [`credentials`](Self::credentials)
    /// drops because no username is set.
    #[must_use]
    pub fn password_ignored(&self) -> bool {
        self.credentials().is_none() && self.pass.as_deref().is_some_and(|p| !p.is_empty())
    }
}

/// One PDU.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TargetConfig {
    #[serde(alias = "Host")]
    pub host: String,
    #[serde(default = "default_snmp_port", alias = "Port")]
    pub port: u16,
    #[serde(default = "default_community", alias = "Community")]
    pub community: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_retries")]
    pub retries: u32,
}

impl TargetConfig {
    /// Returns the per-request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Returns `host:port`.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Builds the SNMP connector for this target.
    #[cfg(feature = "snmp")]
    #[must_use]
    pub fn connector(&self) -> crate::protocol::SnmpConnector {
        crate::protocol::SnmpConnector::new(self.host.clone(), self.port)
            .with_community(self.community.clone())
            .with_timeout(self.timeout())
            .with_retries(self.retries)
    }
}

impl Config {
    /// Reads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read, is not valid TOML
    /// for this schema, or fails validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        content.parse()
    }

    /// Checks values serde cannot.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mqtt.host.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "mqtt.host".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.mqtt.password_ignored() {
            tracing::warn!("mqtt.pass is set without mqtt.user, connecting without credentials");
        }
        for (i, target) in self.targets.iter().enumerate() {
            if target.host.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    field: format!("targets[{i}].host"),
                    reason: "must not be empty".to_string(),
                });
            }
            if target.timeout_ms == 0 {
                return Err(ConfigError::Invalid {
                    field: format!("targets[{i}].timeout_ms"),
                    reason: "must be greater than zero".to_string(),
                });
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_with_defaults() {
        let config: Config = r#"
            [mqtt]
            host = "broker.lan"

            [[targets]]
            host = "pdu1.lan"
        "#
        .parse()
        .unwrap();

        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.mqtt.client_id, "apc2mqtt");
        assert_eq!(config.mqtt.credentials(), None);

        let target = &config.targets[0];
        assert_eq!(target.address(), "pdu1.lan:161");
        assert_eq!(target.community, "private");
        assert_eq!(target.timeout(), Duration::from_secs(2));
        assert_eq!(target.retries, 3);
    }

    #[test]
    fn parse_capitalised_keys() {
        let config: Config = r#"
            [MQTT]
            Host = "10.0.0.2"
            Port = 8883
            User = "bridge"
            Pass = "secret"

            [[Targets]]
            Host = "10.0.0.10"
            Port = 1161

            [[Targets]]
            Host = "10.0.0.11"
        "#
        .parse()
        .unwrap();

        assert_eq!(config.mqtt.host, "10.0.0.2");
        assert_eq!(config.mqtt.port, 8883);
        assert_eq!(config.mqtt.credentials(), Some(("bridge", "secret")));
        assert_eq!(config.targets.len(), 2);
        assert_eq!(config.targets[0].port, 1161);
        assert_eq!(config.targets[1].port, 161);
    }

    #[test]
    fn empty_user_means_no_credentials() {
        let config: Config = r#"
            [mqtt]
            host = "broker"
            user = ""
            pass = "ignored"
        "#
        .parse()
        .unwrap();
        assert_eq!(config.mqtt.credentials(), None);
        assert!(config.mqtt.password_ignored());
        assert!(config.targets.is_empty());
    }

    #[test]
    fn password_without_user_is_flagged() {
        let config: Config = r#"
            [mqtt]
            host = "broker"
            pass = "secret"
        "#
        .parse()
        .unwrap();
        assert_eq!(config.mqtt.credentials(), None);
        assert!(config.mqtt.password_ignored());

        let config: Config = r#"
            [mqtt]
            host = "broker"
            user = "bridge"
            pass = "secret"
        "#
        .parse()
        .unwrap();
        assert_eq!(config.mqtt.credentials(), Some(("bridge", "secret")));
        assert!(!config.mqtt.password_ignored());

        let config: Config = r#"
            [mqtt]
            host = "broker"
        "#
        .parse()
        .unwrap();
        assert!(!config.mqtt.password_ignored());
    }

    #[test]
    fn rejects_empty_target_host() {
        let err = r#"
            [mqtt]
            host = "broker"

            [[targets]]
            host = "pdu1"

            [[targets]]
            host = " "
        "#
        .parse::<Config>()
        .unwrap_err();

        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "targets[1].host"));
    }

    #[test]
    fn rejects_missing_mqtt_section() {
        let err = "[[targets]]\nhost = \"pdu1\"\n".parse::<Config>().unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn load_reports_path() {
        let err = Config::load(Path::new("/nonexistent/apc2mqtt.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/apc2mqtt.toml"));
    }
}
