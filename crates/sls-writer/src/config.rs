// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Writer configuration.
//!
//! The host application hands over its `aliyun.sls` section as JSON, or the writer reads
//! `SLS_*` environment variables. Either way nothing is checked until
//! [`SlsConfig::validate`], which is the single point where the writer decides whether it
//! is enabled.

use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::net::UdpSocket;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::constants::DEFAULT_FLUSH_TIMEOUT_SECS;
use crate::entity::Tag;
use crate::error::{DisabledReason, SlsError};

/// Placeholder in the source expression for the local host address.
pub const IP_PLACEHOLDER: &str = "[IP]";

/// Overrides local address discovery for [`IP_PLACEHOLDER`].
const SOURCE_IP_ENV: &str = "SLS_SOURCE_IP";

// Any routable address works; connecting a UDP socket only selects the interface.
const ROUTE_PROBE_ADDRESS: &str = "8.8.8.8:80";

#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SlsConfig {
    pub disabled: bool,
    pub project: Option<String>,
    pub logstore: Option<String>,
    /// Source expression, see [`build_source`].
    pub source: Option<String>,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub access_key_secret: Option<String>,
    pub tags: BTreeMap<String, String>,
    pub flush_timeout_secs: Option<u64>,
    pub https_proxy: Option<String>,
    pub intake_url_override: Option<String>,
}

impl fmt::Debug for SlsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlsConfig")
            .field("disabled", &self.disabled)
            .field("project", &self.project)
            .field("logstore", &self.logstore)
            .field("source", &self.source)
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id)
            .field(
                "access_key_secret",
                &self.access_key_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("tags", &self.tags)
            .field("flush_timeout_secs", &self.flush_timeout_secs)
            .field("https_proxy", &self.https_proxy)
            .field("intake_url_override", &self.intake_url_override)
            .finish()
    }
}

impl SlsConfig {
    /// Reads the configuration section supplied by the host application.
    ///
    /// # Errors
    ///
    /// `Disabled(MissingSection)` when there is no section at all, `InvalidConfig` when
    /// it cannot be deserialized.
    pub fn from_section(section: Option<&serde_json::Value>) -> Result<Self, SlsError> {
        let section = section.ok_or(SlsError::Disabled(DisabledReason::MissingSection))?;
        SlsConfig::deserialize(section).map_err(|e| SlsError::InvalidConfig(e.to_string()))
    }

    #[must_use]
    pub fn from_env() -> Self {
        SlsConfig {
            disabled: env::var("SLS_DISABLED")
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                .unwrap_or(false),
            project: env::var("SLS_PROJECT").ok(),
            logstore: env::var("SLS_LOGSTORE").ok(),
            source: env::var("SLS_SOURCE").ok(),
            endpoint: env::var("SLS_ENDPOINT").ok(),
            access_key_id: env::var("SLS_ACCESS_KEY_ID").ok(),
            access_key_secret: env::var("SLS_ACCESS_KEY_SECRET").ok(),
            tags: env::var("SLS_TAGS")
                .map(|tags| parse_tags(&tags))
                .unwrap_or_default(),
            flush_timeout_secs: env::var("SLS_FLUSH_TIMEOUT")
                .ok()
                .and_then(|timeout| timeout.parse::<u64>().ok()),
            https_proxy: env::var("SLS_PROXY_HTTPS")
                .or_else(|_| env::var("HTTPS_PROXY"))
                .ok(),
            intake_url_override: env::var("SLS_INTAKE_URL").ok(),
        }
    }

    /// Checks that the writer can run and resolves the source expression.
    ///
    /// # Errors
    ///
    /// `Disabled` when `disabled` is set or a required field is absent or blank.
    pub fn validate(&self) -> Result<ValidatedConfig, SlsError> {
        if self.disabled {
            return Err(SlsError::Disabled(DisabledReason::ExplicitlyDisabled));
        }

        let project = required(self.project.as_ref(), "project")?;
        let logstore = required(self.logstore.as_ref(), "logstore")?;
        let endpoint = required(self.endpoint.as_ref(), "endpoint")?;
        let access_key_id = required(self.access_key_id.as_ref(), "accessKeyId")?;
        let access_key_secret = required(self.access_key_secret.as_ref(), "accessKeySecret")?;

        let source = build_source(self.source.as_deref());

        Ok(ValidatedConfig {
            project,
            logstore,
            endpoint,
            access_key_id,
            access_key_secret,
            source: (!source.is_empty()).then_some(source),
            tags: self
                .tags
                .iter()
                .map(|(key, value)| Tag::new(key.as_str(), value.as_str()))
                .collect(),
            flush_timeout: Duration::from_secs(
                self.flush_timeout_secs.unwrap_or(DEFAULT_FLUSH_TIMEOUT_SECS),
            ),
            https_proxy: self.https_proxy.clone().filter(|p| !p.trim().is_empty()),
            intake_url_override: self
                .intake_url_override
                .clone()
                .filter(|u| !u.trim().is_empty()),
        })
    }
}

fn required(value: Option<&String>, field: &'static str) -> Result<String, SlsError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value.clone()),
        _ => Err(SlsError::Disabled(DisabledReason::MissingField(field))),
    }
}

/// `key:value` pairs separated by commas or whitespace; malformed pairs are ignored.
fn parse_tags(tags: &str) -> BTreeMap<String, String> {
    tags.replace(',', " ")
        .split_whitespace()
        .filter_map(|kv| kv.split_once(':'))
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

/// Configuration that passed [`SlsConfig::validate`].
#[derive(Clone, PartialEq, Eq)]
pub struct ValidatedConfig {
    pub project: String,
    pub logstore: String,
    pub endpoint: String,
    pub access_key_id: String,
    pub access_key_secret: String,
    /// `None` lets the service fill in the source.
    pub source: Option<String>,
    /// Sorted by key.
    pub tags: Vec<Tag>,
    pub flush_timeout: Duration,
    pub https_proxy: Option<String>,
    pub intake_url_override: Option<String>,
}

impl fmt::Debug for ValidatedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatedConfig")
            .field("project", &self.project)
            .field("logstore", &self.logstore)
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<redacted>")
            .field("source", &self.source)
            .field("tags", &self.tags)
            .field("flush_timeout", &self.flush_timeout)
            .field("https_proxy", &self.https_proxy)
            .field("intake_url_override", &self.intake_url_override)
            .finish()
    }
}

/// Resolves a source expression.
///
/// Blank or absent yields the empty string, meaning "let the service decide". Otherwise
/// every `[IP]` is replaced with the local host address; if that address is needed but
/// cannot be found, the whole source falls back to the empty string.
#[must_use]
pub fn build_source(expression: Option<&str>) -> String {
    let Some(expression) = expression.filter(|e| !e.trim().is_empty()) else {
        return String::new();
    };
    if !expression.contains(IP_PLACEHOLDER) {
        return expression.to_string();
    }
    render_source(expression, local_host_address().as_deref())
}

fn render_source(expression: &str, local_address: Option<&str>) -> String {
    match local_address {
        Some(address) => expression.replace(IP_PLACEHOLDER, address),
        None => {
            warn!("SLS | Could not get local host address for SLS source");
            String::new()
        }
    }
}

fn local_host_address() -> Option<String> {
    if let Ok(address) = env::var(SOURCE_IP_ENV) {
        if !address.trim().is_empty() {
            return Some(address.trim().to_string());
        }
    }

    let address = UdpSocket::bind("0.0.0.0:0")
        .and_then(|socket| {
            socket.connect(ROUTE_PROBE_ADDRESS)?;
            socket.local_addr()
        })
        .map(|addr| addr.ip());
    match address {
        Ok(ip) if !ip.is_unspecified() => Some(ip.to_string()),
        Ok(_) => None,
        Err(e) => {
            debug!("SLS | Local address discovery failed: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duplicate::duplicate_item;
    use serde_json::json;
    use serial_test::serial;

    fn complete_section() -> serde_json::Value {
        json!({
            "project": "my-project",
            "logstore": "my-logstore",
            "endpoint": "cn-hangzhou.log.aliyuncs.com",
            "accessKeyId": "id",
            "accessKeySecret": "secret",
            "source": "app-1",
            "tags": {"zone": "b", "env": "prod"},
            "flushTimeoutSecs": 10
        })
    }

    fn disabled_reason(result: Result<ValidatedConfig, SlsError>) -> DisabledReason {
        match result {
            Err(SlsError::Disabled(reason)) => reason,
            other => panic!("expected disabled, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_section_is_disabled() {
        assert!(matches!(
            SlsConfig::from_section(None),
            Err(SlsError::Disabled(DisabledReason::MissingSection))
        ));
    }

    #[test]
    fn test_invalid_section() {
        let section = json!({"project": 42});
        assert!(matches!(
            SlsConfig::from_section(Some(&section)),
            Err(SlsError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_complete_section() {
        let config = SlsConfig::from_section(Some(&complete_section()))
            .unwrap()
            .validate()
            .unwrap();

        assert_eq!(config.project, "my-project");
        assert_eq!(config.logstore, "my-logstore");
        assert_eq!(config.endpoint, "cn-hangzhou.log.aliyuncs.com");
        assert_eq!(config.access_key_id, "id");
        assert_eq!(config.access_key_secret, "secret");
        assert_eq!(config.source.as_deref(), Some("app-1"));
        assert_eq!(config.tags, vec![Tag::new("env", "prod"), Tag::new("zone", "b")]);
        assert_eq!(config.flush_timeout, Duration::from_secs(10));
        assert_eq!(config.https_proxy, None);
    }

    #[test]
    fn test_defaults() {
        let mut section = complete_section();
        let map = section.as_object_mut().unwrap();
        map.remove("source");
        map.remove("tags");
        map.remove("flushTimeoutSecs");

        let config = SlsConfig::from_section(Some(&section))
            .unwrap()
            .validate()
            .unwrap();

        assert_eq!(config.source, None);
        assert!(config.tags.is_empty());
        assert_eq!(
            config.flush_timeout,
            Duration::from_secs(DEFAULT_FLUSH_TIMEOUT_SECS)
        );
    }

    #[test]
    fn test_explicitly_disabled() {
        let mut section = complete_section();
        section["disabled"] = json!(true);
        let config = SlsConfig::from_section(Some(&section)).unwrap();
        assert_eq!(
            disabled_reason(config.validate()),
            DisabledReason::ExplicitlyDisabled
        );
    }

    #[duplicate_item(
        test_name                          field;
        [test_missing_project]             ["project"];
        [test_missing_logstore]            ["logstore"];
        [test_missing_endpoint]            ["endpoint"];
        [test_missing_access_key_id]       ["accessKeyId"];
        [test_missing_access_key_secret]   ["accessKeySecret"];
    )]
    #[test]
    fn test_name() {
        let mut section = complete_section();
        section.as_object_mut().unwrap().remove(field);
        let config = SlsConfig::from_section(Some(&section)).unwrap();
        assert_eq!(
            disabled_reason(config.validate()),
            DisabledReason::MissingField(field)
        );

        // blank counts as missing
        section[field] = json!("  ");
        let config = SlsConfig::from_section(Some(&section)).unwrap();
        assert_eq!(
            disabled_reason(config.validate()),
            DisabledReason::MissingField(field)
        );
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = SlsConfig::from_section(Some(&complete_section())).unwrap();
        let debug = format!("{config:?} {:?}", config.validate().unwrap());
        assert!(!debug.contains("\"secret\""));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_build_source_blank() {
        assert_eq!(build_source(None), "");
        assert_eq!(build_source(Some("")), "");
        assert_eq!(build_source(Some("   ")), "");
    }

    #[test]
    fn test_build_source_without_placeholder() {
        assert_eq!(build_source(Some("worker-7")), "worker-7");
    }

    #[test]
    fn test_render_source() {
        assert_eq!(
            render_source("[IP]/app/[IP]", Some("10.1.2.3")),
            "10.1.2.3/app/10.1.2.3"
        );
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_render_source_without_address() {
        assert_eq!(render_source("[IP]/app", None), "");
        assert!(logs_contain("Could not get local host address"));
    }

    #[test]
    #[serial]
    fn test_build_source_env_override() {
        env::set_var(SOURCE_IP_ENV, "192.0.2.10");
        assert_eq!(build_source(Some("host-[IP]")), "host-192.0.2.10");
        env::remove_var(SOURCE_IP_ENV);
    }

    #[test]
    #[serial]
    fn test_from_env() {
        env::set_var("SLS_PROJECT", "env-project");
        env::set_var("SLS_LOGSTORE", "env-logstore");
        env::set_var("SLS_ENDPOINT", "cn-shanghai.log.aliyuncs.com");
        env::set_var("SLS_ACCESS_KEY_ID", "env-id");
        env::set_var("SLS_ACCESS_KEY_SECRET", "env-secret");
        env::set_var("SLS_TAGS", "env:staging,team:core bad");
        env::set_var("SLS_FLUSH_TIMEOUT", "7");
        env::set_var("SLS_PROXY_HTTPS", "http://proxy:3128");

        let config = SlsConfig::from_env().validate().unwrap();

        assert_eq!(config.project, "env-project");
        assert_eq!(config.endpoint, "cn-shanghai.log.aliyuncs.com");
        assert_eq!(
            config.tags,
            vec![Tag::new("env", "staging"), Tag::new("team", "core")]
        );
        assert_eq!(config.flush_timeout, Duration::from_secs(7));
        assert_eq!(config.https_proxy.as_deref(), Some("http://proxy:3128"));

        for var in [
            "SLS_PROJECT",
            "SLS_LOGSTORE",
            "SLS_ENDPOINT",
            "SLS_ACCESS_KEY_ID",
            "SLS_ACCESS_KEY_SECRET",
            "SLS_TAGS",
            "SLS_FLUSH_TIMEOUT",
            "SLS_PROXY_HTTPS",
        ] {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_from_env_disabled() {
        env::set_var("SLS_DISABLED", "TRUE");
        assert_eq!(
            disabled_reason(SlsConfig::from_env().validate()),
            DisabledReason::ExplicitlyDisabled
        );
        env::remove_var("SLS_DISABLED");
    }
}
