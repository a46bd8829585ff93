// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Translation of application records into wire items.

use std::collections::BTreeMap;
use std::fmt;

use chrono::Utc;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::entity::Item;

const LABELS_KEY: &str = "__labels__";
const TIME_NANO_KEY: &str = "__time_nano__";
const VALUE_KEY: &str = "__value__";
const NAME_KEY: &str = "__name__";

const LABEL_KV_SEPARATOR: &str = "#$#";
const LABEL_SEPARATOR: &str = "|";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    #[default]
    Info,
    Notice,
    Warning,
    Error,
    Fatal,
}

impl Level {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Notice => "NOTICE",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn now_millis() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default()
}

/// A structured log line.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LogRecord {
    pub timestamp_ms: u64,
    pub level: Level,
    pub message: Option<String>,
    pub classification: Vec<String>,
    /// Rendered error chain.
    pub exception: Option<String>,
    pub context: Map<String, Value>,
    /// Free-form entries appended after the well-known ones; `None` values are skipped.
    pub extra: Vec<(String, Option<String>)>,
}

impl LogRecord {
    pub fn new(timestamp_ms: u64, level: Level, message: impl Into<String>) -> Self {
        LogRecord {
            timestamp_ms,
            level,
            message: Some(message.into()),
            ..Default::default()
        }
    }

    /// A record stamped with the current time.
    pub fn now(level: Level, message: impl Into<String>) -> Self {
        Self::new(now_millis(), level, message)
    }

    #[must_use]
    pub fn into_item(self) -> Item {
        let mut item = Item::from_unix_millis(self.timestamp_ms).content("level", self.level.as_str());
        if let Some(message) = self.message {
            item = item.content("message", message);
        }
        if !self.classification.is_empty() {
            let classification: Vec<Value> =
                self.classification.into_iter().map(Value::String).collect();
            item = item.content("classification", Value::Array(classification).to_string());
        }
        if let Some(exception) = self.exception {
            item = item.content("exception", exception);
        }
        if !self.context.is_empty() {
            item = item.content("context", Value::Object(self.context).to_string());
        }
        for (key, value) in self.extra {
            if let Some(value) = value {
                item = item.content(key, value);
            }
        }
        item
    }
}

impl From<LogRecord> for Item {
    fn from(record: LogRecord) -> Self {
        record.into_item()
    }
}

/// One sample for a metric store.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetricRecord {
    pub timestamp_ms: u64,
    pub metric_name: String,
    pub value: f64,
    pub labels: BTreeMap<String, String>,
}

impl MetricRecord {
    pub fn new(metric_name: impl Into<String>, value: f64) -> Self {
        MetricRecord {
            timestamp_ms: now_millis(),
            metric_name: metric_name.into(),
            value,
            labels: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Renders the sample in the time-series layout, adding `source` to its labels.
    #[must_use]
    pub fn to_item(&self, source: &str) -> Item {
        let mut labels = self.labels.clone();
        labels.insert("source".to_string(), source.to_string());
        let labels = labels
            .iter()
            .map(|(k, v)| format!("{k}{LABEL_KV_SEPARATOR}{v}"))
            .collect::<Vec<_>>()
            .join(LABEL_SEPARATOR);

        let time = u32::try_from(self.timestamp_ms / 1_000).unwrap_or(u32::MAX);
        Item::new(time)
            .content(TIME_NANO_KEY, format!("{}000", self.timestamp_ms))
            .content(NAME_KEY, self.metric_name.as_str())
            // `{:?}` keeps the fraction on whole numbers, e.g. `1.0`
            .content(VALUE_KEY, format!("{:?}", self.value))
            .content(LABELS_KEY, labels)
    }
}
