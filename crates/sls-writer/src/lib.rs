// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! # SLS Writer
//!
//! Write path for shipping structured logs and metrics to Aliyun Log Service (SLS).
//!
//! ## Pipeline
//!
//! ```text
//!   records ──> record ──> batcher ──> encoder ──> compressor ──> signer/putter ──> SLS
//!              (Items)    (Groups)    (protobuf)    (LZ4 block)     (HTTP POST)
//! ```
//!
//! - [`record`]: translation of log and metric records into Items
//! - [`entity`]: in-memory Groups, Items, Contents and Tags with running size accounting
//! - [`schema`]: the fixed, process-wide description of the SLS wire messages
//! - [`encoder`]: hand-written protobuf writer driven by the schema
//! - [`compressor`]: LZ4 block compression with a per-worker buffer pool
//! - [`signer`]: `LOG` request signatures (HMAC-SHA1)
//! - [`putter`]: the `PutLogs` HTTP call
//! - [`batcher`]: folds Items into size-bounded Groups and flushes them
//! - [`worker`]: one actor per topic, processing delivered batches sequentially
//! - [`writer`]: validated entry point that spawns topic workers
//!
//! Transmission failures are logged and swallowed. Errors only surface from
//! [`SlsWriter::new`], when the configuration cannot be used.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod batcher;
pub mod compressor;
pub mod config;
pub mod constants;
pub mod encoder;
pub mod entity;
pub mod error;
pub mod http;
pub mod putter;
pub mod record;
pub mod schema;
pub mod signer;
pub mod worker;
pub mod writer;

pub use batcher::{Batcher, BatcherConfig};
pub use config::{SlsConfig, ValidatedConfig};
pub use entity::{Content, Group, GroupList, Item, Tag};
pub use error::{DisabledReason, PutLogsError, SlsError};
pub use putter::{LogPutter, LogPutterConfig, LogSink};
pub use record::{Level, LogRecord, MetricRecord};
pub use worker::{TopicWorker, TopicWorkerHandle};
pub use writer::SlsWriter;
