// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Limits and protocol constants for the SLS `PutLogs` API.
//!
//! The service accepts at most 10MB of raw (uncompressed) data per call. Batches are cut
//! on the *probable* size of a Group, a cheap upper bound that over-estimates the encoded
//! size, so the 5MB threshold leaves ample headroom under the hard limit.

use std::time::Duration;

/// Probable-size threshold above which the current Group is flushed.
///
/// # Value: 5MB (5,242,880 bytes)
///
/// A single Item larger than this is never split; it is shipped alone.
pub const MAX_GROUP_PROBABLE_SIZE: usize = 5 * 1_024 * 1_024;

/// Capacity of the fixed compression buffer each worker keeps for its lifetime.
///
/// # Value: 10MB (10,485,760 bytes)
///
/// Payloads whose worst-case LZ4 output exceeds this go through a separate
/// overflow buffer instead.
pub const FIXED_COMPRESSION_BUFFER_SIZE: usize = 10 * 1_024 * 1_024;

/// Idle time after which the overflow compression buffer is released.
pub const OVERFLOW_BUFFER_IDLE_TTL: Duration = Duration::from_secs(5 * 60);

/// How often a topic worker checks whether its overflow buffer went idle.
pub const IDLE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Default request timeout for `PutLogs` calls.
pub const DEFAULT_FLUSH_TIMEOUT_SECS: u64 = 30;

/// Number of records the shipper binary hands to a worker at once.
pub const DEFAULT_BATCH_BUFFER_SIZE: usize = 128;

pub const API_VERSION: &str = "0.6.0";
pub const SIGNATURE_METHOD: &str = "hmac-sha1";
pub const COMPRESS_TYPE: &str = "lz4";
pub const CONTENT_TYPE: &str = "application/x-protobuf";

// Header names as they enter the signature. The `x-log-` ones are part of the
// canonical string, the rest are not.
pub const HEADER_API_VERSION: &str = "x-log-apiversion";
pub const HEADER_SIGNATURE_METHOD: &str = "x-log-signaturemethod";
pub const HEADER_COMPRESS_TYPE: &str = "x-log-compresstype";
pub const HEADER_BODY_RAW_SIZE: &str = "x-log-bodyrawsize";
pub const HEADER_DATE: &str = "Date";
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
pub const HEADER_CONTENT_LENGTH: &str = "Content-Length";
pub const HEADER_CONTENT_MD5: &str = "Content-MD5";
pub const HEADER_HOST: &str = "Host";
pub const HEADER_AUTHORIZATION: &str = "Authorization";
