// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! LZ4 block compression with a reusable output buffer.
//!
//! Each topic worker owns one [`Lz4Compressor`]. Payloads whose worst-case compressed
//! size fits in the fixed buffer are compressed into it; larger ones go to a growable
//! overflow buffer that is dropped again once it has sat unused for
//! [`OVERFLOW_BUFFER_IDLE_TTL`]. Callers always get an exact-length copy and never see
//! the pooled memory.

use std::time::Instant;

use lz4_flex::block::{compress_into, get_maximum_output_size};
use tracing::debug;

use crate::constants::{FIXED_COMPRESSION_BUFFER_SIZE, OVERFLOW_BUFFER_IDLE_TTL};
use crate::error::CompressionError;

pub struct Lz4Compressor {
    fixed: Vec<u8>,
    overflow: Vec<u8>,
    overflow_last_used: Option<Instant>,
}

impl Lz4Compressor {
    #[must_use]
    pub fn new() -> Self {
        Self::with_fixed_capacity(FIXED_COMPRESSION_BUFFER_SIZE)
    }

    #[must_use]
    pub fn with_fixed_capacity(capacity: usize) -> Self {
        Lz4Compressor {
            fixed: vec![0; capacity],
            overflow: Vec::new(),
            overflow_last_used: None,
        }
    }

    /// Compresses `input` into a raw LZ4 block (no frame header).
    ///
    /// # Errors
    ///
    /// Only if the output buffer is too small, which the worst-case sizing rules out.
    pub fn compress(&mut self, input: &[u8]) -> Result<Vec<u8>, CompressionError> {
        if input.is_empty() {
            return Ok(Vec::new());
        }

        let required = get_maximum_output_size(input.len());
        let buffer = if required <= self.fixed.len() {
            &mut self.fixed
        } else {
            if self.overflow.len() < required {
                debug!(
                    "SLS | Growing LZ4 overflow buffer from {} to {} bytes",
                    self.overflow.len(),
                    required
                );
                self.overflow = vec![0; required];
            }
            self.overflow_last_used = Some(Instant::now());
            &mut self.overflow
        };

        let written = compress_into(input, buffer)?;
        Ok(buffer[..written].to_vec())
    }

    /// Drops the overflow buffer if it has not been used for the idle TTL.
    pub fn release_idle(&mut self, now: Instant) {
        let Some(last_used) = self.overflow_last_used else {
            return;
        };
        if now.saturating_duration_since(last_used) >= OVERFLOW_BUFFER_IDLE_TTL {
            debug!(
                "SLS | Releasing idle LZ4 overflow buffer of {} bytes",
                self.overflow.len()
            );
            self.overflow = Vec::new();
            self.overflow_last_used = None;
        }
    }

    #[must_use]
    pub fn overflow_capacity(&self) -> usize {
        self.overflow.len()
    }
}

impl Default for Lz4Compressor {
    fn default() -> Self {
        Self::new()
    }
}

/// Inverse of [`Lz4Compressor::compress`]; `raw_size` is the `x-log-bodyrawsize` value.
///
/// # Errors
///
/// If `bytes` is not a valid LZ4 block or expands past `raw_size`.
pub fn decompress(bytes: &[u8], raw_size: usize) -> Result<Vec<u8>, CompressionError> {
    if bytes.is_empty() {
        return Ok(Vec::new());
    }
    Ok(lz4_flex::block::decompress(bytes, raw_size)?)
}
