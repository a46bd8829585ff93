// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Size-aware batching of items into groups.
//!
//! Items are appended to the current [`Group`] in order. As soon as its probable size
//! goes over the threshold the group is flushed and a fresh one takes its place; the
//! item that crossed the threshold travels with the group it was added to, so a single
//! oversized item is shipped alone and never split. Whatever is left when the batch
//! ends is flushed as well.

use std::mem;
use std::time::Instant;

use tracing::debug;

use crate::constants::MAX_GROUP_PROBABLE_SIZE;
use crate::entity::{Group, Item, Tag};
use crate::putter::LogSink;

/// Where the groups of one topic go and what they carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatcherConfig {
    pub project: String,
    pub logstore: String,
    pub topic: Option<String>,
    pub source: Option<String>,
    pub tags: Vec<Tag>,
}

pub struct Batcher<S: LogSink> {
    sink: S,
    config: BatcherConfig,
    max_probable_size: usize,
    current: Group,
}

impl<S: LogSink> Batcher<S> {
    pub fn new(sink: S, config: BatcherConfig) -> Self {
        Self::with_max_probable_size(sink, config, MAX_GROUP_PROBABLE_SIZE)
    }

    pub fn with_max_probable_size(sink: S, config: BatcherConfig, max_probable_size: usize) -> Self {
        let current = new_group(&config);
        Batcher {
            sink,
            config,
            max_probable_size,
            current,
        }
    }

    /// Folds one delivered batch into groups and ships them.
    ///
    /// Returns once every group produced from `items` has been handed to the sink.
    /// Shipping failures are the sink's concern and never stop accumulation.
    pub async fn process(&mut self, items: Vec<Item>) {
        debug!("SLS | Processing batch of {} items", items.len());
        for item in items {
            if self.current.push(item) > self.max_probable_size {
                self.flush().await;
            }
        }
        if !self.current.is_empty() {
            self.flush().await;
        }
    }

    async fn flush(&mut self) {
        let fresh = new_group(&self.config);
        let group = mem::replace(&mut self.current, fresh);
        debug!(
            "SLS | Flushing group of {} items, probable size {}",
            group.len(),
            group.probable_size()
        );
        self.sink
            .put_logs(&self.config.project, &self.config.logstore, group)
            .await;
    }

    pub fn release_idle(&mut self, now: Instant) {
        self.sink.release_idle(now);
    }

    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }
}

fn new_group(config: &BatcherConfig) -> Group {
    let mut group = Group::new(config.topic.clone(), config.source.clone());
    group.extend_tags(config.tags.iter().cloned());
    group
}
