// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-memory form of one SLS batch.
//!
//! A [`Group`] is the unit of transmission. It keeps a running *probable size*, a cheap
//! upper bound on its encoded size that the batcher uses to decide when to flush. Every
//! UTF-16 code unit of a content key or value is counted as 3 bytes: a BMP character
//! encodes to at most 3 UTF-8 bytes, and anything outside the BMP takes two units for
//! its 4 bytes.

/// Weight of one UTF-16 code unit in the probable-size estimate.
const PROBABLE_BYTES_PER_CHAR: usize = 3;

/// One `key=value` pair of a log item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    key: String,
    value: String,
}

impl Content {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Content {
            key: key.into(),
            value: value.into(),
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub fn probable_size(&self) -> usize {
        (self.key.encode_utf16().count() + self.value.encode_utf16().count())
            * PROBABLE_BYTES_PER_CHAR
    }
}

/// One log record in wire form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    time: u32,
    time_ns: Option<u32>,
    contents: Vec<Content>,
}

impl Item {
    /// Creates an item stamped with whole UNIX seconds.
    #[must_use]
    pub fn new(time: u32) -> Self {
        Item {
            time,
            time_ns: None,
            contents: Vec::new(),
        }
    }

    /// Creates an item stamped with UNIX seconds plus a sub-second nanosecond fraction.
    #[must_use]
    pub fn with_nanos(time: u32, time_ns: u32) -> Self {
        Item {
            time,
            time_ns: Some(time_ns),
            contents: Vec::new(),
        }
    }

    /// Creates an item from a UNIX timestamp in milliseconds.
    ///
    /// Timestamps past the `u32` range saturate; SLS cannot represent them anyway.
    #[must_use]
    pub fn from_unix_millis(timestamp_ms: u64) -> Self {
        let time = u32::try_from(timestamp_ms / 1_000).unwrap_or(u32::MAX);
        // < 1_000_000_000, always fits
        let nanos = (timestamp_ms % 1_000) as u32 * 1_000_000;
        Item::with_nanos(time, nanos)
    }

    #[must_use]
    pub fn content(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push_content(Content::new(key, value));
        self
    }

    pub fn push_content(&mut self, content: Content) {
        self.contents.push(content);
    }

    #[must_use]
    pub fn time(&self) -> u32 {
        self.time
    }

    #[must_use]
    pub fn time_ns(&self) -> Option<u32> {
        self.time_ns
    }

    #[must_use]
    pub fn contents(&self) -> &[Content] {
        &self.contents
    }

    #[must_use]
    pub fn probable_size(&self) -> usize {
        self.contents.iter().map(Content::probable_size).sum()
    }
}

/// Group-level metadata, e.g. the host or process a batch came from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tag {
    key: String,
    value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Tag {
            key: key.into(),
            value: value.into(),
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// A batch of items sharing a topic, a source and a set of tags.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Group {
    topic: Option<String>,
    source: Option<String>,
    tags: Vec<Tag>,
    items: Vec<Item>,
    probable_size: usize,
}

impl Group {
    #[must_use]
    pub fn new(topic: Option<String>, source: Option<String>) -> Self {
        Group {
            topic,
            source,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    #[must_use]
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Sum of the probable sizes of all items held.
    ///
    /// Maintained on every push, never recomputed.
    #[must_use]
    pub fn probable_size(&self) -> usize {
        self.probable_size
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push_tag(&mut self, tag: Tag) {
        self.tags.push(tag);
    }

    pub fn extend_tags(&mut self, tags: impl IntoIterator<Item = Tag>) {
        self.tags.extend(tags);
    }

    /// Appends an item and returns the new probable size.
    pub fn push(&mut self, item: Item) -> usize {
        self.probable_size += item.probable_size();
        self.items.push(item);
        self.probable_size
    }

    pub fn extend(&mut self, items: impl IntoIterator<Item = Item>) {
        for item in items {
            self.push(item);
        }
    }
}

/// List of groups.
///
/// Part of the published SLS schema but not accepted by `PutLogs`, which takes a bare
/// [`Group`]. Kept so callers that persist or relay group lists can encode them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GroupList {
    groups: Vec<Group>,
}

impl GroupList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, group: Group) {
        self.groups.push(group);
    }

    #[must_use]
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }
}
