// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Protobuf encoding of log groups.
//!
//! A small hand-written writer for the four fixed message shapes of [`crate::schema`].
//! Field keys are resolved from the schema once, when the [`Encoder`] is built; encoding
//! itself is pure and allocation happens exactly once per payload, since nested message
//! lengths are computed up front instead of encoding into scratch buffers.
//!
//! Fields are emitted in field-number order, as the reference protobuf serializer does,
//! and optional fields that are absent are omitted rather than written empty.

use std::sync::OnceLock;

use crate::entity::{Content, Group, GroupList, Item, Tag};
use crate::schema::{schema, MessageDescriptor, Schema};

#[derive(Debug, Clone, Copy)]
struct Keys {
    content_key: u32,
    content_value: u32,
    log_time: u32,
    log_contents: u32,
    log_time_ns: u32,
    tag_key: u32,
    tag_value: u32,
    group_logs: u32,
    group_topic: u32,
    group_source: u32,
    group_tags: u32,
    list_groups: u32,
}

/// Resolves a field key, panicking when the schema lacks it.
///
/// A missing field means the wire contract itself is broken, which must never be
/// papered over at runtime.
#[allow(clippy::panic)]
fn resolve(message: &MessageDescriptor, field: &str) -> u32 {
    message
        .field(field)
        .map(|f| f.key())
        .unwrap_or_else(|| panic!("SLS schema: {} has no field {field}", message.name))
}

#[derive(Debug, Clone)]
pub struct Encoder {
    keys: Keys,
}

impl Encoder {
    #[must_use]
    pub fn new(schema: &Schema) -> Self {
        let keys = Keys {
            content_key: resolve(&schema.content, "Key"),
            content_value: resolve(&schema.content, "Value"),
            log_time: resolve(&schema.log, "Time"),
            log_contents: resolve(&schema.log, "Contents"),
            log_time_ns: resolve(&schema.log, "Time_ns"),
            tag_key: resolve(&schema.log_tag, "Key"),
            tag_value: resolve(&schema.log_tag, "Value"),
            group_logs: resolve(&schema.log_group, "Logs"),
            group_topic: resolve(&schema.log_group, "Topic"),
            group_source: resolve(&schema.log_group, "Source"),
            group_tags: resolve(&schema.log_group, "LogTags"),
            list_groups: resolve(&schema.log_group_list, "logGroupList"),
        };
        Encoder { keys }
    }

    /// Encodes a `LogGroup` message.
    #[must_use]
    pub fn encode(&self, group: &Group) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.group_len(group));
        self.write_group(&mut buf, group);
        buf
    }

    /// Encodes a `LogGroupList` message.
    #[must_use]
    pub fn encode_group_list(&self, list: &GroupList) -> Vec<u8> {
        let len = list
            .groups()
            .iter()
            .map(|g| nested_len(self.keys.list_groups, self.group_len(g)))
            .sum();
        let mut buf = Vec::with_capacity(len);
        for group in list.groups() {
            put_varint(&mut buf, u64::from(self.keys.list_groups));
            put_varint(&mut buf, self.group_len(group) as u64);
            self.write_group(&mut buf, group);
        }
        buf
    }

    /// Exact size of [`Encoder::encode`]'s output.
    #[must_use]
    pub fn group_len(&self, group: &Group) -> usize {
        let k = &self.keys;
        let items: usize = group
            .items()
            .iter()
            .map(|i| nested_len(k.group_logs, self.item_len(i)))
            .sum();
        let topic = group.topic().map_or(0, |t| string_len(k.group_topic, t));
        let source = group.source().map_or(0, |s| string_len(k.group_source, s));
        let tags: usize = group
            .tags()
            .iter()
            .map(|t| nested_len(k.group_tags, self.tag_len(t)))
            .sum();
        items + topic + source + tags
    }

    fn item_len(&self, item: &Item) -> usize {
        let k = &self.keys;
        let time = varint_len(u64::from(k.log_time)) + varint_len(u64::from(item.time()));
        let contents: usize = item
            .contents()
            .iter()
            .map(|c| nested_len(k.log_contents, self.content_len(c)))
            .sum();
        let time_ns = item
            .time_ns()
            .map_or(0, |_| varint_len(u64::from(k.log_time_ns)) + 4);
        time + contents + time_ns
    }

    fn content_len(&self, content: &Content) -> usize {
        string_len(self.keys.content_key, content.key())
            + string_len(self.keys.content_value, content.value())
    }

    fn tag_len(&self, tag: &Tag) -> usize {
        string_len(self.keys.tag_key, tag.key()) + string_len(self.keys.tag_value, tag.value())
    }

    fn write_group(&self, buf: &mut Vec<u8>, group: &Group) {
        let k = &self.keys;
        for item in group.items() {
            put_varint(buf, u64::from(k.group_logs));
            put_varint(buf, self.item_len(item) as u64);
            self.write_item(buf, item);
        }
        if let Some(topic) = group.topic() {
            put_string(buf, k.group_topic, topic);
        }
        if let Some(source) = group.source() {
            put_string(buf, k.group_source, source);
        }
        for tag in group.tags() {
            put_varint(buf, u64::from(k.group_tags));
            put_varint(buf, self.tag_len(tag) as u64);
            put_string(buf, k.tag_key, tag.key());
            put_string(buf, k.tag_value, tag.value());
        }
    }

    fn write_item(&self, buf: &mut Vec<u8>, item: &Item) {
        let k = &self.keys;
        put_varint(buf, u64::from(k.log_time));
        put_varint(buf, u64::from(item.time()));
        for content in item.contents() {
            put_varint(buf, u64::from(k.log_contents));
            put_varint(buf, self.content_len(content) as u64);
            put_string(buf, k.content_key, content.key());
            put_string(buf, k.content_value, content.value());
        }
        if let Some(time_ns) = item.time_ns() {
            put_varint(buf, u64::from(k.log_time_ns));
            buf.extend_from_slice(&time_ns.to_le_bytes());
        }
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Encoder::new(schema())
    }
}

fn shared() -> &'static Encoder {
    static ENCODER: OnceLock<Encoder> = OnceLock::new();
    ENCODER.get_or_init(Encoder::default)
}

/// Encodes a group with the shared encoder.
#[must_use]
pub fn encode(group: &Group) -> Vec<u8> {
    shared().encode(group)
}

/// Encodes a group list with the shared encoder.
#[must_use]
pub fn encode_group_list(list: &GroupList) -> Vec<u8> {
    shared().encode_group_list(list)
}

fn varint_len(mut value: u64) -> usize {
    let mut len = 1;
    while value >= 0x80 {
        value >>= 7;
        len += 1;
    }
    len
}

fn put_varint(buf: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        buf.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

fn nested_len(key: u32, len: usize) -> usize {
    varint_len(u64::from(key)) + varint_len(len as u64) + len
}

fn string_len(key: u32, value: &str) -> usize {
    nested_len(key, value.len())
}

fn put_string(buf: &mut Vec<u8>, key: u32, value: &str) {
    put_varint(buf, u64::from(key));
    put_varint(buf, value.len() as u64);
    buf.extend_from_slice(value.as_bytes());
}
