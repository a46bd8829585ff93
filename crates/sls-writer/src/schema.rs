// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Process-wide description of the SLS wire messages.
//!
//! Mirrors the published `log.proto` (proto2):
//!
//! ```protobuf
//! message Log {
//!     required uint32 Time = 1;
//!     message Content {
//!         required string Key = 1;
//!         required string Value = 2;
//!     }
//!     repeated Content Contents = 2;
//!     optional fixed32 Time_ns = 4;
//! }
//!
//! message LogTag {
//!     required string Key = 1;
//!     required string Value = 2;
//! }
//!
//! message LogGroup {
//!     repeated Log Logs = 1;
//!     optional string Topic = 3;
//!     optional string Source = 4;
//!     repeated LogTag LogTags = 6;
//! }
//!
//! message LogGroupList {
//!     repeated LogGroup logGroupList = 1;
//! }
//! ```
//!
//! Field numbers are load-bearing: the service decodes by number, so any change here
//! silently corrupts every payload.

use std::sync::OnceLock;

/// Protobuf wire types used by the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WireType {
    Varint = 0,
    LengthDelimited = 2,
    Fixed32 = 5,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    Required,
    Optional,
    Repeated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    UInt32,
    Fixed32,
    String,
    /// Nested message, by fully qualified name.
    Message(&'static str),
}

impl FieldType {
    #[must_use]
    pub const fn wire_type(self) -> WireType {
        match self {
            FieldType::UInt32 => WireType::Varint,
            FieldType::Fixed32 => WireType::Fixed32,
            FieldType::String | FieldType::Message(_) => WireType::LengthDelimited,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub number: u32,
    pub label: Label,
    pub field_type: FieldType,
}

impl FieldDescriptor {
    const fn new(name: &'static str, number: u32, label: Label, field_type: FieldType) -> Self {
        FieldDescriptor {
            name,
            number,
            label,
            field_type,
        }
    }

    #[must_use]
    pub const fn wire_type(&self) -> WireType {
        self.field_type.wire_type()
    }

    /// The field key (`number << 3 | wire type`) that precedes every value on the wire.
    #[must_use]
    pub const fn key(&self) -> u32 {
        (self.number << 3) | self.wire_type() as u32
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDescriptor {
    pub name: &'static str,
    pub fields: Vec<FieldDescriptor>,
}

impl MessageDescriptor {
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    #[must_use]
    pub fn field_by_number(&self, number: u32) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.number == number)
    }
}

/// The five SLS message types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub content: MessageDescriptor,
    pub log: MessageDescriptor,
    pub log_tag: MessageDescriptor,
    pub log_group: MessageDescriptor,
    /// Not used by `PutLogs`; see [`crate::entity::GroupList`].
    pub log_group_list: MessageDescriptor,
}

impl Schema {
    fn build() -> Self {
        use FieldType::{Fixed32, Message, UInt32};
        use Label::{Optional, Repeated, Required};

        Schema {
            content: MessageDescriptor {
                name: "Log.Content",
                fields: vec![
                    FieldDescriptor::new("Key", 1, Required, FieldType::String),
                    FieldDescriptor::new("Value", 2, Required, FieldType::String),
                ],
            },
            log: MessageDescriptor {
                name: "Log",
                fields: vec![
                    FieldDescriptor::new("Time", 1, Required, UInt32),
                    FieldDescriptor::new("Contents", 2, Repeated, Message("Log.Content")),
                    FieldDescriptor::new("Time_ns", 4, Optional, Fixed32),
                ],
            },
            log_tag: MessageDescriptor {
                name: "LogTag",
                fields: vec![
                    FieldDescriptor::new("Key", 1, Required, FieldType::String),
                    FieldDescriptor::new("Value", 2, Required, FieldType::String),
                ],
            },
            log_group: MessageDescriptor {
                name: "LogGroup",
                fields: vec![
                    FieldDescriptor::new("Logs", 1, Repeated, Message("Log")),
                    FieldDescriptor::new("Topic", 3, Optional, FieldType::String),
                    FieldDescriptor::new("Source", 4, Optional, FieldType::String),
                    FieldDescriptor::new("LogTags", 6, Repeated, Message("LogTag")),
                ],
            },
            log_group_list: MessageDescriptor {
                name: "LogGroupList",
                fields: vec![FieldDescriptor::new(
                    "logGroupList",
                    1,
                    Repeated,
                    Message("LogGroup"),
                )],
            },
        }
    }

    #[must_use]
    pub fn message(&self, name: &str) -> Option<&MessageDescriptor> {
        [
            &self.content,
            &self.log,
            &self.log_tag,
            &self.log_group,
            &self.log_group_list,
        ]
        .into_iter()
        .find(|m| m.name == name)
    }
}

/// Returns the shared schema, building it on first use.
pub fn schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(Schema::build)
}
