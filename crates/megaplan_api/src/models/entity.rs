//! Entity references shared by every Megaplan payload.

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Discriminator Megaplan attaches to every entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentType {
    Project,
    Task,
    Comment,
    File,
    Employee,
}

impl ContentType {
    /// Path segment used by the v3 API for entities of this type.
    pub fn path_segment(&self) -> &'static str {
        match self {
            ContentType::Project => "project",
            ContentType::Task => "task",
            ContentType::Comment => "comment",
            ContentType::File => "file",
            ContentType::Employee => "employee",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

/// Opaque `{id, contentType}` pointer to a remote entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRef {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub content_type: ContentType,
}

impl EntityRef {
    pub fn new(id: impl Into<String>, content_type: ContentType) -> Self {
        Self {
            id: id.into(),
            content_type,
        }
    }

    pub fn project(id: impl Into<String>) -> Self {
        Self::new(id, ContentType::Project)
    }

    pub fn task(id: impl Into<String>) -> Self {
        Self::new(id, ContentType::Task)
    }

    pub fn file(id: impl Into<String>) -> Self {
        Self::new(id, ContentType::File)
    }
}

/// Megaplan ids are strings, but some installations return plain numbers.
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::String(text) => Ok(text.trim().to_string()),
        Value::Number(number) => Ok(number.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}
