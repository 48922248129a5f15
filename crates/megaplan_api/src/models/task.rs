//! Project and task payloads returned by the v3 entity endpoints.

use serde::Deserialize;

use super::entity::deserialize_id;
use super::party::ResponsibleParty;

/// Lightweight `{id, name}` entry from issue and subtask listings.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CommentRef {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
}

/// Wrapped date value, e.g. `{"contentType": "DateTime", "value": "2024-03-05T10:00:00+03:00"}`.
#[derive(Debug, Deserialize, Clone)]
pub struct DateTimeValue {
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetail {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub sub_tasks: Vec<Issue>,
    #[serde(default)]
    pub responsible: Option<ResponsibleParty>,
    #[serde(default)]
    pub owner: Option<ResponsibleParty>,
    #[serde(default)]
    pub comments: Vec<CommentRef>,
    #[serde(default)]
    pub actual_start: Option<DateTimeValue>,
}

impl TaskDetail {
    /// Raw `actualStart.value`, if the task has been started.
    pub fn actual_start(&self) -> Option<&str> {
        self.actual_start
            .as_ref()
            .and_then(|start| start.value.as_deref())
    }

    /// Responsible party, falling back to the owner.
    pub fn responsible_or_owner(&self) -> Option<&ResponsibleParty> {
        self.responsible.as_ref().or(self.owner.as_ref())
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetail {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub responsible: Option<ResponsibleParty>,
}
