//! To-do item models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single to-do entry as returned by the server.
///
/// Every field is server-assigned or server-echoed; the client never
/// constructs one for submission (see [`NewTodo`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct TodoItem {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Request payload for creating a to-do.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct NewTodo {
    pub title: String,
    pub description: String,
}

impl NewTodo {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }

    /// Both fields must be non-empty before the server is contacted.
    pub fn is_complete(&self) -> bool {
        !self.title.is_empty() && !self.description.is_empty()
    }
}
