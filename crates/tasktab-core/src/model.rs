use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskList {
    pub id: u64,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: u64,

    #[serde(default)]
    pub title: String,

    /// `None` when the server sent anything other than a JSON boolean.
    #[serde(default, deserialize_with = "strict_bool")]
    pub done: Option<bool>,

    #[serde(default)]
    pub limit: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Task {
    pub fn new(id: u64, title: impl Into<String>, done: bool, limit: Option<&str>) -> Self {
        Self {
            id,
            title: title.into(),
            done: Some(done),
            limit: limit.map(str::to_string),
            extra: BTreeMap::new(),
        }
    }

    pub fn status_label(&self) -> &'static str {
        match self.done {
            Some(true) => "done",
            Some(false) => "todo",
            None => "-",
        }
    }
}

/// Body of `GET /lists/{id}/tasks`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TasksEnvelope {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tasks: Vec<Task>,
}

fn strict_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_bool())
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Task>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Task>>::deserialize(deserializer)?.unwrap_or_default())
}
