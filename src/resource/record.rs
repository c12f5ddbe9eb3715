//! Record shapes and the kind-to-shape mapping
//!
//! The shape of a fetched item depends on the kind it was fetched for. That
//! mapping exists twice: statically through [`Resource`], and at runtime
//! through the tagged [`Records`] collection, which always carries the kind
//! next to the data.

use super::kind::ResourceKind;
use crate::error::FetchError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Fields shared by every fetched item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseRecord {
    pub user_id: u64,
    pub id: u64,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoRecord {
    #[serde(flatten)]
    pub base: BaseRecord,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    #[serde(flatten)]
    pub base: BaseRecord,
    pub body: String,
}

/// Compile-time selection of a record shape by kind
pub trait Resource {
    const KIND: ResourceKind;
    type Record: DeserializeOwned + Serialize + Clone + fmt::Debug + Send + Sync + 'static;

    fn wrap(records: Vec<Self::Record>) -> Records;
    fn view(records: &Records) -> Option<&[Self::Record]>;
}

/// Marker for the `todos` collection
#[derive(Debug, Clone, Copy)]
pub struct Todos;

/// Marker for the `posts` collection
#[derive(Debug, Clone, Copy)]
pub struct Posts;

impl Resource for Todos {
    const KIND: ResourceKind = ResourceKind::Todos;
    type Record = TodoRecord;

    fn wrap(records: Vec<TodoRecord>) -> Records {
        Records::Todos(records)
    }

    fn view(records: &Records) -> Option<&[TodoRecord]> {
        match records {
            Records::Todos(items) => Some(items),
            Records::Posts(_) => None,
        }
    }
}

impl Resource for Posts {
    const KIND: ResourceKind = ResourceKind::Posts;
    type Record = PostRecord;

    fn wrap(records: Vec<PostRecord>) -> Records {
        Records::Posts(records)
    }

    fn view(records: &Records) -> Option<&[PostRecord]> {
        match records {
            Records::Posts(items) => Some(items),
            Records::Todos(_) => None,
        }
    }
}

/// A collection of records tagged with the kind it was fetched for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Records {
    Todos(Vec<TodoRecord>),
    Posts(Vec<PostRecord>),
}

impl Records {
    /// Empty collection for a kind
    pub fn empty(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Todos => Self::Todos(Vec::new()),
            ResourceKind::Posts => Self::Posts(Vec::new()),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Todos(_) => ResourceKind::Todos,
            Self::Posts(_) => ResourceKind::Posts,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Todos(items) => items.len(),
            Self::Posts(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Statically typed view, `None` when the tag does not match `R`
    pub fn typed<R: Resource>(&self) -> Option<&[R::Record]> {
        R::view(self)
    }

    pub fn as_todos(&self) -> Option<&[TodoRecord]> {
        self.typed::<Todos>()
    }

    pub fn as_posts(&self) -> Option<&[PostRecord]> {
        self.typed::<Posts>()
    }

    /// Decode a response payload into the shape implied by `kind`.
    ///
    /// The payload must be a JSON array whose items decode as the kind's
    /// record type; anything else is a parse failure.
    pub fn decode(kind: ResourceKind, payload: Value) -> Result<Self, FetchError> {
        match kind {
            ResourceKind::Todos => decode_as::<Todos>(payload),
            ResourceKind::Posts => decode_as::<Posts>(payload),
        }
    }

    /// One compact JSON document per record
    pub fn to_json_lines(&self) -> Result<Vec<String>, serde_json::Error> {
        match self {
            Self::Todos(items) => items.iter().map(serde_json::to_string).collect(),
            Self::Posts(items) => items.iter().map(serde_json::to_string).collect(),
        }
    }
}

/// Decode a payload for a statically known resource
pub fn decode_as<R: Resource>(payload: Value) -> Result<Records, FetchError> {
    if !payload.is_array() {
        return Err(FetchError::Parse(format!(
            "expected a JSON array for '{}', got {}",
            R::KIND,
            json_type_name(&payload)
        )));
    }

    let items: Vec<R::Record> = serde_json::from_value(payload)
        .map_err(|e| FetchError::Parse(format!("invalid {} payload: {}", R::KIND, e)))?;

    Ok(R::wrap(items))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
