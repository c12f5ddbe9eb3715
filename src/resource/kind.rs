//! Resource kind selector

use crate::error::UnknownKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which remote collection to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Todos,
    Posts,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 2] = [ResourceKind::Todos, ResourceKind::Posts];

    /// Path segment used in `<base-url>/<kind>`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todos => "todos",
            Self::Posts => "posts",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todos" => Ok(Self::Todos),
            "posts" => Ok(Self::Posts),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}
