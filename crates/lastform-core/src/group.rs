//! Variant groups -- tags that partition quantities into parallel
//! evaluation contexts (e.g. left/right last).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A variant tag. `Global` is the sentinel for "no group": a global
/// quantity is visible to every variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Group {
    /// No group; visible to every variant.
    #[default]
    Global,
    /// A named variant such as `"left"` or `"36"`.
    Tag(String),
}

impl Group {
    /// Creates a group from a tag string. An empty tag or the literal
    /// `"global"` means global.
    pub fn tag(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if tag.is_empty() || tag == "global" {
            Group::Global
        } else {
            Group::Tag(tag)
        }
    }

    /// Returns `true` for the global sentinel.
    pub fn is_global(&self) -> bool {
        matches!(self, Group::Global)
    }

    /// Returns the tag, or `None` for the global sentinel.
    pub fn as_tag(&self) -> Option<&str> {
        match self {
            Group::Global => None,
            Group::Tag(t) => Some(t),
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Group::Global => f.write_str("global"),
            Group::Tag(t) => f.write_str(t),
        }
    }
}

impl From<String> for Group {
    fn from(s: String) -> Self {
        if s.is_empty() || s == "global" {
            Group::Global
        } else {
            Group::Tag(s)
        }
    }
}

impl From<Group> for String {
    fn from(g: Group) -> Self {
        match g {
            Group::Global => String::new(),
            Group::Tag(t) => t,
        }
    }
}
