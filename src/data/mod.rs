//! Comment data structures

mod timeline;

pub use timeline::{format_time, last_entry_at_or_before, CommentEntry, CommentTimeline};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one video file's comment stream (a "cid").
///
/// Resolved once per navigation and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
