//! Time-ordered comment timeline

use serde::{Deserialize, Serialize};

/// A single time-tagged comment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentEntry {
    /// Offset into the video in seconds (finite, non-negative)
    pub time: f64,

    /// Comment text (trimmed, never empty)
    pub text: String,
}

impl CommentEntry {
    pub fn new(time: f64, text: impl Into<String>) -> Self {
        Self {
            time,
            text: text.into(),
        }
    }
}

/// Comments sorted ascending by time, with a parallel array of the times
/// for lookups.
///
/// Entries with equal times keep their original stream order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommentTimeline {
    entries: Vec<CommentEntry>,
    times: Vec<f64>,
}

impl CommentTimeline {
    /// Build a timeline from entries in stream order.
    pub fn from_entries(mut entries: Vec<CommentEntry>) -> Self {
        // `sort_by` is stable, which keeps equal-time comments in stream order.
        entries.sort_by(|a, b| a.time.total_cmp(&b.time));
        let times = entries.iter().map(|entry| entry.time).collect();
        Self { entries, times }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CommentEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&CommentEntry> {
        self.entries.get(index)
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Index of the comment current at playback time `t`, if any.
    pub fn index_at(&self, t: f64) -> Option<usize> {
        last_entry_at_or_before(&self.times, t)
    }
}

/// Greatest index `i` with `times[i] <= t`, or `None` when `t` precedes every
/// entry (or `times` is empty). `times` must be sorted ascending.
pub fn last_entry_at_or_before(times: &[f64], t: f64) -> Option<usize> {
    times.partition_point(|&time| time <= t).checked_sub(1)
}

/// Format seconds as `mm:ss`. Minutes are not wrapped into hours.
pub fn format_time(secs: f64) -> String {
    let total = if secs.is_finite() { secs.max(0.0).floor() as u64 } else { 0 };
    format!("{:02}:{:02}", total / 60, total % 60)
}
