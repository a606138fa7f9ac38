// THEORY:
// The `history` module keeps a short, serializable log of past comparisons. It is the
// memory of the system: the diff engine itself forgets everything once it returns a
// result, so anything a host wants to look back at has to be snapshotted here.
//
// Key architectural principles:
// 1.  **Bounded**: At most `capacity` entries (10 by default), most recent first.
//     Pushing past the cap evicts the oldest entry.
// 2.  **Self-Contained Snapshots**: Each entry stores its images as base64-encoded
//     PNG, so a history survives a round trip through JSON with no side files.
// 3.  **Opaque Annotations**: User-drawn annotations come from some interactive tool
//     the engine knows nothing about. They are stored as raw JSON values and handed
//     back untouched.

use crate::core_modules::frame::RgbFrame;
use crate::core_modules::severity::Verdict;
use crate::core_modules::utils::image_helper;
use crate::error::Result;
use crate::pipeline::ComparisonResult;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub const DEFAULT_HISTORY_CAPACITY: usize = 10;
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One serialized comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: String,
    pub diff_percent: f64,
    pub verdict: Verdict,
    pub tolerance: u8,
    /// Base64 PNG.
    pub baseline: String,
    /// Base64 PNG.
    pub candidate: String,
    /// Base64 PNG.
    pub highlighted: String,
    #[serde(default)]
    pub annotations: Vec<serde_json::Value>,
}

impl HistoryEntry {
    /// Snapshots a finished comparison, stamped with the current local time.
    pub fn from_result(
        baseline: &RgbFrame,
        candidate: &RgbFrame,
        result: &ComparisonResult,
        annotations: Vec<serde_json::Value>,
    ) -> Result<Self> {
        Ok(Self {
            timestamp: chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(),
            diff_percent: result.diff_percent(),
            verdict: result.verdict(),
            tolerance: result.tolerance(),
            baseline: image_helper::to_base64_png(baseline)?,
            candidate: image_helper::to_base64_png(candidate)?,
            highlighted: image_helper::to_base64_png(result.highlighted())?,
            annotations,
        })
    }

    pub fn decode_baseline(&self) -> Result<RgbFrame> {
        image_helper::from_base64_png(&self.baseline)
    }

    pub fn decode_candidate(&self) -> Result<RgbFrame> {
        image_helper::from_base64_png(&self.candidate)
    }

    pub fn decode_highlighted(&self) -> Result<RgbFrame> {
        image_helper::from_base64_png(&self.highlighted)
    }
}

/// A capped, most-recent-first list of `HistoryEntry`s.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonHistory {
    capacity: usize,
    entries: VecDeque<HistoryEntry>,
}

impl Default for ComparisonHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl ComparisonHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Inserts at the front and evicts the oldest entries past the cap.
    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
    }

    /// Most recent first.
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Serializes the entries, most recent first, as a JSON array.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.entries)?)
    }

    /// Loads a JSON array written by `to_json`, keeping at most `capacity` of the
    /// leading (most recent) entries.
    pub fn from_json(json: &str, capacity: usize) -> Result<Self> {
        let mut entries: VecDeque<HistoryEntry> = serde_json::from_str(json)?;
        entries.truncate(capacity);
        Ok(Self { capacity, entries })
    }
}
