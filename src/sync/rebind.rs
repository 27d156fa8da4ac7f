//! Playback source hand-off with hysteresis
//!
//! Player re-renders can briefly surface a different video element, so a new
//! candidate must win several consecutive scans before the session switches
//! to it.

use tracing::debug;

use crate::playback::SourceId;

/// What to do after one scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebindDecision {
    /// The bound source is still the best candidate (or there is none)
    Stay,
    /// A different candidate is winning but is not yet stable
    Pending { candidate: SourceId, hits: u32 },
    /// Bind `candidate` now
    Switch(SourceId),
}

/// Counts consecutive scans won by the same non-bound candidate
#[derive(Debug, Clone)]
pub struct RebindTracker {
    threshold: u32,
    candidate: Option<SourceId>,
    hits: u32,
}

impl RebindTracker {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            candidate: None,
            hits: 0,
        }
    }

    /// Record one scan result against the currently bound source.
    pub fn observe(&mut self, bound: Option<SourceId>, best: Option<SourceId>) -> RebindDecision {
        let candidate = match best {
            Some(candidate) if Some(candidate) != bound => candidate,
            _ => {
                self.candidate = bound;
                self.hits = 0;
                return RebindDecision::Stay;
            }
        };

        if self.candidate == Some(candidate) {
            self.hits += 1;
        } else {
            self.candidate = Some(candidate);
            self.hits = 1;
        }

        if self.hits >= self.threshold {
            debug!(%candidate, hits = self.hits, "Candidate source is stable");
            self.hits = 0;
            return RebindDecision::Switch(candidate);
        }

        RebindDecision::Pending {
            candidate,
            hits: self.hits,
        }
    }
}
