//! Timeline synchronization state machine
//!
//! Maps the bound source's playback time to the current comment and drives
//! the view's highlight and scroll. Two update strategies share one lookup:
//!
//! - continuous updates (periodic tick, `timeupdate`, `seeking`) are skipped
//!   while the time moves less than the dead-band, and touch the view only
//!   when the current index changes
//! - jump updates (seek completed, metadata, play, initial alignment) always
//!   re-apply the highlight and scroll without smoothing
//!
//! Every transition clears the previous row before marking the next one.

use std::sync::Arc;

use crate::config::SyncConfig;
use crate::data::CommentTimeline;
use crate::playback::SourceId;
use crate::view::{Motion, TimelineView};

/// Mutable synchronization state; reset whenever a source is bound
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncState {
    /// Source the state was computed against
    pub bound: Option<SourceId>,
    /// Current comment; `None` before the first comment
    pub last_index: Option<usize>,
    /// Last observed playback time; `None` until the first observation
    pub last_time: Option<f64>,
}

/// Result of one update
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UpdateOutcome {
    /// Time moved less than the dead-band
    Suppressed,
    /// Time moved but the current comment did not change
    Unchanged,
    /// The highlight was (re)applied
    Applied {
        from: Option<usize>,
        to: Option<usize>,
    },
}

/// Tuning for [`TimelineSync`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncSettings {
    pub dead_band: f64,
    pub anchor_ratio: f64,
}

impl From<&SyncConfig> for SyncSettings {
    fn from(config: &SyncConfig) -> Self {
        Self {
            dead_band: config.dead_band_secs,
            anchor_ratio: config.scroll_anchor_ratio,
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self::from(&SyncConfig::default())
    }
}

pub struct TimelineSync {
    timeline: Arc<CommentTimeline>,
    settings: SyncSettings,
    state: SyncState,
}

impl TimelineSync {
    pub fn new(timeline: Arc<CommentTimeline>, settings: SyncSettings) -> Self {
        Self {
            timeline,
            settings,
            state: SyncState::default(),
        }
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    pub fn timeline(&self) -> &CommentTimeline {
        &self.timeline
    }

    pub fn is_bound_to(&self, id: SourceId) -> bool {
        self.state.bound == Some(id)
    }

    /// Start tracking a new source. Clears the old highlight and resets the
    /// state, so nothing computed against the previous source carries over.
    pub fn bind<V: TimelineView + ?Sized>(&mut self, id: SourceId, view: &mut V) {
        if let Some(previous) = self.state.last_index {
            view.set_current(previous, false);
        }
        self.state = SyncState {
            bound: Some(id),
            ..SyncState::default()
        };
    }

    /// Continuous update at playback time `t`
    pub fn on_tick<V: TimelineView + ?Sized>(&mut self, t: f64, view: &mut V) -> UpdateOutcome {
        if let Some(last) = self.state.last_time {
            if (t - last).abs() < self.settings.dead_band {
                return UpdateOutcome::Suppressed;
            }
        }
        self.state.last_time = Some(t);

        let index = self.timeline.index_at(t);
        if index == self.state.last_index {
            return UpdateOutcome::Unchanged;
        }

        self.apply(index, Motion::Smooth, view)
    }

    /// Jump update at playback time `t`; always re-applies
    pub fn on_jump<V: TimelineView + ?Sized>(
        &mut self,
        t: f64,
        motion: Motion,
        view: &mut V,
    ) -> UpdateOutcome {
        let index = self.timeline.index_at(t);
        self.state.last_time = Some(t);
        self.apply(index, motion, view)
    }

    fn apply<V: TimelineView + ?Sized>(
        &mut self,
        index: Option<usize>,
        motion: Motion,
        view: &mut V,
    ) -> UpdateOutcome {
        let from = self.state.last_index;
        if let Some(previous) = from {
            view.set_current(previous, false);
        }

        if let Some(current) = index {
            view.set_current(current, true);
            if let Some(offset) = view.offset_top(current) {
                let top = offset - view.viewport_height() * self.settings.anchor_ratio;
                view.scroll_to(top.max(0.0), motion);
            }
        }

        self.state.last_index = index;
        UpdateOutcome::Applied { from, to: index }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::CommentEntry;
    use crate::testing::{FakeView, ViewOp};

    fn sync() -> TimelineSync {
        let timeline = CommentTimeline::from_entries(vec![
            CommentEntry::new(1.0, "a"),
            CommentEntry::new(2.0, "b"),
            CommentEntry::new(2.0, "c"),
            CommentEntry::new(10.0, "d"),
        ]);
        TimelineSync::new(Arc::new(timeline), SyncSettings::default())
    }

    #[test]
    fn test_tick_moves_highlight_and_scrolls_smoothly() {
        let mut sync = sync();
        let mut view = FakeView::new(20.0, 100.0);
        sync.bind(SourceId(1), &mut view);

        assert_eq!(
            sync.on_tick(1.5, &mut view),
            UpdateOutcome::Applied { from: None, to: Some(0) }
        );
        assert_eq!(
            sync.on_tick(2.5, &mut view),
            UpdateOutcome::Applied { from: Some(0), to: Some(2) }
        );

        // Row 2 sits at 40; anchoring 30% of a 100 high viewport gives 10.
        assert_eq!(
            view.take_ops(),
            [
                ViewOp::Mark(0),
                ViewOp::Scroll(0.0, Motion::Smooth),
                ViewOp::Unmark(0),
                ViewOp::Mark(2),
                ViewOp::Scroll(10.0, Motion::Smooth),
            ]
        );
        assert_eq!(view.current_rows(), [2]);
    }

    #[test]
    fn test_tick_dead_band_and_unchanged_index() {
        let mut sync = sync();
        let mut view = FakeView::new(20.0, 100.0);
        sync.bind(SourceId(1), &mut view);

        sync.on_tick(1.0, &mut view);
        view.take_ops();

        assert_eq!(sync.on_tick(1.04, &mut view), UpdateOutcome::Suppressed);
        assert_eq!(sync.state().last_time, Some(1.0));
        assert_eq!(sync.on_tick(1.5, &mut view), UpdateOutcome::Unchanged);
        assert_eq!(sync.state().last_time, Some(1.5));
        assert!(view.take_ops().is_empty());
    }

    #[test]
    fn test_first_tick_at_zero_is_observed() {
        let mut sync = sync();
        let mut view = FakeView::new(20.0, 100.0);
        sync.bind(SourceId(1), &mut view);

        // Before the first comment: nothing to mark, but the time is recorded.
        assert_eq!(sync.on_tick(0.0, &mut view), UpdateOutcome::Unchanged);
        assert_eq!(sync.state().last_time, Some(0.0));
        assert_eq!(sync.state().last_index, None);
    }

    #[test]
    fn test_tick_back_before_first_comment_clears() {
        let mut sync = sync();
        let mut view = FakeView::new(20.0, 100.0);
        sync.bind(SourceId(1), &mut view);

        sync.on_tick(5.0, &mut view);
        view.take_ops();
        assert_eq!(
            sync.on_tick(0.2, &mut view),
            UpdateOutcome::Applied { from: Some(2), to: None }
        );
        assert_eq!(view.take_ops(), [ViewOp::Unmark(2)]);
        assert!(view.current_rows().is_empty());
    }

    #[test]
    fn test_jump_always_reapplies() {
        let mut sync = sync();
        let mut view = FakeView::new(20.0, 100.0);
        sync.bind(SourceId(1), &mut view);

        sync.on_jump(10.0, Motion::Immediate, &mut view);
        let first = view.take_ops();
        assert_eq!(
            first,
            [ViewOp::Mark(3), ViewOp::Scroll(30.0, Motion::Immediate)]
        );

        // Same time again: the jump re-applies, the tick does not.
        assert_eq!(
            sync.on_jump(10.0, Motion::Immediate, &mut view),
            UpdateOutcome::Applied { from: Some(3), to: Some(3) }
        );
        assert_eq!(
            view.take_ops(),
            [
                ViewOp::Unmark(3),
                ViewOp::Mark(3),
                ViewOp::Scroll(30.0, Motion::Immediate),
            ]
        );
        assert_eq!(sync.on_tick(10.0, &mut view), UpdateOutcome::Suppressed);
        assert!(view.take_ops().is_empty());
        assert_eq!(view.current_rows(), [3]);
    }

    #[test]
    fn test_bind_resets_state_and_clears_highlight() {
        let mut sync = sync();
        let mut view = FakeView::new(20.0, 100.0);
        sync.bind(SourceId(1), &mut view);
        sync.on_tick(2.0, &mut view);
        view.take_ops();

        sync.bind(SourceId(2), &mut view);
        assert_eq!(view.take_ops(), [ViewOp::Unmark(2)]);
        assert!(sync.is_bound_to(SourceId(2)));
        assert!(!sync.is_bound_to(SourceId(1)));
        assert_eq!(
            sync.state(),
            &SyncState {
                bound: Some(SourceId(2)),
                last_index: None,
                last_time: None,
            }
        );
    }

    #[test]
    fn test_scroll_skipped_for_unmeasured_row() {
        let mut sync = sync();
        let mut view = FakeView::new(20.0, 100.0);
        view.set_row_count(1);
        sync.bind(SourceId(1), &mut view);

        sync.on_jump(10.0, Motion::Immediate, &mut view);
        assert_eq!(view.take_ops(), [ViewOp::Mark(3)]);
    }
}
