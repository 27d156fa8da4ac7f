//! Presentation layer seam
//!
//! The panel itself (markup, styling, mounting) lives outside this crate. The
//! engine only needs to render a timeline, mark rows current, measure rows and
//! scroll the list.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::data::CommentTimeline;
use crate::overlay::OverlayStatus;

/// How a scroll should move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Smooth,
    Immediate,
}

/// The rendered comment list
pub trait TimelineView: Send {
    /// Replace the list with one row per timeline entry, in timeline order
    fn render(&mut self, timeline: &CommentTimeline);

    /// Replace the list with a status line
    fn show_status(&mut self, status: &OverlayStatus);

    /// Add or remove the "current" mark on row `index`
    fn set_current(&mut self, index: usize, current: bool);

    /// Distance from the top of the list to row `index`
    fn offset_top(&self, index: usize) -> Option<f64>;

    /// Visible height of the list
    fn viewport_height(&self) -> f64;

    fn scroll_to(&mut self, top: f64, motion: Motion);
}

pub type SharedView = Arc<Mutex<dyn TimelineView>>;

/// Lock a shared view. A panic while holding the lock cannot leave the view
/// in a state worse than a missed highlight, so poisoning is ignored.
pub fn lock_view(view: &SharedView) -> MutexGuard<'_, dyn TimelineView + 'static> {
    view.lock().unwrap_or_else(PoisonError::into_inner)
}
