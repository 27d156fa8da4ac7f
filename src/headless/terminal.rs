//! Line-oriented panel for terminals

use std::io::Write;

use tracing::{debug, warn};

use crate::data::{format_time, CommentTimeline};
use crate::overlay::OverlayStatus;
use crate::view::{Motion, TimelineView};

/// Prints each newly current comment as one line. Every row is one unit high,
/// so offsets and the viewport are measured in rows.
pub struct TerminalView {
    out: Box<dyn Write + Send>,
    rows: Vec<String>,
    viewport_rows: usize,
    scroll_top: f64,
}

impl TerminalView {
    pub fn new(out: Box<dyn Write + Send>, viewport_rows: usize) -> Self {
        Self {
            out,
            rows: Vec::new(),
            viewport_rows: viewport_rows.max(1),
            scroll_top: 0.0,
        }
    }

    pub fn stdout(viewport_rows: usize) -> Self {
        Self::new(Box::new(std::io::stdout()), viewport_rows)
    }

    /// First row in view
    #[cfg(test)]
    fn scroll_top(&self) -> f64 {
        self.scroll_top
    }

    fn line(&mut self, line: &str) {
        if let Err(e) = writeln!(self.out, "{}", line).and_then(|_| self.out.flush()) {
            warn!("Failed to write to terminal: {}", e);
        }
    }
}

impl TimelineView for TerminalView {
    fn render(&mut self, timeline: &CommentTimeline) {
        self.rows = timeline
            .entries()
            .iter()
            .map(|entry| format!("{}  {}", format_time(entry.time), entry.text))
            .collect();
        self.scroll_top = 0.0;
        let summary = OverlayStatus::Ready {
            comments: self.rows.len(),
        };
        self.line(&format!("-- {} --", summary));
    }

    fn show_status(&mut self, status: &OverlayStatus) {
        self.rows.clear();
        self.line(&format!("-- {} --", status));
    }

    fn set_current(&mut self, index: usize, current: bool) {
        if !current {
            return;
        }
        if let Some(row) = self.rows.get(index).cloned() {
            self.line(&format!("> {}", row));
        }
    }

    fn offset_top(&self, index: usize) -> Option<f64> {
        (index < self.rows.len()).then_some(index as f64)
    }

    fn viewport_height(&self) -> f64 {
        self.viewport_rows as f64
    }

    fn scroll_to(&mut self, top: f64, motion: Motion) {
        debug!(top, ?motion, "Scroll");
        self.scroll_top = top;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::CommentEntry;
    use std::sync::{Arc, Mutex};

    /// Writer whose output stays readable after the view takes it
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn timeline() -> CommentTimeline {
        CommentTimeline::from_entries(vec![
            CommentEntry::new(65.9, "later"),
            CommentEntry::new(3.0, "first"),
        ])
    }

    #[test]
    fn test_prints_current_rows() {
        let out = Captured::default();
        let mut view = TerminalView::new(Box::new(out.clone()), 10);

        view.render(&timeline());
        view.set_current(0, true);
        view.set_current(0, false);
        view.set_current(1, true);
        view.set_current(7, true);

        assert_eq!(
            out.text(),
            "-- 2 comments --\n> 00:03  first\n> 01:05  later\n"
        );
    }

    #[test]
    fn test_measures_in_rows() {
        let mut view = TerminalView::new(Box::new(Captured::default()), 8);
        view.render(&timeline());

        assert_eq!(view.offset_top(1), Some(1.0));
        assert_eq!(view.offset_top(2), None);
        assert_eq!(view.viewport_height(), 8.0);

        view.scroll_to(1.0, Motion::Immediate);
        assert_eq!(view.scroll_top(), 1.0);
    }

    #[test]
    fn test_status_clears_rows() {
        let out = Captured::default();
        let mut view = TerminalView::new(Box::new(out.clone()), 8);
        view.render(&timeline());
        view.show_status(&OverlayStatus::EmptyTimeline);

        assert_eq!(view.offset_top(0), None);
        assert!(out.text().ends_with("-- No comments --\n"));
    }
}
