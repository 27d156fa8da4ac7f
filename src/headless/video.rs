//! Simulated video element driven by the tokio clock

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::playback::{MediaEvent, PlaybackSource, Rect, SharedSource, SourceId, SourceScanner};

/// Ready state reported once playback can proceed
const HAVE_ENOUGH_DATA: u8 = 4;

struct Clock {
    /// Position at `anchor`
    position: f64,
    /// When `position` was taken; `None` while paused
    anchor: Option<Instant>,
    rate: f64,
}

impl Clock {
    fn now(&self) -> f64 {
        match self.anchor {
            Some(anchor) => self.position + anchor.elapsed().as_secs_f64() * self.rate,
            None => self.position,
        }
    }
}

/// A video that advances with (tokio) wall time while playing
pub struct SimulatedVideo {
    id: SourceId,
    bounds: Rect,
    clock: Mutex<Clock>,
    events: broadcast::Sender<MediaEvent>,
}

impl SimulatedVideo {
    /// A paused video positioned at `start` seconds
    pub fn new(id: SourceId, start: f64) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            id,
            bounds: Rect::new(1280.0, 720.0),
            clock: Mutex::new(Clock {
                position: start.max(0.0),
                anchor: None,
                rate: 1.0,
            }),
            events,
        }
    }

    pub fn with_rate(self, rate: f64) -> Self {
        self.lock().rate = rate;
        self
    }

    pub fn is_playing(&self) -> bool {
        self.lock().anchor.is_some()
    }

    pub fn play(&self) {
        {
            let mut clock = self.lock();
            if clock.anchor.is_some() {
                return;
            }
            clock.anchor = Some(Instant::now());
        }
        self.emit(MediaEvent::Play);
    }

    pub fn pause(&self) {
        let mut clock = self.lock();
        clock.position = clock.now();
        clock.anchor = None;
    }

    /// Jump to `position`, emitting the seek start and completion events.
    pub fn seek(&self, position: f64) {
        self.emit(MediaEvent::Seeking);
        {
            let mut clock = self.lock();
            clock.position = position.max(0.0);
            if clock.anchor.is_some() {
                clock.anchor = Some(Instant::now());
            }
        }
        self.emit(MediaEvent::Seeked);
    }

    fn emit(&self, event: MediaEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn lock(&self) -> MutexGuard<'_, Clock> {
        self.clock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PlaybackSource for SimulatedVideo {
    fn id(&self) -> SourceId {
        self.id
    }

    fn current_time(&self) -> f64 {
        self.lock().now()
    }

    fn ready_state(&self) -> u8 {
        HAVE_ENOUGH_DATA
    }

    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn is_visible(&self) -> bool {
        true
    }

    fn subscribe(&self) -> broadcast::Receiver<MediaEvent> {
        self.events.subscribe()
    }
}

/// Scanner over a fixed set of sources
pub struct StaticScanner {
    sources: Vec<SharedSource>,
}

impl StaticScanner {
    pub fn new(sources: Vec<SharedSource>) -> Self {
        Self { sources }
    }
}

impl SourceScanner for StaticScanner {
    fn candidates(&self) -> Vec<SharedSource> {
        self.sources.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_clock_advances_only_while_playing() {
        let video = SimulatedVideo::new(SourceId(1), 10.0);
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(video.current_time(), 10.0);

        video.play();
        tokio::time::advance(Duration::from_millis(2500)).await;
        assert_eq!(video.current_time(), 12.5);

        video.pause();
        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(video.current_time(), 12.5);
        assert!(!video.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_seek_emits_events_and_keeps_playing() {
        let video = SimulatedVideo::new(SourceId(1), 0.0).with_rate(2.0);
        let mut events = video.subscribe();

        video.play();
        video.seek(30.0);
        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(video.current_time(), 32.0);

        assert_eq!(events.recv().await.unwrap(), MediaEvent::Play);
        assert_eq!(events.recv().await.unwrap(), MediaEvent::Seeking);
        assert_eq!(events.recv().await.unwrap(), MediaEvent::Seeked);
    }

    #[test]
    fn test_static_scanner_keeps_order() {
        let a: SharedSource = std::sync::Arc::new(SimulatedVideo::new(SourceId(1), 0.0));
        let b: SharedSource = std::sync::Arc::new(SimulatedVideo::new(SourceId(2), 0.0));
        let scanner = StaticScanner::new(vec![a, b]);
        let ids: Vec<SourceId> = scanner.candidates().iter().map(|s| s.id()).collect();
        assert_eq!(ids, [SourceId(1), SourceId(2)]);
    }
}
