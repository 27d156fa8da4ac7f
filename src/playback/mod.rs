//! Playback sources (video elements) and their clocks

mod candidates;
mod tracker;

pub use candidates::best_candidate;
pub use tracker::current_time;

use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Ready state at which a source's duration and dimensions are known
pub const HAVE_METADATA: u8 = 1;

/// Stable identity of one live playback source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(pub u64);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source#{}", self.0)
    }
}

/// Lifecycle events a source emits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaEvent {
    /// Playback time advanced
    TimeUpdate,
    /// A seek started
    Seeking,
    /// A seek completed
    Seeked,
    /// Metadata became available
    LoadedMetadata,
    /// Playback started or resumed
    Play,
}

/// Rendered size of a source
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// A live video element. Not owned by the engine.
pub trait PlaybackSource: Send + Sync {
    fn id(&self) -> SourceId;

    /// The element's own reported time in seconds. May be NaN or 0 while the
    /// player is still initializing.
    fn current_time(&self) -> f64;

    fn ready_state(&self) -> u8;

    /// Time reported by the player's own API, when it exposes one
    fn player_time(&self) -> Option<f64> {
        None
    }

    fn bounds(&self) -> Rect;

    /// Whether the element is displayed (not `display: none` or hidden)
    fn is_visible(&self) -> bool;

    /// Subscribe to lifecycle events. Dropping the receiver detaches it.
    fn subscribe(&self) -> broadcast::Receiver<MediaEvent>;
}

pub type SharedSource = Arc<dyn PlaybackSource>;

/// Enumerates the page's playback sources
pub trait SourceScanner: Send + Sync {
    /// All candidate sources, in document order
    fn candidates(&self) -> Vec<SharedSource>;
}
