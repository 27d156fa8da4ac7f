//! Playback synchronization
//!
//! [`TimelineSync`] is the pure state machine, [`RebindTracker`] decides when
//! to hand off to a different video element, and [`SessionHandle`] runs both
//! on a single task that owns every timer and event subscription.

mod engine;
mod rebind;
mod session;

pub use engine::{SyncSettings, SyncState, TimelineSync, UpdateOutcome};
pub use rebind::{RebindDecision, RebindTracker};
pub use session::{SessionClosed, SessionHandle, SessionSettings};

use tokio::sync::oneshot;

use crate::playback::SharedSource;

/// Commands that can be sent to a running session
pub enum SessionCommand {
    /// Bind a specific source now, bypassing the rebind hysteresis
    Bind(SharedSource),
    /// Enable or suppress continuous updates
    SetEnabled(bool),
    /// Report the current synchronization state
    State(oneshot::Sender<SyncState>),
    /// Release every timer and listener and stop
    Shutdown,
}
