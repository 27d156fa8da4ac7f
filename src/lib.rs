//! dm-side
//!
//! Side-panel comment timeline for bilibili videos: resolves a video's comment
//! channel, loads its comment stream and keeps the list highlighted and
//! scrolled in step with playback.

pub mod config;
pub mod data;
pub mod headless;
pub mod loader;
pub mod logging;
pub mod net;
pub mod overlay;
pub mod playback;
pub mod resolver;
pub mod sync;
pub mod view;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use overlay::{Overlay, OverlayStatus};
