//! Playback clock reading

use super::PlaybackSource;

/// Current playback time of `source` in seconds, never negative.
///
/// Some players initialize the element's own clock lazily but expose their
/// API clock earlier, so a zero or unusable element time defers to the API.
pub fn current_time(source: &dyn PlaybackSource) -> f64 {
    let own = source.current_time();
    if own.is_finite() && own > 0.0 {
        return own;
    }

    if let Some(api) = source.player_time().filter(|t| t.is_finite() && *t >= 0.0) {
        return api;
    }

    if own.is_finite() {
        own.max(0.0)
    } else {
        0.0
    }
}
