//! Best playback source selection

use super::SharedSource;

/// The visible source with the largest rendered area, or the first source
/// when none is visible with a nonzero area. Earlier sources win ties.
pub fn best_candidate(candidates: &[SharedSource]) -> Option<SharedSource> {
    let mut best: Option<&SharedSource> = None;
    let mut best_area = 0.0;

    for source in candidates {
        if !source.is_visible() {
            continue;
        }
        let area = source.bounds().area();
        if area > best_area {
            best_area = area;
            best = Some(source);
        }
    }

    best.or_else(|| candidates.first()).cloned()
}
