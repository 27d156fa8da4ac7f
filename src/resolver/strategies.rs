//! Zero-latency channel id strategies over an in-page snapshot
//!
//! Each strategy is a pure function of the snapshot; [`first_match`] tries them
//! in order and stops at the first hit.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

use super::PageSnapshot;
use crate::data::ChannelId;

pub type Strategy = fn(&PageSnapshot) -> Option<ChannelId>;

/// In-page strategies, most specific first
pub const IN_PAGE_STRATEGIES: &[(&str, Strategy)] = &[
    ("videoData", from_video_data),
    ("epInfo", from_ep_info),
    ("episodeInfo", from_episode_info),
    ("epList", from_episode_list_head),
    ("script", from_scripts),
];

/// Run the in-page strategies in order, returning the first hit and the name
/// of the strategy that produced it.
pub fn first_match(snapshot: &PageSnapshot) -> Option<(&'static str, ChannelId)> {
    IN_PAGE_STRATEGIES
        .iter()
        .find_map(|(name, strategy)| strategy(snapshot).map(|id| (*name, id)))
}

pub fn from_video_data(snapshot: &PageSnapshot) -> Option<ChannelId> {
    state_field(snapshot, "/videoData/cid")
}

pub fn from_ep_info(snapshot: &PageSnapshot) -> Option<ChannelId> {
    state_field(snapshot, "/epInfo/cid")
}

pub fn from_episode_info(snapshot: &PageSnapshot) -> Option<ChannelId> {
    state_field(snapshot, "/episodeInfo/cid")
}

pub fn from_episode_list_head(snapshot: &PageSnapshot) -> Option<ChannelId> {
    state_field(snapshot, "/epList/0/cid")
}

/// Search embedded script text for a serialized `"cid": <number>`.
pub fn from_scripts(snapshot: &PageSnapshot) -> Option<ChannelId> {
    snapshot.scripts.iter().find_map(|text| {
        cid_pattern()
            .captures(text)
            .map(|captures| ChannelId::new(&captures[1]))
    })
}

fn state_field(snapshot: &PageSnapshot, pointer: &str) -> Option<ChannelId> {
    snapshot
        .initial_state
        .as_ref()?
        .pointer(pointer)
        .and_then(id_from_value)
}

/// Interpret a JSON id. Zero, empty strings and non-scalars count as absent.
pub(crate) fn id_from_value(value: &Value) -> Option<ChannelId> {
    match value {
        Value::Number(number) => match number.as_u64() {
            Some(0) => None,
            Some(id) => Some(ChannelId::new(id.to_string())),
            None => number
                .as_f64()
                .filter(|id| id.is_finite() && *id != 0.0)
                .map(|id| ChannelId::new(id.to_string())),
        },
        Value::String(id) if !id.is_empty() => Some(ChannelId::new(id.clone())),
        _ => None,
    }
}

fn cid_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#""cid"\s*:\s*(\d+)"#).expect("valid cid pattern"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn with_state(state: Value) -> PageSnapshot {
        PageSnapshot {
            initial_state: Some(state),
            scripts: Vec::new(),
        }
    }

    #[test]
    fn test_each_state_shape() {
        assert_eq!(
            from_video_data(&with_state(json!({"videoData": {"cid": 101}}))),
            Some(ChannelId::new("101"))
        );
        assert_eq!(
            from_ep_info(&with_state(json!({"epInfo": {"cid": "202"}}))),
            Some(ChannelId::new("202"))
        );
        assert_eq!(
            from_episode_info(&with_state(json!({"episodeInfo": {"cid": 303}}))),
            Some(ChannelId::new("303"))
        );
        assert_eq!(
            from_episode_list_head(&with_state(json!({"epList": [{"cid": 404}, {"cid": 405}]}))),
            Some(ChannelId::new("404"))
        );
        assert_eq!(from_episode_list_head(&with_state(json!({"epList": []}))), None);
    }

    #[test]
    fn test_falsy_ids_are_absent() {
        assert_eq!(from_video_data(&with_state(json!({"videoData": {"cid": 0}}))), None);
        assert_eq!(from_video_data(&with_state(json!({"videoData": {"cid": ""}}))), None);
        assert_eq!(from_video_data(&with_state(json!({"videoData": {"cid": null}}))), None);
        assert_eq!(from_video_data(&with_state(json!({"videoData": {}}))), None);
        assert_eq!(from_video_data(&PageSnapshot::default()), None);
    }

    #[test]
    fn test_first_match_order() {
        let snapshot = PageSnapshot {
            initial_state: Some(json!({
                "epInfo": {"cid": 2},
                "epList": [{"cid": 3}],
            })),
            scripts: vec![r#"{"cid": 4}"#.to_string()],
        };
        assert_eq!(first_match(&snapshot), Some(("epInfo", ChannelId::new("2"))));

        let snapshot = PageSnapshot {
            initial_state: Some(json!({"unrelated": true})),
            scripts: vec![
                "var nothing = 1;".to_string(),
                r#"window.__playinfo__={"aid":9,"cid" :  5551}"#.to_string(),
            ],
        };
        assert_eq!(first_match(&snapshot), Some(("script", ChannelId::new("5551"))));
    }

    #[test]
    fn test_script_scan_needs_number() {
        let snapshot = PageSnapshot {
            initial_state: None,
            scripts: vec![r#"{"cid": "abc"}"#.to_string()],
        };
        assert_eq!(from_scripts(&snapshot), None);
        assert_eq!(first_match(&snapshot), None);
    }
}
