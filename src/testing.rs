//! Scriptable stand-ins for the HTTP client, host page, video elements and
//! comment panel, shared by the unit tests.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::data::CommentTimeline;
use crate::net::{HttpClient, HttpRequest, HttpResponse, TransportError};
use crate::overlay::OverlayStatus;
use crate::playback::{
    MediaEvent, PlaybackSource, Rect, SharedSource, SourceId, SourceScanner, HAVE_METADATA,
};
use crate::resolver::{PageHost, PageSnapshot};
use crate::view::{Motion, TimelineView};

enum Route {
    Respond(HttpResponse),
    Delayed(Duration, HttpResponse),
    Fail,
}

/// HTTP client answering from routes keyed by URL substring. Unrouted URLs
/// get a 404. Every request is recorded.
#[derive(Default)]
pub struct FakeHttp {
    routes: Mutex<Vec<(String, Route)>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl FakeHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, pattern: &str, response: HttpResponse) {
        self.route(pattern, Route::Respond(response));
    }

    /// Answer after `delay` of (tokio) time
    pub fn respond_after(&self, pattern: &str, delay: Duration, response: HttpResponse) {
        self.route(pattern, Route::Delayed(delay, response));
    }

    /// Fail with a network error
    pub fn fail(&self, pattern: &str) {
        self.route(pattern, Route::Fail);
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn route(&self, pattern: &str, route: Route) {
        let mut routes = self.routes.lock().unwrap();
        routes.retain(|(existing, _)| existing != pattern);
        routes.push((pattern.to_string(), route));
    }
}

#[async_trait]
impl HttpClient for FakeHttp {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());

        let (delay, outcome) = {
            let routes = self.routes.lock().unwrap();
            match routes
                .iter()
                .find(|(pattern, _)| request.url.as_str().contains(pattern.as_str()))
            {
                Some((_, Route::Respond(response))) => (None, Ok(response.clone())),
                Some((_, Route::Delayed(delay, response))) => (Some(*delay), Ok(response.clone())),
                Some((_, Route::Fail)) => (
                    None,
                    Err(TransportError::Network("connection refused".to_string())),
                ),
                None => (None, Ok(HttpResponse::new(404, ""))),
            }
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        outcome
    }
}

/// Host page whose state can appear after a number of snapshots
pub struct FakePage {
    url: Url,
    state: Mutex<Option<Value>>,
    delayed: Mutex<Option<(usize, Value)>>,
}

impl FakePage {
    pub fn new(url: &str) -> Self {
        Self {
            url: Url::parse(url).unwrap(),
            state: Mutex::new(None),
            delayed: Mutex::new(None),
        }
    }

    pub fn set_state(&self, state: Value) {
        *self.state.lock().unwrap() = Some(state);
    }

    /// The first `snapshots` snapshots see no state; later ones see `state`.
    pub fn hydrate_after(&self, snapshots: usize, state: Value) {
        *self.delayed.lock().unwrap() = Some((snapshots, state));
    }
}

impl PageHost for FakePage {
    fn snapshot(&self) -> PageSnapshot {
        let mut delayed = self.delayed.lock().unwrap();
        if let Some((remaining, _)) = delayed.as_mut() {
            if *remaining > 0 {
                *remaining -= 1;
            } else if let Some((_, state)) = delayed.take() {
                *self.state.lock().unwrap() = Some(state);
            }
        }

        PageSnapshot {
            initial_state: self.state.lock().unwrap().clone(),
            scripts: Vec::new(),
        }
    }

    fn location(&self) -> Url {
        self.url.clone()
    }
}

struct SourceState {
    time: f64,
    player_time: Option<f64>,
    ready_state: u8,
    bounds: Rect,
    visible: bool,
}

/// Video element with settable clock and layout. Starts visible, 640x360,
/// with metadata loaded.
pub struct FakeSource {
    id: SourceId,
    state: Mutex<SourceState>,
    events: broadcast::Sender<MediaEvent>,
}

impl FakeSource {
    pub fn new(id: SourceId) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            id,
            state: Mutex::new(SourceState {
                time: 0.0,
                player_time: None,
                ready_state: HAVE_METADATA,
                bounds: Rect::new(640.0, 360.0),
                visible: true,
            }),
            events,
        }
    }

    pub fn set_time(&self, time: f64) {
        self.state.lock().unwrap().time = time;
    }

    pub fn set_player_time(&self, time: Option<f64>) {
        self.state.lock().unwrap().player_time = time;
    }

    pub fn set_ready_state(&self, ready_state: u8) {
        self.state.lock().unwrap().ready_state = ready_state;
    }

    pub fn set_bounds(&self, bounds: Rect) {
        self.state.lock().unwrap().bounds = bounds;
    }

    pub fn set_visible(&self, visible: bool) {
        self.state.lock().unwrap().visible = visible;
    }

    pub fn emit(&self, event: MediaEvent) {
        let _ = self.events.send(event);
    }

    /// Number of live event subscriptions
    pub fn listener_count(&self) -> usize {
        self.events.receiver_count()
    }
}

impl PlaybackSource for FakeSource {
    fn id(&self) -> SourceId {
        self.id
    }

    fn current_time(&self) -> f64 {
        self.state.lock().unwrap().time
    }

    fn ready_state(&self) -> u8 {
        self.state.lock().unwrap().ready_state
    }

    fn player_time(&self) -> Option<f64> {
        self.state.lock().unwrap().player_time
    }

    fn bounds(&self) -> Rect {
        self.state.lock().unwrap().bounds
    }

    fn is_visible(&self) -> bool {
        self.state.lock().unwrap().visible
    }

    fn subscribe(&self) -> broadcast::Receiver<MediaEvent> {
        self.events.subscribe()
    }
}

#[derive(Default)]
pub struct FakeScanner {
    candidates: Mutex<Vec<SharedSource>>,
}

impl FakeScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, candidates: Vec<SharedSource>) {
        *self.candidates.lock().unwrap() = candidates;
    }
}

impl SourceScanner for FakeScanner {
    fn candidates(&self) -> Vec<SharedSource> {
        self.candidates.lock().unwrap().clone()
    }
}

/// Recorded view mutation
#[derive(Debug, Clone, PartialEq)]
pub enum ViewOp {
    Render(usize),
    Status(String),
    Mark(usize),
    Unmark(usize),
    Scroll(f64, Motion),
}

/// Panel with fixed-height rows that records every mutation
pub struct FakeView {
    row_height: f64,
    viewport_height: f64,
    /// Rows that can be measured; unlimited when `None`
    row_count: Option<usize>,
    current: Vec<usize>,
    ops: Vec<ViewOp>,
}

impl FakeView {
    pub fn new(row_height: f64, viewport_height: f64) -> Self {
        Self {
            row_height,
            viewport_height,
            row_count: None,
            current: Vec::new(),
            ops: Vec::new(),
        }
    }

    pub fn set_row_count(&mut self, rows: usize) {
        self.row_count = Some(rows);
    }

    pub fn take_ops(&mut self) -> Vec<ViewOp> {
        std::mem::take(&mut self.ops)
    }

    /// Rows currently marked, in ascending order
    pub fn current_rows(&self) -> Vec<usize> {
        let mut rows = self.current.clone();
        rows.sort_unstable();
        rows
    }
}

impl TimelineView for FakeView {
    fn render(&mut self, timeline: &CommentTimeline) {
        self.row_count = Some(timeline.len());
        self.current.clear();
        self.ops.push(ViewOp::Render(timeline.len()));
    }

    fn show_status(&mut self, status: &OverlayStatus) {
        self.current.clear();
        self.ops.push(ViewOp::Status(status.to_string()));
    }

    fn set_current(&mut self, index: usize, current: bool) {
        if current {
            if !self.current.contains(&index) {
                self.current.push(index);
            }
            self.ops.push(ViewOp::Mark(index));
        } else {
            self.current.retain(|&row| row != index);
            self.ops.push(ViewOp::Unmark(index));
        }
    }

    fn offset_top(&self, index: usize) -> Option<f64> {
        match self.row_count {
            Some(rows) if index >= rows => None,
            _ => Some(index as f64 * self.row_height),
        }
    }

    fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    fn scroll_to(&mut self, top: f64, motion: Motion) {
        self.ops.push(ViewOp::Scroll(top, motion));
    }
}
