//! Sync session task
//!
//! One session exists per loaded timeline. It owns the periodic tick, the
//! one-shot initial alignment, the rebind scan and the event subscription of
//! the bound source, and releases all of them when it stops.

use std::future::pending;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior, Sleep};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{StreamExt, StreamMap};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::engine::{SyncSettings, SyncState, TimelineSync};
use super::rebind::{RebindDecision, RebindTracker};
use super::SessionCommand;
use crate::config::Config;
use crate::data::CommentTimeline;
use crate::playback::{
    best_candidate, current_time, MediaEvent, SharedSource, SourceId, SourceScanner, HAVE_METADATA,
};
use crate::view::{lock_view, Motion, SharedView};

/// Timing and behaviour of a session
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub tick_interval: Duration,
    pub align_delay: Duration,
    pub scan_interval: Duration,
    pub stability_threshold: u32,
    pub enabled: bool,
    pub sync: SyncSettings,
}

impl From<&Config> for SessionSettings {
    fn from(config: &Config) -> Self {
        Self {
            tick_interval: config.sync.tick_interval(),
            align_delay: config.sync.initial_align_delay(),
            scan_interval: config.rebind.scan_interval(),
            stability_threshold: config.rebind.stability_threshold,
            enabled: config.display.enabled,
            sync: SyncSettings::from(&config.sync),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("sync session has shut down")]
pub struct SessionClosed;

/// Owner's handle on a running session
///
/// Dropping the handle aborts the session; [`SessionHandle::teardown`] stops
/// it and waits until every resource is released.
pub struct SessionHandle {
    id: Uuid,
    cmd_tx: mpsc::Sender<SessionCommand>,
    task: Option<JoinHandle<()>>,
}

impl SessionHandle {
    /// Start a session bound to `source`. Must be called within a tokio
    /// runtime.
    pub fn spawn(
        settings: SessionSettings,
        timeline: Arc<CommentTimeline>,
        view: SharedView,
        scanner: Arc<dyn SourceScanner>,
        source: SharedSource,
    ) -> Self {
        let id = Uuid::new_v4();
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let session = SyncSession::new(settings, timeline, view, scanner);

        let span = info_span!("session", id = %id);
        let task = tokio::spawn(session.run(cmd_rx, source).instrument(span));

        Self {
            id,
            cmd_tx,
            task: Some(task),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Bind `source` immediately, replacing the current one
    pub async fn bind(&self, source: SharedSource) -> Result<(), SessionClosed> {
        self.send(SessionCommand::Bind(source)).await
    }

    pub async fn set_enabled(&self, enabled: bool) -> Result<(), SessionClosed> {
        self.send(SessionCommand::SetEnabled(enabled)).await
    }

    pub async fn state(&self) -> Result<SyncState, SessionClosed> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(SessionCommand::State(reply_tx)).await?;
        reply_rx.await.map_err(|_| SessionClosed)
    }

    /// Stop the session and wait until its timers and listeners are gone.
    pub async fn teardown(mut self) {
        let _ = self.cmd_tx.send(SessionCommand::Shutdown).await;
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!("Sync session {} ended abnormally: {}", self.id, e);
                }
            }
        }
    }

    async fn send(&self, command: SessionCommand) -> Result<(), SessionClosed> {
        self.cmd_tx.send(command).await.map_err(|_| SessionClosed)
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Periodic tick armed for one source
struct ScopedTick {
    source: SourceId,
    interval: Interval,
}

/// One-shot alignment armed for one source
struct ScopedAlign {
    source: SourceId,
    sleep: Pin<Box<Sleep>>,
}

struct SyncSession {
    settings: SessionSettings,
    sync: TimelineSync,
    view: SharedView,
    scanner: Arc<dyn SourceScanner>,
    bound: Option<SharedSource>,
    /// Event subscriptions by source; removing an entry detaches it
    listeners: StreamMap<SourceId, BroadcastStream<MediaEvent>>,
    rebind: RebindTracker,
    enabled: bool,
}

impl SyncSession {
    fn new(
        settings: SessionSettings,
        timeline: Arc<CommentTimeline>,
        view: SharedView,
        scanner: Arc<dyn SourceScanner>,
    ) -> Self {
        Self {
            sync: TimelineSync::new(timeline, settings.sync),
            rebind: RebindTracker::new(settings.stability_threshold),
            enabled: settings.enabled,
            settings,
            view,
            scanner,
            bound: None,
            listeners: StreamMap::new(),
        }
    }

    async fn run(mut self, mut cmd_rx: mpsc::Receiver<SessionCommand>, initial: SharedSource) {
        info!(comments = self.sync.timeline().len(), "Sync session starting");

        // interval_at delays the first scan (interval() ticks immediately)
        let scan_period = self.settings.scan_interval;
        let mut scan = interval_at(Instant::now() + scan_period, scan_period);
        scan.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let bound = self.bind(initial);
        let (mut tick, mut align) = self.arm(bound);

        loop {
            tokio::select! {
                command = cmd_rx.recv() => {
                    match command {
                        Some(SessionCommand::Bind(source)) => {
                            let bound = self.bind(source);
                            (tick, align) = self.arm(bound);
                        }
                        Some(SessionCommand::SetEnabled(enabled)) => {
                            info!("Continuous updates {}", if enabled { "enabled" } else { "disabled" });
                            self.enabled = enabled;
                        }
                        Some(SessionCommand::State(reply)) => {
                            let _ = reply.send(self.sync.state().clone());
                        }
                        Some(SessionCommand::Shutdown) | None => break,
                    }
                }

                Some((source, event)) = self.listeners.next() => {
                    match event {
                        Ok(event) => self.on_media_event(source, event),
                        Err(BroadcastStreamRecvError::Lagged(missed)) => {
                            debug!(%source, missed, "Media event listener lagged");
                        }
                    }
                }

                source = next_tick(&mut tick) => {
                    self.on_tick(source);
                }

                source = fire_once(&mut align) => {
                    align = None;
                    self.on_initial_align(source);
                }

                _ = scan.tick() => {
                    if let Some(bound) = self.scan_sources() {
                        (tick, align) = self.arm(bound);
                    }
                }
            }
        }

        self.detach_all();
        info!("Sync session stopped");
    }

    /// Fresh tick and alignment timers scoped to `source`
    fn arm(&self, source: SourceId) -> (Option<ScopedTick>, Option<ScopedAlign>) {
        let period = self.settings.tick_interval;
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let tick = ScopedTick { source, interval };
        let align = ScopedAlign {
            source,
            sleep: Box::pin(tokio::time::sleep(self.settings.align_delay)),
        };
        (Some(tick), Some(align))
    }

    fn bind(&mut self, source: SharedSource) -> SourceId {
        let id = source.id();
        if let Some(previous) = self.bound.take() {
            self.detach(previous.id());
        }
        self.attach(&source);

        {
            let mut view = lock_view(&self.view);
            self.sync.bind(id, &mut *view);
        }
        self.bound = Some(source);
        info!(%id, "Bound playback source");
        id
    }

    /// Subscribe to `source`'s events. Any earlier subscription to the same
    /// source is dropped first, so rebinding never duplicates handlers.
    fn attach(&mut self, source: &SharedSource) {
        let id = source.id();
        self.detach(id);
        self.listeners
            .insert(id, BroadcastStream::new(source.subscribe()));
    }

    fn detach(&mut self, id: SourceId) {
        if self.listeners.remove(&id).is_some() {
            debug!(%id, "Detached playback source listeners");
        }
    }

    fn detach_all(&mut self) {
        let ids: Vec<SourceId> = self.listeners.keys().copied().collect();
        for id in ids {
            self.detach(id);
        }
        self.bound = None;
    }

    fn on_media_event(&mut self, source: SourceId, event: MediaEvent) {
        if !self.sync.is_bound_to(source) {
            debug!(%source, ?event, "Ignoring event from unbound source");
            return;
        }

        match event {
            MediaEvent::TimeUpdate | MediaEvent::Seeking => self.continuous_update(),
            MediaEvent::Seeked | MediaEvent::LoadedMetadata => self.jump_update(),
            MediaEvent::Play => {
                self.jump_update();
                self.continuous_update();
            }
        }
    }

    fn on_tick(&mut self, scope: SourceId) {
        if !self.sync.is_bound_to(scope) {
            debug!(%scope, "Ignoring tick armed for a replaced source");
            return;
        }
        self.continuous_update();
    }

    fn on_initial_align(&mut self, scope: SourceId) {
        if !self.sync.is_bound_to(scope) {
            debug!(%scope, "Ignoring alignment armed for a replaced source");
            return;
        }
        self.jump_update();
    }

    fn continuous_update(&mut self) {
        if !self.enabled {
            return;
        }
        let Some(source) = self.bound.as_ref() else {
            return;
        };
        if source.ready_state() < HAVE_METADATA {
            return;
        }

        let t = current_time(source.as_ref());
        let mut view = lock_view(&self.view);
        self.sync.on_tick(t, &mut *view);
    }

    fn jump_update(&mut self) {
        let Some(source) = self.bound.as_ref() else {
            return;
        };

        let t = current_time(source.as_ref());
        let mut view = lock_view(&self.view);
        self.sync.on_jump(t, Motion::Immediate, &mut *view);
    }

    /// Scan for a better source; returns the newly bound source on a switch.
    fn scan_sources(&mut self) -> Option<SourceId> {
        let candidates = self.scanner.candidates();
        let best = best_candidate(&candidates);
        let bound = self.bound.as_ref().map(|source| source.id());

        match self.rebind.observe(bound, best.as_ref().map(|source| source.id())) {
            RebindDecision::Stay => None,
            RebindDecision::Pending { candidate, hits } => {
                debug!(%candidate, hits, "Candidate source not yet stable");
                None
            }
            RebindDecision::Switch(next) => {
                let source = best?;
                info!(from = ?bound, to = %next, "Playback source changed, rebinding");
                Some(self.bind(source))
            }
        }
    }
}

async fn next_tick(tick: &mut Option<ScopedTick>) -> SourceId {
    match tick {
        Some(tick) => {
            tick.interval.tick().await;
            tick.source
        }
        None => pending().await,
    }
}

async fn fire_once(align: &mut Option<ScopedAlign>) -> SourceId {
    match align {
        Some(align) => {
            align.sleep.as_mut().await;
            align.source
        }
        None => pending().await,
    }
}
