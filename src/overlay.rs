//! Overlay initialization pipeline
//!
//! Tear down whatever the previous page left behind, pick a playback source,
//! resolve the channel id, load and render the comments, then hand the bound
//! source to a fresh sync session. Every failure along the way ends as an
//! [`OverlayStatus`] shown in the panel.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::config::Config;
use crate::loader::{CommentLoader, LoadError};
use crate::net::{Endpoints, HttpClient};
use crate::playback::{best_candidate, SourceScanner};
use crate::resolver::{PageHost, Resolver};
use crate::sync::{SessionHandle, SessionSettings};
use crate::view::{lock_view, SharedView};

/// What the panel shows instead of (or above) the comment list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayStatus {
    Loading,
    NoPlaybackSource,
    IdentifierNotFound,
    FetchFailed,
    EmptyTimeline,
    Ready { comments: usize },
    /// A newer initialization replaced this one; nothing is shown
    Superseded,
}

impl OverlayStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }
}

impl fmt::Display for OverlayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loading => write!(f, "Loading comments…"),
            Self::NoPlaybackSource => write!(f, "No video element found"),
            Self::IdentifierNotFound => {
                write!(f, "Could not find the video's cid (try switching parts or reloading)")
            }
            Self::FetchFailed => write!(f, "Failed to load comments"),
            Self::EmptyTimeline => write!(f, "No comments"),
            Self::Ready { comments } => write!(f, "{} comments", comments),
            Self::Superseded => write!(f, "Superseded by a newer load"),
        }
    }
}

pub struct Overlay {
    config: Config,
    resolver: Resolver,
    loader: CommentLoader,
    view: SharedView,
    session: Option<SessionHandle>,
}

impl Overlay {
    pub fn new(config: Config, client: Arc<dyn HttpClient>, view: SharedView) -> Result<Self> {
        let endpoints = Endpoints::from_config(&config.endpoints)?;
        let resolver = Resolver::new(client.clone(), endpoints.clone(), &config.resolver);
        let loader = CommentLoader::new(client, endpoints);

        Ok(Self {
            config,
            resolver,
            loader,
            view,
            session: None,
        })
    }

    /// Run the whole pipeline for `page`. Any previous session is torn down
    /// first, so calling this again on navigation never stacks timers or
    /// listeners.
    pub async fn initialize(
        &mut self,
        page: &dyn PageHost,
        scanner: Arc<dyn SourceScanner>,
    ) -> OverlayStatus {
        self.teardown().await;

        let status = self.run_pipeline(page, scanner).await;
        match &status {
            OverlayStatus::Ready { comments } => {
                info!(comments, "Overlay ready");
            }
            OverlayStatus::Superseded => {}
            other => {
                info!("Overlay stopped: {}", other);
                lock_view(&self.view).show_status(other);
            }
        }
        status
    }

    async fn run_pipeline(
        &mut self,
        page: &dyn PageHost,
        scanner: Arc<dyn SourceScanner>,
    ) -> OverlayStatus {
        lock_view(&self.view).show_status(&OverlayStatus::Loading);

        let candidates = scanner.candidates();
        let Some(source) = best_candidate(&candidates) else {
            warn!("No playback source on {}", page.location());
            return OverlayStatus::NoPlaybackSource;
        };

        let cid = match self.resolver.resolve(page).await {
            Ok(cid) => cid,
            Err(e) => {
                warn!("{}", e);
                return OverlayStatus::IdentifierNotFound;
            }
        };

        let timeline = match self.loader.load(&cid, Some(page.location())).await {
            Ok(timeline) => timeline,
            Err(LoadError::Superseded) => return OverlayStatus::Superseded,
            Err(e) => {
                warn!("Failed to load comments for {}: {}", cid, e);
                return OverlayStatus::FetchFailed;
            }
        };

        if timeline.is_empty() {
            return OverlayStatus::EmptyTimeline;
        }

        let comments = timeline.len();
        let timeline = Arc::new(timeline);
        lock_view(&self.view).render(&timeline);

        self.session = Some(SessionHandle::spawn(
            SessionSettings::from(&self.config),
            timeline,
            self.view.clone(),
            scanner,
            source,
        ));

        OverlayStatus::Ready { comments }
    }

    /// Cancel any in-flight load and stop the running session.
    pub async fn teardown(&mut self) {
        self.loader.cancel();
        if let Some(session) = self.session.take() {
            session.teardown().await;
        }
    }

    pub fn session(&self) -> Option<&SessionHandle> {
        self.session.as_ref()
    }
}
