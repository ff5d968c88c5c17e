//! App session wiring for the watch shell.
//!
//! Owns the sync service for the lifetime of the process and maps app
//! lifecycle events onto it. Data layer work is spawned onto the runtime so
//! the caller (the render loop) never waits on the phone.

use std::sync::Arc;
use std::time::Duration;

use superbai_core::config::SyncSettings;
use superbai_core::datalayer::DataLayer;
use superbai_core::sync::{CacheOutcome, RefreshReport, SyncView};
use superbai_core::WearDataService;
use tokio::task::JoinHandle;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleEvent {
    Resume,
    Pause,
}

/// What happened during [`AppSession::start`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StartupReport {
    pub cache: CacheOutcome,
    pub connected: Option<bool>,
    pub refresh: RefreshReport,
}

pub struct AppSession {
    service: WearDataService,
    splash: Duration,
}

impl AppSession {
    pub fn new(layer: Arc<dyn DataLayer>, settings: SyncSettings, splash: Duration) -> Self {
        Self {
            service: WearDataService::new(layer, settings),
            splash,
        }
    }

    pub fn view(&self) -> SyncView {
        self.service.view()
    }

    /// Startup sequence: listen, seed from cache, probe, then ask for fresh data.
    pub async fn start(&self) -> StartupReport {
        tracing::info!("Starting Superbai wear session");
        self.service.start_listening();
        let cache = self.service.load_cached().await;
        let connected = self.service.probe_connectivity().await;
        let refresh = self.service.request_refresh().await;
        StartupReport {
            cache,
            connected,
            refresh,
        }
    }

    /// Run the startup sequence while the splash screen is up.
    pub async fn start_behind_splash(&self) -> StartupReport {
        let (report, ()) = tokio::join!(self.start(), tokio::time::sleep(self.splash));
        report
    }

    /// Fire a refresh request without waiting for it.
    pub fn spawn_refresh(&self) -> JoinHandle<RefreshReport> {
        let service = self.service.clone();
        tokio::spawn(async move { service.request_refresh().await })
    }

    pub fn spawn_probe(&self) -> JoinHandle<Option<bool>> {
        let service = self.service.clone();
        tokio::spawn(async move { service.probe_connectivity().await })
    }

    /// React to the app moving between foreground and background.
    ///
    /// Resuming re-probes connectivity and requests a refresh; pausing leaves
    /// power management to the platform.
    pub fn handle_lifecycle(&self, event: LifecycleEvent) -> Option<ResumeTasks> {
        match event {
            LifecycleEvent::Resume => {
                tracing::debug!("App resumed, refreshing bookings");
                Some(ResumeTasks {
                    probe: self.spawn_probe(),
                    refresh: self.spawn_refresh(),
                })
            }
            LifecycleEvent::Pause => {
                tracing::debug!("App paused");
                None
            }
        }
    }
}

/// Background work started by a resume.
pub struct ResumeTasks {
    pub probe: JoinHandle<Option<bool>>,
    pub refresh: JoinHandle<RefreshReport>,
}

impl ResumeTasks {
    /// Wait for both tasks. A panicked task counts as a failed probe/refresh.
    pub async fn join(self) -> (Option<bool>, RefreshReport) {
        let (probe, refresh) = tokio::join!(self.probe, self.refresh);
        (probe.ok().flatten(), refresh.unwrap_or_default())
    }
}
