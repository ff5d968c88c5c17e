//! Superbai Wear
//!
//! Headless shell for the watch app: seeds bookings from the local replica,
//! asks the paired phone for fresh data, and prints the booking screen.

mod cli;
mod config;
mod error;
mod session;
mod snapshot;
mod ui;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use superbai_core::datalayer::{DataLayer, MemoryDataLayer};
use superbai_core::sync::{CacheOutcome, SyncView};
use superbai_core::{Booking, SyncStatus};

use crate::cli::{Cli, Commands};
use crate::config::{resolve_runtime_config, WearRuntimeConfig};
use crate::error::WearError;
use crate::session::{AppSession, LifecycleEvent, StartupReport};
use crate::snapshot::PhoneSnapshot;
use crate::ui::{render_screen, BookingCard, ScreenModel};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), WearError> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "superbai=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Decode { file } => run_decode(&file, cli.json),
        Commands::Show { no_splash } => {
            let config = resolve_runtime_config(cli.config.as_deref(), cli.snapshot)?;
            run_show(&config, no_splash, cli.json).await
        }
        Commands::Refresh => {
            let config = resolve_runtime_config(cli.config.as_deref(), cli.snapshot)?;
            run_refresh(&config, cli.json).await
        }
    }
}

fn open_data_layer(config: &WearRuntimeConfig) -> Result<Arc<dyn DataLayer>, WearError> {
    let Some(path) = config.snapshot_path.as_deref() else {
        tracing::info!("No phone snapshot configured, running without a paired phone");
        return Ok(Arc::new(MemoryDataLayer::new()));
    };
    tracing::info!("Emulating phone from snapshot {}", path.display());
    let layer = PhoneSnapshot::load(path)?.into_data_layer(&config.sync)?;
    Ok(Arc::new(layer))
}

async fn run_show(config: &WearRuntimeConfig, no_splash: bool, as_json: bool) -> Result<(), WearError> {
    let splash = if no_splash {
        Duration::ZERO
    } else {
        config.splash_duration()
    };
    let session = AppSession::new(open_data_layer(config)?, config.sync.clone(), splash);

    let report = session.start_behind_splash().await;
    tracing::debug!("Startup finished: {report:?}");
    if !as_json {
        println!("{}", startup_summary(&report));
    }
    if report.refresh.requested > 0 {
        wait_for_update(&session.view(), config.response_wait()).await;
    }

    print_screen(&session.view(), as_json)
}

async fn run_refresh(config: &WearRuntimeConfig, as_json: bool) -> Result<(), WearError> {
    let session = AppSession::new(open_data_layer(config)?, config.sync.clone(), Duration::ZERO);
    session.start().await;
    session.handle_lifecycle(LifecycleEvent::Pause);

    let Some(tasks) = session.handle_lifecycle(LifecycleEvent::Resume) else {
        return print_screen(&session.view(), as_json);
    };
    let (connected, refresh) = tasks.join().await;
    if refresh.requested > 0 {
        wait_for_update(&session.view(), config.response_wait()).await;
    }

    if !as_json {
        println!(
            "Refresh: {} node(s), {} requested, {} failed{}",
            refresh.nodes,
            refresh.requested,
            refresh.failed,
            match connected {
                Some(true) => "",
                Some(false) => " (disconnected)",
                None => " (connectivity unknown)",
            }
        );
    }
    print_screen(&session.view(), as_json)
}

fn startup_summary(report: &StartupReport) -> String {
    let cache = match report.cache {
        CacheOutcome::Seeded { count } => format!("{count} cached booking(s)"),
        CacheOutcome::Superseded => "cache superseded by phone".to_string(),
        CacheOutcome::Empty => "no cached bookings".to_string(),
        CacheOutcome::Malformed => "cached bookings unreadable".to_string(),
        CacheOutcome::Failed => "cache unavailable".to_string(),
    };
    let phone = match report.connected {
        Some(true) => "phone connected",
        Some(false) => "phone disconnected",
        None => "connectivity unknown",
    };
    format!(
        "Startup: {cache}, {phone}, {} request(s) sent",
        report.refresh.requested
    )
}

/// Give the phone a bounded window to push its reply.
async fn wait_for_update(view: &SyncView, wait: Duration) {
    let mut status = view.subscribe_status();
    if tokio::time::timeout(
        wait,
        status.wait_for(|snapshot| snapshot.status == SyncStatus::Updated),
    )
    .await
    .is_err()
    {
        tracing::info!("Phone did not answer within {}ms", wait.as_millis());
    }
}

fn print_screen(view: &SyncView, as_json: bool) -> Result<(), WearError> {
    let model = ScreenModel::from_view(view);
    if as_json {
        println!("{}", serde_json::to_string_pretty(&model)?);
    } else {
        for line in render_screen(&model) {
            println!("{line}");
        }
    }
    Ok(())
}

fn run_decode(file: &Path, as_json: bool) -> Result<(), WearError> {
    let payload = std::fs::read_to_string(file)?;
    let bookings = Booking::try_decode_list(payload.trim())
        .map_err(|error| WearError::MalformedPayload(error.to_string()))?;

    if as_json {
        let cards = bookings.iter().map(BookingCard::from).collect::<Vec<_>>();
        println!("{}", serde_json::to_string_pretty(&cards)?);
        return Ok(());
    }

    println!("{} booking(s)", bookings.len());
    for booking in &bookings {
        println!(
            "{}  {}  [{}]  {}  {}",
            booking.id,
            booking.service_name,
            booking.booking_status(),
            booking.maid_name,
            booking.time_slot
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payload.json");
        std::fs::write(&path, "[{\"id\":").unwrap();

        let error = run_decode(&path, false).unwrap_err();
        assert!(matches!(error, WearError::MalformedPayload(_)));
    }

    #[test]
    fn startup_summary_reports_cache_and_phone() {
        let report = StartupReport {
            cache: CacheOutcome::Seeded { count: 3 },
            connected: Some(false),
            refresh: superbai_core::sync::RefreshReport::default(),
        };
        assert_eq!(
            startup_summary(&report),
            "Startup: 3 cached booking(s), phone disconnected, 0 request(s) sent"
        );
    }

    #[tokio::test]
    async fn open_data_layer_without_snapshot_has_no_phone() {
        let layer = open_data_layer(&WearRuntimeConfig::default()).unwrap();
        assert!(layer.connected_nodes().await.unwrap().is_empty());
    }
}
