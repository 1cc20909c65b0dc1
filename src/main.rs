//! Camconsole - Live Tracking Console
//!
//! Main entry point for the console core.

use camconsole::{
    channel_manager::{
        ChannelManager, ChannelTransport, DashboardRouter, HttpStreamTransport, NoFaults,
        PeriodicDrop, SimulatedDashboard, SimulatedTracking, TrackingRouter,
    },
    event_log::EventLog,
    feed_coordinator::{Camera, FeedCoordinator},
    gateway_client::GatewayClient,
    identity_registry::IdentityRegistry,
    state::{AppConfig, AppState},
    track_store::TrackStore,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Fallback camera inventory for simulation or an unreachable gateway
fn builtin_cameras() -> Vec<Camera> {
    vec![
        Camera {
            id: "cam_001".to_string(),
            name: "Entrance Camera".to_string(),
            stream_endpoint: Some("sim://cam_001".to_string()),
        },
        Camera {
            id: "cam_002".to_string(),
            name: "Checkout Camera".to_string(),
            stream_endpoint: Some("sim://cam_002".to_string()),
        },
    ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "camconsole=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Camconsole v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::default();
    tracing::info!(
        gateway_url = %config.gateway_url,
        tracking_stream_url = %config.tracking_stream_url,
        dashboard_stream_url = %config.dashboard_stream_url,
        simulate = config.simulate,
        "Configuration loaded"
    );

    // Initialize components
    let registry = Arc::new(IdentityRegistry::new());
    let event_log = Arc::new(EventLog::default());
    let store = Arc::new(TrackStore::new(registry.clone(), event_log.clone()));
    let feeds = Arc::new(FeedCoordinator::new(store.clone()));
    let gateway = Arc::new(GatewayClient::new(&config.gateway_url));
    tracing::info!("Core components initialized (IdentityRegistry, TrackStore, EventLog, FeedCoordinator, GatewayClient)");

    // Mount the camera inventory
    let cameras = if config.simulate {
        builtin_cameras()
    } else {
        match gateway.fetch_cameras(3).await {
            Ok(cameras) => cameras.into_iter().map(Camera::from).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Camera fetch failed, using builtin inventory");
                builtin_cameras()
            }
        }
    };
    let camera_ids: Vec<String> = cameras.iter().map(|c| c.id.clone()).collect();
    feeds.mount_cameras(cameras).await;
    tracing::info!(count = camera_ids.len(), "Feeds mounted");

    // Seed the event log from gateway history
    if config.simulate {
        event_log.seed(Vec::new()).await;
    } else {
        match gateway.fetch_recent_logs(config.log_fetch_limit).await {
            Ok(entries) => event_log.seed(entries).await,
            Err(e) => {
                tracing::warn!(error = %e, "Log history fetch failed, starting empty");
                event_log.seed(Vec::new()).await;
            }
        }
    }

    // Wire the streaming channels
    let tracking_transport: Arc<dyn ChannelTransport> = if config.simulate {
        Arc::new(SimulatedTracking::new(
            registry.clone(),
            camera_ids,
            Arc::new(PeriodicDrop { every: 40 }),
            Duration::from_millis(750),
        ))
    } else {
        Arc::new(HttpStreamTransport::new(&config.tracking_stream_url))
    };
    let dashboard_transport: Arc<dyn ChannelTransport> = if config.simulate {
        Arc::new(SimulatedDashboard::new(
            Arc::new(NoFaults),
            Duration::from_secs(5),
        ))
    } else {
        Arc::new(HttpStreamTransport::new(&config.dashboard_stream_url))
    };

    let tracking_channel = Arc::new(ChannelManager::new(
        "tracking",
        tracking_transport,
        Arc::new(TrackingRouter::new(store.clone())),
        event_log.clone(),
    ));
    let dashboard_channel = Arc::new(ChannelManager::new(
        "dashboard",
        dashboard_transport,
        Arc::new(DashboardRouter::new(event_log.clone())),
        event_log.clone(),
    ));

    tracking_channel.start().await;
    dashboard_channel.start().await;

    // Create application state
    let state = AppState {
        config,
        registry,
        store,
        event_log,
        gateway,
        feeds,
        tracking_channel,
        dashboard_channel,
    };

    // Poll the authoritative alert count from the gateway
    if !state.config.simulate {
        let gateway_poll = state.gateway.clone();
        let event_log_poll = state.event_log.clone();
        let poll_secs = state.config.alert_poll_secs;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(poll_secs));
            loop {
                interval.tick().await;
                match gateway_poll.fetch_alert_count().await {
                    Ok(count) => event_log_poll.sync_alert_count(count).await,
                    Err(e) => tracing::debug!(error = %e, "Alert count poll failed"),
                }
            }
        });
    }

    // Periodic status digest
    let digest_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(digest_state.config.digest_secs));
        loop {
            interval.tick().await;
            let (tracking, dashboard) = digest_state.channel_statuses().await;
            let gateway_healthy = if digest_state.config.simulate {
                true
            } else {
                digest_state.gateway.health_check().await
            };
            let objects = digest_state.store.object_count().await;
            let known_people = digest_state.registry.count().await;
            let log_entries = digest_state.event_log.count().await;
            let alerts = digest_state.event_log.alert_count().await;
            tracing::info!(
                tracking_status = ?tracking,
                dashboard_status = ?dashboard,
                gateway_healthy = gateway_healthy,
                objects = objects,
                known_people = known_people,
                log_entries = log_entries,
                alerts = alerts,
                "Console status"
            );
        }
    });

    tracing::info!("Console running, press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    state.shutdown().await;

    Ok(())
}
