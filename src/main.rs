//! Wardwatch
//!
//! Entry point: wires the fixture-backed store, the entity services and the
//! simulated live feed into a terminal dashboard.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use wardwatch::config;
use wardwatch::feed::LiveFeed;
use wardwatch::filter::{filter_patients, sort_patients, PatientFilters, TableSort};
use wardwatch::services::{
    ActivityService, EmergencyService, MetricsService, PatientService, StaffService,
};
use wardwatch::store::InMemoryStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Initialize logger
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = config::load_config().context("Failed to load configuration")?;

    // Seed the offline store and wire the services
    let store = Arc::new(InMemoryStore::with_fixtures().context("Failed to seed fixture store")?);
    let patients = PatientService::new(store.clone());
    let staff = StaffService::new(store.clone()).with_page_limit(config.store.page_limit);
    let activities = ActivityService::new(store.clone());
    let metrics = MetricsService::new(store.clone());
    let alerts = EmergencyService::new(store.clone());

    // Patient roster, the way the table renders it by default
    let roster = sort_patients(
        &filter_patients(&patients.list().await, &PatientFilters::default()),
        TableSort::default(),
    );
    info!(count = roster.len(), "patient roster loaded");
    for patient in &roster {
        info!(
            id = patient.id,
            room = %patient.room_number,
            status = %patient.admission_status,
            "patient: {}",
            patient.name
        );
    }

    info!(count = staff.list().await.len(), "staff directory loaded");

    for activity in activities.recent(None).await {
        info!(severity = ?activity.severity, "activity: {}", activity.description);
    }
    for alert in alerts.recent(None).await {
        info!(
            severity = alert.severity.as_str(),
            acknowledged = alert.acknowledged_by.len(),
            "alert: {}",
            alert.message
        );
    }

    // Live metrics until Ctrl-C
    let feed = LiveFeed::new(config.feed.clone(), metrics.list().await);
    feed.start(
        |list, changed| {
            let metric = &list[changed];
            info!(
                value = metric.value,
                trend = ?metric.trend,
                "metric updated: {}",
                metric.label
            );
        },
        |connected| info!(connected, "live feed connection changed"),
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    feed.stop();
    info!("shutting down");
    Ok(())
}
