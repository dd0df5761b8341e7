//! Periodic dashboard refresh.
//!
//! A background task pulls a snapshot of the log on a fixed interval, runs the
//! projections and publishes the result; readers only ever see whole snapshots.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::models::{Event, LiveStatus};
use crate::projections::{compute_analytics, compute_live_status, AnalyticsPayload};
use crate::store::EventStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub analytics: AnalyticsPayload,
    pub live_status: Vec<LiveStatus>,
    pub generated_at: NaiveDateTime,
}

impl DashboardSnapshot {
    pub fn build(events: &[Event], now: NaiveDateTime) -> Self {
        Self {
            analytics: AnalyticsPayload::from(&compute_analytics(events)),
            live_status: compute_live_status(events, now),
            generated_at: now,
        }
    }

    pub fn empty(now: NaiveDateTime) -> Self {
        Self::build(&[], now)
    }
}

/// Refresh once per `every` until every receiver is dropped.
pub fn spawn_refresher(
    store: Arc<EventStore>,
    every: Duration,
) -> (watch::Receiver<DashboardSnapshot>, JoinHandle<()>) {
    let (tx, rx) = watch::channel(DashboardSnapshot::empty(Local::now().naive_local()));

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let events = match store.all_events() {
                Ok(events) => events,
                Err(e) => {
                    error!(error = %e, "dashboard refresh failed, keeping last snapshot");
                    continue;
                }
            };
            let snapshot = DashboardSnapshot::build(&events, Local::now().naive_local());
            debug!(
                events = events.len(),
                tables = snapshot.live_status.len(),
                "dashboard refreshed"
            );
            if tx.send(snapshot).is_err() {
                break;
            }
        }
    });

    (rx, handle)
}
