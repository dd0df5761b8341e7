//! Global operational metrics across every table.

use std::collections::BTreeMap;

use chrono::Timelike;
use serde::Serialize;

use crate::models::{Event, EventKind};

use super::sessions::reconstruct_table;

pub const HOURS_PER_DAY: usize = 24;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsSummary {
    pub total: u64,
    pub open: u64,
    pub closed: u64,
    /// Mean minutes from call to first response, one decimal.
    pub avg_response: f64,
    /// Mean minutes from call to close, one decimal.
    pub avg_delivery: f64,
    /// `Customer_Called` events per hour of day.
    pub hourly: [u64; HOURS_PER_DAY],
    /// Unrounded means; the wire payload rounds these itself.
    #[serde(skip)]
    mean_response: f64,
    #[serde(skip)]
    mean_delivery: f64,
}

impl Default for AnalyticsSummary {
    fn default() -> Self {
        Self {
            total: 0,
            open: 0,
            closed: 0,
            avg_response: 0.0,
            avg_delivery: 0.0,
            hourly: [0; HOURS_PER_DAY],
            mean_response: 0.0,
            mean_delivery: 0.0,
        }
    }
}

pub fn compute_analytics(events: &[Event]) -> AnalyticsSummary {
    let mut by_table: BTreeMap<u32, Vec<&Event>> = BTreeMap::new();
    let mut hourly = [0u64; HOURS_PER_DAY];

    for event in events {
        by_table.entry(event.table_id()).or_default().push(event);
        if event.kind() == EventKind::CustomerCalled {
            hourly[event.occurred_at().hour() as usize] += 1;
        }
    }

    let mut total = 0;
    let mut closed = 0;
    let mut response_samples = Vec::new();
    let mut delivery_samples = Vec::new();

    for (table_id, table_events) in by_table {
        let summary = reconstruct_table(table_id, table_events);
        total += summary.calls;
        closed += summary.closed;
        response_samples.extend(summary.response_samples);
        delivery_samples.extend(summary.delivery_samples);
    }

    debug_assert!(closed <= total, "closed sessions exceed calls");

    let mean_response = mean(&response_samples);
    let mean_delivery = mean(&delivery_samples);
    AnalyticsSummary {
        total,
        open: total - closed,
        closed,
        avg_response: round1(mean_response),
        avg_delivery: round1(mean_delivery),
        hourly,
        mean_response,
        mean_delivery,
    }
}

fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        0.0
    } else {
        samples.iter().sum::<f64>() / samples.len() as f64
    }
}

/// Ties go to even, matching how `{:.1}` renders the payload.
fn round1(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}

/// Shape the dashboard polls: counts and averages as strings, `closed` as a
/// number, hours keyed `"0".."23"`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsPayload {
    pub total: String,
    pub open: String,
    pub closed: u64,
    pub avg_resp: String,
    pub avg_dlv: String,
    pub hourly: BTreeMap<usize, u64>,
}

impl From<&AnalyticsSummary> for AnalyticsPayload {
    fn from(summary: &AnalyticsSummary) -> Self {
        Self {
            total: summary.total.to_string(),
            open: summary.open.to_string(),
            closed: summary.closed,
            avg_resp: format!("{:.1}", summary.mean_response),
            avg_dlv: format!("{:.1}", summary.mean_delivery),
            hourly: summary.hourly.iter().copied().enumerate().collect(),
        }
    }
}

impl Default for AnalyticsPayload {
    fn default() -> Self {
        Self::from(&AnalyticsSummary::default())
    }
}
