//! Table-service call tracking for a restaurant floor.
//!
//! Staff and table devices append `(table_id, event_type)` entries to a call
//! log. All state shown to staff is derived from that log on demand by the
//! pure functions in [`projections`]: per-table session reconstruction,
//! global analytics, live floor status and per-table reports.

pub mod api;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod event_log;
pub mod models;
pub mod projections;
pub mod store;

pub use error::{ApiError, EventError, StoreError};
pub use models::{Event, EventKind, LiveStatus, Session, SessionKind, TableReport};
pub use projections::{
    compute_analytics, compute_live_status, compute_table_report, reconstruct_sessions,
    AnalyticsSummary, PerTableSessionSummary,
};
