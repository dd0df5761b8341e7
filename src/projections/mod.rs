//! Pure projections over the call log.
//!
//! Every function here takes an already-retrieved, unordered slice of events and
//! returns plain values. Nothing is cached between calls and nothing does I/O.

pub mod analytics;
pub mod live_status;
pub mod sessions;
pub mod table_report;

pub use analytics::{compute_analytics, AnalyticsPayload, AnalyticsSummary};
pub use live_status::compute_live_status;
pub use sessions::{reconstruct_sessions, LatencySample, PerTableSessionSummary, SessionState, Step};
pub use table_report::compute_table_report;
