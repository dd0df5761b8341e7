//! Per-table session reconstruction.
//!
//! A table's events are replayed in time order through [`SessionState::step`].
//! Two policies fall out of the transition table:
//! - a `Customer_Called` while a session is open replaces it ("last call wins"),
//!   the earlier call still counts but contributes no latency;
//! - a response or close with no open call is dropped.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::models::{Event, EventKind, Session, SessionKind};

/// Lifecycle position of one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Called {
        opened_at: NaiveDateTime,
    },
    Responded {
        opened_at: NaiveDateTime,
        responded_at: NaiveDateTime,
    },
}

/// A latency measured against the open call, in fractional minutes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LatencySample {
    Response(f64),
    Delivery(f64),
}

/// What a single transition produced besides the next state.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub state: SessionState,
    pub sample: Option<LatencySample>,
    /// Session finished by this event.
    pub closed: Option<Session>,
}

impl SessionState {
    fn opened_at(&self) -> Option<NaiveDateTime> {
        match *self {
            SessionState::Idle => None,
            SessionState::Called { opened_at } | SessionState::Responded { opened_at, .. } => {
                Some(opened_at)
            }
        }
    }

    fn responded_at(&self) -> Option<NaiveDateTime> {
        match *self {
            SessionState::Responded { responded_at, .. } => Some(responded_at),
            _ => None,
        }
    }

    /// Pure transition function for one table.
    pub fn step(self, event: &Event) -> Step {
        let at = event.occurred_at();
        let unchanged = Step {
            state: self,
            sample: None,
            closed: None,
        };

        match (event.kind(), self.opened_at()) {
            (EventKind::CustomerCalled, _) => Step {
                state: SessionState::Called { opened_at: at },
                sample: None,
                closed: None,
            },
            (EventKind::WaiterResponded, Some(opened_at)) => Step {
                // Repeat responses keep the first response time but still sample.
                state: SessionState::Responded {
                    opened_at,
                    responded_at: self.responded_at().unwrap_or(at),
                },
                sample: Some(LatencySample::Response(minutes_between(opened_at, at))),
                closed: None,
            },
            (EventKind::Closing, Some(opened_at)) => Step {
                state: SessionState::Idle,
                sample: Some(LatencySample::Delivery(minutes_between(opened_at, at))),
                closed: Some(Session {
                    table_id: event.table_id(),
                    opened_at,
                    responded_at: self.responded_at(),
                    closed_at: Some(at),
                    kind: SessionKind::Closed,
                }),
            },
            _ => unchanged,
        }
    }
}

fn minutes_between(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    (to - from).num_milliseconds() as f64 / 60_000.0
}

/// Reconstruction result for a single table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerTableSessionSummary {
    pub table_id: u32,
    pub calls: u64,
    pub closed: u64,
    pub response_samples: Vec<f64>,
    pub delivery_samples: Vec<f64>,
    pub sessions: Vec<Session>,
}

/// Reconstruct the sessions of `table_id` from an unfiltered event collection.
pub fn reconstruct_sessions(events: &[Event], table_id: u32) -> PerTableSessionSummary {
    reconstruct_table(
        table_id,
        events.iter().filter(|e| e.table_id() == table_id).collect(),
    )
}

/// Walk one table's events (arrival order) through the state machine.
pub(crate) fn reconstruct_table(table_id: u32, mut events: Vec<&Event>) -> PerTableSessionSummary {
    // Stable: equal timestamps keep arrival order.
    events.sort_by_key(|e| e.occurred_at());

    let mut summary = PerTableSessionSummary {
        table_id,
        ..Default::default()
    };
    let mut state = SessionState::Idle;

    for event in events {
        if event.kind() == EventKind::CustomerCalled {
            summary.calls += 1;
        }

        let step = state.step(event);
        match step.sample {
            Some(LatencySample::Response(m)) => summary.response_samples.push(m),
            Some(LatencySample::Delivery(m)) => summary.delivery_samples.push(m),
            None => {}
        }
        if let Some(session) = step.closed {
            summary.closed += 1;
            summary.sessions.push(session);
        }
        state = step.state;
    }

    if let Some(opened_at) = state.opened_at() {
        summary.sessions.push(Session {
            table_id,
            opened_at,
            responded_at: state.responded_at(),
            closed_at: None,
            kind: SessionKind::Open,
        });
    }

    summary
}
