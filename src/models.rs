use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::EventError;

pub const CUSTOMER_CALLED: &str = "Customer_Called";
pub const WAITER_RESPONDED: &str = "Waiter_Responded";
pub const FOOD_DELIVERED: &str = "Food_Delivered";
/// Synthetic display state; never stored.
pub const IDLE: &str = "Idle";

/// Width of the `event` column in the call log.
pub const MAX_EVENT_TYPE_LEN: usize = 50;

/// How an event type drives the per-table lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    CustomerCalled,
    WaiterResponded,
    /// `Food_Delivered` or any type containing `Bill`.
    Closing,
    Other,
}

impl EventKind {
    pub fn of(event_type: &str) -> Self {
        if event_type == CUSTOMER_CALLED {
            EventKind::CustomerCalled
        } else if event_type == WAITER_RESPONDED {
            EventKind::WaiterResponded
        } else if event_type == FOOD_DELIVERED || event_type.contains("Bill") {
            EventKind::Closing
        } else {
            EventKind::Other
        }
    }
}

/// One immutable entry of the call log.
///
/// Only constructed through [`Event::new`] / [`Event::from_raw`], so every
/// value reaching the projections is already well formed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    table_id: u32,
    event_type: String,
    occurred_at: NaiveDateTime,
}

impl Event {
    pub fn new(
        table_id: i64,
        event_type: impl Into<String>,
        occurred_at: NaiveDateTime,
    ) -> Result<Self, EventError> {
        let event_type = event_type.into();
        if event_type.trim().is_empty() {
            return Err(EventError::MissingField);
        }
        // Stored and matched verbatim; only line-breaking characters are refused.
        if event_type.chars().any(char::is_control) {
            return Err(EventError::ControlCharacter(event_type));
        }
        let len = event_type.chars().count();
        if len > MAX_EVENT_TYPE_LEN {
            return Err(EventError::EventTypeTooLong {
                len,
                max: MAX_EVENT_TYPE_LEN,
            });
        }
        if table_id < 0 {
            return Err(EventError::NegativeTableId(table_id));
        }
        let table_id =
            u32::try_from(table_id).map_err(|_| EventError::InvalidTableId(table_id.to_string()))?;

        Ok(Self {
            table_id,
            event_type,
            occurred_at,
        })
    }

    /// Build an event from untyped text, e.g. a line of the CSV mirror.
    pub fn from_raw(table: &str, event_type: &str, occurred_at: &str) -> Result<Self, EventError> {
        let table_id = parse_table_id(table)?;
        let occurred_at = parse_timestamp(occurred_at)?;
        Self::new(table_id, event_type, occurred_at)
    }

    pub fn table_id(&self) -> u32 {
        self.table_id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn occurred_at(&self) -> NaiveDateTime {
        self.occurred_at
    }

    pub fn kind(&self) -> EventKind {
        EventKind::of(&self.event_type)
    }
}

pub fn parse_table_id(raw: &str) -> Result<i64, EventError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(EventError::MissingField);
    }
    raw.parse::<i64>()
        .map_err(|_| EventError::InvalidTableId(raw.to_string()))
}

/// Accepts RFC 3339 (offset dropped, wall-clock kept) or naive ISO-8601 with
/// either `T` or a space between date and time.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, EventError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.naive_local());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| EventError::InvalidTimestamp(raw.to_string()))
}

/// A table id as sent by clients: JSON number or string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawTableId {
    Int(i64),
    Text(String),
}

impl RawTableId {
    fn resolve(&self) -> Result<i64, EventError> {
        match self {
            RawTableId::Int(v) => Ok(*v),
            RawTableId::Text(s) => parse_table_id(s),
        }
    }
}

/// Event input from the `/log` endpoint (JSON body or query string).
#[derive(Debug, Default, Deserialize)]
pub struct EventInput {
    #[serde(rename = "tableId")]
    pub table_id: Option<RawTableId>,
    pub table: Option<RawTableId>,
    pub event: Option<String>,
    /// Client-reported time, kept for reference only.
    pub time: Option<String>,
}

/// Validated ingestion request; `occurred_at` is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub table_id: i64,
    pub event_type: String,
    pub client_time: Option<String>,
}

impl EventInput {
    pub fn validate(self) -> Result<NewEvent, EventError> {
        let table = self
            .table_id
            .or(self.table)
            .ok_or(EventError::MissingField)?;
        let event_type = self
            .event
            .filter(|e| !e.trim().is_empty())
            .ok_or(EventError::MissingField)?;
        let table_id = table.resolve()?;
        if table_id < 0 {
            return Err(EventError::NegativeTableId(table_id));
        }
        Ok(NewEvent {
            table_id,
            event_type,
            client_time: self.time,
        })
    }
}

/// A call-log row as stored, including store-assigned metadata.
#[derive(Debug, Clone, Serialize)]
pub struct StoredEvent {
    pub id: i64,
    #[serde(flatten)]
    pub event: Event,
    pub client_time: Option<String>,
}

/// API Response
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ApiResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            data: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            data: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Open,
    Closed,
}

/// Session projection (derived from events, never stored)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub table_id: u32,
    pub opened_at: NaiveDateTime,
    pub responded_at: Option<NaiveDateTime>,
    pub closed_at: Option<NaiveDateTime>,
    pub kind: SessionKind,
}

/// Current display state of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiveStatus {
    pub table_id: u32,
    #[serde(rename = "status")]
    pub display_status: String,
    pub minutes_ago: i64,
}

/// Per-table counters. All fields are strings on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableReport {
    pub available: String,
    pub orders_received: String,
    pub orders_responded: String,
    pub orders_delivered: String,
}
