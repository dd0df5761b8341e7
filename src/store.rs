//! SQLite-backed call log.
//!
//! The store only appends and reads; the projections get a fresh snapshot on
//! every call.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{Local, NaiveDateTime};
use rusqlite::{params, Connection, Row};
use tracing::{info, warn};

use crate::error::{StoreError, StoreResult};
use crate::event_log;
use crate::models::{
    Event, EventKind, NewEvent, StoredEvent, CUSTOMER_CALLED, FOOD_DELIVERED, WAITER_RESPONDED,
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS call_log (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    table_id        INTEGER NOT NULL,
    event           TEXT    NOT NULL,
    timestamp       TEXT    NOT NULL,
    client_time_str TEXT
)";

/// Minimum similarity for suggesting a known event type.
const SUGGESTION_THRESHOLD: f64 = 0.85;

/// How the CSV mirror lines up with the call log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MirrorCheck {
    pub stored: usize,
    pub mirrored: usize,
    /// The mirror equals the newest `mirrored` rows of the log.
    pub in_sync: bool,
}

pub struct EventStore {
    conn: Mutex<Connection>,
    csv_mirror: Option<PathBuf>,
}

impl EventStore {
    pub fn open(path: &Path) -> StoreResult<Self> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            csv_mirror: None,
        })
    }

    pub fn with_csv_mirror(mut self, path: impl Into<PathBuf>) -> Self {
        self.csv_mirror = Some(path.into());
        self
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Append with `occurred_at` taken from the local clock.
    pub fn append(&self, new: NewEvent) -> StoreResult<StoredEvent> {
        self.append_at(new, Local::now().naive_local())
    }

    pub fn append_at(&self, new: NewEvent, occurred_at: NaiveDateTime) -> StoreResult<StoredEvent> {
        let event =
            Event::new(new.table_id, new.event_type, occurred_at).map_err(StoreError::Invalid)?;

        if event.kind() == EventKind::Other {
            if let Some(known) = closest_known_type(event.event_type()) {
                warn!(
                    event = event.event_type(),
                    suggestion = known,
                    "unrecognized event type, did you mean '{}'?",
                    known
                );
            }
        }

        let id = {
            let conn = self.conn()?;
            conn.execute(
                "INSERT INTO call_log (table_id, event, timestamp, client_time_str)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    event.table_id(),
                    event.event_type(),
                    event.occurred_at(),
                    new.client_time
                ],
            )?;
            conn.last_insert_rowid()
        };

        if let Some(mirror) = &self.csv_mirror {
            if let Err(e) = event_log::append_event(mirror, &event) {
                warn!(path = %mirror.display(), error = %e, "failed to write csv mirror");
            }
        }

        info!(
            id,
            table_id = event.table_id(),
            event = event.event_type(),
            time = %event.occurred_at(),
            "event logged"
        );

        Ok(StoredEvent {
            id,
            event,
            client_time: new.client_time,
        })
    }

    /// Every stored row in arrival order.
    pub fn records(&self) -> StoreResult<Vec<StoredEvent>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, table_id, event, timestamp, client_time_str FROM call_log ORDER BY id",
        )?;
        let rows = stmt.query_map([], row_to_record)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row??);
        }
        Ok(records)
    }

    /// Snapshot of the whole log for the projections.
    pub fn all_events(&self) -> StoreResult<Vec<Event>> {
        Ok(self.records()?.into_iter().map(|r| r.event).collect())
    }

    /// Compare the CSV mirror with the log. `None` when no mirror is configured.
    ///
    /// A mirror enabled after the log already had rows only covers its tail,
    /// so that still counts as in sync. A missing mirror file reads as empty.
    pub fn check_mirror(&self) -> StoreResult<Option<MirrorCheck>> {
        let Some(mirror) = &self.csv_mirror else {
            return Ok(None);
        };
        let stored = self.all_events()?;
        let mirrored = if mirror.exists() {
            event_log::read_events(mirror)?
        } else {
            Vec::new()
        };

        Ok(Some(MirrorCheck {
            stored: stored.len(),
            mirrored: mirrored.len(),
            in_sync: stored.ends_with(&mirrored),
        }))
    }

    pub fn table_events(&self, table_id: u32) -> StoreResult<Vec<Event>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, table_id, event, timestamp, client_time_str FROM call_log
             WHERE table_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![table_id], row_to_record)?;

        let mut events = Vec::new();
        for row in rows {
            events.push(row??.event);
        }
        Ok(events)
    }
}

/// Rows written by other tools may still violate event invariants.
fn row_to_record(row: &Row<'_>) -> rusqlite::Result<StoreResult<StoredEvent>> {
    let id: i64 = row.get(0)?;
    let table_id: i64 = row.get(1)?;
    let event_type: String = row.get(2)?;
    let occurred_at: NaiveDateTime = row.get(3)?;
    let client_time: Option<String> = row.get(4)?;

    Ok(Event::new(table_id, event_type, occurred_at)
        .map(|event| StoredEvent {
            id,
            event,
            client_time,
        })
        .map_err(|source| StoreError::CorruptRow { id, source }))
}

fn closest_known_type(event_type: &str) -> Option<&'static str> {
    [CUSTOMER_CALLED, WAITER_RESPONDED, FOOD_DELIVERED]
        .into_iter()
        .map(|known| (known, strsim::jaro_winkler(event_type, known)))
        .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(known, _)| known)
}
