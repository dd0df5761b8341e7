//! Append-only CSV mirror of the call log.
//!
//! One line per event: `table_id,event,timestamp`. Never rewritten, only appended.

use std::fs::OpenOptions;
use std::io::{BufRead, Write};
use std::path::Path;

use crate::error::{StoreError, StoreResult};
use crate::models::Event;

pub fn format_line(event: &Event) -> String {
    format!(
        "{},{},{}\n",
        event.table_id(),
        event.event_type(),
        event.occurred_at().format("%Y-%m-%dT%H:%M:%S%.f")
    )
}

pub fn append_event(path: &Path, event: &Event) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;

    file.write_all(format_line(event).as_bytes())?;
    Ok(())
}

/// Read a mirror back into events, in file order.
///
/// Blank lines are skipped; any other unparseable line fails the read.
pub fn read_events(path: &Path) -> StoreResult<Vec<Event>> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);

    let mut events = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        // Event types may contain commas; the timestamp never does.
        let parsed = match (line.split_once(','), line.rsplit_once(',')) {
            (Some((table, _)), Some((head, ts))) if head.len() > table.len() => {
                Event::from_raw(table, &head[table.len() + 1..], ts)
            }
            _ => Err(crate::error::EventError::MissingField),
        };
        let event = parsed.map_err(|source| StoreError::MalformedLine {
            path: path.display().to_string(),
            line: idx + 1,
            source,
        })?;
        events.push(event);
    }

    Ok(events)
}
