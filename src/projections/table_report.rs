use crate::models::{Event, EventKind, TableReport};

/// Lifetime counters and availability for one table.
///
/// Counts are over the whole history, not per session. A table with no
/// events reports available with zero counts.
pub fn compute_table_report(events: &[Event], table_id: u32) -> TableReport {
    let mut table_events: Vec<&Event> = events.iter().filter(|e| e.table_id() == table_id).collect();
    table_events.sort_by_key(|e| e.occurred_at());

    let (mut received, mut responded, mut delivered) = (0u64, 0u64, 0u64);
    for event in &table_events {
        match event.kind() {
            EventKind::CustomerCalled => received += 1,
            EventKind::WaiterResponded => responded += 1,
            EventKind::Closing => delivered += 1,
            EventKind::Other => {}
        }
    }

    let busy = table_events.last().is_some_and(|last| {
        matches!(
            last.kind(),
            EventKind::CustomerCalled | EventKind::WaiterResponded
        )
    });

    TableReport {
        available: if busy { "No" } else { "Yes" }.to_string(),
        orders_received: received.to_string(),
        orders_responded: responded.to_string(),
        orders_delivered: delivered.to_string(),
    }
}
