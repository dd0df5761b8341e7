//! Live floor status derived from each table's latest event.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use crate::models::{Event, EventKind, LiveStatus, IDLE};

/// Display status for each table that has at least one event, by ascending table id.
///
/// `now` is injected so callers (and tests) control the clock.
pub fn compute_live_status(events: &[Event], now: NaiveDateTime) -> Vec<LiveStatus> {
    let mut latest: BTreeMap<u32, &Event> = BTreeMap::new();

    for event in events {
        latest
            .entry(event.table_id())
            .and_modify(|current| {
                // `>=` so a later arrival wins a timestamp tie.
                if event.occurred_at() >= current.occurred_at() {
                    *current = event;
                }
            })
            .or_insert(event);
    }

    latest
        .into_values()
        .map(|event| LiveStatus {
            table_id: event.table_id(),
            display_status: display_status(event).to_string(),
            minutes_ago: (now - event.occurred_at()).num_minutes(),
        })
        .collect()
}

fn display_status(event: &Event) -> &str {
    match event.kind() {
        EventKind::Closing => IDLE,
        _ => event.event_type(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn ev(table: i64, kind: &str, time: NaiveDateTime) -> Event {
        Event::new(table, kind, time).unwrap()
    }

    #[test]
    fn test_latest_event_per_table() {
        let events = vec![
            ev(2, "Customer_Called", at(14, 0, 0)),
            ev(1, "Waiter_Responded", at(13, 5, 0)),
            ev(1, "Customer_Called", at(13, 0, 0)),
        ];
        let status = compute_live_status(&events, at(14, 30, 45));
        assert_eq!(
            status,
            vec![
                LiveStatus {
                    table_id: 1,
                    display_status: "Waiter_Responded".to_string(),
                    minutes_ago: 85,
                },
                LiveStatus {
                    table_id: 2,
                    display_status: "Customer_Called".to_string(),
                    minutes_ago: 30,
                },
            ]
        );
    }

    #[test]
    fn test_closing_events_display_idle() {
        let events = vec![
            ev(1, "Food_Delivered", at(9, 0, 0)),
            ev(2, "Table_Closed 💰 Bill", at(9, 0, 0)),
        ];
        let status = compute_live_status(&events, at(9, 0, 59));
        assert!(status.iter().all(|s| s.display_status == "Idle"));
        assert!(status.iter().all(|s| s.minutes_ago == 0));
    }

    #[test]
    fn test_unknown_type_passes_through() {
        let events = vec![ev(6, "Water_Refill", at(9, 0, 0))];
        let status = compute_live_status(&events, at(9, 10, 0));
        assert_eq!(status[0].display_status, "Water_Refill");
    }

    #[test]
    fn test_event_type_shown_verbatim() {
        let events = vec![ev(7, " Customer_Called", at(9, 0, 0))];
        let status = compute_live_status(&events, at(9, 5, 0));
        assert_eq!(status[0].display_status, " Customer_Called");
    }

    #[test]
    fn test_tie_goes_to_later_arrival() {
        let events = vec![
            ev(3, "Customer_Called", at(9, 0, 0)),
            ev(3, "Food_Delivered", at(9, 0, 0)),
        ];
        let status = compute_live_status(&events, at(9, 1, 0));
        assert_eq!(status[0].display_status, "Idle");
    }

    #[test]
    fn test_duplicate_latest_does_not_change_result() {
        let mut events = vec![
            ev(3, "Customer_Called", at(9, 0, 0)),
            ev(3, "Waiter_Responded", at(9, 4, 0)),
        ];
        let now = at(9, 10, 0);
        let before = compute_live_status(&events, now);
        events.push(ev(3, "Waiter_Responded", at(9, 4, 0)));
        assert_eq!(compute_live_status(&events, now), before);
    }

    #[test]
    fn test_no_events_no_rows() {
        assert!(compute_live_status(&[], at(9, 0, 0)).is_empty());
    }
}
