use chrono::{DateTime, Days, NaiveDate, Utc};
use ram_core::{Agenda, Item};

/// All-day event derived from an item's estimated date.
pub struct CalendarEvent {
    pub uid: String,
    pub date: NaiveDate,
    pub summary: String,
    pub description: String,
}

pub fn agenda_to_events(agenda: &Agenda) -> Vec<CalendarEvent> {
    agenda
        .sections()
        .iter()
        .flat_map(|(_, items)| items.iter())
        .filter_map(item_to_event)
        .collect()
}

fn item_to_event(item: &Item) -> Option<CalendarEvent> {
    let date = item.estimated_date?;
    let mut description = format!(
        "Type: {:?}\nEnergy: {}\nUrgency: {}\n",
        item.item_type,
        item.energy.as_str(),
        item.urgency.as_str()
    );
    if let Some(cue) = &item.temporal_cue {
        description.push_str(&format!("When: {cue}\n"));
    }
    if !item.tags.is_empty() {
        description.push_str(&format!("Tags: {}\n", item.tags.join(", ")));
    }
    Some(CalendarEvent {
        uid: format!("{}@ram", item.id),
        date,
        summary: item.processed_text.clone(),
        description,
    })
}

/// Emit a minimal ICS calendar of all-day VEVENT blocks.
///
/// UIDs are `<item id>@ram`, so re-importing updates instead of duplicating.
pub fn events_to_ics(events: &[CalendarEvent], stamp: DateTime<Utc>) -> String {
    let mut s = String::new();
    s.push_str("BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//RAM//External Brain//EN\r\n");

    let dtstamp = stamp.format("%Y%m%dT%H%M%SZ");
    for e in events {
        let end = e.date.checked_add_days(Days::new(1)).unwrap_or(e.date);
        s.push_str("BEGIN:VEVENT\r\n");
        s.push_str(&format!("UID:{}\r\n", e.uid));
        s.push_str(&format!("DTSTAMP:{}\r\n", dtstamp));
        s.push_str(&format!("DTSTART;VALUE=DATE:{}\r\n", e.date.format("%Y%m%d")));
        s.push_str(&format!("DTEND;VALUE=DATE:{}\r\n", end.format("%Y%m%d")));
        s.push_str(&format!("SUMMARY:{}\r\n", escape_ics(&e.summary)));
        s.push_str(&format!("DESCRIPTION:{}\r\n", escape_ics(&e.description)));
        s.push_str("END:VEVENT\r\n");
    }

    s.push_str("END:VCALENDAR\r\n");
    s
}

fn escape_ics(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace(',', "\\,")
        .replace(';', "\\;")
}
