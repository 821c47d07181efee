//! Agenda: dated items grouped around the user's local "today".

use anyhow::Result;
use chrono::{DateTime, Days, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::item::Item;

pub fn parse_timezone(tz: &str) -> Result<Tz> {
    tz.parse::<Tz>()
        .map_err(|_| anyhow::anyhow!("invalid timezone: {tz}"))
}

/// Calendar date of `now` in an IANA timezone like "America/Chicago".
pub fn local_today(tz: &str, now: DateTime<Utc>) -> Result<NaiveDate> {
    let tz = parse_timezone(tz)?;
    Ok(now.with_timezone(&tz).date_naive())
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Agenda {
    pub overdue: Vec<Item>,
    pub today: Vec<Item>,
    pub tomorrow: Vec<Item>,
    pub upcoming: Vec<Item>,
}

impl Agenda {
    /// Open items with an estimated date, sorted by date, bucketed.
    pub fn build(items: &[Item], today: NaiveDate) -> Self {
        let mut dated: Vec<(NaiveDate, &Item)> = items
            .iter()
            .filter(|i| i.is_open())
            .filter_map(|i| i.estimated_date.map(|d| (d, i)))
            .collect();
        dated.sort_by_key(|(d, _)| *d);

        let tomorrow = today.checked_add_days(Days::new(1)).unwrap_or(today);
        let mut agenda = Agenda::default();
        for (date, item) in dated {
            let bucket = if date < today {
                &mut agenda.overdue
            } else if date == today {
                &mut agenda.today
            } else if date == tomorrow {
                &mut agenda.tomorrow
            } else {
                &mut agenda.upcoming
            };
            bucket.push(item.clone());
        }
        agenda
    }

    pub fn len(&self) -> usize {
        self.overdue.len() + self.today.len() + self.tomorrow.len() + self.upcoming.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sections in display order, empty ones included.
    pub fn sections(&self) -> [(&'static str, &[Item]); 4] {
        [
            ("Overdue", self.overdue.as_slice()),
            ("Today", self.today.as_slice()),
            ("Tomorrow", self.tomorrow.as_slice()),
            ("Upcoming", self.upcoming.as_slice()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemType;
    use chrono::TimeZone;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn local_today_respects_timezone() {
        // 03:00 UTC on Mar 6 is still Mar 5 in Chicago (CST, UTC-6).
        let now = Utc.with_ymd_and_hms(2026, 3, 6, 3, 0, 0).unwrap();
        assert_eq!(local_today("America/Chicago", now).unwrap(), d(2026, 3, 5));
        assert_eq!(local_today("UTC", now).unwrap(), d(2026, 3, 6));
        assert!(local_today("Mars/Olympus", now).is_err());
    }

    #[test]
    fn buckets_by_relative_day() {
        let created = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let mk = |id: &str, date: NaiveDate| Item::new(id, id, created).with_estimated_date(date);
        let mut done = mk("done", d(2026, 3, 5));
        done.completed_at = Some(created);
        let idea = mk("idea", d(2026, 3, 9)).with_type(ItemType::Idea);

        let items = vec![
            mk("later", d(2026, 3, 20)),
            mk("late", d(2026, 3, 1)),
            mk("now", d(2026, 3, 5)),
            mk("next", d(2026, 3, 6)),
            Item::new("undated", "undated", created),
            done,
            idea,
        ];

        let a = Agenda::build(&items, d(2026, 3, 5));
        assert_eq!(a.overdue[0].id, "late");
        assert_eq!(a.today.len(), 1);
        assert_eq!(a.today[0].id, "now");
        assert_eq!(a.tomorrow[0].id, "next");
        let upcoming: Vec<&str> = a.upcoming.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(upcoming, vec!["idea", "later"]);
        assert_eq!(a.len(), 5);
    }
}
