//! iCalendar rendering.
//!
//! Turns [`CalendarEvent`]s into a single `VCALENDAR` document. Times are
//! written as local wall-clock values with a `TZID` parameter, and every
//! property derived from "now" is replaced by a value derived from the event
//! itself, so identical input renders to identical bytes.

use chrono::{NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use icalendar::{Calendar, Component, EventLike, Property};

use crate::event::CalendarEvent;

/// Product identifier written into every calendar.
pub const PRODID: &str = "-//untiscal//WebUntis Timetable//EN";

/// Default calendar display name.
pub const DEFAULT_CALENDAR_NAME: &str = "WebUntis Timetable";

/// Calendar-level metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarMeta {
    /// Display name (`X-WR-CALNAME`).
    pub name: String,
    /// School timezone; used for `TZID` and `X-WR-TIMEZONE`.
    pub timezone: Tz,
}

impl Default for CalendarMeta {
    fn default() -> Self {
        Self {
            name: DEFAULT_CALENDAR_NAME.to_string(),
            timezone: chrono_tz::Europe::Brussels,
        }
    }
}

impl CalendarMeta {
    /// Creates calendar metadata.
    pub fn new(name: impl Into<String>, timezone: Tz) -> Self {
        Self {
            name: name.into(),
            timezone,
        }
    }
}

/// Renders events into an iCalendar document with CRLF line endings.
pub fn render_calendar(meta: &CalendarMeta, events: &[CalendarEvent]) -> String {
    let tzid = meta.timezone.name();

    let mut cal = Calendar::new();
    cal.append_property(Property::new("X-WR-CALNAME", &meta.name));
    cal.append_property(Property::new("X-WR-TIMEZONE", tzid));

    for event in events {
        cal.push(render_event(event, meta.timezone));
    }

    tracing::debug!(events = events.len(), tzid, "Rendered calendar");

    strip_generated(&cal.done().to_string())
}

fn render_event(event: &CalendarEvent, tz: Tz) -> icalendar::Event {
    let mut ics_event = icalendar::Event::new();
    ics_event.uid(&event.uid);
    ics_event.summary(&event.summary);

    // Overwrites the wall-clock DTSTAMP the crate inserts by default.
    let dtstamp = utc_stamp(event.start, tz);
    ics_event.add_property("DTSTAMP", &dtstamp);

    add_local_datetime(&mut ics_event, "DTSTART", event.start, tz);
    add_local_datetime(&mut ics_event, "DTEND", event.end, tz);

    if let Some(ref location) = event.location {
        ics_event.location(location);
    }
    if let Some(ref description) = event.description {
        ics_event.description(description);
    }
    if event.is_cancelled() {
        ics_event.add_property("STATUS", "CANCELLED");
    }

    ics_event.done()
}

fn add_local_datetime(ics_event: &mut icalendar::Event, name: &str, at: NaiveDateTime, tz: Tz) {
    let value = at.format("%Y%m%dT%H%M%S").to_string();
    let mut prop = Property::new(name, &value);
    prop.add_parameter("TZID", tz.name());
    ics_event.append_property(prop);
}

/// Formats a local datetime as a UTC `DATE-TIME` value.
///
/// Times skipped by a DST transition fall back to the naive value.
fn utc_stamp(local: NaiveDateTime, tz: Tz) -> String {
    let utc = tz
        .from_local_datetime(&local)
        .earliest()
        .map(|dt| dt.naive_utc())
        .unwrap_or(local);
    utc.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Replaces the crate's PRODID and drops the redundant `CALSCALE:GREGORIAN`.
fn strip_generated(ics: &str) -> String {
    let mut result = String::with_capacity(ics.len());
    for line in ics.lines() {
        if line.starts_with("PRODID:") {
            result.push_str("PRODID:");
            result.push_str(PRODID);
            result.push_str("\r\n");
            continue;
        }
        if line == "CALSCALE:GREGORIAN" {
            continue;
        }
        result.push_str(line);
        result.push_str("\r\n");
    }
    result
}
