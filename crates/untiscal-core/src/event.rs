//! Calendar event records.
//!
//! [`build_event`] maps a [`MergedBlock`] onto a [`CalendarEvent`]: the flat,
//! display-ready record handed to the iCalendar writer.

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::lesson::{LessonType, MergedBlock};

/// Domain suffix appended to every generated UID.
pub const UID_DOMAIN: &str = "untiscal";

/// A calendar-ready event derived from one merged block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Stable identifier, identical across runs for unchanged input.
    pub uid: String,
    /// Subject plus lesson type marker.
    pub summary: String,
    /// Sorted rooms, comma separated.
    pub location: Option<String>,
    /// Teachers, classes and notes.
    pub description: Option<String>,
    /// School-local date of the event.
    pub date: NaiveDate,
    /// Local wall-clock start.
    pub start: NaiveDateTime,
    /// Local wall-clock end.
    pub end: NaiveDateTime,
    /// Lesson type of the underlying block.
    pub lesson_type: LessonType,
}

impl CalendarEvent {
    /// Returns true if the event marks a cancelled lesson.
    pub fn is_cancelled(&self) -> bool {
        self.lesson_type.is_cancelled()
    }
}

/// Builds a calendar event from a merged block.
pub fn build_event(block: &MergedBlock) -> CalendarEvent {
    CalendarEvent {
        uid: event_uid(block, 0),
        summary: summary(block),
        location: join_nonempty(block.rooms.iter(), ", "),
        description: description(block),
        date: block.date,
        start: block.starts_at(),
        end: block.ends_at(),
        lesson_type: block.lesson_type,
    }
}

/// Builds calendar events for a sequence of blocks, preserving order.
///
/// UIDs are unique within the result: a block whose UID is already taken is
/// rehashed with an occurrence counter.
pub fn build_events(blocks: &[MergedBlock]) -> Vec<CalendarEvent> {
    let mut seen = HashSet::new();
    blocks
        .iter()
        .map(|block| {
            let mut event = build_event(block);
            let mut occurrence = 0;
            while !seen.insert(event.uid.clone()) {
                occurrence += 1;
                event.uid = event_uid(block, occurrence);
            }
            event
        })
        .collect()
}

/// Derives a deterministic UID from the block's date, times, lesson type,
/// subject and rooms, plus `occurrence` when it is non-zero.
///
/// Fields are separated by a unit separator so that e.g. subject `"A"` with
/// room `"BC"` never collides with subject `"AB"` with room `"C"`.
fn event_uid(block: &MergedBlock, occurrence: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(block.date.format("%Y%m%d").to_string());
    hasher.update([0x1f]);
    hasher.update(block.start.to_string());
    hasher.update([0x1f]);
    hasher.update(block.end.to_string());
    hasher.update([0x1f]);
    hasher.update(block.lesson_type.as_str());
    hasher.update([0x1f]);
    hasher.update(&block.subject);
    for room in &block.rooms {
        hasher.update([0x1f]);
        hasher.update(room);
    }
    if occurrence > 0 {
        hasher.update([0x1e]);
        hasher.update(occurrence.to_string());
    }
    let digest = format!("{:x}", hasher.finalize());
    format!("{}@{}", &digest[..32], UID_DOMAIN)
}

fn summary(block: &MergedBlock) -> String {
    match block.lesson_type.marker() {
        Some(marker) => format!("{} {}", block.subject, marker),
        None => block.subject.clone(),
    }
}

fn description(block: &MergedBlock) -> Option<String> {
    let mut lines = Vec::new();
    if let Some(teachers) = join_nonempty(block.teachers.iter(), " / ") {
        lines.push(teachers);
    }
    if let Some(classes) = join_nonempty(block.classes.iter(), " / ") {
        lines.push(classes);
    }
    if !block.notes.is_empty() {
        lines.push("-".repeat(20));
        lines.extend(block.notes.iter().cloned());
    }
    (!lines.is_empty()).then(|| lines.join("\n"))
}

fn join_nonempty<'a>(values: impl Iterator<Item = &'a String>, separator: &str) -> Option<String> {
    let values: Vec<&str> = values.map(String::as_str).collect();
    (!values.is_empty()).then(|| values.join(separator))
}
