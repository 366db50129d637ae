//! RawLesson to Lesson conversion.
//!
//! This is the validation boundary of the pipeline: a [`RawLesson`] either
//! becomes a well-formed [`Lesson`] or is rejected with a
//! [`MalformedRecordError`]. Batch normalization logs and skips rejected
//! records instead of failing.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use untiscal_core::{ClockTime, Lesson, LessonType, Semester};

use crate::raw_lesson::{RawElement, RawLesson};

/// Which element name is shown in the calendar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameStyle {
    /// Prefer the long name, fall back to the short one.
    #[default]
    Long,
    /// Prefer the short name, fall back to the long one.
    Short,
}

impl NameStyle {
    /// Picks the display name of an element; blank names count as absent.
    pub fn display_name(&self, element: &RawElement) -> Option<String> {
        let long = non_blank(element.longname.as_deref());
        let short = non_blank(element.name.as_deref());
        let name = match self {
            Self::Long => long.or(short),
            Self::Short => short.or(long),
        };
        name.map(str::to_string)
    }
}

impl fmt::Display for NameStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => f.write_str("long"),
            Self::Short => f.write_str("short"),
        }
    }
}

/// A raw record that cannot be turned into a lesson.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedRecordError {
    /// A required field is absent or blank.
    #[error("record {record}: missing {field}")]
    MissingField {
        record: String,
        field: &'static str,
    },
    /// The `YYYYMMDD` date does not denote a calendar date.
    #[error("record {record}: invalid date {value}")]
    InvalidDate { record: String, value: u32 },
    /// An `HHMM` time is out of range.
    #[error("record {record}: invalid {field} {value}")]
    InvalidTime {
        record: String,
        field: &'static str,
        value: u32,
    },
    /// The lesson does not end after it starts.
    #[error("record {record}: end {end} is not after start {start}")]
    EmptyInterval {
        record: String,
        start: ClockTime,
        end: ClockTime,
    },
}

/// Converts one raw record into a [`Lesson`].
///
/// Several subjects are joined with `", "` in platform order. Teachers,
/// rooms and classes are deduplicated; notes are collected from
/// the lesson text, info and substitution text in that order.
///
/// # Errors
///
/// Returns [`MalformedRecordError`] if the date, either time or the subject
/// is missing or invalid, or if the end is not after the start.
pub fn normalize_lesson(
    raw: &RawLesson,
    semester: Semester,
    names: NameStyle,
) -> Result<Lesson, MalformedRecordError> {
    let record = record_label(raw);

    let date_value = raw.date.ok_or_else(|| MalformedRecordError::MissingField {
        record: record.clone(),
        field: "date",
    })?;
    let date = parse_date(date_value).ok_or_else(|| MalformedRecordError::InvalidDate {
        record: record.clone(),
        value: date_value,
    })?;

    let start = parse_time(&record, "startTime", raw.start_time)?;
    let end = parse_time(&record, "endTime", raw.end_time)?;
    if end <= start {
        return Err(MalformedRecordError::EmptyInterval { record, start, end });
    }

    let mut subjects: Vec<String> = Vec::with_capacity(raw.subjects.len());
    for name in raw.subjects.iter().filter_map(|su| names.display_name(su)) {
        if !subjects.contains(&name) {
            subjects.push(name);
        }
    }
    if subjects.is_empty() {
        return Err(MalformedRecordError::MissingField {
            record,
            field: "subject",
        });
    }
    let subject = subjects.join(", ");

    let mut lesson = Lesson::new(date, start, end, subject, semester).with_type(lesson_type(raw));
    for teacher in raw.teachers.iter().filter_map(|te| names.display_name(te)) {
        lesson = lesson.with_teacher(teacher);
    }
    for room in raw.rooms.iter().filter_map(|ro| names.display_name(ro)) {
        lesson = lesson.with_room(room);
    }
    for class in raw.classes.iter().filter_map(|kl| names.display_name(kl)) {
        lesson = lesson.with_class(class);
    }
    for note in [&raw.lstext, &raw.info, &raw.subst_text].into_iter().flatten() {
        lesson = lesson.with_note(note.as_str());
    }

    Ok(lesson)
}

/// Outcome of normalizing a batch of raw records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedBatch {
    /// Lessons in input order.
    pub lessons: Vec<Lesson>,
    /// Why each skipped record was rejected, in input order.
    pub skipped: Vec<MalformedRecordError>,
}

/// Normalizes a batch of raw records, skipping malformed ones.
///
/// Every skipped record is logged at `warn` level and reported in
/// [`NormalizedBatch::skipped`]; the batch itself never fails.
pub fn normalize_batch(raws: &[RawLesson], semester: Semester, names: NameStyle) -> NormalizedBatch {
    let mut batch = NormalizedBatch {
        lessons: Vec::with_capacity(raws.len()),
        skipped: Vec::new(),
    };

    for raw in raws {
        match normalize_lesson(raw, semester, names) {
            Ok(lesson) => batch.lessons.push(lesson),
            Err(error) => {
                warn!(%semester, %error, "Skipping malformed lesson record");
                batch.skipped.push(error);
            }
        }
    }

    debug!(
        %semester,
        records = raws.len(),
        lessons = batch.lessons.len(),
        skipped = batch.skipped.len(),
        "Normalized lesson records"
    );

    batch
}

/// Like [`normalize_batch`], keeping only the lessons.
pub fn normalize_lessons(raws: &[RawLesson], semester: Semester, names: NameStyle) -> Vec<Lesson> {
    normalize_batch(raws, semester, names).lessons
}

/// Maps platform status fields to a lesson type.
///
/// Cancellation wins over exam, which wins over substitution.
fn lesson_type(raw: &RawLesson) -> LessonType {
    let code = raw.code.as_deref().map(str::trim);
    let lstype = raw.lstype.as_deref().map(str::trim);

    if code == Some("cancelled") {
        LessonType::Cancelled
    } else if lstype == Some("ex") {
        LessonType::Exam
    } else if code == Some("irregular") {
        LessonType::Substituted
    } else {
        LessonType::Regular
    }
}

/// Parses a `YYYYMMDD` date.
pub(crate) fn parse_date(value: u32) -> Option<NaiveDate> {
    let year = i32::try_from(value / 10_000).ok()?;
    NaiveDate::from_ymd_opt(year, (value / 100) % 100, value % 100)
}

fn parse_time(
    record: &str,
    field: &'static str,
    value: Option<u32>,
) -> Result<ClockTime, MalformedRecordError> {
    let value = value.ok_or_else(|| MalformedRecordError::MissingField {
        record: record.to_string(),
        field,
    })?;
    ClockTime::from_hhmm(value).ok_or_else(|| MalformedRecordError::InvalidTime {
        record: record.to_string(),
        field,
        value,
    })
}

fn record_label(raw: &RawLesson) -> String {
    match raw.id {
        Some(id) => format!("#{id}"),
        None => "<no id>".to_string(),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
