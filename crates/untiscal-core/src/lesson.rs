//! Lesson types for timetable data.
//!
//! This module provides the core value records that flow through the pipeline:
//! - [`Lesson`]: A single normalized timetable period
//! - [`MergedBlock`]: One or more lessons collapsed into a calendar-ready block
//! - [`LessonType`]: Regular, exam, cancelled or substituted
//! - [`Semester`]: Which timetable stream a lesson was fetched from

use std::collections::BTreeSet;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::time::ClockTime;

/// The kind of a lesson as reported by the scheduling platform.
///
/// The variant order is used as a deterministic tie-break when sorting.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum LessonType {
    /// A lesson taking place as planned.
    #[default]
    Regular,
    /// An exam.
    Exam,
    /// A lesson that was cancelled.
    Cancelled,
    /// A lesson with a substitute teacher, room or subject.
    Substituted,
}

impl LessonType {
    /// Returns the bracketed marker appended to event summaries, if any.
    pub fn marker(&self) -> Option<&'static str> {
        match self {
            Self::Regular => None,
            Self::Exam => Some("[Exam]"),
            Self::Cancelled => Some("[Cancelled]"),
            Self::Substituted => Some("[Substitution]"),
        }
    }

    /// Returns true if this lesson does not take place.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns a machine-readable name for this lesson type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Exam => "exam",
            Self::Cancelled => "cancelled",
            Self::Substituted => "substituted",
        }
    }
}

impl fmt::Display for LessonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The timetable stream a lesson was taken from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Semester {
    /// The timetable in effect before the switch date.
    #[default]
    Current,
    /// The timetable in effect from the switch date on.
    Future,
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Current => f.write_str("current"),
            Self::Future => f.write_str("future"),
        }
    }
}

/// A single normalized timetable lesson.
///
/// Lessons are produced once at the normalization boundary and never mutated
/// afterwards; every later stage derives new values from them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    /// School-local date of the lesson.
    pub date: NaiveDate,
    /// Wall-clock start time.
    pub start: ClockTime,
    /// Wall-clock end time.
    pub end: ClockTime,
    /// Subject display name.
    pub subject: String,
    /// Teachers assigned to the lesson.
    pub teachers: BTreeSet<String>,
    /// Rooms assigned to the lesson.
    pub rooms: BTreeSet<String>,
    /// Classes attending the lesson.
    pub classes: BTreeSet<String>,
    /// Free-text notes (lesson text, info, substitution text), deduplicated
    /// in first-seen order.
    pub notes: Vec<String>,
    /// The kind of lesson.
    pub lesson_type: LessonType,
    /// The stream this lesson was fetched from.
    pub semester: Semester,
}

impl Lesson {
    /// Creates a new regular lesson with no teachers, rooms or notes.
    pub fn new(
        date: NaiveDate,
        start: ClockTime,
        end: ClockTime,
        subject: impl Into<String>,
        semester: Semester,
    ) -> Self {
        Self {
            date,
            start,
            end,
            subject: subject.into(),
            teachers: BTreeSet::new(),
            rooms: BTreeSet::new(),
            classes: BTreeSet::new(),
            notes: Vec::new(),
            lesson_type: LessonType::Regular,
            semester,
        }
    }

    /// Builder method to add a teacher.
    pub fn with_teacher(mut self, teacher: impl Into<String>) -> Self {
        self.teachers.insert(teacher.into());
        self
    }

    /// Builder method to add a room.
    pub fn with_room(mut self, room: impl Into<String>) -> Self {
        self.rooms.insert(room.into());
        self
    }

    /// Builder method to add a class.
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.insert(class.into());
        self
    }

    /// Builder method to add a note; duplicates and blanks are ignored.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        push_unique(&mut self.notes, note.into());
        self
    }

    /// Builder method to set the lesson type.
    pub fn with_type(mut self, lesson_type: LessonType) -> Self {
        self.lesson_type = lesson_type;
        self
    }

    /// Returns the local start datetime.
    pub fn starts_at(&self) -> NaiveDateTime {
        self.start.on(self.date)
    }

    /// Returns the local end datetime.
    pub fn ends_at(&self) -> NaiveDateTime {
        self.end.on(self.date)
    }
}

/// A calendar-ready block of one or more merged lessons.
///
/// Invariants: `start < end`; all constituents share `subject` and
/// `lesson_type`; constituents are contiguous or share the same time slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedBlock {
    /// School-local date of the block.
    pub date: NaiveDate,
    /// Start of the first constituent.
    pub start: ClockTime,
    /// End of the last constituent.
    pub end: ClockTime,
    /// Shared subject.
    pub subject: String,
    /// Union of constituent teachers.
    pub teachers: BTreeSet<String>,
    /// Union of constituent rooms.
    pub rooms: BTreeSet<String>,
    /// Union of constituent classes.
    pub classes: BTreeSet<String>,
    /// Constituent notes, deduplicated in first-seen order.
    pub notes: Vec<String>,
    /// Shared lesson type.
    pub lesson_type: LessonType,
    /// Number of raw lessons folded into this block.
    pub lesson_count: usize,
}

impl MergedBlock {
    /// Opens a block containing a single lesson.
    pub fn from_lesson(lesson: &Lesson) -> Self {
        Self {
            date: lesson.date,
            start: lesson.start,
            end: lesson.end,
            subject: lesson.subject.clone(),
            teachers: lesson.teachers.clone(),
            rooms: lesson.rooms.clone(),
            classes: lesson.classes.clone(),
            notes: lesson.notes.clone(),
            lesson_type: lesson.lesson_type,
            lesson_count: 1,
        }
    }

    /// Returns the local start datetime.
    pub fn starts_at(&self) -> NaiveDateTime {
        self.start.on(self.date)
    }

    /// Returns the local end datetime.
    pub fn ends_at(&self) -> NaiveDateTime {
        self.end.on(self.date)
    }

    /// Returns true if `other` may be folded into this block at all: same
    /// date, subject and lesson type.
    pub(crate) fn is_compatible(&self, other: &MergedBlock) -> bool {
        self.date == other.date
            && self.subject == other.subject
            && self.lesson_type == other.lesson_type
    }

    /// Folds a block occupying the exact same slot into this one, taking
    /// the union of teachers, rooms and classes.
    pub(crate) fn absorb(&mut self, other: MergedBlock) {
        self.teachers.extend(other.teachers);
        self.rooms.extend(other.rooms);
        self.classes.extend(other.classes);
        self.merge_notes(other.notes);
        self.lesson_count += other.lesson_count;
    }

    /// Extends this block to cover a directly following block.
    pub(crate) fn extend(&mut self, other: MergedBlock) {
        self.end = other.end;
        self.classes.extend(other.classes);
        self.merge_notes(other.notes);
        self.lesson_count += other.lesson_count;
    }

    fn merge_notes(&mut self, notes: Vec<String>) {
        for note in notes {
            push_unique(&mut self.notes, note);
        }
    }
}

/// Appends `value` unless it is blank or already present.
fn push_unique(values: &mut Vec<String>, value: String) {
    let value = value.trim();
    if value.is_empty() || values.iter().any(|v| v == value) {
        return;
    }
    values.push(value.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(h: u32, m: u32) -> ClockTime {
        ClockTime::from_hm(h, m).unwrap()
    }

    fn math() -> Lesson {
        Lesson::new(date(2024, 1, 31), at(8, 0), at(8, 45), "Math", Semester::Current)
    }

    #[test]
    fn lesson_builder() {
        let lesson = math()
            .with_teacher("Smith")
            .with_teacher("Smith")
            .with_room("A101")
            .with_class("5a")
            .with_note("bring calculator")
            .with_type(LessonType::Exam);

        assert_eq!(lesson.teachers.len(), 1);
        assert!(lesson.rooms.contains("A101"));
        assert!(lesson.classes.contains("5a"));
        assert_eq!(lesson.notes, vec!["bring calculator".to_string()]);
        assert_eq!(lesson.lesson_type, LessonType::Exam);
        assert_eq!(lesson.semester, Semester::Current);
    }

    #[test]
    fn notes_skip_blank_and_duplicates() {
        let lesson = math().with_note("  ").with_note("x").with_note(" x ");
        assert_eq!(lesson.notes, vec!["x".to_string()]);
    }

    #[test]
    fn lesson_datetimes() {
        let lesson = math();
        assert_eq!(
            lesson.starts_at(),
            date(2024, 1, 31).and_hms_opt(8, 0, 0).unwrap()
        );
        assert_eq!(
            lesson.ends_at(),
            date(2024, 1, 31).and_hms_opt(8, 45, 0).unwrap()
        );
    }

    #[test]
    fn lesson_type_markers() {
        assert_eq!(LessonType::Regular.marker(), None);
        assert_eq!(LessonType::Exam.marker(), Some("[Exam]"));
        assert_eq!(LessonType::Cancelled.marker(), Some("[Cancelled]"));
        assert_eq!(LessonType::Substituted.marker(), Some("[Substitution]"));
        assert!(LessonType::Cancelled.is_cancelled());
        assert_eq!(LessonType::Substituted.to_string(), "substituted");
    }

    #[test]
    fn block_absorb_unions_sets() {
        let mut block = MergedBlock::from_lesson(&math().with_teacher("Smith").with_room("A101"));
        let other = MergedBlock::from_lesson(&math().with_teacher("Jones").with_room("A102"));

        assert!(block.is_compatible(&other));
        block.absorb(other);

        assert_eq!(block.teachers.len(), 2);
        assert_eq!(block.rooms.len(), 2);
        assert_eq!(block.lesson_count, 2);
        assert_eq!(block.end, at(8, 45));
    }

    #[test]
    fn block_extend_moves_end() {
        let mut block = MergedBlock::from_lesson(&math().with_note("a"));
        let next = Lesson::new(date(2024, 1, 31), at(8, 45), at(9, 30), "Math", Semester::Current)
            .with_note("b");
        block.extend(MergedBlock::from_lesson(&next));

        assert_eq!(block.start, at(8, 0));
        assert_eq!(block.end, at(9, 30));
        assert_eq!(block.notes, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn cancelled_block_is_not_compatible_with_regular() {
        let regular = MergedBlock::from_lesson(&math());
        let cancelled = MergedBlock::from_lesson(&math().with_type(LessonType::Cancelled));
        assert!(!regular.is_compatible(&cancelled));
    }

    #[test]
    fn serde_roundtrip() {
        let lesson = math().with_teacher("Smith").with_type(LessonType::Substituted);
        let json = serde_json::to_string(&lesson).unwrap();
        let parsed: Lesson = serde_json::from_str(&json).unwrap();
        assert_eq!(lesson, parsed);
    }
}
