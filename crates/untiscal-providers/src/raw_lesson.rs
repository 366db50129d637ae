//! Raw lesson records as returned by a timetable platform.
//!
//! [`RawLesson`] mirrors the loosely-typed `getTimetable` period objects:
//! every field is optional so that one odd record never fails a whole
//! response. Validation happens in [`crate::normalize`].

use serde::{Deserialize, Serialize};

/// A named element attached to a period (subject, teacher, room or class).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawElement {
    /// Platform id of the element.
    #[serde(default)]
    pub id: Option<i64>,
    /// Short name, e.g. `"MA"` or `"A101"`.
    #[serde(default)]
    pub name: Option<String>,
    /// Long name, e.g. `"Mathematics"`.
    #[serde(default, alias = "longName")]
    pub longname: Option<String>,
}

impl RawElement {
    /// Creates an element with a short and a long name.
    pub fn new(name: impl Into<String>, longname: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
            longname: Some(longname.into()),
        }
    }

    /// Creates an element with only a short name.
    pub fn short(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
            longname: None,
        }
    }
}

/// A single timetable period before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLesson {
    /// Platform id of the period.
    #[serde(default)]
    pub id: Option<i64>,
    /// Date encoded as `YYYYMMDD`.
    #[serde(default)]
    pub date: Option<u32>,
    /// Start time encoded as `HHMM`.
    #[serde(default)]
    pub start_time: Option<u32>,
    /// End time encoded as `HHMM`.
    #[serde(default)]
    pub end_time: Option<u32>,
    /// Subjects.
    #[serde(default, rename = "su")]
    pub subjects: Vec<RawElement>,
    /// Teachers.
    #[serde(default, rename = "te")]
    pub teachers: Vec<RawElement>,
    /// Rooms.
    #[serde(default, rename = "ro")]
    pub rooms: Vec<RawElement>,
    /// Classes.
    #[serde(default, rename = "kl")]
    pub classes: Vec<RawElement>,
    /// Status code: absent, `"cancelled"` or `"irregular"`.
    #[serde(default)]
    pub code: Option<String>,
    /// Lesson type: `"ls"` (lesson), `"ex"` (exam), `"oh"` (office hour), ...
    #[serde(default)]
    pub lstype: Option<String>,
    /// Free-text info.
    #[serde(default)]
    pub info: Option<String>,
    /// Lesson text.
    #[serde(default)]
    pub lstext: Option<String>,
    /// Substitution text.
    #[serde(default)]
    pub subst_text: Option<String>,
}

impl RawLesson {
    /// Creates a record with date and times set and nothing else.
    pub fn new(date: u32, start_time: u32, end_time: u32) -> Self {
        Self {
            date: Some(date),
            start_time: Some(start_time),
            end_time: Some(end_time),
            ..Self::default()
        }
    }

    /// Builder method to add a subject.
    pub fn with_subject(mut self, subject: RawElement) -> Self {
        self.subjects.push(subject);
        self
    }

    /// Builder method to add a teacher.
    pub fn with_teacher(mut self, teacher: RawElement) -> Self {
        self.teachers.push(teacher);
        self
    }

    /// Builder method to add a room.
    pub fn with_room(mut self, room: RawElement) -> Self {
        self.rooms.push(room);
        self
    }

    /// Builder method to add a class.
    pub fn with_class(mut self, class: RawElement) -> Self {
        self.classes.push(class);
        self
    }

    /// Builder method to set the status code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Builder method to set the lesson type.
    pub fn with_lstype(mut self, lstype: impl Into<String>) -> Self {
        self.lstype = Some(lstype.into());
        self
    }

    /// Builder method to set the info text.
    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = Some(info.into());
        self
    }
}
