//! Core types and algorithms: lessons, merging, semester reconciliation,
//! calendar events and iCalendar rendering

pub mod event;
pub mod ics;
pub mod lesson;
pub mod merge;
pub mod reconcile;
pub mod time;
pub mod tracing;

pub use event::{CalendarEvent, build_event, build_events};
pub use ics::{CalendarMeta, render_calendar};
pub use lesson::{Lesson, LessonType, MergedBlock, Semester};
pub use merge::merge_lessons;
pub use reconcile::{FutureFetchError, FutureLessons, SwitchPolicy, reconcile};
pub use time::{ClockTime, DateRange};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
