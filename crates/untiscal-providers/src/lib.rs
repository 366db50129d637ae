//! LessonSource trait and implementations.
//!
//! This crate sits between a timetable platform and the pure core:
//!
//! - [`LessonSource`] - The trait every timetable backend implements
//! - [`RawLesson`] - Loosely-typed records as delivered by the platform
//! - [`normalize_lessons`] - Validation boundary from raw records to lessons
//! - [`ProviderError`] - Error types for source operations
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐
//! │  WebUntis API   │    │  JSON snapshot  │
//! └────────┬────────┘    └────────┬────────┘
//!          │                      │
//!          ▼                      ▼
//! ┌─────────────────┐    ┌─────────────────┐
//! │ WebUntisSource  │    │  StaticSource   │
//! └────────┬────────┘    └────────┬────────┘
//!          │                      │
//!          │     LessonSource     │
//!          └──────────┬───────────┘
//!                     │
//!                     ▼
//!              ┌─────────────┐
//!              │  RawLesson  │
//!              └──────┬──────┘
//!                     │
//!                     ▼ normalize_lessons()
//!              ┌─────────────┐
//!              │   Lesson    │
//!              └─────────────┘
//! ```

pub mod error;
pub mod normalize;
pub mod provider;
pub mod raw_lesson;
#[cfg(feature = "webuntis")]
pub mod webuntis;

// Re-export main types at crate root
pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use normalize::{
    MalformedRecordError, NameStyle, NormalizedBatch, normalize_batch, normalize_lesson,
    normalize_lessons,
};
pub use provider::{BoxFuture, ElementKind, Entity, ErrorSource, LessonSource, StaticSource};
pub use raw_lesson::{RawElement, RawLesson};
