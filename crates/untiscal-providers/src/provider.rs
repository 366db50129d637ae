//! LessonSource trait definition.
//!
//! This module defines the [`LessonSource`] trait, the seam between the sync
//! pipeline and a timetable platform, plus two in-process sources:
//! [`StaticSource`] for offline input and tests, and [`ErrorSource`] for
//! exercising failure paths.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use untiscal_core::DateRange;

use crate::error::{ProviderError, ProviderResult};
use crate::normalize::parse_date;
use crate::raw_lesson::RawLesson;

/// The kind of timetable owner being queried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    /// A school class.
    #[default]
    Class,
    /// A single student.
    Student,
}

impl ElementKind {
    /// Returns the numeric element type used by WebUntis.
    pub fn code(self) -> u8 {
        match self {
            Self::Class => 1,
            Self::Student => 5,
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Class => "class",
            Self::Student => "student",
        };
        f.write_str(name)
    }
}

/// The owner of a timetable: an element id plus its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    /// Platform element id.
    pub id: i64,
    /// Element kind.
    pub kind: ElementKind,
}

impl Entity {
    /// Creates a class entity.
    pub fn class(id: i64) -> Self {
        Self {
            id,
            kind: ElementKind::Class,
        }
    }

    /// Creates a student entity.
    pub fn student(id: i64) -> Self {
        Self {
            id,
            kind: ElementKind::Student,
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

/// A boxed future for async trait methods.
///
/// Boxed futures keep the trait object-safe so the pipeline can hold a
/// `&dyn LessonSource`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A source of raw timetable records.
///
/// Implementations must be `Send + Sync`: the current and future semester
/// are fetched concurrently from the same source.
pub trait LessonSource: Send + Sync {
    /// Returns the name of this source (e.g., "webuntis").
    fn name(&self) -> &str;

    /// Resolves the entity whose timetable is fetched.
    ///
    /// An explicit id is taken as a class. The default implementation
    /// requires one; sources that can discover an entity override this.
    fn resolve_entity(&self, id: Option<i64>) -> BoxFuture<'_, ProviderResult<Entity>> {
        let result = id.map(Entity::class).ok_or_else(|| {
            ProviderError::configuration("no class id configured").with_provider(self.name())
        });
        Box::pin(async move { result })
    }

    /// Fetches every raw record of `entity` whose date lies in `range`.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` on authentication, network or protocol
    /// failures. A partial result is never returned.
    fn fetch_lessons(
        &self,
        entity: Entity,
        range: DateRange,
    ) -> BoxFuture<'_, ProviderResult<Vec<RawLesson>>>;

    /// Releases any session held by the source. Best effort.
    fn close(&self) -> BoxFuture<'_, ProviderResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

/// An in-memory source keyed by entity id.
///
/// Records are filtered by date on fetch, like a real platform would.
/// Records without a parseable date are always returned so that the
/// normalizer can report them.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    lessons: BTreeMap<i64, Vec<RawLesson>>,
}

impl StaticSource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to register the records of an entity.
    pub fn with_lessons(mut self, entity_id: i64, lessons: Vec<RawLesson>) -> Self {
        self.lessons.entry(entity_id).or_default().extend(lessons);
        self
    }

    fn in_range(raw: &RawLesson, range: DateRange) -> bool {
        raw.date
            .and_then(parse_date)
            .is_none_or(|date| range.contains(date))
    }
}

impl LessonSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    /// Falls back to the lowest registered entity id.
    fn resolve_entity(&self, id: Option<i64>) -> BoxFuture<'_, ProviderResult<Entity>> {
        let result = id
            .or_else(|| self.lessons.keys().next().copied())
            .map(Entity::class)
            .ok_or_else(|| {
                ProviderError::configuration("no lessons registered").with_provider(self.name())
            });
        Box::pin(async move { result })
    }

    fn fetch_lessons(
        &self,
        entity: Entity,
        range: DateRange,
    ) -> BoxFuture<'_, ProviderResult<Vec<RawLesson>>> {
        let lessons = self
            .lessons
            .get(&entity.id)
            .map(|all| {
                all.iter()
                    .filter(|raw| Self::in_range(raw, range))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Box::pin(async move { Ok(lessons) })
    }
}

/// A source that always returns an error.
#[derive(Debug)]
pub struct ErrorSource {
    name: String,
    error: ProviderError,
}

impl ErrorSource {
    /// Creates a new error source.
    pub fn new(name: impl Into<String>, error: ProviderError) -> Self {
        Self {
            name: name.into(),
            error,
        }
    }

    fn error(&self) -> ProviderError {
        // ProviderError is not Clone because of its boxed source.
        ProviderError::new(self.error.code(), self.error.message()).with_provider(&self.name)
    }
}

impl LessonSource for ErrorSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch_lessons(
        &self,
        _entity: Entity,
        _range: DateRange,
    ) -> BoxFuture<'_, ProviderResult<Vec<RawLesson>>> {
        let error = self.error();
        Box::pin(async move { Err(error) })
    }
}
