//! WebUntis lesson source implementation.

use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use untiscal_core::DateRange;

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{BoxFuture, Entity, LessonSource};
use crate::raw_lesson::RawLesson;

use super::client::{Session, WebUntisClient};
use super::config::WebUntisConfig;

/// WebUntis lesson source.
///
/// Logs in lazily on first use and shares one session across concurrent
/// fetches. Call [`LessonSource::close`] at the end of a run to log out.
pub struct WebUntisSource {
    client: WebUntisClient,
    session: Mutex<Option<Session>>,
}

impl WebUntisSource {
    /// Creates a new WebUntis source with the given configuration.
    pub fn new(config: WebUntisConfig) -> ProviderResult<Self> {
        let client = WebUntisClient::new(config)?;
        Ok(Self {
            client,
            session: Mutex::new(None),
        })
    }

    /// Returns the current session, logging in if there is none yet.
    async fn session(&self) -> ProviderResult<Session> {
        let mut guard = self.session.lock().await;
        if let Some(ref session) = *guard {
            return Ok(session.clone());
        }
        let session = self
            .client
            .authenticate()
            .await
            .map_err(|e| e.with_provider(self.name()))?;
        *guard = Some(session.clone());
        Ok(session)
    }

    /// Picks the first class, or else the first student, visible to the
    /// logged-in user.
    async fn detect_entity(&self) -> ProviderResult<Entity> {
        let session = self.session().await?;

        let classes = self.client.classes(&session).await?;
        if let Some(class) = classes.first() {
            info!(
                id = class.id,
                name = class.name.as_deref().unwrap_or("?"),
                "Auto-detected class"
            );
            return Ok(Entity::class(class.id));
        }

        let students = self.client.students(&session).await?;
        if let Some(student) = students.first() {
            info!(
                id = student.id,
                name = student.name.as_deref().unwrap_or("?"),
                "Auto-detected student"
            );
            return Ok(Entity::student(student.id));
        }

        Err(ProviderError::configuration(
            "no class id configured and no class or student is visible to this account",
        ))
    }

    async fn fetch_chunked(&self, entity: Entity, range: DateRange) -> ProviderResult<Vec<RawLesson>> {
        if range.is_empty() {
            return Ok(Vec::new());
        }
        let session = self.session().await?;
        let chunks = range.chunks(self.client.config().chunk_days);

        debug!(%entity, %range, chunks = chunks.len(), "Fetching timetable");

        let mut lessons = Vec::new();
        for (first, last) in chunks {
            let chunk = self
                .client
                .timetable(&session, entity, first, last)
                .await
                .map_err(|e| {
                    warn!(%entity, %first, %last, error = %e, "Timetable chunk failed");
                    e
                })?;
            debug!(%first, %last, records = chunk.len(), "Fetched timetable chunk");
            lessons.extend(chunk);
        }

        info!(%entity, records = lessons.len(), "Fetched timetable");
        Ok(lessons)
    }
}

impl LessonSource for WebUntisSource {
    fn name(&self) -> &str {
        "webuntis"
    }

    fn resolve_entity(&self, id: Option<i64>) -> BoxFuture<'_, ProviderResult<Entity>> {
        Box::pin(async move {
            match id {
                Some(id) => Ok(Entity::class(id)),
                None => self
                    .detect_entity()
                    .await
                    .map_err(|e| e.with_provider(self.name())),
            }
        })
    }

    fn fetch_lessons(
        &self,
        entity: Entity,
        range: DateRange,
    ) -> BoxFuture<'_, ProviderResult<Vec<RawLesson>>> {
        Box::pin(async move {
            self.fetch_chunked(entity, range)
                .await
                .map_err(|e| e.with_provider(self.name()))
        })
    }

    fn close(&self) -> BoxFuture<'_, ProviderResult<()>> {
        Box::pin(async move {
            let session = self.session.lock().await.take();
            if let Some(session) = session {
                self.client
                    .logout(&session)
                    .await
                    .map_err(|e| e.with_provider(self.name()))?;
                debug!("Logged out of WebUntis");
            }
            Ok(())
        })
    }
}
