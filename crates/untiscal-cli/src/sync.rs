//! Sync pipeline: fetch, normalize, reconcile, merge and render.

use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, info, warn};
use untiscal_core::{
    CalendarMeta, DateRange, FutureLessons, Semester, SwitchPolicy, build_events, merge_lessons,
    reconcile, render_calendar,
};
use untiscal_providers::{
    LessonSource, NameStyle, ProviderResult, RawLesson, StaticSource, normalize_lessons,
};

use crate::config::Config;
use crate::error::{SyncError, SyncResult};

/// Entity id used for offline current-semester records when none is
/// configured.
pub const RAW_INPUT_CURRENT_ID: i64 = 0;

/// Everything a run needs besides the source.
#[derive(Debug, Clone)]
pub struct SyncPlan {
    /// Which semester applies on which date.
    pub policy: SwitchPolicy,
    /// Dates to publish.
    pub window: DateRange,
    /// Element naming.
    pub names: NameStyle,
    /// Whether cancelled lessons are published.
    pub include_cancelled: bool,
    /// Calendar name and timezone.
    pub meta: CalendarMeta,
}

impl SyncPlan {
    /// Builds the plan for a run on `today`.
    pub fn from_config(config: &Config, today: NaiveDate) -> SyncResult<Self> {
        Ok(Self {
            policy: config.switch_policy(today),
            window: config.window(today),
            names: config.calendar.name_style,
            include_cancelled: config.calendar.include_cancelled,
            meta: config.calendar_meta()?,
        })
    }
}

/// Raw lessons read from a JSON file by `sync --raw-input`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawInput {
    /// Records of the current timetable.
    pub current: Vec<RawLesson>,
    /// Records of the future timetable.
    pub future: Vec<RawLesson>,
}

impl RawInput {
    /// Reads raw lessons from `path`.
    pub fn load(path: &Path) -> SyncResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| SyncError::io(path, e))?;
        serde_json::from_str(&content).map_err(|source| SyncError::Input {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Registers the records under the entity ids of `policy`.
    ///
    /// Future records are dropped with a warning when no future class is
    /// configured.
    pub fn into_source(self, policy: &SwitchPolicy) -> StaticSource {
        let current_id = policy.current_entity_id.unwrap_or(RAW_INPUT_CURRENT_ID);
        let source = StaticSource::new().with_lessons(current_id, self.current);
        match policy.future_entity_id {
            Some(future_id) => source.with_lessons(future_id, self.future),
            None => {
                if !self.future.is_empty() {
                    warn!(
                        records = self.future.len(),
                        "Ignoring future records, no future class configured"
                    );
                }
                source
            }
        }
    }
}

/// Runs the pipeline against `source` and returns the rendered calendar.
///
/// The current and future timetables are fetched concurrently. A failed
/// current fetch aborts the run; a failed future fetch aborts it only if a
/// date in the window needs the future timetable.
pub async fn build_calendar(source: &dyn LessonSource, plan: &SyncPlan) -> SyncResult<String> {
    let policy = &plan.policy;
    let current_range = policy.current_range(plan.window);
    let future_range = policy.future_range(plan.window);

    debug!(
        source = source.name(),
        window = %plan.window,
        current = %current_range,
        future = ?future_range.map(|r| r.to_string()),
        "Planning fetch"
    );

    let fetch_current = async {
        if current_range.is_empty() {
            return Ok(Vec::new());
        }
        fetch_entity(source, policy.current_entity_id, current_range).await
    };
    let fetch_future = async {
        match (future_range, policy.future_entity_id) {
            (Some(range), Some(id)) => Some(fetch_entity(source, Some(id), range).await),
            _ => None,
        }
    };
    let (current, future) = tokio::join!(fetch_current, fetch_future);

    let current = normalize_lessons(&current?, Semester::Current, plan.names);
    let future = match future {
        None => FutureLessons::Skipped,
        Some(Ok(raws)) => FutureLessons::Fetched(normalize_lessons(&raws, Semester::Future, plan.names)),
        Some(Err(e)) => {
            warn!(error = %e, "Future timetable fetch failed");
            FutureLessons::Failed {
                reason: e.to_string(),
            }
        }
    };

    let mut lessons = reconcile(policy, plan.window, current, future)?;
    if !plan.include_cancelled {
        let before = lessons.len();
        lessons.retain(|lesson| !lesson.lesson_type.is_cancelled());
        debug!(dropped = before - lessons.len(), "Dropped cancelled lessons");
    }

    let blocks = merge_lessons(&lessons);
    let events = build_events(&blocks);
    info!(
        lessons = lessons.len(),
        events = events.len(),
        "Built calendar events"
    );

    Ok(render_calendar(&plan.meta, &events))
}

async fn fetch_entity(
    source: &dyn LessonSource,
    id: Option<i64>,
    range: DateRange,
) -> ProviderResult<Vec<RawLesson>> {
    let entity = source.resolve_entity(id).await?;
    source.fetch_lessons(entity, range).await
}
