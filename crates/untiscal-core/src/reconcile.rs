//! Semester reconciliation.
//!
//! Two timetables are fetched independently: the current semester's entity
//! and, optionally, the entity that takes over from a configured switch date.
//! [`reconcile`] turns both streams into one chronological lesson stream,
//! choosing exactly one source per date.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::lesson::{Lesson, Semester};
use crate::time::DateRange;

/// Decides which semester's lessons are authoritative for a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchPolicy {
    /// First date on which the future entity applies.
    pub switch_date: NaiveDate,
    /// Entity id of the current timetable.
    pub current_entity_id: Option<i64>,
    /// Entity id of the future timetable; switching is disabled without it.
    pub future_entity_id: Option<i64>,
}

impl SwitchPolicy {
    /// Creates a policy that never switches.
    pub fn current_only(switch_date: NaiveDate, current_entity_id: Option<i64>) -> Self {
        Self {
            switch_date,
            current_entity_id,
            future_entity_id: None,
        }
    }

    /// Builder method to set the future entity.
    pub fn with_future_entity(mut self, entity_id: i64) -> Self {
        self.future_entity_id = Some(entity_id);
        self
    }

    /// Returns true if a future entity is configured.
    pub fn switches(&self) -> bool {
        self.future_entity_id.is_some()
    }

    /// Returns the semester whose lessons apply on `date`.
    pub fn semester_for(&self, date: NaiveDate) -> Semester {
        if self.switches() && date >= self.switch_date {
            Semester::Future
        } else {
            Semester::Current
        }
    }

    /// Returns the part of `range` served by the current semester.
    pub fn current_range(&self, range: DateRange) -> DateRange {
        if self.switches() {
            DateRange::clamped(range.start, range.end.min(self.switch_date))
        } else {
            range
        }
    }

    /// Returns the part of `range` served by the future semester, or `None`
    /// when switching is disabled or the switch date lies past the range.
    pub fn future_range(&self, range: DateRange) -> Option<DateRange> {
        if !self.switches() {
            return None;
        }
        let future = DateRange::clamped(range.start.max(self.switch_date), range.end);
        (!future.is_empty()).then_some(future)
    }
}

/// The outcome of fetching the future semester's timetable.
#[derive(Debug, Clone, Default)]
pub enum FutureLessons {
    /// The fetch succeeded.
    Fetched(Vec<Lesson>),
    /// The fetch failed; the reason is kept for error reporting.
    Failed {
        /// Human-readable failure reason.
        reason: String,
    },
    /// No fetch was attempted.
    #[default]
    Skipped,
}

/// Returned when a date needs future-semester lessons that are unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("future timetable required from {switch_date} but unavailable: {reason}")]
pub struct FutureFetchError {
    /// The configured switch date.
    pub switch_date: NaiveDate,
    /// Why the future lessons are missing.
    pub reason: String,
}

/// Merges the current and future lesson streams into one timeline.
///
/// For every date in `range`, the lessons of exactly one semester are kept as
/// decided by `policy`; lessons outside `range` are dropped. The output is in
/// date order, and within a date in `(start, end)` order.
///
/// # Errors
///
/// Returns [`FutureFetchError`] if any date in `range` resolves to the future
/// semester while `future` is not [`FutureLessons::Fetched`]. Falling back to
/// current-semester lessons on those dates would silently publish the wrong
/// timetable.
pub fn reconcile(
    policy: &SwitchPolicy,
    range: DateRange,
    current: Vec<Lesson>,
    future: FutureLessons,
) -> Result<Vec<Lesson>, FutureFetchError> {
    let needs_future = policy.future_range(range).is_some();

    let future = match future {
        FutureLessons::Fetched(lessons) => lessons,
        FutureLessons::Failed { reason } if needs_future => {
            return Err(FutureFetchError {
                switch_date: policy.switch_date,
                reason,
            });
        }
        FutureLessons::Skipped if needs_future => {
            return Err(FutureFetchError {
                switch_date: policy.switch_date,
                reason: "future timetable was not fetched".to_string(),
            });
        }
        FutureLessons::Failed { .. } | FutureLessons::Skipped => Vec::new(),
    };

    let mut current_by_date = group_by_date(current);
    let mut future_by_date = group_by_date(future);

    let mut timeline = Vec::new();
    let mut future_days = 0usize;
    for date in range.days() {
        let selected = match policy.semester_for(date) {
            Semester::Current => current_by_date.remove(&date),
            Semester::Future => {
                future_days += 1;
                future_by_date.remove(&date)
            }
        };
        if let Some(mut lessons) = selected {
            lessons.sort_by(|a, b| (a.start, a.end).cmp(&(b.start, b.end)));
            timeline.extend(lessons);
        }
    }

    if future_days > 0 {
        info!(
            switch_date = %policy.switch_date,
            future_days,
            "Future timetable applied from switch date"
        );
    }
    debug!(
        range = %range,
        lessons = timeline.len(),
        "Reconciled semester streams"
    );

    Ok(timeline)
}

fn group_by_date(lessons: Vec<Lesson>) -> BTreeMap<NaiveDate, Vec<Lesson>> {
    let mut by_date: BTreeMap<NaiveDate, Vec<Lesson>> = BTreeMap::new();
    for lesson in lessons {
        by_date.entry(lesson.date).or_default().push(lesson);
    }
    by_date
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::ClockTime;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn lesson(day: NaiveDate, subject: &str, semester: Semester) -> Lesson {
        Lesson::new(
            day,
            ClockTime::from_hm(8, 0).unwrap(),
            ClockTime::from_hm(8, 45).unwrap(),
            subject,
            semester,
        )
    }

    fn switching_policy() -> SwitchPolicy {
        SwitchPolicy::current_only(date(2024, 2, 1), Some(100)).with_future_entity(200)
    }

    fn range() -> DateRange {
        DateRange::new(date(2024, 1, 29), date(2024, 2, 5))
    }

    mod policy {
        use super::*;

        #[test]
        fn resolves_semester_by_date() {
            let policy = switching_policy();
            assert_eq!(policy.semester_for(date(2024, 1, 31)), Semester::Current);
            assert_eq!(policy.semester_for(date(2024, 2, 1)), Semester::Future);
            assert_eq!(policy.semester_for(date(2024, 3, 1)), Semester::Future);
        }

        #[test]
        fn switching_is_opt_in() {
            let policy = SwitchPolicy::current_only(date(2024, 2, 1), Some(100));
            assert!(!policy.switches());
            assert_eq!(policy.semester_for(date(2024, 3, 1)), Semester::Current);
            assert_eq!(policy.current_range(range()), range());
            assert_eq!(policy.future_range(range()), None);
        }

        #[test]
        fn splits_range_at_switch_date() {
            let policy = switching_policy();
            assert_eq!(
                policy.current_range(range()),
                DateRange::new(date(2024, 1, 29), date(2024, 2, 1))
            );
            assert_eq!(
                policy.future_range(range()),
                Some(DateRange::new(date(2024, 2, 1), date(2024, 2, 5)))
            );
        }

        #[test]
        fn switch_after_range_needs_no_future() {
            let policy =
                SwitchPolicy::current_only(date(2024, 6, 1), Some(100)).with_future_entity(200);
            assert_eq!(policy.future_range(range()), None);
            assert_eq!(policy.current_range(range()), range());
        }

        #[test]
        fn switch_before_range_leaves_current_empty() {
            let policy =
                SwitchPolicy::current_only(date(2023, 9, 1), Some(100)).with_future_entity(200);
            assert!(policy.current_range(range()).is_empty());
            assert_eq!(policy.future_range(range()), Some(range()));
        }
    }

    mod streams {
        use super::*;

        #[test]
        fn picks_one_semester_per_date() {
            let current = vec![
                lesson(date(2024, 1, 31), "Old Math", Semester::Current),
                lesson(date(2024, 2, 1), "Old Math", Semester::Current),
            ];
            let future = vec![
                lesson(date(2024, 1, 31), "New Math", Semester::Future),
                lesson(date(2024, 2, 1), "New Math", Semester::Future),
            ];

            let timeline = reconcile(
                &switching_policy(),
                range(),
                current,
                FutureLessons::Fetched(future),
            )
            .unwrap();

            assert_eq!(timeline.len(), 2);
            assert_eq!(timeline[0].date, date(2024, 1, 31));
            assert_eq!(timeline[0].subject, "Old Math");
            assert_eq!(timeline[0].semester, Semester::Current);
            assert_eq!(timeline[1].date, date(2024, 2, 1));
            assert_eq!(timeline[1].subject, "New Math");
            assert_eq!(timeline[1].semester, Semester::Future);
        }

        #[test]
        fn never_blends_semesters_on_one_date() {
            let current = vec![lesson(date(2024, 2, 2), "Old", Semester::Current)];
            let future = vec![lesson(date(2024, 2, 2), "New", Semester::Future)];

            let timeline = reconcile(
                &switching_policy(),
                range(),
                current,
                FutureLessons::Fetched(future),
            )
            .unwrap();

            assert_eq!(timeline.len(), 1);
            assert_eq!(timeline[0].subject, "New");
        }

        #[test]
        fn without_future_entity_current_applies_everywhere() {
            let policy = SwitchPolicy::current_only(date(2024, 2, 1), Some(100));
            let current = vec![
                lesson(date(2024, 1, 30), "Math", Semester::Current),
                lesson(date(2024, 2, 3), "Math", Semester::Current),
            ];

            let timeline = reconcile(&policy, range(), current, FutureLessons::Skipped).unwrap();
            assert_eq!(timeline.len(), 2);
        }

        #[test]
        fn drops_lessons_outside_range() {
            let policy = SwitchPolicy::current_only(date(2024, 2, 1), Some(100));
            let current = vec![
                lesson(date(2024, 1, 1), "Math", Semester::Current),
                lesson(date(2024, 1, 30), "Math", Semester::Current),
                lesson(date(2024, 2, 5), "Math", Semester::Current),
            ];

            let timeline = reconcile(&policy, range(), current, FutureLessons::Skipped).unwrap();
            assert_eq!(timeline.len(), 1);
            assert_eq!(timeline[0].date, date(2024, 1, 30));
        }

        #[test]
        fn output_is_chronological() {
            let policy = SwitchPolicy::current_only(date(2024, 2, 1), Some(100));
            let late = Lesson::new(
                date(2024, 1, 30),
                ClockTime::from_hm(10, 0).unwrap(),
                ClockTime::from_hm(10, 45).unwrap(),
                "Art",
                Semester::Current,
            );
            let current = vec![
                lesson(date(2024, 2, 2), "Math", Semester::Current),
                late,
                lesson(date(2024, 1, 30), "Math", Semester::Current),
            ];

            let timeline = reconcile(&policy, range(), current, FutureLessons::Skipped).unwrap();
            let order: Vec<_> = timeline
                .iter()
                .map(|l| (l.date, l.subject.as_str()))
                .collect();
            assert_eq!(
                order,
                vec![
                    (date(2024, 1, 30), "Math"),
                    (date(2024, 1, 30), "Art"),
                    (date(2024, 2, 2), "Math"),
                ]
            );
        }
    }

    mod failures {
        use super::*;

        #[test]
        fn failed_future_fetch_after_switch_is_fatal() {
            let current = vec![lesson(date(2024, 2, 2), "Old", Semester::Current)];

            let err = reconcile(
                &switching_policy(),
                range(),
                current,
                FutureLessons::Failed {
                    reason: "connection reset".to_string(),
                },
            )
            .unwrap_err();

            assert_eq!(err.switch_date, date(2024, 2, 1));
            assert!(err.to_string().contains("connection reset"));
        }

        #[test]
        fn skipped_future_fetch_after_switch_is_fatal() {
            let result = reconcile(
                &switching_policy(),
                range(),
                Vec::new(),
                FutureLessons::Skipped,
            );
            assert!(result.is_err());
        }

        #[test]
        fn failed_future_fetch_before_switch_is_harmless() {
            let policy =
                SwitchPolicy::current_only(date(2024, 6, 1), Some(100)).with_future_entity(200);
            let current = vec![lesson(date(2024, 2, 2), "Math", Semester::Current)];

            let timeline = reconcile(
                &policy,
                range(),
                current,
                FutureLessons::Failed {
                    reason: "timeout".to_string(),
                },
            )
            .unwrap();

            assert_eq!(timeline.len(), 1);
        }
    }
}
