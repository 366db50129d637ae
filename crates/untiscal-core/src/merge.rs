//! Lesson merging.
//!
//! Collapses the raw per-period lessons of each day into [`MergedBlock`]s:
//!
//! 1. **Co-teaching**: lessons sharing date, start, end, subject and lesson
//!    type become one block whose teachers, rooms and classes are the union
//!    of the constituents'.
//! 2. **Adjacency**: back-to-back blocks (`next.start == open.end`) with the
//!    same subject, teachers, rooms and lesson type are extended into one.
//!
//! Lessons are sorted first, then each rule runs as a single left-to-right
//! sweep with one open block. Days never merge into each other, and since the
//! lesson type must match, cancelled lessons never merge with lessons that
//! still take place.

use std::cmp::Ordering;

use tracing::debug;

use crate::lesson::{Lesson, MergedBlock};

/// Merges lessons into calendar-ready blocks.
///
/// The result is ordered by date, then start time, and does not depend on the
/// order of `lessons`.
pub fn merge_lessons(lessons: &[Lesson]) -> Vec<MergedBlock> {
    let mut sorted: Vec<&Lesson> = lessons.iter().collect();
    sorted.sort_by(|a, b| compare_lessons(a, b));

    let mut blocks = Vec::with_capacity(sorted.len());
    for day in sorted.chunk_by(|a, b| a.date == b.date) {
        let co_taught = merge_co_taught(day);
        blocks.extend(merge_adjacent(co_taught));
    }

    debug!(
        lessons = lessons.len(),
        blocks = blocks.len(),
        "Merged lessons into blocks"
    );

    blocks
}

/// Total order used before merging: `(date, start, end)`, then subject, type,
/// teachers and rooms so identical slots of one subject sit next to each other.
fn compare_lessons(a: &Lesson, b: &Lesson) -> Ordering {
    (
        a.date,
        a.start,
        a.end,
        &a.subject,
        a.lesson_type,
        &a.teachers,
        &a.rooms,
    )
        .cmp(&(
            b.date,
            b.start,
            b.end,
            &b.subject,
            b.lesson_type,
            &b.teachers,
            &b.rooms,
        ))
}

/// First sweep: folds lessons occupying the same slot into one block.
fn merge_co_taught(day: &[&Lesson]) -> Vec<MergedBlock> {
    let mut blocks = Vec::new();
    let mut open: Option<MergedBlock> = None;

    for lesson in day {
        let next = MergedBlock::from_lesson(lesson);
        if let Some(block) = open.as_mut()
            && is_same_slot(block, &next)
        {
            block.absorb(next);
            continue;
        }
        if let Some(done) = open.replace(next) {
            blocks.push(done);
        }
    }

    blocks.extend(open);
    blocks
}

/// Second sweep: extends blocks with directly following identical content.
fn merge_adjacent(blocks: Vec<MergedBlock>) -> Vec<MergedBlock> {
    let mut merged = Vec::with_capacity(blocks.len());
    let mut open: Option<MergedBlock> = None;

    for next in blocks {
        if let Some(block) = open.as_mut()
            && is_continuation(block, &next)
        {
            block.extend(next);
            continue;
        }
        if let Some(done) = open.replace(next) {
            merged.push(done);
        }
    }

    merged.extend(open);
    merged
}

fn is_same_slot(open: &MergedBlock, next: &MergedBlock) -> bool {
    open.is_compatible(next) && open.start == next.start && open.end == next.end
}

fn is_continuation(open: &MergedBlock, next: &MergedBlock) -> bool {
    open.is_compatible(next)
        && open.end == next.start
        && open.teachers == next.teachers
        && open.rooms == next.rooms
}
