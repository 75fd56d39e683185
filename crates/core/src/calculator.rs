//! Pure completion-percentage math over a [`ProgressRecord`].
//!
//! No I/O and no mutation; every function returns a value in [0,100] for
//! any record, including one with zero quizzes and zero scroll entries.

use crate::model::{ContentId, CourseCatalog, ProgressRecord, QuizOutcome};

const SCROLL_WEIGHT: f64 = 0.3;
const QUIZ_WEIGHT: f64 = 0.7;

/// The course a learner most recently touched, for the dashboard header.
#[derive(Debug, Clone, PartialEq)]
pub struct LastAccessed {
    pub title: String,
    pub progress: f64,
}

/// Clamp a percentage into [0,100]; non-finite inputs collapse to 0.
///
/// Upstream monotonicity can be violated by a race between sessions, so
/// outputs are clamped even when the inputs should already be in range.
#[must_use]
pub fn clamp_percent(value: f64) -> f64 {
    if value.is_finite() { value.clamp(0.0, 100.0) } else { 0.0 }
}

/// Completion percentage for a section: 30% furthest scroll, 70% share of
/// its quizzes completed. With no quizzes recorded under the section the
/// scroll fraction stands alone.
#[must_use]
pub fn section_progress(record: &ProgressRecord, section_id: &ContentId) -> f64 {
    weighted_progress(record, section_id)
}

/// Completion percentage for a course, using the same 30/70 weighting over
/// every quiz recorded under the course id.
#[must_use]
pub fn course_progress(record: &ProgressRecord, course_id: &ContentId) -> f64 {
    weighted_progress(record, course_id)
}

/// Arithmetic mean of `course_progress` over the tracked course list.
#[must_use]
pub fn total_progress(record: &ProgressRecord, courses: &[ContentId]) -> f64 {
    if courses.is_empty() {
        return 0.0;
    }
    let sum: f64 = courses
        .iter()
        .map(|course| course_progress(record, course))
        .sum();
    #[allow(clippy::cast_precision_loss)]
    let count = courses.len() as f64;
    clamp_percent(sum / count)
}

/// The most recently answered quiz, resolved to a course title and that
/// course's progress. `None` until the learner has answered a quiz.
///
/// The course id is the question key's segment before the first separator;
/// ids the catalog does not know resolve to
/// [`CourseCatalog::UNKNOWN_COURSE`].
#[must_use]
pub fn last_accessed(record: &ProgressRecord, catalog: &CourseCatalog) -> Option<LastAccessed> {
    let (key, _) = record
        .quiz_progress
        .iter()
        .max_by_key(|(_, outcome)| outcome.timestamp)?;
    let course_id = key.leading_segment();
    Some(LastAccessed {
        title: catalog.course_name(course_id).to_owned(),
        progress: course_progress(record, &ContentId::new(course_id)),
    })
}

fn weighted_progress(record: &ProgressRecord, content_id: &ContentId) -> f64 {
    if content_id.is_empty() {
        return 0.0;
    }

    let quizzes: Vec<&QuizOutcome> = record
        .quiz_progress
        .iter()
        .filter(|(key, _)| key.is_under(content_id))
        .map(|(_, outcome)| outcome)
        .collect();

    let scroll = record
        .scroll_progress
        .get(content_id)
        .copied()
        .unwrap_or(0.0);

    // Zero quizzes must short-circuit to the scroll-only branch, never NaN.
    if quizzes.is_empty() {
        return clamp_percent(scroll);
    }

    let completed = quizzes.iter().filter(|q| q.completed).count();
    #[allow(clippy::cast_precision_loss)]
    let completion_ratio = completed as f64 / quizzes.len() as f64;

    clamp_percent(SCROLL_WEIGHT * scroll + QUIZ_WEIGHT * completion_ratio * 100.0)
}
