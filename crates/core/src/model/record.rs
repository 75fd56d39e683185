use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::model::catalog::CourseCatalog;
use crate::model::{Badge, BadgeId, ContentId, LessonKey, QuestionKey, badge_catalog};

/// Upper bound on the recent-activity feed.
pub const MAX_RECENT_ACTIVITIES: usize = 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RecordError {
    #[error("unknown badge id: {0}")]
    UnknownBadge(BadgeId),
}

/// Outcome of one quiz question. Overwritten wholesale on resubmission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizOutcome {
    pub completed: bool,
    pub correct: bool,
    pub timestamp: DateTime<Utc>,
}

/// Completion state of one lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonOutcome {
    pub completed: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Lesson,
    Quiz,
    Badge,
}

impl ActivityKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityKind::Lesson => "lesson",
            ActivityKind::Quiz => "quiz",
            ActivityKind::Badge => "badge",
        }
    }
}

/// One entry in the recent-activity feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Unique, time-derived id.
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub course_id: ContentId,
    pub title: String,
    pub timestamp: DateTime<Utc>,
    /// Course-progress snapshot taken when the activity happened.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
}

/// The per-user progress record: the root document this engine maintains.
///
/// Scroll fractions are 0-100 per course or section; quiz and lesson maps
/// are keyed by composite keys; `recent_activities` is newest first and
/// bounded at [`MAX_RECENT_ACTIVITIES`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProgressRecord {
    pub scroll_progress: HashMap<ContentId, f64>,
    pub quiz_progress: HashMap<QuestionKey, QuizOutcome>,
    pub lesson_progress: HashMap<LessonKey, LessonOutcome>,
    pub badges: HashMap<BadgeId, Badge>,
    pub recent_activities: Vec<Activity>,
}

impl ProgressRecord {
    /// The default record for a fresh user: zero scroll on every tracked
    /// course and a locked copy of each catalog badge.
    #[must_use]
    pub fn initial(courses: &CourseCatalog) -> Self {
        let scroll_progress = courses
            .tracked()
            .iter()
            .map(|course| (course.clone(), 0.0))
            .collect();
        let badges = badge_catalog()
            .into_iter()
            .map(|badge| (badge.id.clone(), badge))
            .collect();
        Self {
            scroll_progress,
            quiz_progress: HashMap::new(),
            lesson_progress: HashMap::new(),
            badges,
            recent_activities: Vec::new(),
        }
    }

    /// Record how far the learner scrolled through a course or section.
    ///
    /// Monotonic: the stored value only moves up. Returns whether the
    /// stored value changed.
    pub fn raise_scroll_progress(&mut self, content_id: ContentId, value: f64) -> bool {
        let entry = self.scroll_progress.entry(content_id).or_insert(0.0);
        if value > *entry {
            *entry = value;
            return true;
        }
        false
    }

    /// Write (or overwrite, on resubmission) a quiz outcome.
    pub fn record_quiz_outcome(&mut self, key: QuestionKey, outcome: QuizOutcome) {
        self.quiz_progress.insert(key, outcome);
    }

    /// Write a lesson outcome.
    pub fn record_lesson_outcome(&mut self, key: LessonKey, outcome: LessonOutcome) {
        self.lesson_progress.insert(key, outcome);
    }

    /// Prepend an activity, dropping the oldest past the cap.
    pub fn push_activity(&mut self, activity: Activity) {
        self.recent_activities.insert(0, activity);
        self.recent_activities.truncate(MAX_RECENT_ACTIVITIES);
    }

    /// Unlock a badge at `now`.
    ///
    /// Returns the badge title when the badge transitioned to unlocked,
    /// `Ok(None)` when it was already unlocked.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::UnknownBadge` if no badge with this id exists
    /// in the record.
    pub fn unlock_badge(
        &mut self,
        badge_id: &BadgeId,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, RecordError> {
        let badge = self
            .badges
            .get_mut(badge_id)
            .ok_or_else(|| RecordError::UnknownBadge(badge_id.clone()))?;
        if badge.unlock(now) {
            Ok(Some(badge.title.clone()))
        } else {
            Ok(None)
        }
    }
}
