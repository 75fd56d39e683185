//! Persisted shape of the per-user progress document.
//!
//! Mirrors the remote document schema: the same top-level maps as the
//! in-memory record, except that badges carry an `iconName` string instead
//! of a display icon, plus `lastUpdated` and the owning `userId` for
//! defense-in-depth validation. Conversion back into a domain record is
//! the forward-compatible merge: catalog badges missing from storage are
//! added locked, unknown stored badges are preserved but never evaluated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use progress_core::model::{
    Activity, Badge, BadgeIcon, BadgeId, ContentId, CourseCatalog, LessonKey, LessonOutcome,
    MAX_RECENT_ACTIVITIES, ProgressRecord, QuestionKey, QuizOutcome, UserId,
};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DocumentError {
    /// The raw document does not have the required shape.
    #[error("malformed progress document: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The document claims a different owner than the bound user.
    #[error("progress document owned by {found}, expected {expected}")]
    WrongOwner { expected: UserId, found: UserId },
}

/// Persisted form of a badge. `icon_name` is required: a badge entry
/// without a recognized-shape icon key fails structural validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredBadge {
    pub id: String,
    pub title: String,
    pub description: String,
    pub unlocked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlocked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub progress: f64,
    pub icon_name: String,
}

impl StoredBadge {
    fn from_badge(badge: &Badge) -> Self {
        Self {
            id: badge.id.as_str().to_owned(),
            title: badge.title.clone(),
            description: badge.description.clone(),
            unlocked: badge.unlocked,
            unlocked_at: badge.unlocked_at,
            progress: badge.progress,
            icon_name: badge.icon.stored_name().to_owned(),
        }
    }

    fn into_badge(self, id: BadgeId) -> Badge {
        Badge {
            id,
            title: self.title,
            description: self.description,
            unlocked: self.unlocked,
            unlocked_at: self.unlocked_at,
            progress: self.progress,
            icon: BadgeIcon::from_stored_name(&self.icon_name),
        }
    }
}

/// The root persisted document, one per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredProgressRecord {
    pub scroll_progress: HashMap<ContentId, f64>,
    pub quiz_progress: HashMap<QuestionKey, QuizOutcome>,
    pub lesson_progress: HashMap<LessonKey, LessonOutcome>,
    pub badges: HashMap<BadgeId, StoredBadge>,
    pub recent_activities: Vec<Activity>,
    pub last_updated: DateTime<Utc>,
    pub user_id: UserId,
}

impl StoredProgressRecord {
    /// Snapshot a domain record into its persisted form, encoding icons
    /// through their stored names.
    #[must_use]
    pub fn from_record(record: &ProgressRecord, user_id: &UserId, now: DateTime<Utc>) -> Self {
        Self {
            scroll_progress: record.scroll_progress.clone(),
            quiz_progress: record.quiz_progress.clone(),
            lesson_progress: record.lesson_progress.clone(),
            badges: record
                .badges
                .iter()
                .map(|(id, badge)| (id.clone(), StoredBadge::from_badge(badge)))
                .collect(),
            recent_activities: record.recent_activities.clone(),
            last_updated: now,
            user_id: user_id.clone(),
        }
    }

    /// Validate a raw document structurally and check its owner.
    ///
    /// # Errors
    ///
    /// Returns `DocumentError::Malformed` if a required map is missing or
    /// mistyped, or `DocumentError::WrongOwner` if the document carries a
    /// different user id than expected.
    pub fn parse(
        document: &serde_json::Value,
        expected_user: &UserId,
    ) -> Result<Self, DocumentError> {
        let stored: Self = serde_json::from_value(document.clone())?;
        if stored.user_id != *expected_user {
            return Err(DocumentError::WrongOwner {
                expected: expected_user.clone(),
                found: stored.user_id,
            });
        }
        Ok(stored)
    }

    /// Encode into the raw document form handed to the stores.
    ///
    /// # Errors
    ///
    /// Returns `DocumentError::Malformed` if encoding fails (it cannot for
    /// this shape, but the serializer contract surfaces through).
    pub fn to_document(&self) -> Result<serde_json::Value, DocumentError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Merge this stored document into a fresh default record.
    ///
    /// Starts from the defaults for `courses`, keeps the stored
    /// scroll/quiz/lesson maps verbatim, overlays stored unlock state onto
    /// catalog badges (title/description/icon always come from code), adds
    /// catalog badges missing from storage in their locked defaults, and
    /// preserves stored badges the catalog no longer knows.
    #[must_use]
    pub fn merge_into_record(self, courses: &CourseCatalog) -> ProgressRecord {
        let mut record = ProgressRecord::initial(courses);

        record.scroll_progress = self.scroll_progress;
        record.quiz_progress = self.quiz_progress;
        record.lesson_progress = self.lesson_progress;

        let mut stored_badges = self.badges;
        for (id, badge) in &mut record.badges {
            if let Some(stored) = stored_badges.remove(id) {
                badge.unlocked = stored.unlocked;
                badge.unlocked_at = stored.unlocked_at;
                badge.progress = stored.progress;
            }
        }
        for (id, stored) in stored_badges {
            record.badges.insert(id.clone(), stored.into_badge(id));
        }

        record.recent_activities = self.recent_activities;
        record.recent_activities.truncate(MAX_RECENT_ACTIVITIES);

        record
    }
}
