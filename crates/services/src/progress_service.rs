use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use progress_core::badges;
use progress_core::calculator::{self, LastAccessed};
use progress_core::model::{
    Activity, ActivityKind, Badge, BadgeId, ContentId, LessonKey, LessonOutcome, ProgressRecord,
    QuestionKey, QuizOutcome,
};
use storage::StoredProgressRecord;

use crate::session_context::SessionContext;
use crate::sync_gateway::PersistRequest;

//
// ─── PROGRESS STORE ────────────────────────────────────────────────────────────
//

/// Owns mutations of the live progress record for the signed-in user.
///
/// Every mutation is synchronous on the in-memory record (copy-on-write:
/// derive a new record, run the Badge Evaluator, swap) and enqueues a
/// fire-and-forget persist of the full document through the Sync Gateway.
/// Without a signed-in user mutations are logged no-ops; reads always work
/// against whatever record is in memory.
pub struct ProgressService {
    context: Arc<SessionContext>,
    persist_tx: mpsc::UnboundedSender<PersistRequest>,
    activity_seq: AtomicU64,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        context: Arc<SessionContext>,
        persist_tx: mpsc::UnboundedSender<PersistRequest>,
    ) -> Self {
        Self {
            context,
            persist_tx,
            activity_seq: AtomicU64::new(0),
        }
    }

    // ─── Mutations ─────────────────────────────────────────────────────────────

    /// Record how far the learner scrolled through a course or section.
    /// Monotonic; non-finite values and empty ids are ignored.
    pub fn update_scroll_progress(&self, content_id: &str, value: f64) {
        if content_id.is_empty() || !value.is_finite() {
            debug!(content_id, value, "ignoring invalid scroll progress");
            return;
        }
        self.mutate("update_scroll_progress", |record, _now| {
            record.raise_scroll_progress(ContentId::new(content_id), value);
        });
    }

    /// Record a quiz answer. Overwrites any earlier outcome for the same
    /// question (resubmission).
    pub fn update_quiz_progress(&self, section_id: &str, question_id: &str, correct: bool) {
        if section_id.is_empty() || question_id.is_empty() {
            debug!(section_id, question_id, "ignoring quiz progress with empty id");
            return;
        }
        self.mutate("update_quiz_progress", |record, now| {
            record.record_quiz_outcome(
                QuestionKey::compose(&ContentId::new(section_id), question_id),
                QuizOutcome {
                    completed: true,
                    correct,
                    timestamp: now,
                },
            );
        });
    }

    /// Mark a lesson complete and log it in the recent-activity feed with a
    /// snapshot of the course's progress.
    pub fn mark_lesson_complete(&self, course_id: &str, lesson_id: &str) {
        if course_id.is_empty() || lesson_id.is_empty() {
            debug!(course_id, lesson_id, "ignoring lesson completion with empty id");
            return;
        }
        let activity_id = self.next_activity_id(ActivityKind::Lesson);
        self.mutate("mark_lesson_complete", |record, now| {
            let course = ContentId::new(course_id);
            record.record_lesson_outcome(
                LessonKey::compose(&course, lesson_id),
                LessonOutcome {
                    completed: true,
                    timestamp: now,
                },
            );
            let progress = calculator::course_progress(record, &course);
            record.push_activity(Activity {
                id: activity_id,
                kind: ActivityKind::Lesson,
                course_id: course,
                title: format!("Completed {lesson_id}"),
                timestamp: now,
                progress: Some(progress),
            });
        });
    }

    /// Unlock a badge directly.
    ///
    /// Primarily driven by the Badge Evaluator after mutations, but safe to
    /// call from outside; unlocking an already-unlocked or unknown badge
    /// changes nothing.
    pub fn unlock_badge(&self, badge_id: &str) {
        let activity_id = self.next_activity_id(ActivityKind::Badge);
        self.mutate("unlock_badge", |record, now| {
            apply_unlock(record, &BadgeId::new(badge_id), activity_id, now);
        });
    }

    // ─── Reads ─────────────────────────────────────────────────────────────────

    #[must_use]
    pub fn section_progress(&self, section_id: &str) -> f64 {
        let shared = self.context.lock();
        calculator::section_progress(&shared.record, &ContentId::new(section_id))
    }

    #[must_use]
    pub fn course_progress(&self, course_id: &str) -> f64 {
        let shared = self.context.lock();
        calculator::course_progress(&shared.record, &ContentId::new(course_id))
    }

    /// Mean progress over the catalog's tracked courses.
    #[must_use]
    pub fn total_progress(&self) -> f64 {
        let shared = self.context.lock();
        calculator::total_progress(&shared.record, self.context.catalog().tracked())
    }

    #[must_use]
    pub fn last_accessed(&self) -> Option<LastAccessed> {
        let shared = self.context.lock();
        calculator::last_accessed(&shared.record, self.context.catalog())
    }

    #[must_use]
    pub fn badges(&self) -> HashMap<BadgeId, Badge> {
        self.context.lock().record.badges.clone()
    }

    #[must_use]
    pub fn recent_activities(&self) -> Vec<Activity> {
        self.context.lock().record.recent_activities.clone()
    }

    /// A snapshot of the whole record, newest state first in activities.
    #[must_use]
    pub fn record(&self) -> ProgressRecord {
        self.context.lock().record.clone()
    }

    /// True until the first hydration completes (or resolves to signed-out).
    #[must_use]
    pub fn loading(&self) -> bool {
        self.context.lock().loading
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.context.lock().user.is_some()
    }

    /// Where the gateway stands for the current user.
    #[must_use]
    pub fn sync_state(&self) -> crate::sync_gateway::SyncState {
        self.context.lock().sync
    }

    // ─── Internals ─────────────────────────────────────────────────────────────

    /// Copy-on-write mutation: clone the record, apply the operation, run
    /// the Badge Evaluator, swap the record in, and enqueue a persist of
    /// the full document.
    fn mutate(
        &self,
        operation: &'static str,
        apply: impl FnOnce(&mut ProgressRecord, DateTime<Utc>),
    ) {
        let now = self.context.clock().now();

        let request = {
            let mut shared = self.context.lock();
            let Some(user_id) = shared.user.clone() else {
                warn!(operation, "cannot track progress: no user signed in");
                return;
            };

            let mut next = shared.record.clone();
            apply(&mut next, now);

            for badge_id in badges::evaluate(&next, now) {
                let activity_id = self.next_activity_id(ActivityKind::Badge);
                apply_unlock(&mut next, &badge_id, activity_id, now);
            }

            let document = StoredProgressRecord::from_record(&next, &user_id, now);
            shared.record = next;
            PersistRequest { user_id, document }
        };

        // Fire and forget: the gateway logs failures, the next successful
        // write carries the latest state forward.
        if self.persist_tx.send(request).is_err() {
            warn!(operation, "persist queue closed; keeping local state only");
        }
    }

    /// Unique, time-derived activity id.
    fn next_activity_id(&self, kind: ActivityKind) -> String {
        let seq = self.activity_seq.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}-{seq}", kind.as_str(), self.context.clock().unix_millis())
    }
}

/// Transition a badge to unlocked and log the achievement, if it exists
/// and is still locked.
fn apply_unlock(
    record: &mut ProgressRecord,
    badge_id: &BadgeId,
    activity_id: String,
    now: DateTime<Utc>,
) {
    match record.unlock_badge(badge_id, now) {
        Ok(Some(title)) => {
            record.push_activity(Activity {
                id: activity_id,
                kind: ActivityKind::Badge,
                course_id: ContentId::new("system"),
                title: format!("Earned {title} badge!"),
                timestamp: now,
                progress: None,
            });
        }
        Ok(None) => {}
        Err(error) => warn!(%badge_id, %error, "cannot unlock badge"),
    }
}
