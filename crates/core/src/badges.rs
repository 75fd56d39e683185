//! Badge Evaluator: a stateless rule engine over the progress record.
//!
//! Each rule is a pure predicate registered in [`rules`]; the caller applies
//! the returned transitions. New rules slot into the table without touching
//! persisted data beyond the catalog merge picking up their definition.

use chrono::{DateTime, Utc};

use crate::calculator::course_progress;
use crate::model::{BadgeId, ContentId, ProgressRecord};

/// Lessons that must be completed within one calendar day for quick-learner.
pub const QUICK_LEARNER_DAILY_LESSONS: usize = 5;

/// One achievement rule: a badge id and the predicate that unlocks it.
pub struct BadgeRule {
    pub badge_id: &'static str,
    pub predicate: fn(&ProgressRecord, DateTime<Utc>) -> bool,
}

/// The rule table. Order is unlock-evaluation order.
#[must_use]
pub fn rules() -> &'static [BadgeRule] {
    static RULES: [BadgeRule; 3] = [
        BadgeRule {
            badge_id: "quick-learner",
            predicate: quick_learner,
        },
        BadgeRule {
            badge_id: "math-master",
            predicate: math_master,
        },
        BadgeRule {
            badge_id: "perfect-score",
            predicate: perfect_score,
        },
    ];
    &RULES
}

/// Badge ids whose rule is satisfied and whose badge is still locked.
///
/// Never returns an already-unlocked badge, so applying the result is
/// idempotent and unlock stays terminal. Badges absent from the record
/// (not yet merged) are skipped rather than invented.
#[must_use]
pub fn evaluate(record: &ProgressRecord, now: DateTime<Utc>) -> Vec<BadgeId> {
    rules()
        .iter()
        .filter(|rule| {
            record
                .badges
                .get(&BadgeId::new(rule.badge_id))
                .is_some_and(|badge| !badge.unlocked)
                && (rule.predicate)(record, now)
        })
        .map(|rule| BadgeId::new(rule.badge_id))
        .collect()
}

fn quick_learner(record: &ProgressRecord, now: DateTime<Utc>) -> bool {
    let today = now.date_naive();
    let completed_today = record
        .lesson_progress
        .values()
        .filter(|outcome| outcome.completed && outcome.timestamp.date_naive() == today)
        .count();
    completed_today >= QUICK_LEARNER_DAILY_LESSONS
}

fn math_master(record: &ProgressRecord, _now: DateTime<Utc>) -> bool {
    course_progress(record, &ContentId::new("math-beg")) >= 100.0
}

fn perfect_score(record: &ProgressRecord, _now: DateTime<Utc>) -> bool {
    !record.quiz_progress.is_empty() && record.quiz_progress.values().all(|quiz| quiz.correct)
}
