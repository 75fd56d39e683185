use chrono::{DateTime, Utc};

use crate::model::BadgeId;

/// Closed set of achievement icons.
///
/// Display tokens do not round-trip through the persistence layer, so every
/// icon has a stable stored name and this enum is the single seam where the
/// conversion happens. `Medal` doubles as the reserved default for anything
/// unrecognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BadgeIcon {
    Bolt,
    SquareRoot,
    Trophy,
    Fire,
    Star,
    Moon,
    Sun,
    Medal,
}

/// Stored name reserved for unmapped icons.
pub const DEFAULT_ICON_NAME: &str = "default";

impl BadgeIcon {
    /// Stable name used in the persisted document.
    #[must_use]
    pub fn stored_name(self) -> &'static str {
        match self {
            BadgeIcon::Bolt => "bolt",
            BadgeIcon::SquareRoot => "square-root",
            BadgeIcon::Trophy => "trophy",
            BadgeIcon::Fire => "fire",
            BadgeIcon::Star => "star",
            BadgeIcon::Moon => "moon",
            BadgeIcon::Sun => "sun",
            BadgeIcon::Medal => DEFAULT_ICON_NAME,
        }
    }

    /// Decode a stored name; unknown names fall back to the default icon.
    #[must_use]
    pub fn from_stored_name(name: &str) -> Self {
        match name {
            "bolt" => BadgeIcon::Bolt,
            "square-root" => BadgeIcon::SquareRoot,
            "trophy" => BadgeIcon::Trophy,
            "fire" => BadgeIcon::Fire,
            "star" => BadgeIcon::Star,
            "moon" => BadgeIcon::Moon,
            "sun" => BadgeIcon::Sun,
            _ => BadgeIcon::Medal,
        }
    }

    /// Every icon in the closed vocabulary.
    #[must_use]
    pub fn all() -> &'static [BadgeIcon] {
        &[
            BadgeIcon::Bolt,
            BadgeIcon::SquareRoot,
            BadgeIcon::Trophy,
            BadgeIcon::Fire,
            BadgeIcon::Star,
            BadgeIcon::Moon,
            BadgeIcon::Sun,
            BadgeIcon::Medal,
        ]
    }
}

impl Default for BadgeIcon {
    fn default() -> Self {
        BadgeIcon::Medal
    }
}

/// An achievement definition plus per-user unlock state.
///
/// `id`, `title`, `description` and `icon` are defined in code; `unlocked`,
/// `unlocked_at` and `progress` are user data.
#[derive(Debug, Clone, PartialEq)]
pub struct Badge {
    pub id: BadgeId,
    pub title: String,
    pub description: String,
    pub unlocked: bool,
    pub unlocked_at: Option<DateTime<Utc>>,
    /// Partial-credit indicator in [0,100] for not-yet-unlocked badges.
    pub progress: f64,
    pub icon: BadgeIcon,
}

impl Badge {
    /// A locked badge definition with no user data yet.
    #[must_use]
    pub fn definition(id: &str, title: &str, description: &str, icon: BadgeIcon) -> Self {
        Self {
            id: BadgeId::new(id),
            title: title.to_owned(),
            description: description.to_owned(),
            unlocked: false,
            unlocked_at: None,
            progress: 0.0,
            icon,
        }
    }

    /// Mark the badge unlocked at `now`.
    ///
    /// Unlock is terminal: returns false (and changes nothing, including
    /// `unlocked_at`) if the badge is already unlocked.
    pub fn unlock(&mut self, now: DateTime<Utc>) -> bool {
        if self.unlocked {
            return false;
        }
        self.unlocked = true;
        self.unlocked_at = Some(now);
        self.progress = 100.0;
        true
    }
}

/// The static achievement catalog.
///
/// The first three have evaluator rules; the rest are definitions that
/// existing stored records pick up through the forward-compatible merge.
#[must_use]
pub fn badge_catalog() -> Vec<Badge> {
    vec![
        Badge::definition(
            "quick-learner",
            "Quick Learner",
            "Complete 5 lessons in a day",
            BadgeIcon::Bolt,
        ),
        Badge::definition(
            "math-master",
            "Math Master",
            "Complete Basic Mathematics course",
            BadgeIcon::SquareRoot,
        ),
        Badge::definition(
            "perfect-score",
            "Perfect Score",
            "Get 100% in all quizzes",
            BadgeIcon::Trophy,
        ),
        Badge::definition(
            "streak-master",
            "Streak Master",
            "Complete lessons for 7 days in a row",
            BadgeIcon::Fire,
        ),
        Badge::definition(
            "quiz-champion",
            "Quiz Champion",
            "Complete 10 quizzes with perfect scores",
            BadgeIcon::Star,
        ),
        Badge::definition(
            "speed-learner",
            "Speed Learner",
            "Complete a course in under 24 hours",
            BadgeIcon::Bolt,
        ),
        Badge::definition(
            "night-owl",
            "Night Owl",
            "Study between 10 PM and 5 AM",
            BadgeIcon::Moon,
        ),
        Badge::definition(
            "early-bird",
            "Early Bird",
            "Study between 5 AM and 8 AM",
            BadgeIcon::Sun,
        ),
    ]
}
