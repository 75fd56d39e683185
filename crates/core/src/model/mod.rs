mod badge;
mod catalog;
mod ids;
mod record;

pub use badge::{Badge, BadgeIcon, DEFAULT_ICON_NAME, badge_catalog};
pub use catalog::CourseCatalog;
pub use ids::{BadgeId, ContentId, KEY_SEPARATOR, LessonKey, QuestionKey, UserId};
pub use record::{
    Activity, ActivityKind, LessonOutcome, MAX_RECENT_ACTIVITIES, ProgressRecord, QuizOutcome,
    RecordError,
};
