use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator used when composing child keys from a parent content id.
pub const KEY_SEPARATOR: char = '-';

/// Identifier of a signed-in learner, as issued by the identity provider.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifier of a course or section, used as a scroll-progress key.
///
/// Content ids are catalog slugs such as `math-beg` or
/// `math-beg-formula-rearrangement`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentId(String);

impl ContentId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Identifier of an achievement definition.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BadgeId(String);

impl BadgeId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Composite key for one quiz question: `{section_id}-{question_id}`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuestionKey(String);

impl QuestionKey {
    /// Compose the key for a question within a section.
    #[must_use]
    pub fn compose(section_id: &ContentId, question_id: &str) -> Self {
        Self(format!("{}{KEY_SEPARATOR}{question_id}", section_id.as_str()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this question belongs under the given course or section id.
    #[must_use]
    pub fn is_under(&self, content_id: &ContentId) -> bool {
        self.0.starts_with(content_id.as_str())
    }

    /// The portion of the key before the first separator.
    ///
    /// This is how the last-accessed lookup derives a course id from a
    /// question key; composite slugs resolve to their leading segment.
    #[must_use]
    pub fn leading_segment(&self) -> &str {
        self.0.split(KEY_SEPARATOR).next().unwrap_or(&self.0)
    }
}

/// Composite key for one lesson: `{course_id}-{lesson_id}`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LessonKey(String);

impl LessonKey {
    /// Compose the key for a lesson within a course.
    #[must_use]
    pub fn compose(course_id: &ContentId, lesson_id: &str) -> Self {
        Self(format!("{}{KEY_SEPARATOR}{lesson_id}", course_id.as_str()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", self.0)
    }
}

impl fmt::Debug for BadgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BadgeId({})", self.0)
    }
}

impl fmt::Debug for QuestionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuestionKey({})", self.0)
    }
}

impl fmt::Debug for LessonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LessonKey({})", self.0)
    }
}

// ─── Display Implementations ───────────────────────────────────────────────────

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for BadgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for QuestionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for LessonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ContentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<&str> for BadgeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_key_composes_with_separator() {
        let section = ContentId::new("math-beg-formula-rearrangement");
        let key = QuestionKey::compose(&section, "q1");
        assert_eq!(key.as_str(), "math-beg-formula-rearrangement-q1");
    }

    #[test]
    fn question_key_matches_section_and_course_prefixes() {
        let key = QuestionKey::compose(&ContentId::new("math-beg-fractions"), "q2");
        assert!(key.is_under(&ContentId::new("math-beg-fractions")));
        assert!(key.is_under(&ContentId::new("math-beg")));
        assert!(!key.is_under(&ContentId::new("math-int")));
    }

    #[test]
    fn leading_segment_stops_at_first_separator() {
        let key = QuestionKey::compose(&ContentId::new("math-beg"), "q1");
        assert_eq!(key.leading_segment(), "math");
    }

    #[test]
    fn lesson_key_composes_with_separator() {
        let key = LessonKey::compose(&ContentId::new("python-basics"), "lesson-3");
        assert_eq!(key.as_str(), "python-basics-lesson-3");
    }

    #[test]
    fn content_id_reports_empty() {
        assert!(ContentId::new("").is_empty());
        assert!(!ContentId::new("math-beg").is_empty());
    }
}
