use crate::model::ContentId;

/// Static course catalog: display names for known courses, plus the list of
/// courses whose progress contributes to the overall percentage.
///
/// The engine only references catalog ids; course structure itself lives
/// outside this subsystem.
#[derive(Debug, Clone)]
pub struct CourseCatalog {
    names: Vec<(ContentId, String)>,
    tracked: Vec<ContentId>,
}

impl CourseCatalog {
    /// Fallback display name for ids the catalog does not know.
    pub const UNKNOWN_COURSE: &'static str = "Unknown Course";

    #[must_use]
    pub fn new(names: Vec<(ContentId, String)>, tracked: Vec<ContentId>) -> Self {
        Self { names, tracked }
    }

    /// The catalog shipped with the platform.
    #[must_use]
    pub fn builtin() -> Self {
        let names = [
            ("math-beg", "Basic Mathematics"),
            ("math-int", "Intermediate Mathematics"),
            ("math-adv", "Advanced Mathematics"),
            ("html-basics", "HTML & CSS Basics"),
            ("js-basics", "JavaScript Essentials"),
            ("python-basics", "Python Fundamentals"),
        ]
        .into_iter()
        .map(|(id, name)| (ContentId::new(id), name.to_owned()))
        .collect();
        let tracked = ["math-beg", "math-int", "math-adv"]
            .into_iter()
            .map(ContentId::new)
            .collect();
        Self { names, tracked }
    }

    /// Display name for a course id, or [`Self::UNKNOWN_COURSE`].
    #[must_use]
    pub fn course_name(&self, course_id: &str) -> &str {
        self.names
            .iter()
            .find(|(id, _)| id.as_str() == course_id)
            .map_or(Self::UNKNOWN_COURSE, |(_, name)| name.as_str())
    }

    /// Courses included in the overall progress average.
    #[must_use]
    pub fn tracked(&self) -> &[ContentId] {
        &self.tracked
    }
}

impl Default for CourseCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
