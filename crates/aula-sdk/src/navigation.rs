//! Lesson ordering and navigation resolution
//!
//! A course arrives as a module tree; the lesson view needs a flat
//! ordered sequence, an access-filtered visible subset, and an answer
//! to "which lesson do I show, and what are its neighbours". Everything
//! here is pure once the access decision is in hand, so the whole of it
//! is unit-testable without a CMS.

use tracing::warn;

use aula_cms_client::{Course, Lesson};

use crate::session::Session;
use crate::store::EnrollmentStore;

/// Whether the viewer may watch beyond the free previews
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Granted,
    Denied,
}

impl AccessDecision {
    pub fn from_enrollment_exists(enrolled: bool) -> Self {
        if enrolled {
            Self::Granted
        } else {
            Self::Denied
        }
    }

    pub fn granted(self) -> bool {
        matches!(self, Self::Granted)
    }

    /// Check enrollment-backed access for `course_id`
    ///
    /// Fails closed: guests and failed lookups both read as denied, and
    /// a denied viewer still sees whatever is free to preview.
    pub async fn resolve(
        store: &dyn EnrollmentStore,
        session: Option<&Session>,
        course_id: i64,
    ) -> Self {
        let Some(session) = session else {
            return Self::Denied;
        };
        match store.validate_access(session, course_id).await {
            Ok(enrolled) => Self::from_enrollment_exists(enrolled),
            Err(e) => {
                warn!(course = course_id, error = %e, "access check failed, denying");
                Self::Denied
            }
        }
    }
}

/// Flatten a course's module tree into one ordered lesson sequence.
/// Modules sort by their `order`, then lessons by theirs; ties keep
/// the order the CMS returned them in.
pub fn lesson_sequence(course: &Course) -> Vec<Lesson> {
    let mut modules = course.modules.clone();
    modules.sort_by_key(|m| m.order);

    let mut sequence = Vec::new();
    for module in &mut modules {
        module.lessons.sort_by_key(|l| l.order);
        sequence.append(&mut module.lessons);
    }
    sequence
}

/// What the lesson view should do for a given request
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    /// Nothing here for this viewer: back to the course page
    RedirectAway,
    /// Navigate to this lesson slug
    RedirectTo { lesson: String },
    /// Show `current`, with neighbours for prev/next controls
    Render {
        current: Lesson,
        previous: Option<Lesson>,
        next: Option<Lesson>,
    },
    /// The course has no lessons to show yet
    NoLessons,
}

/// Resolves lesson requests against one course and one access decision
pub struct LessonNavigator {
    sequence: Vec<Lesson>,
    visible: Vec<Lesson>,
    access: AccessDecision,
}

impl LessonNavigator {
    pub fn new(course: &Course, access: AccessDecision) -> Self {
        let sequence = lesson_sequence(course);
        let visible = if access.granted() {
            sequence.clone()
        } else {
            sequence
                .iter()
                .filter(|l| l.free_preview)
                .cloned()
                .collect()
        };
        Self {
            sequence,
            visible,
            access,
        }
    }

    /// Every lesson in course order, regardless of access
    pub fn sequence(&self) -> &[Lesson] {
        &self.sequence
    }

    /// The lessons this viewer may watch, in course order
    pub fn visible(&self) -> &[Lesson] {
        &self.visible
    }

    /// Slugs of the full sequence; progress math runs over all lessons,
    /// not just the visible ones
    pub fn lesson_ids(&self) -> Vec<String> {
        self.sequence.iter().map(|l| l.slug()).collect()
    }

    /// Resolve a navigation request into a view state
    ///
    /// `requested` is the slug from the URL, if the URL named one;
    /// `resume_hint` is the enrollment's current-lesson pointer. A hint
    /// pointing at a lesson this viewer cannot watch is ignored rather
    /// than trusted.
    pub fn resolve(&self, requested: Option<&str>, resume_hint: Option<&str>) -> ViewState {
        if !self.access.granted() && self.visible.is_empty() {
            return ViewState::RedirectAway;
        }
        if self.visible.is_empty() {
            return ViewState::NoLessons;
        }

        let Some(requested) = requested else {
            let lesson = resume_hint
                .filter(|hint| self.visible.iter().any(|l| l.slug() == *hint))
                .map(|hint| hint.to_string())
                .unwrap_or_else(|| self.visible[0].slug());
            return ViewState::RedirectTo { lesson };
        };

        // Stale and foreign slugs land on the first visible lesson
        // instead of erroring
        let index = self
            .visible
            .iter()
            .position(|l| l.slug() == requested)
            .unwrap_or(0);

        ViewState::Render {
            current: self.visible[index].clone(),
            previous: index.checked_sub(1).map(|i| self.visible[i].clone()),
            next: self.visible.get(index + 1).cloned(),
        }
    }
}
