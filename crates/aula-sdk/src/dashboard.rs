//! Dashboard assembly
//!
//! Combines the enrollment set with the continue-watching pick into one
//! renderable view, making sure the highlighted course never shows up
//! twice on the same screen.

use aula_cms_client::Enrollment;

use crate::continue_watching::ContinueWatching;
use crate::enrollments::Enrollments;
use crate::session::Session;

/// Everything a dashboard needs to render
#[derive(Debug, Clone)]
pub struct DashboardView {
    /// Highlighted enrollment, when the CMS picked one
    pub continue_watching: Option<Enrollment>,
    /// Remaining enrollments, with the highlighted course filtered out
    pub other_enrollments: Vec<Enrollment>,
    /// True while either underlying fetch is still settling
    pub loading: bool,
}

impl DashboardView {
    /// Build the view from already-fetched state
    pub async fn assemble(enrollments: &Enrollments, pick: &ContinueWatching) -> Self {
        let continue_watching = pick.current().await;
        let all = enrollments.items().await;
        let other_enrollments = exclude_continue_watching(&all, continue_watching.as_ref());
        let loading = enrollments.loading().await || pick.loading().await;
        Self {
            continue_watching,
            other_enrollments,
            loading,
        }
    }

    /// Fetch both halves and assemble
    pub async fn load(
        enrollments: &Enrollments,
        pick: &ContinueWatching,
        session: Option<&Session>,
    ) -> Self {
        enrollments.fetch_all(session).await;
        pick.fetch(session).await;
        Self::assemble(enrollments, pick).await
    }
}

/// Drop every enrollment whose course matches the highlighted pick.
/// Matching is by course, not by enrollment id — duplicate enrollments
/// on one course still collapse to the banner alone.
pub fn exclude_continue_watching(
    enrollments: &[Enrollment],
    pick: Option<&Enrollment>,
) -> Vec<Enrollment> {
    match pick {
        Some(pick) => enrollments
            .iter()
            .filter(|e| e.course.id != pick.course.id)
            .cloned()
            .collect(),
        None => enrollments.to_vec(),
    }
}
