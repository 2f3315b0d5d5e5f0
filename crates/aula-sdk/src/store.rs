//! Backend seam for enrollment reads and progress writes
//!
//! Every SDK component talks to the CMS through [`EnrollmentStore`]
//! rather than [`CmsClient`] directly, so tests (and alternative
//! backends) can swap in their own implementation.

use async_trait::async_trait;
use aula_cms_client::{CmsClient, Enrollment, ProgressUpdate};

use crate::error::Result;
use crate::session::Session;

/// Source of truth for enrollments and progress
#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    /// All enrollments held by the session's identity
    async fn list_enrollments(&self, session: &Session) -> Result<Vec<Enrollment>>;

    /// The server-selected enrollment to resume, if any
    async fn continue_watching(&self, session: &Session) -> Result<Option<Enrollment>>;

    /// Apply a partial progress update to one enrollment
    async fn update_progress(
        &self,
        session: &Session,
        enrollment_id: i64,
        update: &ProgressUpdate,
    ) -> Result<Enrollment>;

    /// Create a fresh in-progress enrollment for a course
    async fn create_enrollment(&self, session: &Session, course_id: i64) -> Result<Enrollment>;

    /// Whether the identity holds any enrollment for the course
    async fn validate_access(&self, session: &Session, course_id: i64) -> Result<bool>;
}

#[async_trait]
impl EnrollmentStore for CmsClient {
    async fn list_enrollments(&self, session: &Session) -> Result<Vec<Enrollment>> {
        Ok(CmsClient::list_enrollments(self, session.token()).await?)
    }

    async fn continue_watching(&self, session: &Session) -> Result<Option<Enrollment>> {
        Ok(CmsClient::continue_watching(self, session.token()).await?)
    }

    async fn update_progress(
        &self,
        session: &Session,
        enrollment_id: i64,
        update: &ProgressUpdate,
    ) -> Result<Enrollment> {
        Ok(CmsClient::update_progress(self, session.token(), enrollment_id, update).await?)
    }

    async fn create_enrollment(&self, session: &Session, course_id: i64) -> Result<Enrollment> {
        Ok(CmsClient::create_enrollment(self, session.token(), course_id).await?)
    }

    async fn validate_access(&self, session: &Session, course_id: i64) -> Result<bool> {
        Ok(CmsClient::validate_access(self, session.token(), course_id, session.user_id).await?)
    }
}
