//! Rust client for the Aula headless CMS
//!
//! Typed access to the content and enrollment API: course catalogs, course
//! module trees, and per-identity enrollment progress. The CMS has served
//! two wire vintages over its lifetime (nested `attributes` envelopes and
//! flat records); this crate accepts both and normalizes everything into
//! canonical types before handing it to callers.
//!
//! # Example
//!
//! ```rust,no_run
//! use aula_cms_client::{CmsClient, CmsConfig, ProgressUpdate};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = CmsClient::new(CmsConfig::default());
//!
//! // Public course read
//! let course = client.course_by_slug("woodworking-basics").await?;
//!
//! // Authenticated enrollment read and write
//! let enrollments = client.list_enrollments("jwt-token").await?;
//! if let Some(enrollment) = enrollments.first() {
//!     client
//!         .update_progress("jwt-token", enrollment.id, &ProgressUpdate::heartbeat("intro-1"))
//!         .await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod types;

pub use client::CmsClient;
pub use error::{CmsError, Result};
pub use types::{
    build_catalog, format_duration, resolve_media_url, CatalogCourse, CatalogInstructor,
    CatalogQuery, CatalogTag, CmsConfig, Course, CourseLanguage, CourseLevel, CourseModule,
    CourseSettings, CoursesResponse, Enrollment, EnrollmentCourse, EnrollmentRecord,
    EnrollmentResponse, EnrollmentStatus, EnrollmentsResponse, Instructor, Lesson, LessonRef,
    Media, MediaRef, Pagination, ProgressUpdate, ResponseMeta, Tag, TagsResponse,
};
