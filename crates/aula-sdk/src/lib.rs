//! Client-side core for the Aula course platform
//!
//! Everything a viewer-facing app needs between its views and the CMS:
//!
//! - [`playback`] — local, instant-resume video position cache (SQLite)
//! - [`progress`] — debounced heartbeats and atomic completion toggles
//! - [`enrollments`] — the viewer's enrollment set, loading and error
//!   state included
//! - [`continue_watching`] — the CMS-picked enrollment to resume
//! - [`dashboard`] — combines the two above without showing a course
//!   twice
//! - [`navigation`] — module-tree flattening, free-preview gating, and
//!   prev/next resolution for the lesson view
//!
//! The CMS itself is reached through the [`EnrollmentStore`] trait, with
//! [`CmsClient`](aula_cms_client::CmsClient) as the production
//! implementation; tests substitute their own.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use aula_sdk::cms::{CmsClient, CmsConfig};
//! use aula_sdk::{
//!     Enrollments, EnrollmentStore, PlaybackCache, ProgressSync, ProgressSyncConfig,
//!     ProgressTarget, Session,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store: Arc<dyn EnrollmentStore> = Arc::new(CmsClient::new(CmsConfig::default()));
//! let session = Session::new(42, "jwt-token");
//!
//! // Dashboard data
//! let enrollments = Enrollments::new(Arc::clone(&store));
//! enrollments.fetch_all(Some(&session)).await;
//! let enrollment = enrollments.ensure_for_course(&session, 7).await?;
//!
//! // Playback position cache plus progress sync for one course
//! let playback = Arc::new(PlaybackCache::open(Path::new("/var/lib/aula")));
//! let sync = ProgressSync::new(
//!     store,
//!     Arc::clone(&playback),
//!     Some(session),
//!     ProgressTarget {
//!         enrollment_id: Some(enrollment.id),
//!         course_id: 7,
//!         total_lessons: 12,
//!     },
//!     ProgressSyncConfig::default(),
//! );
//!
//! playback.save(7, "intro-1", 95.0, 600.0);
//! sync.update_progress("intro-1").await;
//! # Ok(())
//! # }
//! ```

pub mod continue_watching;
pub mod dashboard;
pub mod enrollments;
pub mod error;
pub mod navigation;
pub mod playback;
pub mod progress;
pub mod session;
pub mod store;

/// The underlying CMS client, for constructing the production store and
/// for the wire-level types not re-exported here
pub use aula_cms_client as cms;

pub use continue_watching::ContinueWatching;
pub use dashboard::{exclude_continue_watching, DashboardView};
pub use enrollments::Enrollments;
pub use error::{Result, SdkError};
pub use navigation::{lesson_sequence, AccessDecision, LessonNavigator, ViewState};
pub use playback::{PlaybackCache, PlaybackPosition};
pub use progress::{
    next_uncompleted_after, progress_percentage, Debounce, ProgressSync, ProgressSyncConfig,
    ProgressTarget,
};
pub use session::Session;
pub use store::EnrollmentStore;

pub use aula_cms_client::{
    Course, CourseModule, Enrollment, EnrollmentCourse, EnrollmentStatus, Lesson, ProgressUpdate,
};
