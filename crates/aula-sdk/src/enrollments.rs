//! Aggregated view over a viewer's enrollments
//!
//! Holds one fetched set of [`Enrollment`] records plus the loading and
//! error state a view needs to render it. Fetch failures keep whatever
//! set was last held — a transient CMS error must not blank out a
//! dashboard that was showing courses a moment ago.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use aula_cms_client::Enrollment;

use crate::error::Result;
use crate::session::Session;
use crate::store::EnrollmentStore;

#[derive(Debug, Default)]
struct State {
    items: Vec<Enrollment>,
    loading: bool,
    error: Option<String>,
}

/// The viewer's enrollment set, refreshable in place
pub struct Enrollments {
    store: Arc<dyn EnrollmentStore>,
    state: RwLock<State>,
}

impl Enrollments {
    pub fn new(store: Arc<dyn EnrollmentStore>) -> Self {
        Self {
            store,
            state: RwLock::new(State {
                items: Vec::new(),
                // Views render a spinner until the first fetch settles
                loading: true,
                error: None,
            }),
        }
    }

    /// Fetch the full enrollment set for `session`
    ///
    /// Guests resolve to an empty set without touching the network and
    /// without raising an error. A failed fetch keeps the previously
    /// held items and surfaces the failure through [`error`].
    ///
    /// [`error`]: Enrollments::error
    pub async fn fetch_all(&self, session: Option<&Session>) -> Vec<Enrollment> {
        let Some(session) = session else {
            let mut state = self.state.write().await;
            state.items.clear();
            state.loading = false;
            state.error = None;
            return Vec::new();
        };

        {
            let mut state = self.state.write().await;
            state.loading = true;
        }

        let outcome = self.store.list_enrollments(session).await;
        let mut state = self.state.write().await;
        state.loading = false;
        match outcome {
            Ok(items) => {
                debug!(count = items.len(), "enrollments fetched");
                state.error = None;
                state.items = items.clone();
                items
            }
            Err(e) => {
                warn!(error = %e, "enrollment fetch failed, keeping previous set");
                state.error = Some(e.to_string());
                state.items.clone()
            }
        }
    }

    /// Re-fetch and replace the held set wholesale
    pub async fn refresh(&self, session: Option<&Session>) -> Vec<Enrollment> {
        self.fetch_all(session).await
    }

    /// Snapshot of the currently held enrollments
    pub async fn items(&self) -> Vec<Enrollment> {
        self.state.read().await.items.clone()
    }

    pub async fn loading(&self) -> bool {
        self.state.read().await.loading
    }

    pub async fn error(&self) -> Option<String> {
        self.state.read().await.error.clone()
    }

    /// The held enrollment for `course_id`, if any
    pub async fn find_by_course(&self, course_id: i64) -> Option<Enrollment> {
        self.state
            .read()
            .await
            .items
            .iter()
            .find(|e| e.course.id == course_id)
            .cloned()
    }

    /// The enrollment for `course_id`, creating one when none exists
    ///
    /// Creation refreshes the held set so the new enrollment shows up
    /// everywhere at once.
    pub async fn ensure_for_course(
        &self,
        session: &Session,
        course_id: i64,
    ) -> Result<Enrollment> {
        if let Some(existing) = self.find_by_course(course_id).await {
            return Ok(existing);
        }

        let created = self.store.create_enrollment(session, course_id).await?;
        debug!(course = course_id, enrollment = created.id, "enrollment created");
        self.refresh(Some(session)).await;
        Ok(created)
    }
}
