//! Continue-watching pick
//!
//! The CMS chooses the single most recently accessed in-progress
//! enrollment; this module just asks for it and holds the answer. The
//! pick is cosmetic — when the lookup fails the dashboard simply shows
//! no banner, it does not break.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use aula_cms_client::Enrollment;

use crate::session::Session;
use crate::store::EnrollmentStore;

#[derive(Debug, Default)]
struct State {
    enrollment: Option<Enrollment>,
    loading: bool,
    error: Option<String>,
}

/// The enrollment to surface as "continue watching", if any
pub struct ContinueWatching {
    store: Arc<dyn EnrollmentStore>,
    state: RwLock<State>,
}

impl ContinueWatching {
    pub fn new(store: Arc<dyn EnrollmentStore>) -> Self {
        Self {
            store,
            state: RwLock::new(State {
                enrollment: None,
                loading: true,
                error: None,
            }),
        }
    }

    /// Ask the CMS for the current pick
    ///
    /// Guests get `None` without a network round trip. Lookup failures
    /// also resolve to `None`; the error is held for diagnostics but no
    /// caller should treat an absent pick as a problem.
    pub async fn fetch(&self, session: Option<&Session>) -> Option<Enrollment> {
        let Some(session) = session else {
            let mut state = self.state.write().await;
            state.enrollment = None;
            state.loading = false;
            state.error = None;
            return None;
        };

        {
            let mut state = self.state.write().await;
            state.loading = true;
        }

        let outcome = self.store.continue_watching(session).await;
        let mut state = self.state.write().await;
        state.loading = false;
        match outcome {
            Ok(pick) => {
                debug!(found = pick.is_some(), "continue-watching resolved");
                state.error = None;
                state.enrollment = pick.clone();
                pick
            }
            Err(e) => {
                warn!(error = %e, "continue-watching lookup failed");
                state.error = Some(e.to_string());
                state.enrollment = None;
                None
            }
        }
    }

    /// The held pick from the last fetch
    pub async fn current(&self) -> Option<Enrollment> {
        self.state.read().await.enrollment.clone()
    }

    pub async fn loading(&self) -> bool {
        self.state.read().await.loading
    }

    pub async fn error(&self) -> Option<String> {
        self.state.read().await.error.clone()
    }
}
