//! Progress reconciliation between playback and the enrollment store
//!
//! Two write paths with very different tempers share this module:
//!
//! - **Heartbeats** ([`ProgressSync::update_progress`]): fired on every
//!   playback tick, collapsed through a debounce window so only the
//!   latest lesson pointer reaches the CMS, and silently dropped when
//!   nobody is signed in or enrolled. Failures are logged, never raised.
//! - **Completion toggles** ([`ProgressSync::mark_lesson_complete`]):
//!   explicit user action, written immediately as one atomic four-field
//!   update. Nothing is reported as changed until the CMS acknowledges
//!   the write; on failure callers get the pre-toggle state back plus an
//!   error string to display.

mod debounce;

pub use debounce::Debounce;

use aula_cms_client::ProgressUpdate;
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

use crate::playback::PlaybackCache;
use crate::session::Session;
use crate::store::EnrollmentStore;

/// Progress sync configuration
#[derive(Debug, Clone)]
pub struct ProgressSyncConfig {
    /// Window within which heartbeat calls collapse into one write
    pub debounce_window: Duration,
}

impl Default for ProgressSyncConfig {
    fn default() -> Self {
        Self {
            debounce_window: Duration::from_secs(3),
        }
    }
}

/// The enrollment a [`ProgressSync`] instance drives
#[derive(Debug, Clone)]
pub struct ProgressTarget {
    /// Enrollment under sync; `None` when the viewer holds none
    pub enrollment_id: Option<i64>,
    /// Course the enrollment belongs to; keys the playback cache
    pub course_id: i64,
    /// Denominator for the percentage derivation — the full lesson
    /// count of the course, not just the visible subset
    pub total_lessons: usize,
}

/// Synchronizes one viewer's progress on one enrollment
pub struct ProgressSync {
    store: Arc<dyn EnrollmentStore>,
    playback: Arc<PlaybackCache>,
    session: Option<Session>,
    target: ProgressTarget,
    config: ProgressSyncConfig,
    debounce: Debounce,
    updating: AtomicBool,
    // Each write path owns its own slot; a late-firing heartbeat must
    // not erase a toggle failure still on display
    toggle_error: Mutex<Option<String>>,
    heartbeat_error: Arc<Mutex<Option<String>>>,
}

impl ProgressSync {
    pub fn new(
        store: Arc<dyn EnrollmentStore>,
        playback: Arc<PlaybackCache>,
        session: Option<Session>,
        target: ProgressTarget,
        config: ProgressSyncConfig,
    ) -> Self {
        Self {
            store,
            playback,
            session,
            target,
            config,
            debounce: Debounce::new(),
            updating: AtomicBool::new(false),
            toggle_error: Mutex::new(None),
            heartbeat_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Record that the viewer is on `lesson_id` now
    ///
    /// Debounced: rapid calls collapse so that one write carrying the
    /// latest lesson goes out once the window elapses. The timestamp is
    /// taken when the write actually fires. No session or no enrollment
    /// means no write at all.
    pub async fn update_progress(&self, lesson_id: &str) {
        let (Some(session), Some(enrollment_id)) = (self.session.clone(), self.target.enrollment_id)
        else {
            debug!(lesson = lesson_id, "heartbeat skipped: no session or enrollment");
            return;
        };

        let store = Arc::clone(&self.store);
        let heartbeat_error = Arc::clone(&self.heartbeat_error);
        let lesson = lesson_id.to_string();

        self.debounce
            .arm(self.config.debounce_window, async move {
                set_slot(&heartbeat_error, None);
                let update = ProgressUpdate::heartbeat(lesson.clone());
                match store.update_progress(&session, enrollment_id, &update).await {
                    Ok(_) => {
                        debug!(enrollment = enrollment_id, lesson = %lesson, "heartbeat written");
                    }
                    Err(e) => {
                        warn!(
                            enrollment = enrollment_id,
                            lesson = %lesson,
                            error = %e,
                            "heartbeat write failed"
                        );
                        set_slot(&heartbeat_error, Some(e.to_string()));
                    }
                }
            })
            .await;
    }

    /// Toggle completion of `lesson_id` and return the lesson's
    /// completion state after the operation
    ///
    /// Self-inverse: completing an already-completed lesson un-completes
    /// it. One write carries the toggled completion set, the derived
    /// percentage, the advanced resume pointer, and a fresh access time.
    /// Local state only moves on CMS acknowledgment — on failure the
    /// pre-toggle state is returned and [`last_error`] carries a message
    /// for display. `on_complete` runs only after an acknowledged write;
    /// whatever it does is its own business and cannot fail the toggle.
    ///
    /// [`last_error`]: ProgressSync::last_error
    pub async fn mark_lesson_complete(
        &self,
        lesson_id: &str,
        completed_lessons: &[String],
        all_lesson_ids: &[String],
        on_complete: Option<BoxFuture<'_, ()>>,
    ) -> bool {
        let was_completed = completed_lessons.iter().any(|l| l == lesson_id);

        let (Some(session), Some(enrollment_id)) =
            (self.session.as_ref(), self.target.enrollment_id)
        else {
            self.set_error(Some("not signed in or not enrolled".to_string()));
            return was_completed;
        };

        self.updating.store(true, Ordering::SeqCst);
        self.set_error(None);

        let updated: Vec<String> = if was_completed {
            completed_lessons
                .iter()
                .filter(|l| l.as_str() != lesson_id)
                .cloned()
                .collect()
        } else {
            let mut extended = completed_lessons.to_vec();
            extended.push(lesson_id.to_string());
            extended
        };

        // Un-marking points back at the lesson itself; completing
        // advances to the first uncompleted lesson after it, staying
        // put when none remains.
        let next_current = if was_completed {
            lesson_id.to_string()
        } else {
            next_uncompleted_after(lesson_id, all_lesson_ids, &updated)
                .unwrap_or_else(|| lesson_id.to_string())
        };

        let percentage = progress_percentage(updated.len(), self.target.total_lessons);
        let update = ProgressUpdate::completion(next_current, updated, percentage);

        let completed_now = match self
            .store
            .update_progress(session, enrollment_id, &update)
            .await
        {
            Ok(_) => {
                if !was_completed {
                    // A finished lesson should not offer a resume hint
                    // the next time it opens
                    self.playback.clear(self.target.course_id, lesson_id);
                }
                if let Some(refresh) = on_complete {
                    refresh.await;
                }
                !was_completed
            }
            Err(e) => {
                warn!(
                    enrollment = enrollment_id,
                    lesson = lesson_id,
                    error = %e,
                    "completion toggle failed"
                );
                self.set_error(Some(e.to_string()));
                was_completed
            }
        };

        self.updating.store(false, Ordering::SeqCst);
        completed_now
    }

    /// Whether a completion toggle is in flight
    pub fn updating(&self) -> bool {
        self.updating.load(Ordering::SeqCst)
    }

    /// Message from the most recent failed write, for display
    ///
    /// A toggle failure outranks a heartbeat failure and sticks until
    /// the next toggle; the heartbeat slot clears itself on the next
    /// heartbeat that fires.
    pub fn last_error(&self) -> Option<String> {
        read_slot(&self.toggle_error).or_else(|| read_slot(&self.heartbeat_error))
    }

    /// Cancel any pending heartbeat; used on view teardown. Dropping
    /// the instance does the same.
    pub async fn cancel_pending(&self) {
        self.debounce.cancel().await;
    }

    fn set_error(&self, message: Option<String>) {
        set_slot(&self.toggle_error, message);
    }
}

fn set_slot(slot: &Mutex<Option<String>>, message: Option<String>) {
    *slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = message;
}

fn read_slot(slot: &Mutex<Option<String>>) -> Option<String> {
    slot.lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

/// Percentage of lessons completed, rounded, clamped into 0..=100.
/// A course with no lessons reads as zero percent.
pub fn progress_percentage(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let ratio = completed as f64 / total as f64;
    (ratio * 100.0).round().clamp(0.0, 100.0) as u8
}

/// First lesson after `lesson_id` in `all` that is not in `completed`.
/// A `lesson_id` missing from `all` scans from the start, so a stale
/// pointer still yields a usable resume target.
pub fn next_uncompleted_after(
    lesson_id: &str,
    all: &[String],
    completed: &[String],
) -> Option<String> {
    let start = all
        .iter()
        .position(|l| l == lesson_id)
        .map_or(0, |p| p + 1);
    all.iter()
        .skip(start)
        .find(|l| !completed.contains(l))
        .cloned()
}
