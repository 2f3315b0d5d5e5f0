//! Progress sync and enrollment flow integration tests
//!
//! Runs the whole client pipeline against an in-process store double:
//! - heartbeat debouncing, cancellation, and failure absorption
//! - completion toggles: the atomic four-field write, resume-pointer
//!   advancement, and pre-toggle state on failure
//! - enrollment aggregation, the continue-watching pick, and the
//!   dashboard exclusion rule
//! - enrollment-backed access checks

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::time::sleep;

use aula_sdk::{
    AccessDecision, ContinueWatching, DashboardView, Enrollment, EnrollmentCourse,
    EnrollmentStatus, EnrollmentStore, Enrollments, PlaybackCache, ProgressSync,
    ProgressSyncConfig, ProgressTarget, ProgressUpdate, Result, SdkError, Session,
};

// =============================================================================
// Store double
// =============================================================================

/// In-memory stand-in for the CMS-backed store. Writes mutate the held
/// enrollments the way the real CMS would echo them back; failure flags
/// turn individual operations into errors.
struct MockStore {
    enrollments: Mutex<Vec<Enrollment>>,
    continue_pick: Mutex<Option<Enrollment>>,
    updates: Mutex<Vec<(i64, ProgressUpdate)>>,
    fail_updates: AtomicBool,
    fail_reads: AtomicBool,
    next_id: AtomicI64,
}

impl MockStore {
    fn with_enrollments(items: Vec<Enrollment>) -> Arc<Self> {
        Arc::new(Self {
            enrollments: Mutex::new(items),
            continue_pick: Mutex::new(None),
            updates: Mutex::new(Vec::new()),
            fail_updates: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
            next_id: AtomicI64::new(1000),
        })
    }

    async fn set_enrollments(&self, items: Vec<Enrollment>) {
        *self.enrollments.lock().await = items;
    }

    async fn set_pick(&self, pick: Option<Enrollment>) {
        *self.continue_pick.lock().await = pick;
    }

    async fn recorded_updates(&self) -> Vec<(i64, ProgressUpdate)> {
        self.updates.lock().await.clone()
    }

    async fn enrollment(&self, id: i64) -> Enrollment {
        self.enrollments
            .lock()
            .await
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .unwrap_or_else(|| panic!("no enrollment {id} in the store"))
    }

    async fn held_count(&self) -> usize {
        self.enrollments.lock().await.len()
    }
}

#[async_trait]
impl EnrollmentStore for MockStore {
    async fn list_enrollments(&self, _session: &Session) -> Result<Vec<Enrollment>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(SdkError::Cms("cms unreachable".to_string()));
        }
        Ok(self.enrollments.lock().await.clone())
    }

    async fn continue_watching(&self, _session: &Session) -> Result<Option<Enrollment>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(SdkError::Cms("cms unreachable".to_string()));
        }
        Ok(self.continue_pick.lock().await.clone())
    }

    async fn update_progress(
        &self,
        _session: &Session,
        enrollment_id: i64,
        update: &ProgressUpdate,
    ) -> Result<Enrollment> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(SdkError::Cms("write rejected".to_string()));
        }
        self.updates.lock().await.push((enrollment_id, update.clone()));

        let mut items = self.enrollments.lock().await;
        let entry = items
            .iter_mut()
            .find(|e| e.id == enrollment_id)
            .ok_or_else(|| SdkError::Cms(format!("enrollment {enrollment_id} not found")))?;
        if let Some(lesson) = &update.current_lesson {
            entry.current_lesson = Some(lesson.clone());
        }
        if let Some(set) = &update.completed_lessons {
            entry.completed_lessons = set.clone();
        }
        if let Some(pct) = update.progress_percentage {
            entry.progress_percentage = pct;
        }
        if let Some(at) = update.last_accessed_at {
            entry.last_accessed_at = at;
        }
        Ok(entry.clone())
    }

    async fn create_enrollment(&self, _session: &Session, course_id: i64) -> Result<Enrollment> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let created = enrollment_for(id, course_id, "", &[]);
        self.enrollments.lock().await.push(created.clone());
        Ok(created)
    }

    async fn validate_access(&self, _session: &Session, course_id: i64) -> Result<bool> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(SdkError::Cms("cms unreachable".to_string()));
        }
        Ok(self
            .enrollments
            .lock()
            .await
            .iter()
            .any(|e| e.course.id == course_id))
    }
}

// =============================================================================
// Fixtures
// =============================================================================

fn enrollment_for(id: i64, course_id: i64, current: &str, completed: &[&str]) -> Enrollment {
    Enrollment {
        id,
        status: EnrollmentStatus::InProgress,
        progress_percentage: (completed.len() * 25).min(100) as u8,
        current_lesson: if current.is_empty() {
            None
        } else {
            Some(current.to_string())
        },
        completed_lessons: completed.iter().map(|s| s.to_string()).collect(),
        last_accessed_at: DateTime::<Utc>::UNIX_EPOCH,
        enrolled_at: None,
        completed_at: None,
        total_time_spent: None,
        course: EnrollmentCourse {
            id: course_id,
            title: format!("Course {course_id}"),
            slug: format!("course-{course_id}"),
            cover_image: None,
            total_lessons: Some(4),
        },
    }
}

fn session() -> Session {
    Session::new(42, "test-token")
}

fn slugs(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

/// Sync instance with a short debounce window so tests stay fast
fn sync_for(
    store: &Arc<MockStore>,
    playback: &Arc<PlaybackCache>,
    enrollment_id: i64,
    course_id: i64,
    total_lessons: usize,
) -> ProgressSync {
    ProgressSync::new(
        Arc::clone(store) as Arc<dyn EnrollmentStore>,
        Arc::clone(playback),
        Some(session()),
        ProgressTarget {
            enrollment_id: Some(enrollment_id),
            course_id,
            total_lessons,
        },
        ProgressSyncConfig {
            debounce_window: Duration::from_millis(40),
        },
    )
}

// =============================================================================
// Heartbeats
// =============================================================================

#[tokio::test]
async fn rapid_heartbeats_collapse_into_one_write() {
    let store = MockStore::with_enrollments(vec![enrollment_for(1, 10, "", &[])]);
    let playback = Arc::new(PlaybackCache::open_in_memory());
    let sync = sync_for(&store, &playback, 1, 10, 4);

    for lesson in ["l1", "l2", "l3", "l4", "l5"] {
        sync.update_progress(lesson).await;
    }
    sleep(Duration::from_millis(120)).await;

    let updates = store.recorded_updates().await;
    assert_eq!(updates.len(), 1, "five rapid calls must yield one write");

    let (enrollment_id, update) = &updates[0];
    assert_eq!(*enrollment_id, 1);
    assert_eq!(update.current_lesson.as_deref(), Some("l5"));
    assert!(update.last_accessed_at.is_some());
    // Heartbeats never touch completion state
    assert!(update.completed_lessons.is_none());
    assert!(update.progress_percentage.is_none());
}

#[tokio::test]
async fn heartbeats_need_a_session_and_an_enrollment() {
    let store = MockStore::with_enrollments(vec![enrollment_for(1, 10, "", &[])]);
    let playback = Arc::new(PlaybackCache::open_in_memory());

    let guest = ProgressSync::new(
        Arc::clone(&store) as Arc<dyn EnrollmentStore>,
        Arc::clone(&playback),
        None,
        ProgressTarget {
            enrollment_id: Some(1),
            course_id: 10,
            total_lessons: 4,
        },
        ProgressSyncConfig {
            debounce_window: Duration::from_millis(40),
        },
    );
    guest.update_progress("l1").await;

    let unenrolled = ProgressSync::new(
        Arc::clone(&store) as Arc<dyn EnrollmentStore>,
        Arc::clone(&playback),
        Some(session()),
        ProgressTarget {
            enrollment_id: None,
            course_id: 10,
            total_lessons: 4,
        },
        ProgressSyncConfig {
            debounce_window: Duration::from_millis(40),
        },
    );
    unenrolled.update_progress("l1").await;

    sleep(Duration::from_millis(120)).await;
    assert!(store.recorded_updates().await.is_empty());
}

#[tokio::test]
async fn teardown_cancels_the_pending_heartbeat() {
    let store = MockStore::with_enrollments(vec![enrollment_for(1, 10, "", &[])]);
    let playback = Arc::new(PlaybackCache::open_in_memory());

    let sync = sync_for(&store, &playback, 1, 10, 4);
    sync.update_progress("l1").await;
    sync.cancel_pending().await;

    let dropped = sync_for(&store, &playback, 1, 10, 4);
    dropped.update_progress("l2").await;
    drop(dropped);

    sleep(Duration::from_millis(120)).await;
    assert!(store.recorded_updates().await.is_empty());
}

#[tokio::test]
async fn heartbeat_failure_is_absorbed_and_reported() {
    let store = MockStore::with_enrollments(vec![enrollment_for(1, 10, "", &[])]);
    store.fail_updates.store(true, Ordering::SeqCst);
    let playback = Arc::new(PlaybackCache::open_in_memory());
    let sync = sync_for(&store, &playback, 1, 10, 4);

    sync.update_progress("l1").await;
    sleep(Duration::from_millis(120)).await;

    assert!(sync.last_error().is_some());

    // The next successful write clears the report
    store.fail_updates.store(false, Ordering::SeqCst);
    sync.update_progress("l2").await;
    sleep(Duration::from_millis(120)).await;

    assert!(sync.last_error().is_none());
    assert_eq!(store.recorded_updates().await.len(), 1);
}

// =============================================================================
// Completion toggles
// =============================================================================

#[tokio::test]
async fn toggle_writes_all_four_fields_and_advances_the_pointer() {
    let store = MockStore::with_enrollments(vec![enrollment_for(1, 10, "b", &["a"])]);
    let playback = Arc::new(PlaybackCache::open_in_memory());
    let sync = sync_for(&store, &playback, 1, 10, 4);
    let all = slugs(&["a", "b", "c", "d"]);

    let completed_now = sync
        .mark_lesson_complete("b", &slugs(&["a"]), &all, None)
        .await;

    assert!(completed_now);
    let updates = store.recorded_updates().await;
    assert_eq!(updates.len(), 1);
    let update = &updates[0].1;
    assert_eq!(update.completed_lessons, Some(slugs(&["a", "b"])));
    assert_eq!(update.progress_percentage, Some(50));
    assert_eq!(update.current_lesson.as_deref(), Some("c"));
    assert!(update.last_accessed_at.is_some());

    let after = store.enrollment(1).await;
    assert_eq!(after.completed_lessons, slugs(&["a", "b"]));
    assert_eq!(after.current_lesson.as_deref(), Some("c"));
    assert_eq!(after.progress_percentage, 50);
}

#[tokio::test]
async fn toggling_twice_restores_the_original_state() {
    let store = MockStore::with_enrollments(vec![enrollment_for(1, 10, "b", &["a"])]);
    let playback = Arc::new(PlaybackCache::open_in_memory());
    let sync = sync_for(&store, &playback, 1, 10, 4);
    let all = slugs(&["a", "b", "c", "d"]);

    assert!(sync.mark_lesson_complete("b", &slugs(&["a"]), &all, None).await);
    assert!(!sync
        .mark_lesson_complete("b", &slugs(&["a", "b"]), &all, None)
        .await);

    let after = store.enrollment(1).await;
    assert_eq!(after.completed_lessons, slugs(&["a"]));
    assert_eq!(after.progress_percentage, 25);
    // Un-marking points the resume pointer back at the lesson itself
    assert_eq!(after.current_lesson.as_deref(), Some("b"));
}

#[tokio::test]
async fn failed_toggle_reports_the_previous_state() {
    let store = MockStore::with_enrollments(vec![enrollment_for(1, 10, "b", &["a"])]);
    store.fail_updates.store(true, Ordering::SeqCst);
    let playback = Arc::new(PlaybackCache::open_in_memory());
    playback.save(10, "b", 420.0, 600.0);
    let sync = sync_for(&store, &playback, 1, 10, 4);
    let all = slugs(&["a", "b", "c", "d"]);

    let completed_now = sync
        .mark_lesson_complete("b", &slugs(&["a"]), &all, None)
        .await;

    assert!(!completed_now, "failed toggle must return the pre-toggle state");
    assert!(sync.last_error().is_some());
    assert!(!sync.updating());
    // Neither the store nor the cached position moved
    assert_eq!(store.enrollment(1).await.completed_lessons, slugs(&["a"]));
    assert!(playback.get(10, "b").is_some());
}

#[tokio::test]
async fn a_successful_heartbeat_does_not_erase_a_toggle_failure() {
    let store = MockStore::with_enrollments(vec![enrollment_for(1, 10, "b", &["a"])]);
    store.fail_updates.store(true, Ordering::SeqCst);
    let playback = Arc::new(PlaybackCache::open_in_memory());
    let sync = sync_for(&store, &playback, 1, 10, 4);
    let all = slugs(&["a", "b", "c", "d"]);

    sync.mark_lesson_complete("b", &slugs(&["a"]), &all, None).await;
    let toggle_message = sync.last_error();
    assert!(toggle_message.is_some());

    // The heartbeat goes out and succeeds; the toggle failure stays up
    store.fail_updates.store(false, Ordering::SeqCst);
    sync.update_progress("c").await;
    sleep(Duration::from_millis(120)).await;

    assert_eq!(store.recorded_updates().await.len(), 1);
    assert_eq!(sync.last_error(), toggle_message);

    // The next toggle owns the message again
    assert!(sync.mark_lesson_complete("c", &slugs(&["a"]), &all, None).await);
    assert!(sync.last_error().is_none());
}

#[tokio::test]
async fn completing_clears_the_cached_position_but_undoing_does_not() {
    let store = MockStore::with_enrollments(vec![enrollment_for(1, 10, "", &[])]);
    let playback = Arc::new(PlaybackCache::open_in_memory());
    let sync = sync_for(&store, &playback, 1, 10, 4);
    let all = slugs(&["a", "b", "c", "d"]);

    playback.save(10, "b", 500.0, 600.0);
    assert!(sync.mark_lesson_complete("b", &slugs(&[]), &all, None).await);
    assert!(
        playback.get(10, "b").is_none(),
        "a finished lesson must not offer a resume hint"
    );

    playback.save(10, "b", 500.0, 600.0);
    assert!(!sync.mark_lesson_complete("b", &slugs(&["b"]), &all, None).await);
    assert!(playback.get(10, "b").is_some());
}

#[tokio::test]
async fn refresh_callback_runs_only_after_an_acknowledged_write() {
    let store = MockStore::with_enrollments(vec![enrollment_for(1, 10, "b", &["a"])]);
    let playback = Arc::new(PlaybackCache::open_in_memory());
    let sync = sync_for(&store, &playback, 1, 10, 4);
    let all = slugs(&["a", "b", "c", "d"]);

    let enrollments = Enrollments::new(Arc::clone(&store) as Arc<dyn EnrollmentStore>);
    let viewer = session();
    enrollments.fetch_all(Some(&viewer)).await;

    let completed_now = sync
        .mark_lesson_complete(
            "b",
            &slugs(&["a"]),
            &all,
            Some(Box::pin(async {
                enrollments.refresh(Some(&viewer)).await;
            })),
        )
        .await;

    assert!(completed_now);
    let held = enrollments.find_by_course(10).await.unwrap();
    assert_eq!(held.completed_lessons, slugs(&["a", "b"]));

    // A rejected write must not run the callback
    store.fail_updates.store(true, Ordering::SeqCst);
    let invoked = AtomicBool::new(false);
    sync.mark_lesson_complete(
        "c",
        &slugs(&["a", "b"]),
        &all,
        Some(Box::pin(async {
            invoked.store(true, Ordering::SeqCst);
        })),
    )
    .await;
    assert!(!invoked.load(Ordering::SeqCst));
}

// =============================================================================
// Enrollment aggregation
// =============================================================================

#[tokio::test]
async fn guests_resolve_to_an_empty_set_without_error() {
    let store = MockStore::with_enrollments(vec![enrollment_for(1, 10, "", &[])]);
    let enrollments = Enrollments::new(Arc::clone(&store) as Arc<dyn EnrollmentStore>);

    assert!(enrollments.loading().await, "unsettled state starts loading");

    let items = enrollments.fetch_all(None).await;

    assert!(items.is_empty());
    assert!(!enrollments.loading().await);
    assert!(enrollments.error().await.is_none());
}

#[tokio::test]
async fn fetch_failure_keeps_the_previous_set_and_surfaces_the_error() {
    let store = MockStore::with_enrollments(vec![
        enrollment_for(1, 10, "", &[]),
        enrollment_for(2, 20, "", &[]),
    ]);
    let enrollments = Enrollments::new(Arc::clone(&store) as Arc<dyn EnrollmentStore>);
    let viewer = session();

    enrollments.fetch_all(Some(&viewer)).await;
    store.fail_reads.store(true, Ordering::SeqCst);
    let items = enrollments.fetch_all(Some(&viewer)).await;

    assert_eq!(items.len(), 2, "stale set beats a blank dashboard");
    assert!(enrollments.error().await.is_some());

    // Recovery clears the surfaced error
    store.fail_reads.store(false, Ordering::SeqCst);
    enrollments.refresh(Some(&viewer)).await;
    assert!(enrollments.error().await.is_none());
}

#[tokio::test]
async fn refresh_replaces_the_held_set_wholesale() {
    let store = MockStore::with_enrollments(vec![enrollment_for(1, 10, "", &[])]);
    let enrollments = Enrollments::new(Arc::clone(&store) as Arc<dyn EnrollmentStore>);
    let viewer = session();

    enrollments.fetch_all(Some(&viewer)).await;
    store
        .set_enrollments(vec![enrollment_for(2, 20, "", &[])])
        .await;
    enrollments.refresh(Some(&viewer)).await;

    let items = enrollments.items().await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, 2);
}

#[tokio::test]
async fn ensure_for_course_creates_once() {
    let store = MockStore::with_enrollments(Vec::new());
    let enrollments = Enrollments::new(Arc::clone(&store) as Arc<dyn EnrollmentStore>);
    let viewer = session();
    enrollments.fetch_all(Some(&viewer)).await;

    let first = enrollments.ensure_for_course(&viewer, 30).await.unwrap();
    let second = enrollments.ensure_for_course(&viewer, 30).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(store.held_count().await, 1);
    assert!(enrollments.find_by_course(30).await.is_some());
}

// =============================================================================
// Continue watching and the dashboard
// =============================================================================

#[tokio::test]
async fn dashboard_shows_each_course_once() {
    let pick = enrollment_for(2, 20, "b", &["a"]);
    let store = MockStore::with_enrollments(vec![
        enrollment_for(1, 10, "", &[]),
        pick.clone(),
        enrollment_for(3, 30, "", &[]),
    ]);
    store.set_pick(Some(pick)).await;

    let enrollments = Enrollments::new(Arc::clone(&store) as Arc<dyn EnrollmentStore>);
    let continue_watching = ContinueWatching::new(Arc::clone(&store) as Arc<dyn EnrollmentStore>);
    let view = DashboardView::load(&enrollments, &continue_watching, Some(&session())).await;

    assert_eq!(
        view.continue_watching.as_ref().map(|e| e.course.id),
        Some(20)
    );
    assert_eq!(view.other_enrollments.len(), 2);
    assert!(view.other_enrollments.iter().all(|e| e.course.id != 20));
    assert!(!view.loading);
}

#[tokio::test]
async fn continue_watching_lookup_failure_degrades_to_none() {
    let store = MockStore::with_enrollments(vec![enrollment_for(1, 10, "", &[])]);
    store.set_pick(Some(enrollment_for(1, 10, "", &[]))).await;
    store.fail_reads.store(true, Ordering::SeqCst);

    let continue_watching = ContinueWatching::new(Arc::clone(&store) as Arc<dyn EnrollmentStore>);
    let pick = continue_watching.fetch(Some(&session())).await;

    assert!(pick.is_none());
    assert!(continue_watching.current().await.is_none());
    assert!(continue_watching.error().await.is_some());
}

#[tokio::test]
async fn continue_watching_is_skipped_for_guests() {
    let store = MockStore::with_enrollments(vec![enrollment_for(1, 10, "", &[])]);
    store.set_pick(Some(enrollment_for(1, 10, "", &[]))).await;

    let continue_watching = ContinueWatching::new(Arc::clone(&store) as Arc<dyn EnrollmentStore>);
    let pick = continue_watching.fetch(None).await;

    assert!(pick.is_none());
    assert!(continue_watching.error().await.is_none());
}

// =============================================================================
// Access checks
// =============================================================================

#[tokio::test]
async fn access_checks_fail_closed() {
    let store = MockStore::with_enrollments(vec![enrollment_for(1, 10, "", &[])]);
    let viewer = session();

    assert!(
        AccessDecision::resolve(store.as_ref(), Some(&viewer), 10)
            .await
            .granted()
    );
    assert!(
        !AccessDecision::resolve(store.as_ref(), Some(&viewer), 99)
            .await
            .granted()
    );
    assert!(
        !AccessDecision::resolve(store.as_ref(), None, 10)
            .await
            .granted()
    );

    store.fail_reads.store(true, Ordering::SeqCst);
    assert!(
        !AccessDecision::resolve(store.as_ref(), Some(&viewer), 10)
            .await
            .granted()
    );
}
