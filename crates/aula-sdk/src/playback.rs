//! Device-local playback position cache
//!
//! Keyed SQLite store for per-lesson resume points. This cache is
//! best-effort by contract: every failure — storage missing, disk full,
//! corrupt database — is absorbed and logged here, never surfaced, so a
//! broken cache can never block playback. Positions are written
//! unconditionally on every tick (no monotonic check; scrubbing
//! backwards persists the new spot too) and cleared when a lesson is
//! marked complete so it stops offering a resume hint.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, warn};

/// Fraction of a video that must be played for it to count as watched
const WATCHED_THRESHOLD: f64 = 0.9;

/// A stored resume point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackPosition {
    pub lesson_id: String,
    /// Seconds into the video
    pub position: f64,
    /// Total video length in seconds
    pub duration: f64,
    /// Unix milliseconds of the last write
    pub last_updated: i64,
}

/// Local playback position store
///
/// Opens lazily into a disabled no-op when storage is unavailable; all
/// operations then return empty results instead of erroring.
pub struct PlaybackCache {
    conn: Mutex<Option<Connection>>,
}

impl PlaybackCache {
    /// Open (or create) the cache under `storage_dir`. Failure to open
    /// yields a disabled cache, not an error.
    pub fn open(storage_dir: &Path) -> Self {
        if let Err(e) = std::fs::create_dir_all(storage_dir) {
            warn!(
                dir = %storage_dir.display(),
                error = %e,
                "playback cache disabled: cannot create storage directory"
            );
            return Self {
                conn: Mutex::new(None),
            };
        }

        let db_path = storage_dir.join("playback.db");
        match Connection::open(&db_path).and_then(|conn| {
            conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
            Self::init_schema(&conn)?;
            Ok(conn)
        }) {
            Ok(conn) => {
                debug!(path = %db_path.display(), "playback cache ready");
                Self {
                    conn: Mutex::new(Some(conn)),
                }
            }
            Err(e) => {
                warn!(path = %db_path.display(), error = %e, "playback cache disabled");
                Self {
                    conn: Mutex::new(None),
                }
            }
        }
    }

    /// In-memory cache for tests
    pub fn open_in_memory() -> Self {
        match Connection::open_in_memory().and_then(|conn| {
            Self::init_schema(&conn)?;
            Ok(conn)
        }) {
            Ok(conn) => Self {
                conn: Mutex::new(Some(conn)),
            },
            Err(e) => {
                warn!(error = %e, "playback cache disabled");
                Self {
                    conn: Mutex::new(None),
                }
            }
        }
    }

    fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS playback_positions (
                key TEXT PRIMARY KEY,
                lesson_id TEXT NOT NULL,
                position REAL NOT NULL,
                duration REAL NOT NULL,
                last_updated INTEGER NOT NULL
            );",
        )
    }

    /// Store a resume point, overwriting any previous one for the lesson
    pub fn save(&self, course_id: i64, lesson_id: &str, position: f64, duration: f64) {
        let key = storage_key(course_id, lesson_id);
        let now = Utc::now().timestamp_millis();

        let result = self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO playback_positions (key, lesson_id, position, duration, last_updated)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(key) DO UPDATE SET
                     lesson_id = excluded.lesson_id,
                     position = excluded.position,
                     duration = excluded.duration,
                     last_updated = excluded.last_updated",
                params![key, lesson_id, position, duration, now],
            )
        });
        if let Some(Err(e)) = result {
            warn!(key = %key, error = %e, "failed to save playback position");
        }
    }

    /// The stored resume point for a lesson, if any
    pub fn get(&self, course_id: i64, lesson_id: &str) -> Option<PlaybackPosition> {
        let key = storage_key(course_id, lesson_id);

        match self.with_conn(|conn| {
            conn.query_row(
                "SELECT lesson_id, position, duration, last_updated
                 FROM playback_positions WHERE key = ?1",
                params![key],
                |row| {
                    Ok(PlaybackPosition {
                        lesson_id: row.get(0)?,
                        position: row.get(1)?,
                        duration: row.get(2)?,
                        last_updated: row.get(3)?,
                    })
                },
            )
            .optional()
        })? {
            Ok(position) => position,
            Err(e) => {
                warn!(key = %key, error = %e, "failed to read playback position");
                None
            }
        }
    }

    /// Drop the stored resume point for a lesson
    pub fn clear(&self, course_id: i64, lesson_id: &str) {
        let key = storage_key(course_id, lesson_id);

        let result = self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM playback_positions WHERE key = ?1",
                params![key],
            )
        });
        if let Some(Err(e)) = result {
            warn!(key = %key, error = %e, "failed to clear playback position");
        }
    }

    /// Every stored position, most recently updated first
    pub fn list_all(&self) -> Vec<PlaybackPosition> {
        match self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT lesson_id, position, duration, last_updated
                 FROM playback_positions ORDER BY last_updated DESC",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(PlaybackPosition {
                    lesson_id: row.get(0)?,
                    position: row.get(1)?,
                    duration: row.get(2)?,
                    last_updated: row.get(3)?,
                })
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        }) {
            Some(Ok(positions)) => positions,
            Some(Err(e)) => {
                warn!(error = %e, "failed to list playback positions");
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    /// Run `f` against the connection; `None` when the cache is disabled
    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> Option<rusqlite::Result<T>> {
        // A poisoned lock just means an earlier panic mid-write; the
        // connection itself is still usable for a best-effort cache.
        let guard = self
            .conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.as_ref().map(f)
    }
}

fn storage_key(course_id: i64, lesson_id: &str) -> String {
    format!("video_{}_{}", course_id, lesson_id)
}

/// Whether a position counts as watched: at least 90% played. Zero or
/// unknown duration never counts.
pub fn is_watched(position: f64, duration: f64) -> bool {
    if duration == 0.0 {
        return false;
    }
    position / duration >= WATCHED_THRESHOLD
}

/// Format seconds as "MM:SS"
pub fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}
