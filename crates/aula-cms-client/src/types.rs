//! Wire and canonical types for the Aula CMS API
//!
//! The CMS has served two record vintages over its lifetime: the older
//! relational shape nests fields under `attributes` and wraps relations in
//! `data` envelopes, the newer one returns flat objects. Lesson references
//! likewise arrive either as bare slug strings or as small objects carrying
//! the slug under `lessonId`. Everything here accepts both encodings and
//! collapses them into canonical structs before they leave this crate, so
//! downstream code never branches on wire vintage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// CMS connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CmsConfig {
    /// Base URL of the CMS, e.g. "http://localhost:1337"
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:1337".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Lifecycle state of an enrollment
///
/// The CMS owns the transitions; clients only ever read this field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EnrollmentStatus {
    /// Enrolled but nothing watched yet
    #[default]
    NotStarted,
    /// At least one lesson under way
    InProgress,
    /// Every lesson completed
    Completed,
}

impl EnrollmentStatus {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "not-started" => Some(Self::NotStarted),
            "in-progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not-started",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
        }
    }

    /// Whether the enrollment has reached the end of the course
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl std::fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Difficulty grading for a course
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CourseLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl CourseLevel {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "beginner" => Some(Self::Beginner),
            "intermediate" => Some(Self::Intermediate),
            "advanced" => Some(Self::Advanced),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }
}

/// Course content language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CourseLanguage {
    #[default]
    Es,
    En,
    Pt,
}

// ============================================================
// Media
// ============================================================

/// Expanded media object as the CMS returns it
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub alternative_text: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// Media relation: a bare URL string or the expanded object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MediaRef {
    Url(String),
    Media(Media),
}

impl MediaRef {
    /// Absolute URL for the asset, or `None` when the reference is empty
    pub fn resolve(&self, base_url: &str) -> Option<String> {
        let url = match self {
            MediaRef::Url(url) => url.as_str(),
            MediaRef::Media(media) => media.url.as_str(),
        };
        if url.is_empty() {
            None
        } else {
            Some(resolve_media_url(url, base_url))
        }
    }
}

/// Resolve a possibly-relative CMS media path against the CMS base URL.
/// Absolute and protocol-relative URLs pass through untouched.
pub fn resolve_media_url(url: &str, base_url: &str) -> String {
    if url.starts_with("http") || url.starts_with("//") {
        url.to_string()
    } else {
        format!("{}{}", base_url, url)
    }
}

// ============================================================
// Enrollments
// ============================================================

/// Lesson reference as stored on an enrollment: the older shape keeps
/// bare slugs, the newer one objects with the slug under `lessonId`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LessonRef {
    Slug(String),
    Expanded(LessonRefFields),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonRefFields {
    pub lesson_id: String,
    #[serde(default)]
    pub title: Option<String>,
}

impl LessonRef {
    pub fn slug(&self) -> &str {
        match self {
            LessonRef::Slug(slug) => slug,
            LessonRef::Expanded(fields) => &fields.lesson_id,
        }
    }
}

/// Enrollment fields common to both wire vintages. Every field defaults
/// so a drifting CMS schema degrades instead of failing the whole list.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentFields {
    #[serde(default)]
    pub enrollment_status: EnrollmentStatus,
    #[serde(default)]
    pub progress_percentage: Option<f64>,
    #[serde(default)]
    pub current_lesson: Option<LessonRef>,
    #[serde(default)]
    pub completed_lessons: Vec<LessonRef>,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub last_accessed_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub enrolled_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_time_spent: Option<u64>,
    #[serde(default)]
    pub course: Option<CourseRef>,
}

/// Course relation on an enrollment: a flat object with `id` at the top
/// level or nested `{ "data": { "id", "attributes" } }`.
///
/// `Flat` must come first: `Nested`'s only field is an `Option`, so it
/// matches any map and would swallow flat relations whole.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CourseRef {
    Flat(FlatCourse),
    Nested { data: Option<NestedCourse> },
    /// Unpopulated relation: just the id
    Id(i64),
}

#[derive(Debug, Clone, Deserialize)]
pub struct NestedCourse {
    pub id: i64,
    #[serde(default)]
    pub attributes: CourseSummary,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlatCourse {
    pub id: i64,
    #[serde(flatten)]
    pub summary: CourseSummary,
}

/// Course fields surfaced on an enrollment card
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummary {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub cover_image: Option<MediaRef>,
    #[serde(default)]
    pub total_lessons: Option<u32>,
}

impl CourseRef {
    fn into_course(self, base_url: &str) -> EnrollmentCourse {
        let (id, summary) = match self {
            CourseRef::Flat(flat) => (flat.id, flat.summary),
            CourseRef::Nested { data: Some(nested) } => (nested.id, nested.attributes),
            CourseRef::Nested { data: None } => return EnrollmentCourse::default(),
            CourseRef::Id(id) => {
                return EnrollmentCourse {
                    id,
                    ..Default::default()
                }
            }
        };
        EnrollmentCourse {
            id,
            cover_image: summary.cover_image.as_ref().and_then(|c| c.resolve(base_url)),
            title: summary.title,
            slug: summary.slug,
            total_lessons: summary.total_lessons,
        }
    }
}

/// Raw enrollment record in either wire vintage. Call
/// [`flatten`](EnrollmentRecord::flatten) to get the canonical
/// [`Enrollment`].
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EnrollmentRecord {
    Nested {
        id: i64,
        attributes: EnrollmentFields,
    },
    Flat {
        id: i64,
        #[serde(flatten)]
        fields: EnrollmentFields,
    },
}

impl EnrollmentRecord {
    /// Collapse either shape into the canonical enrollment, resolving
    /// media URLs against `base_url` and defaulting anything missing.
    pub fn flatten(self, base_url: &str) -> Enrollment {
        let (id, fields) = match self {
            EnrollmentRecord::Nested { id, attributes } => (id, attributes),
            EnrollmentRecord::Flat { id, fields } => (id, fields),
        };

        // Completion set: slugs only, empties dropped, duplicates collapsed
        let mut completed_lessons: Vec<String> = Vec::new();
        for lesson in &fields.completed_lessons {
            let slug = lesson.slug();
            if !slug.is_empty() && !completed_lessons.iter().any(|s| s == slug) {
                completed_lessons.push(slug.to_string());
            }
        }

        let progress_percentage = fields
            .progress_percentage
            .map(|p| p.round().clamp(0.0, 100.0) as u8)
            .unwrap_or(0);

        Enrollment {
            id,
            status: fields.enrollment_status,
            progress_percentage,
            current_lesson: fields
                .current_lesson
                .as_ref()
                .map(|l| l.slug())
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            completed_lessons,
            last_accessed_at: fields.last_accessed_at.unwrap_or(DateTime::UNIX_EPOCH),
            enrolled_at: fields.enrolled_at,
            completed_at: fields.completed_at,
            total_time_spent: fields.total_time_spent,
            course: fields
                .course
                .map(|c| c.into_course(base_url))
                .unwrap_or_default(),
        }
    }
}

/// One enrollment, flattened to a single shape regardless of which wire
/// vintage produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: i64,
    pub status: EnrollmentStatus,
    /// 0..=100, rounded
    pub progress_percentage: u8,
    /// Slug of the lesson to resume at, when one is set
    pub current_lesson: Option<String>,
    /// Unique lesson slugs, completion order preserved
    pub completed_lessons: Vec<String>,
    pub last_accessed_at: DateTime<Utc>,
    pub enrolled_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Accumulated watch time in seconds, when the CMS tracks it
    pub total_time_spent: Option<u64>,
    pub course: EnrollmentCourse,
}

/// Course summary carried on a flattened enrollment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentCourse {
    pub id: i64,
    pub title: String,
    pub slug: String,
    /// Cover URL, already resolved against the CMS base
    pub cover_image: Option<String>,
    pub total_lessons: Option<u32>,
}

/// Partial enrollment update; unset fields stay untouched server-side
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_lesson: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_lessons: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_percentage: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_accessed_at: Option<DateTime<Utc>>,
}

impl ProgressUpdate {
    /// Heartbeat payload: move the resume pointer and touch the access
    /// time, leaving completion state alone
    pub fn heartbeat(current_lesson: impl Into<String>) -> Self {
        Self {
            current_lesson: Some(current_lesson.into()),
            last_accessed_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Completion-toggle payload: the full four-field write
    pub fn completion(
        current_lesson: impl Into<String>,
        completed_lessons: Vec<String>,
        progress_percentage: u8,
    ) -> Self {
        Self {
            current_lesson: Some(current_lesson.into()),
            completed_lessons: Some(completed_lessons),
            progress_percentage: Some(progress_percentage),
            last_accessed_at: Some(Utc::now()),
        }
    }
}

// ============================================================
// Courses
// ============================================================

/// Lesson inside a course module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: i64,
    /// Stable slug used in URLs and progress records; lessons predating
    /// the field fall back to the numeric id
    #[serde(default)]
    pub lesson_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub text_content: Option<String>,
    /// Runtime in minutes
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub order: i32,
    /// Watchable without an enrollment
    #[serde(default)]
    pub free_preview: bool,
}

impl Lesson {
    /// Progress-record identifier for this lesson
    pub fn slug(&self) -> String {
        match &self.lesson_id {
            Some(slug) if !slug.is_empty() => slug.clone(),
            _ => self.id.to_string(),
        }
    }
}

/// Ordered group of lessons
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseModule {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instructor {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar: Option<MediaRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

/// Publication controls set by course editors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSettings {
    /// Hidden courses stay out of the catalog; only an explicit `false`
    /// hides
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub language: CourseLanguage,
}

fn default_true() -> bool {
    true
}

/// Full course with its module tree, as returned by the by-slug lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub cover_image: Option<MediaRef>,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub full_description: Option<String>,
    #[serde(default)]
    pub instructor: Option<Instructor>,
    #[serde(default)]
    pub level: CourseLevel,
    /// Total runtime in minutes
    #[serde(default)]
    pub estimated_duration: u32,
    #[serde(default)]
    pub price_usd: Option<f64>,
    #[serde(default)]
    pub price_arg: f64,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub modules: Vec<CourseModule>,
    #[serde(default)]
    pub settings: Option<CourseSettings>,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub updated_at: Option<DateTime<Utc>>,
}

// ============================================================
// Catalog
// ============================================================

/// Card-sized course projection for catalog surfaces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogCourse {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub cover_image: Option<String>,
    pub short_description: String,
    pub level: CourseLevel,
    pub estimated_duration: u32,
    pub price_arg: f64,
    pub price_usd: Option<f64>,
    pub instructor: Option<CatalogInstructor>,
    pub tags: Vec<CatalogTag>,
    pub featured: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogInstructor {
    pub name: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogTag {
    pub name: String,
    pub slug: String,
    pub color: Option<String>,
}

impl CatalogCourse {
    /// Flatten a full course record into a card, resolving media URLs
    pub fn from_course(course: &Course, base_url: &str) -> Self {
        Self {
            id: course.id,
            title: course.title.clone(),
            slug: course.slug.clone(),
            cover_image: course.cover_image.as_ref().and_then(|c| c.resolve(base_url)),
            short_description: course.short_description.clone().unwrap_or_default(),
            level: course.level,
            estimated_duration: course.estimated_duration,
            price_arg: course.price_arg,
            price_usd: course.price_usd,
            instructor: course.instructor.as_ref().map(|i| CatalogInstructor {
                name: i.name.clone(),
                avatar: i.avatar.as_ref().and_then(|a| a.resolve(base_url)),
            }),
            tags: course
                .tags
                .iter()
                .map(|tag| CatalogTag {
                    name: tag.name.clone(),
                    slug: tag.slug.clone(),
                    color: tag.color.clone(),
                })
                .collect(),
            featured: course.settings.as_ref().map_or(false, |s| s.featured),
        }
    }
}

/// Catalog listing filters; tag and level apply server-side, featured
/// and limit after normalization
#[derive(Debug, Clone, Default)]
pub struct CatalogQuery {
    /// Keep only courses flagged featured
    pub featured: bool,
    /// Filter by tag slug
    pub tag: Option<String>,
    /// Filter by difficulty
    pub level: Option<CourseLevel>,
    /// Cap the result count after filtering
    pub limit: Option<usize>,
}

/// Shape raw course records into catalog cards: courses hidden by their
/// settings drop out, then the featured filter and limit apply
pub fn build_catalog(courses: Vec<Course>, query: &CatalogQuery, base_url: &str) -> Vec<CatalogCourse> {
    let mut catalog: Vec<CatalogCourse> = courses
        .iter()
        .filter(|course| course.settings.as_ref().map_or(true, |s| s.visible))
        .map(|course| CatalogCourse::from_course(course, base_url))
        .collect();
    if query.featured {
        catalog.retain(|course| course.featured);
    }
    if let Some(limit) = query.limit {
        catalog.truncate(limit);
    }
    catalog
}

/// Human-readable duration from minutes: "45 min", "2h", "1h 30min"
pub fn format_duration(minutes: u32) -> String {
    if minutes < 60 {
        return format!("{} min", minutes);
    }
    let hours = minutes / 60;
    let remaining = minutes % 60;
    if remaining == 0 {
        format!("{}h", hours)
    } else {
        format!("{}h {}min", hours, remaining)
    }
}

// ============================================================
// Response envelopes
// ============================================================

/// Pagination block on list responses
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub page_count: u32,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseMeta {
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

/// `GET /api/enrollments` — `{ "data": [...], "meta": {...} }`
#[derive(Debug, Clone, Deserialize)]
pub struct EnrollmentsResponse {
    #[serde(default)]
    pub data: Vec<EnrollmentRecord>,
    #[serde(default)]
    pub meta: Option<ResponseMeta>,
}

/// Single-record envelope — `{ "data": {...} | null }`
#[derive(Debug, Clone, Deserialize)]
pub struct EnrollmentResponse {
    #[serde(default)]
    pub data: Option<EnrollmentRecord>,
}

/// `GET /api/courses` — `{ "data": [...], "meta": {...} }`
#[derive(Debug, Clone, Deserialize)]
pub struct CoursesResponse {
    #[serde(default)]
    pub data: Vec<Course>,
    #[serde(default)]
    pub meta: Option<ResponseMeta>,
}

/// `GET /api/tags` — `{ "data": [...] }`
#[derive(Debug, Clone, Deserialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub data: Vec<Tag>,
}

/// Accept a timestamp in any shape the CMS has ever sent; anything
/// unparseable reads as absent rather than failing the record
fn lenient_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value
        .as_str()
        .and_then(|s| s.parse::<DateTime<Utc>>().ok()))
}
