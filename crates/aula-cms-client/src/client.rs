//! HTTP client for the Aula CMS content and enrollment API

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::{CmsError, Result};
use crate::types::{
    build_catalog, CatalogCourse, CatalogQuery, CmsConfig, Course, CoursesResponse, Enrollment,
    EnrollmentResponse, EnrollmentStatus, EnrollmentsResponse, ProgressUpdate, Tag, TagsResponse,
};

/// Client for the Aula CMS
///
/// Course reads are public; enrollment operations authenticate with the
/// caller's bearer token, so one client instance serves any number of
/// signed-in identities.
///
/// # Example
///
/// ```rust,no_run
/// use aula_cms_client::{CmsClient, CmsConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = CmsClient::new(CmsConfig::default());
///
/// // Full course with its module tree
/// let course = client.course_by_slug("woodworking-basics").await?;
///
/// // The signed-in user's enrollments
/// let enrollments = client.list_enrollments("jwt-token").await?;
/// # Ok(())
/// # }
/// ```
pub struct CmsClient {
    config: CmsConfig,
    client: Client,
}

impl CmsClient {
    /// Create a new client from the given configuration
    pub fn new(config: CmsConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to build HTTP client");

        Self { config, client }
    }

    /// Base URL this client talks to
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// All enrollments belonging to the token's identity, with course
    /// summaries populated
    pub async fn list_enrollments(&self, token: &str) -> Result<Vec<Enrollment>> {
        let url = format!(
            "{}/api/enrollments?populate[course][populate]=*",
            self.config.base_url
        );

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await?;

        let body: EnrollmentsResponse = self.handle_response(response).await?;
        Ok(body
            .data
            .into_iter()
            .map(|record| record.flatten(&self.config.base_url))
            .collect())
    }

    /// The enrollment the identity should resume, as selected by the
    /// CMS: most recently accessed and not yet completed. `None` when
    /// nothing qualifies.
    pub async fn continue_watching(&self, token: &str) -> Result<Option<Enrollment>> {
        let url = format!(
            "{}/api/enrollments/continue-watching",
            self.config.base_url
        );

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body: EnrollmentResponse = self.handle_response(response).await?;
        Ok(body.data.map(|record| record.flatten(&self.config.base_url)))
    }

    /// Apply a partial progress update to one enrollment and return the
    /// updated record
    pub async fn update_progress(
        &self,
        token: &str,
        enrollment_id: i64,
        update: &ProgressUpdate,
    ) -> Result<Enrollment> {
        let url = format!("{}/api/enrollments/{}", self.config.base_url, enrollment_id);

        let mut data = serde_json::to_value(update)?;
        if let Some(fields) = data.as_object_mut() {
            fields.insert("id".to_string(), serde_json::json!(enrollment_id));
        }

        let response = self
            .client
            .put(&url)
            .header("Authorization", format!("Bearer {}", token))
            .json(&serde_json::json!({ "data": data }))
            .send()
            .await?;

        let body: EnrollmentResponse = self.handle_response(response).await?;
        body.data
            .map(|record| record.flatten(&self.config.base_url))
            .ok_or_else(|| CmsError::InvalidResponse("update returned no enrollment".to_string()))
    }

    /// Create a fresh enrollment for a course: in-progress, zero
    /// percent, empty completion set
    pub async fn create_enrollment(&self, token: &str, course_id: i64) -> Result<Enrollment> {
        let url = format!("{}/api/enrollments", self.config.base_url);

        let body = serde_json::json!({
            "data": {
                "course": course_id,
                "enrollmentStatus": EnrollmentStatus::InProgress,
                "progressPercentage": 0,
                "currentLesson": "",
                "completedLessons": [],
                "lastAccessedAt": chrono::Utc::now(),
            }
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", token))
            .json(&body)
            .send()
            .await?;

        let body: EnrollmentResponse = self.handle_response(response).await?;
        body.data
            .map(|record| record.flatten(&self.config.base_url))
            .ok_or_else(|| CmsError::InvalidResponse("create returned no enrollment".to_string()))
    }

    /// Whether `user_id` holds at least one enrollment for `course_id`
    pub async fn validate_access(&self, token: &str, course_id: i64, user_id: i64) -> Result<bool> {
        let url = format!(
            "{}/api/enrollments?filters[course][id][$eq]={}&filters[user][id][$eq]={}",
            self.config.base_url, course_id, user_id
        );

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await?;

        let body: EnrollmentsResponse = self.handle_response(response).await?;
        Ok(!body.data.is_empty())
    }

    /// Look up a published course by slug with its full module tree.
    /// `Ok(None)` when no course carries the slug.
    pub async fn course_by_slug(&self, slug: &str) -> Result<Option<Course>> {
        let url = format!(
            "{}/api/courses?filters[slug][$eq]={}\
             &populate[modules][populate]=lessons\
             &populate[instructor]=populate\
             &populate[tags]=populate\
             &populate[coverImage]=populate\
             &populate[settings]=populate",
            self.config.base_url,
            urlencoding::encode(slug)
        );

        let response = self.client.get(&url).send().await?;
        let body: CoursesResponse = self.handle_response(response).await?;
        Ok(body.data.into_iter().next())
    }

    /// Catalog listing: published courses, newest first, shaped by
    /// `query`
    pub async fn published_courses(&self, query: &CatalogQuery) -> Result<Vec<CatalogCourse>> {
        let mut url = format!("{}/api/courses?", self.config.base_url);
        if let Some(tag) = &query.tag {
            url.push_str(&format!(
                "filters[tags][slug][$eq]={}&",
                urlencoding::encode(tag)
            ));
        }
        if let Some(level) = query.level {
            url.push_str(&format!("filters[level][$eq]={}&", level.as_str()));
        }
        url.push_str("populate=*&sort[0]=createdAt:desc");

        let response = self.client.get(&url).send().await?;
        let body: CoursesResponse = self.handle_response(response).await?;
        Ok(build_catalog(body.data, query, &self.config.base_url))
    }

    /// Courses flagged featured, capped at `limit`
    pub async fn featured_courses(&self, limit: usize) -> Result<Vec<CatalogCourse>> {
        self.published_courses(&CatalogQuery {
            featured: true,
            limit: Some(limit),
            ..Default::default()
        })
        .await
    }

    /// All tags available for catalog filtering
    pub async fn tags(&self) -> Result<Vec<Tag>> {
        let url = format!("{}/api/tags", self.config.base_url);
        let response = self.client.get(&url).send().await?;
        let body: TagsResponse = self.handle_response(response).await?;
        Ok(body.data)
    }

    /// Map a response to a typed result, folding CMS error statuses
    /// into [`CmsError`]
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CmsError::Unauthorized(message));
        }

        if status == StatusCode::NOT_FOUND {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CmsError::NotFound(message));
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CmsError::Server {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}
