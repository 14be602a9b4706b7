//! Remote catalog access.
//!
//! The engine consumes the platform's hosted store through two reads
//! (purchases, course) and one write (lesson completion). Callers of the
//! completion write branch on success versus failure only; there is no
//! richer error contract on that path.

use async_trait::async_trait;
use serde::Serialize;

use super::{Course, CourseId, LessonId, Purchase, PurchaseId, UserId};
use crate::config::ApiConfig;

/// Errors from catalog reads and the completion write.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Catalog request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Catalog responded with status {status} for {endpoint}")]
    UnexpectedStatus { status: u16, endpoint: String },

    #[error("Could not decode catalog record: {reason}")]
    Decode { reason: String },

    #[error("Course {course_id} not found")]
    CourseNotFound { course_id: CourseId },

    #[error("Purchase {purchase_id} not found")]
    PurchaseNotFound { purchase_id: PurchaseId },
}

/// Outbound completion write payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRecord {
    pub lesson_id: LessonId,
    pub course_id: CourseId,
    pub purchase_id: PurchaseId,
    pub duration_watched_minutes: u32,
}

/// Read/write access to the hosted course store.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Fetches all purchases of a user.
    async fn fetch_purchases(&self, user_id: UserId) -> Result<Vec<Purchase>, CatalogError>;

    /// Fetches a course with its lessons in drip order.
    async fn fetch_course(&self, course_id: CourseId) -> Result<Course, CatalogError>;

    /// Durable completion write.
    async fn record_completion(&self, record: &CompletionRecord) -> Result<(), CatalogError>;
}

/// Catalog client speaking to the platform HTTP API.
pub struct HttpCatalogClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpCatalogClient {
    /// Creates a client with the configured timeout and user agent.
    ///
    /// # Errors
    ///
    /// - `CatalogError::Http` - TLS backend initialization failed
    pub fn new(config: &ApiConfig) -> Result<Self, CatalogError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn fetch_purchases(&self, user_id: UserId) -> Result<Vec<Purchase>, CatalogError> {
        let endpoint = self.endpoint(&format!("users/{user_id}/purchases"));
        let response = self.http.get(&endpoint).send().await?;

        if !response.status().is_success() {
            return Err(CatalogError::UnexpectedStatus {
                status: response.status().as_u16(),
                endpoint,
            });
        }

        response
            .json::<Vec<Purchase>>()
            .await
            .map_err(|e| CatalogError::Decode {
                reason: e.to_string(),
            })
    }

    async fn fetch_course(&self, course_id: CourseId) -> Result<Course, CatalogError> {
        let endpoint = self.endpoint(&format!("courses/{course_id}"));
        let response = self.http.get(&endpoint).send().await?;

        if response.status().as_u16() == 404 {
            return Err(CatalogError::CourseNotFound { course_id });
        }
        if !response.status().is_success() {
            return Err(CatalogError::UnexpectedStatus {
                status: response.status().as_u16(),
                endpoint,
            });
        }

        let mut course = response
            .json::<Course>()
            .await
            .map_err(|e| CatalogError::Decode {
                reason: e.to_string(),
            })?;

        // Wire order is not guaranteed; drip positions are.
        course.sort_lessons();
        Ok(course)
    }

    async fn record_completion(&self, record: &CompletionRecord) -> Result<(), CatalogError> {
        let endpoint = self.endpoint(&format!("lessons/{}/completions", record.lesson_id));
        let response = self.http.post(&endpoint).json(record).send().await?;

        if !response.status().is_success() {
            return Err(CatalogError::UnexpectedStatus {
                status: response.status().as_u16(),
                endpoint,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use uuid::Uuid;

    use super::*;

    #[test]
    fn test_completion_record_wire_shape() {
        let record = CompletionRecord {
            lesson_id: LessonId::new(Uuid::from_u128(1)),
            course_id: CourseId::new(Uuid::from_u128(2)),
            purchase_id: PurchaseId::new(Uuid::from_u128(3)),
            duration_watched_minutes: 20,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["lessonId"], json!(record.lesson_id));
        assert_eq!(json["durationWatchedMinutes"], 20);
        assert!(json.get("lesson_id").is_none());
    }

    #[test]
    fn test_http_client_normalizes_base_url() {
        // trailing slash on the configured base must not double up
        let config = ApiConfig {
            base_url: "https://api.example.com/".to_string(),
            ..ApiConfig::default()
        };
        let client = HttpCatalogClient::new(&config).unwrap();

        assert_eq!(
            client.endpoint("courses/abc"),
            "https://api.example.com/courses/abc"
        );
    }
}
