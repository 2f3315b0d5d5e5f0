//! SDK error types

use thiserror::Error;

/// SDK-level error
#[derive(Debug, Error)]
pub enum SdkError {
    /// Operation needs a signed-in identity
    #[error("Not authenticated: {0}")]
    Unauthenticated(String),

    /// The CMS rejected or failed the operation
    #[error("CMS error: {0}")]
    Cms(String),
}

impl From<aula_cms_client::CmsError> for SdkError {
    fn from(err: aula_cms_client::CmsError) -> Self {
        match err {
            aula_cms_client::CmsError::Unauthorized(message) => SdkError::Unauthenticated(message),
            other => SdkError::Cms(other.to_string()),
        }
    }
}

/// Result type for SDK operations
pub type Result<T> = std::result::Result<T, SdkError>;
