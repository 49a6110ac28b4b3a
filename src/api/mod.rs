//! Content repository access
//!
//! The rest of the crate talks to the backend through [`ContentSource`], so
//! the build, the server, and the pagination state work the same against the
//! Prismic client and against the in-memory source used in tests.

mod prismic;

pub use prismic::PrismicClient;

use std::future::Future;
use thiserror::Error;

use crate::content::{PostDetail, PostPage};

/// Errors raised while talking to the content repository
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Post not found: {uid}")]
    NotFound { uid: String },

    #[error("Repository has no master ref")]
    MissingMasterRef,

    #[error("Cursor does not belong to the configured repository: {0}")]
    InvalidCursor(String),

    #[error("Invalid API endpoint: {0}")]
    InvalidEndpoint(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }
}

/// A backend that lists posts and fetches them by uid
pub trait ContentSource: Send + Sync {
    /// First page of posts
    fn list_posts(&self) -> impl Future<Output = Result<PostPage, ApiError>> + Send;

    /// One post by its unique identifier
    fn post_by_uid(&self, uid: &str) -> impl Future<Output = Result<PostDetail, ApiError>> + Send;

    /// The page a cursor points at
    fn fetch_page(&self, cursor: &str) -> impl Future<Output = Result<PostPage, ApiError>> + Send;
}
