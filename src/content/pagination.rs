//! Incremental listing pagination
//!
//! [`Pagination`] holds the posts shown so far and the cursor of the next
//! page. Loading more appends the fetched page after the held items, in
//! arrival order, and swaps in the new cursor. The state is a plain value
//! owned by whoever drives it (the build, a CLI session); `load_more` takes
//! `&mut self`, so one state never has two loads in flight.

use crate::api::{ApiError, ContentSource};

use super::{PostPage, PostSummary};

/// Outcome of a successful `load_more`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMore {
    /// A page was fetched and appended
    Loaded { added: usize },
    /// No cursor was held; nothing was fetched
    Exhausted,
}

/// Posts loaded so far plus the cursor of the next page
#[derive(Debug, Clone, Default)]
pub struct Pagination {
    items: Vec<PostSummary>,
    cursor: Option<String>,
}

impl Pagination {
    /// Start from the first page
    pub fn new(page: PostPage) -> Self {
        Self {
            items: page.results,
            cursor: page.next_page,
        }
    }

    /// Posts in the order they arrived
    pub fn items(&self) -> &[PostSummary] {
        &self.items
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    /// Whether a further page exists, i.e. whether "load more" is offered
    pub fn has_more(&self) -> bool {
        self.cursor.is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append `page` after the held items and take over its cursor
    ///
    /// No sorting and no deduplication: a post the backend returns twice is
    /// listed twice.
    pub fn merge(&mut self, page: PostPage) {
        self.items.extend(page.results);
        self.cursor = page.next_page;
    }

    /// Fetch the page behind the held cursor and merge it
    ///
    /// On error the items and the cursor are left as they were, so the
    /// same page can be requested again.
    pub async fn load_more<S: ContentSource>(&mut self, source: &S) -> Result<LoadMore, ApiError> {
        let Some(cursor) = self.cursor.as_deref() else {
            return Ok(LoadMore::Exhausted);
        };

        let page = source.fetch_page(cursor).await?;
        let added = page.results.len();
        self.merge(page);

        tracing::debug!(
            "Loaded {} more posts ({} total, more: {})",
            added,
            self.items.len(),
            self.has_more()
        );
        Ok(LoadMore::Loaded { added })
    }

    /// Follow cursors until the last page
    pub async fn load_all<S: ContentSource>(&mut self, source: &S) -> Result<(), ApiError> {
        while let LoadMore::Loaded { .. } = self.load_more(source).await? {}
        Ok(())
    }

    pub fn into_parts(self) -> (Vec<PostSummary>, Option<String>) {
        (self.items, self.cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::{summary, MemorySource};

    fn uids(pagination: &Pagination) -> Vec<&str> {
        pagination.items().iter().map(|p| p.uid.as_str()).collect()
    }

    #[test]
    fn test_merge_appends_in_order() {
        let mut pagination = Pagination::new(PostPage {
            results: vec![summary("c"), summary("a")],
            next_page: Some("https://x/2".to_string()),
        });
        pagination.merge(PostPage {
            results: vec![summary("b"), summary("a")],
            next_page: None,
        });

        assert_eq!(uids(&pagination), ["c", "a", "b", "a"]);
        assert!(!pagination.has_more());
    }

    #[tokio::test]
    async fn test_load_more_follows_cursors() {
        let source = MemorySource::with_pages(&[&["p1", "p2"], &["p3"], &["p4", "p5"]]);
        let mut pagination = Pagination::new(source.list_posts().await.unwrap());
        assert!(pagination.has_more());

        let outcome = pagination.load_more(&source).await.unwrap();
        assert_eq!(outcome, LoadMore::Loaded { added: 1 });
        assert_eq!(uids(&pagination), ["p1", "p2", "p3"]);
        assert_eq!(pagination.cursor(), Some(MemorySource::cursor(2).as_str()));

        let outcome = pagination.load_more(&source).await.unwrap();
        assert_eq!(outcome, LoadMore::Loaded { added: 2 });
        assert_eq!(uids(&pagination), ["p1", "p2", "p3", "p4", "p5"]);
        assert!(!pagination.has_more());

        assert_eq!(
            source.requests(),
            ["list", "memory://page/1", "memory://page/2"]
        );
    }

    #[tokio::test]
    async fn test_exhausted_does_not_fetch() {
        let source = MemorySource::with_pages(&[&["only"]]);
        let mut pagination = Pagination::new(source.list_posts().await.unwrap());

        assert_eq!(
            pagination.load_more(&source).await.unwrap(),
            LoadMore::Exhausted
        );
        assert_eq!(uids(&pagination), ["only"]);
        assert_eq!(source.requests(), ["list"]);
    }

    #[tokio::test]
    async fn test_failure_keeps_state() {
        let source = MemorySource::with_pages(&[&["p1"], &["p2"]]);
        let mut pagination = Pagination::new(source.list_posts().await.unwrap());
        source.fail_once(&MemorySource::cursor(1));

        let err = pagination.load_more(&source).await.unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 503, .. }));
        assert_eq!(uids(&pagination), ["p1"]);
        assert_eq!(pagination.cursor(), Some(MemorySource::cursor(1).as_str()));

        // Retrying the same cursor works
        pagination.load_more(&source).await.unwrap();
        assert_eq!(uids(&pagination), ["p1", "p2"]);
    }

    #[tokio::test]
    async fn test_load_all() {
        let source = MemorySource::with_pages(&[&["a"], &["b", "c"], &[], &["d"]]);
        let mut pagination = Pagination::new(source.list_posts().await.unwrap());
        pagination.load_all(&source).await.unwrap();

        assert_eq!(uids(&pagination), ["a", "b", "c", "d"]);
        let (items, cursor) = pagination.into_parts();
        assert_eq!(items.len(), 4);
        assert_eq!(cursor, None);
    }
}
