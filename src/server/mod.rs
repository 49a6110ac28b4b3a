//! HTTP server for the generated site
//!
//! Serves the public directory, builds post pages that were not pre-built
//! on their first request, and answers the listing's "load more" button.

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::api::{ApiError, ContentSource};
use crate::config::FallbackMode;
use crate::generator::{Generator, LOAD_MORE_ROUTE};
use crate::helpers;
use crate::Blog;

/// Server state
pub struct ServerState<S> {
    source: S,
    generator: Generator,
    public_dir: std::path::PathBuf,
    fallback: FallbackMode,
    /// Uids being built in the background
    building: Mutex<HashSet<String>>,
    /// Background build errors not yet reported to a client
    failures: Mutex<FailedBuilds>,
}

impl<S: ContentSource + 'static> ServerState<S> {
    pub fn new(blog: &Blog, source: S) -> Result<Self> {
        Ok(Self {
            source,
            generator: Generator::new(blog)?,
            public_dir: blog.public_dir.clone(),
            fallback: blog.config.build.fallback,
            building: Mutex::new(HashSet::new()),
            failures: Mutex::new(FailedBuilds::new(MAX_FAILED_BUILDS)),
        })
    }
}

/// Failed background builds kept for their next request
const MAX_FAILED_BUILDS: usize = 256;

/// Errors of background builds by uid, oldest evicted first
struct FailedBuilds {
    capacity: usize,
    errors: HashMap<String, anyhow::Error>,
    order: VecDeque<String>,
}

impl FailedBuilds {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            errors: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn insert(&mut self, uid: String, err: anyhow::Error) {
        if self.errors.insert(uid.clone(), err).is_some() {
            return;
        }
        self.order.push_back(uid);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.errors.remove(&oldest);
            }
        }
    }

    /// Remove and return the error recorded for `uid`
    fn take(&mut self, uid: &str) -> Option<anyhow::Error> {
        let err = self.errors.remove(uid)?;
        self.order.retain(|u| u != uid);
        Some(err)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.errors.len()
    }
}

/// `GET /api/posts` query
#[derive(Debug, Deserialize)]
pub struct LoadMoreQuery {
    pub cursor: String,
}

/// `GET /api/posts` response
#[derive(Debug, Serialize, Deserialize)]
pub struct LoadMoreResponse {
    /// Listing items to append
    pub html: String,
    pub next_page: Option<String>,
    pub count: usize,
}

/// Build the router for a content source
pub fn router<S: ContentSource + 'static>(state: Arc<ServerState<S>>) -> Router {
    let public_dir = state.public_dir.clone();
    Router::new()
        .route(LOAD_MORE_ROUTE, get(load_more_handler::<S>))
        .route("/post/:uid", get(post_handler::<S>))
        .route("/post/:uid/", get(post_handler::<S>))
        .fallback_service(ServeDir::new(public_dir).append_index_html_on_directories(true))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the server
pub async fn start(blog: &Blog, ip: &str, port: u16, open: bool) -> Result<()> {
    let state = Arc::new(ServerState::new(blog, blog.client()?)?);
    let app = router(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let url = format!("http://{}:{}", ip, port);
    println!("Server running at {}", url);
    println!("Press Ctrl+C to stop.");

    // Open browser if requested
    if open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Fetch the page behind a cursor and render its listing items
async fn load_more_handler<S: ContentSource + 'static>(
    State(state): State<Arc<ServerState<S>>>,
    Query(query): Query<LoadMoreQuery>,
) -> Response {
    let page = match state.source.fetch_page(&query.cursor).await {
        Ok(page) => page,
        Err(e) => {
            tracing::warn!("Load more failed: {}", e);
            let status = match e {
                ApiError::InvalidCursor(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::BAD_GATEWAY,
            };
            return (status, Json(serde_json::json!({ "error": e.to_string() }))).into_response();
        }
    };

    match state.generator.render_cards(&page.results) {
        Ok(html) => Json(LoadMoreResponse {
            html,
            next_page: page.next_page,
            count: page.results.len(),
        })
        .into_response(),
        Err(e) => server_error(e),
    }
}

/// Serve a post page, building it first if it was not pre-built
async fn post_handler<S: ContentSource + 'static>(
    State(state): State<Arc<ServerState<S>>>,
    Path(uid): Path<String>,
) -> Response {
    if !helpers::is_safe_uid(&uid) {
        return not_found(&state.generator, &uid);
    }

    let output_path = state.generator.post_output_path(&uid);
    if let Ok(html) = tokio::fs::read_to_string(&output_path).await {
        return Html(html).into_response();
    }

    match state.fallback {
        FallbackMode::Blocking => {
            tracing::info!("Building post {} on demand", uid);
            match state.generator.build_post(&state.source, &uid).await {
                Ok(path) => match tokio::fs::read_to_string(&path).await {
                    Ok(html) => Html(html).into_response(),
                    Err(e) => server_error(e.into()),
                },
                Err(e) => build_error(&state.generator, &uid, e),
            }
        }
        FallbackMode::Loading => {
            // Report a failed build once, then let the next request retry
            let failure = lock(&state.failures).take(&uid);
            if let Some(err) = failure {
                return build_error(&state.generator, &uid, err);
            }
            if lock(&state.building).insert(uid.clone()) {
                spawn_build(state.clone(), uid);
            }
            match state.generator.render_loading() {
                Ok(html) => ([(header::CACHE_CONTROL, "no-store")], Html(html)).into_response(),
                Err(e) => server_error(e),
            }
        }
    }
}

/// Build a post in the background; the loading page polls until it exists
fn spawn_build<S: ContentSource + 'static>(state: Arc<ServerState<S>>, uid: String) {
    tracing::info!("Building post {} in the background", uid);
    tokio::spawn(async move {
        if let Err(e) = state.generator.build_post(&state.source, &uid).await {
            if !is_not_found(&e) {
                tracing::error!("Failed to build post {}: {}", uid, e);
            }
            lock(&state.failures).insert(uid.clone(), e);
        }
        lock(&state.building).remove(&uid);
    });
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn is_not_found(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ApiError>()
        .is_some_and(ApiError::is_not_found)
}

fn build_error(generator: &Generator, uid: &str, err: anyhow::Error) -> Response {
    if is_not_found(&err) {
        return not_found(generator, uid);
    }
    tracing::error!("Failed to build post {}: {}", uid, err);
    (StatusCode::BAD_GATEWAY, "Content repository unavailable").into_response()
}

fn not_found(generator: &Generator, uid: &str) -> Response {
    match generator.render_not_found(uid) {
        Ok(html) => (StatusCode::NOT_FOUND, Html(html)).into_response(),
        Err(e) => server_error(e),
    }
}

fn server_error(err: anyhow::Error) -> Response {
    tracing::error!("Render error: {}", err);
    (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
}

/// Open a URL in the default browser
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::MemorySource;
    use crate::config::SiteConfig;
    use std::time::Duration;

    fn state(dir: &std::path::Path, fallback: FallbackMode) -> Arc<ServerState<MemorySource>> {
        let mut config = SiteConfig::default();
        config.build.fallback = fallback;
        let blog = Blog::with_config(dir, config);
        let source = MemorySource::with_pages(&[&["hooks"], &["rust"]]);
        Arc::new(ServerState::new(&blog, source).unwrap())
    }

    async fn wait_for_builds(state: &ServerState<MemorySource>) {
        for _ in 0..200 {
            if lock(&state.building).is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    async fn body(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_blocking_fallback_builds_page() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path(), FallbackMode::Blocking);

        let response = post_handler(State(state.clone()), Path("rust".to_string())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body(response).await.contains("Title rust"));
        assert!(state.generator.post_output_path("rust").exists());

        // Second request is served from disk
        let response = post_handler(State(state.clone()), Path("rust".to_string())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            state.source.requests().iter().filter(|r| *r == "uid:rust").count(),
            1
        );
    }

    #[tokio::test]
    async fn test_unknown_post_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path(), FallbackMode::Blocking);

        let response = post_handler(State(state.clone()), Path("nope".to_string())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body(response).await.contains("Post não encontrado"));
    }

    #[tokio::test]
    async fn test_unsafe_uid_skips_backend() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path(), FallbackMode::Blocking);

        let response = post_handler(State(state.clone()), Path("..".to_string())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(state.source.requests().is_empty());
    }

    #[tokio::test]
    async fn test_loading_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path(), FallbackMode::Loading);

        let response = post_handler(State(state.clone()), Path("hooks".to_string())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body(response).await.contains("Carregando..."));

        // Wait for the background build
        let path = state.generator.post_output_path("hooks");
        for _ in 0..100 {
            if path.exists() && lock(&state.building).is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let response = post_handler(State(state.clone()), Path("hooks".to_string())).await;
        assert!(body(response).await.contains("Title hooks"));
    }

    #[tokio::test]
    async fn test_loading_fallback_missing_post() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path(), FallbackMode::Loading);

        let response = post_handler(State(state.clone()), Path("nope".to_string())).await;
        assert_eq!(response.status(), StatusCode::OK);

        wait_for_builds(&state).await;

        let response = post_handler(State(state.clone()), Path("nope".to_string())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(lock(&state.failures).len(), 0);
    }

    #[tokio::test]
    async fn test_loading_fallback_reports_backend_error_once() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path(), FallbackMode::Loading);
        state.source.fail_post_once("hooks");
        let fetches = || {
            state
                .source
                .requests()
                .iter()
                .filter(|r| *r == "uid:hooks")
                .count()
        };

        let response = post_handler(State(state.clone()), Path("hooks".to_string())).await;
        assert_eq!(response.status(), StatusCode::OK);
        wait_for_builds(&state).await;

        // The refresh gets the error without another fetch
        let response = post_handler(State(state.clone()), Path("hooks".to_string())).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(fetches(), 1);

        // The next one retries
        let response = post_handler(State(state.clone()), Path("hooks".to_string())).await;
        assert!(body(response).await.contains("Carregando..."));
        wait_for_builds(&state).await;
        assert_eq!(fetches(), 2);

        let response = post_handler(State(state.clone()), Path("hooks".to_string())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body(response).await.contains("Title hooks"));
    }

    #[tokio::test]
    async fn test_unknown_uids_do_not_accumulate() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path(), FallbackMode::Loading);

        for i in 0..MAX_FAILED_BUILDS + 20 {
            let uid = format!("junk-{}", i);
            post_handler(State(state.clone()), Path(uid)).await;
        }
        wait_for_builds(&state).await;

        assert_eq!(lock(&state.failures).len(), MAX_FAILED_BUILDS);

        // A kept entry is answered once and dropped
        let kept = lock(&state.failures).order.front().cloned().unwrap();
        let response = post_handler(State(state.clone()), Path(kept)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(lock(&state.failures).len(), MAX_FAILED_BUILDS - 1);
    }

    #[test]
    fn test_failed_builds_evict_oldest() {
        let mut failures = FailedBuilds::new(2);
        failures.insert("a".to_string(), anyhow::anyhow!("a"));
        failures.insert("b".to_string(), anyhow::anyhow!("b"));
        failures.insert("b".to_string(), anyhow::anyhow!("b again"));
        failures.insert("c".to_string(), anyhow::anyhow!("c"));

        assert_eq!(failures.len(), 2);
        assert!(failures.take("a").is_none());
        assert_eq!(failures.take("b").unwrap().to_string(), "b again");
        assert!(failures.take("b").is_none());

        failures.insert("d".to_string(), anyhow::anyhow!("d"));
        failures.insert("e".to_string(), anyhow::anyhow!("e"));
        assert!(failures.take("c").is_none());
        assert_eq!(failures.len(), 2);
    }

    #[tokio::test]
    async fn test_routes() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path(), FallbackMode::Blocking);
        std::fs::create_dir_all(&state.public_dir).unwrap();
        std::fs::write(state.public_dir.join("index.html"), "<h1>listing</h1>").unwrap();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move { axum::serve(listener, router(state)).await.unwrap() });
        let client = reqwest::Client::new();

        let index = client.get(format!("{}/", base)).send().await.unwrap();
        assert_eq!(index.status(), reqwest::StatusCode::OK);
        assert!(index.text().await.unwrap().contains("listing"));

        for path in ["/post/rust", "/post/rust/"] {
            let post = client.get(format!("{}{}", base, path)).send().await.unwrap();
            assert_eq!(post.status(), reqwest::StatusCode::OK);
            assert!(post.text().await.unwrap().contains("Title rust"));
        }

        let missing = client.get(format!("{}/post/nope/", base)).send().await.unwrap();
        assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);

        let more = client
            .get(format!("{}{}", base, LOAD_MORE_ROUTE))
            .query(&[("cursor", MemorySource::cursor(1))])
            .send()
            .await
            .unwrap();
        assert_eq!(more.status(), reqwest::StatusCode::OK);
        let page: LoadMoreResponse = more.json().await.unwrap();
        assert_eq!(page.count, 1);
        assert!(page.html.contains("Title rust"));

        let no_cursor = client
            .get(format!("{}{}", base, LOAD_MORE_ROUTE))
            .send()
            .await
            .unwrap();
        assert_eq!(no_cursor.status(), reqwest::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_load_more() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path(), FallbackMode::Blocking);

        let response = load_more_handler(
            State(state.clone()),
            Query(LoadMoreQuery {
                cursor: MemorySource::cursor(1),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let page: LoadMoreResponse = serde_json::from_str(&body(response).await).unwrap();
        assert_eq!(page.count, 1);
        assert_eq!(page.next_page, None);
        assert!(page.html.contains("Title rust"));
        assert!(page.html.contains("/post/rust/"));
    }

    #[tokio::test]
    async fn test_load_more_errors() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path(), FallbackMode::Blocking);

        let response = load_more_handler(
            State(state.clone()),
            Query(LoadMoreQuery {
                cursor: "https://elsewhere.example/steal".to_string(),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        state.source.fail_once(&MemorySource::cursor(1));
        let response = load_more_handler(
            State(state.clone()),
            Query(LoadMoreQuery {
                cursor: MemorySource::cursor(1),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(body(response).await.contains("error"));
    }
}
