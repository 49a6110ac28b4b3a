//! Prismic REST API client

use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::OnceCell;

use super::{ApiError, ContentSource};
use crate::config::ApiConfig;
use crate::content::{ContentBlock, PostDetail, PostPage, PostSummary};

/// Client for one Prismic repository
pub struct PrismicClient {
    http: reqwest::Client,
    endpoint: Url,
    access_token: Option<String>,
    document_type: String,
    page_size: usize,
    master_ref: OnceCell<String>,
}

/// `GET {endpoint}` response (only what we read)
#[derive(Deserialize)]
struct ApiInfo {
    refs: Vec<ApiRef>,
}

#[derive(Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(rename = "isMasterRef", default)]
    is_master_ref: bool,
}

/// `documents/search` response
#[derive(Deserialize)]
struct SearchResponse<T> {
    results: Vec<Document<T>>,
    #[serde(default, deserialize_with = "crate::content::cursor")]
    next_page: Option<String>,
}

#[derive(Deserialize)]
struct Document<T> {
    id: String,
    uid: Option<String>,
    first_publication_date: Option<String>,
    data: T,
}

impl<T> Document<T> {
    /// Documents without a uid are routed by their id
    fn route_key(&self) -> String {
        self.uid.clone().unwrap_or_else(|| self.id.clone())
    }
}

#[derive(Deserialize)]
struct SummaryFields {
    #[serde(default, deserialize_with = "crate::content::null_as_empty")]
    title: String,
    #[serde(default, deserialize_with = "crate::content::null_as_empty")]
    subtitle: String,
    #[serde(default, deserialize_with = "crate::content::null_as_empty")]
    author: String,
}

#[derive(Deserialize)]
struct DetailFields {
    #[serde(default, deserialize_with = "crate::content::null_as_empty")]
    title: String,
    #[serde(default)]
    banner: Option<ImageField>,
    #[serde(default, deserialize_with = "crate::content::null_as_empty")]
    author: String,
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize, Default)]
struct ImageField {
    url: Option<String>,
}

impl From<Document<SummaryFields>> for PostSummary {
    fn from(doc: Document<SummaryFields>) -> Self {
        PostSummary {
            uid: doc.route_key(),
            first_publication_date: doc.first_publication_date,
            title: doc.data.title,
            subtitle: doc.data.subtitle,
            author: doc.data.author,
        }
    }
}

impl From<Document<DetailFields>> for PostDetail {
    fn from(doc: Document<DetailFields>) -> Self {
        let uid = doc.route_key();
        PostDetail {
            uid,
            first_publication_date: doc.first_publication_date,
            title: doc.data.title,
            banner: doc.data.banner.and_then(|b| b.url).unwrap_or_default(),
            author: doc.data.author,
            content: doc.data.content,
        }
    }
}

impl From<SearchResponse<SummaryFields>> for PostPage {
    fn from(response: SearchResponse<SummaryFields>) -> Self {
        PostPage {
            results: response.results.into_iter().map(PostSummary::from).collect(),
            next_page: response.next_page,
        }
    }
}

impl PrismicClient {
    /// Create a client from the `api` section of the site config
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let endpoint = Url::parse(config.endpoint.trim())
            .map_err(|e| ApiError::InvalidEndpoint(format!("{}: {}", config.endpoint, e)))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ApiError::InvalidEndpoint(config.endpoint.clone()));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("spacetraveling/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoint,
            access_token: config.access_token.clone(),
            document_type: config.document_type.clone(),
            page_size: config.page_size,
            master_ref: OnceCell::new(),
        })
    }

    /// Resolve (once) the ref every search has to name
    async fn master_ref(&self) -> Result<&str, ApiError> {
        let reference = self
            .master_ref
            .get_or_try_init(|| async {
                let mut request = self.http.get(self.endpoint.clone());
                if let Some(token) = &self.access_token {
                    request = request.query(&[("access_token", token)]);
                }
                let info: ApiInfo = self.get_json(request).await?;
                let master = info
                    .refs
                    .into_iter()
                    .find(|r| r.is_master_ref)
                    .ok_or(ApiError::MissingMasterRef)?;
                tracing::debug!("Resolved master ref {}", master.reference);
                Ok::<_, ApiError>(master.reference)
            })
            .await?;
        Ok(reference.as_str())
    }

    fn search_url(&self) -> String {
        format!(
            "{}/documents/search",
            self.endpoint.as_str().trim_end_matches('/')
        )
    }

    fn type_predicate(&self) -> String {
        format!("[[at(document.type,\"{}\")]]", self.document_type)
    }

    fn uid_predicate(&self, uid: &str) -> String {
        format!(
            "[[at(my.{}.uid,\"{}\")]]",
            self.document_type,
            uid.replace('\\', "\\\\").replace('"', "\\\"")
        )
    }

    async fn search<T: DeserializeOwned>(
        &self,
        predicate: &str,
        page_size: usize,
    ) -> Result<SearchResponse<T>, ApiError> {
        let reference = self.master_ref().await?;
        let page_size = page_size.to_string();
        let mut request = self.http.get(self.search_url()).query(&[
            ("ref", reference),
            ("q", predicate),
            ("pageSize", page_size.as_str()),
        ]);
        if let Some(token) = &self.access_token {
            request = request.query(&[("access_token", token)]);
        }
        self.get_json(request).await
    }

    /// Accept only cursors that point back at the configured repository
    fn check_cursor(&self, cursor: &str) -> Result<Url, ApiError> {
        let url = Url::parse(cursor).map_err(|_| ApiError::InvalidCursor(cursor.to_string()))?;
        let same_origin = url.scheme() == self.endpoint.scheme()
            && url.host_str() == self.endpoint.host_str()
            && url.port_or_known_default() == self.endpoint.port_or_known_default();
        if same_origin {
            Ok(url)
        } else {
            Err(ApiError::InvalidCursor(cursor.to_string()))
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl ContentSource for PrismicClient {
    async fn list_posts(&self) -> Result<PostPage, ApiError> {
        let response: SearchResponse<SummaryFields> =
            self.search(&self.type_predicate(), self.page_size).await?;
        tracing::debug!(
            "Listed {} {} (more: {})",
            response.results.len(),
            self.document_type,
            response.next_page.is_some()
        );
        Ok(response.into())
    }

    async fn post_by_uid(&self, uid: &str) -> Result<PostDetail, ApiError> {
        let response: SearchResponse<DetailFields> =
            self.search(&self.uid_predicate(uid), 1).await?;
        response
            .results
            .into_iter()
            .next()
            .map(PostDetail::from)
            .ok_or_else(|| ApiError::NotFound {
                uid: uid.to_string(),
            })
    }

    async fn fetch_page(&self, cursor: &str) -> Result<PostPage, ApiError> {
        let url = self.check_cursor(cursor)?;
        tracing::debug!("Fetching page {}", url);
        let response: SearchResponse<SummaryFields> = self.get_json(self.http.get(url)).await?;
        Ok(response.into())
    }
}
