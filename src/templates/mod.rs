//! Built-in blog templates using Tera template engine
//!
//! The templates are embedded in the binary, so a site needs nothing but
//! its `_config.yml` to build.

use anyhow::Result;
use serde::Serialize;
use tera::{Context, Tera};

use crate::config::{LabelsConfig, SiteConfig};

/// Seconds before the loading page polls again
const LOADING_REFRESH_SECS: u32 = 2;

/// Template renderer with the embedded blog templates
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        // Post content comes from the backend; keep HTML escaping on
        tera.autoescape_on(vec![".html"]);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("blog/layout.html")),
            ("index.html", include_str!("blog/index.html")),
            ("post.html", include_str!("blog/post.html")),
            ("loading.html", include_str!("blog/loading.html")),
            ("not_found.html", include_str!("blog/not_found.html")),
            // Partials
            (
                "partials/header.html",
                include_str!("blog/partials/header.html"),
            ),
            (
                "partials/cards.html",
                include_str!("blog/partials/cards.html"),
            ),
        ])?;

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }

    /// Listing page
    pub fn render_index(&self, base: &BaseData, listing: &ListingData) -> Result<String> {
        let mut context = base.context();
        context.insert("posts", &listing.posts);
        context.insert("next_page", &listing.next_page);
        context.insert("api_url", &listing.api_url);
        self.render("index.html", &context)
    }

    /// Listing items only, appended by the "load more" button
    pub fn render_cards(&self, base: &BaseData, posts: &[PostCardData]) -> Result<String> {
        let mut context = base.context();
        context.insert("posts", posts);
        self.render("partials/cards.html", &context)
    }

    /// Post page
    pub fn render_post(&self, base: &BaseData, post: &PostViewData) -> Result<String> {
        let mut context = base.context();
        context.insert("post", post);
        self.render("post.html", &context)
    }

    /// Placeholder shown while a post page is being built
    pub fn render_loading(&self, base: &BaseData) -> Result<String> {
        let mut context = base.context();
        context.insert("refresh_secs", &LOADING_REFRESH_SECS);
        self.render("loading.html", &context)
    }

    pub fn render_not_found(&self, base: &BaseData, uid: &str) -> Result<String> {
        let mut context = base.context();
        context.insert("uid", uid);
        self.render("not_found.html", &context)
    }
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub language: String,
    pub root: String,
    pub logo: String,
}

/// Variables every page sees
#[derive(Debug, Clone)]
pub struct BaseData {
    pub site: SiteData,
    pub labels: LabelsConfig,
}

impl BaseData {
    pub fn from_config(config: &SiteConfig) -> Self {
        Self {
            site: SiteData {
                title: config.title.clone(),
                language: config.language.clone(),
                root: crate::helpers::url_for(config, ""),
                logo: crate::helpers::url_for(config, &config.logo),
            },
            labels: config.labels.clone(),
        }
    }

    fn context(&self) -> Context {
        let mut context = Context::new();
        context.insert("site", &self.site);
        context.insert("labels", &self.labels);
        context
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PostCardData {
    pub uid: String,
    pub url: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub date: Option<String>,
    pub date_iso: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListingData {
    pub posts: Vec<PostCardData>,
    /// Cursor of the next page; the "load more" button is shown only if set
    pub next_page: Option<String>,
    pub api_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostViewData {
    pub uid: String,
    pub title: String,
    pub banner: String,
    pub author: String,
    pub date: Option<String>,
    pub date_iso: Option<String>,
    pub reading_time: u32,
    pub blocks: Vec<BlockData>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockData {
    pub heading: String,
    pub paragraphs: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> BaseData {
        BaseData::from_config(&SiteConfig::default())
    }

    fn card(uid: &str) -> PostCardData {
        PostCardData {
            uid: uid.to_string(),
            url: format!("/post/{}/", uid),
            title: format!("Title {}", uid),
            subtitle: "Subtitle".to_string(),
            author: "Joseph Oliveira".to_string(),
            date: Some("19 abr 2022".to_string()),
            date_iso: Some("2022-04-19T00:00:00+00:00".to_string()),
        }
    }

    #[test]
    fn test_index_with_cursor_shows_button() {
        let renderer = TemplateRenderer::new().unwrap();
        let html = renderer
            .render_index(
                &base(),
                &ListingData {
                    posts: vec![card("a"), card("b")],
                    next_page: Some("https://x.cdn.prismic.io/api/v2/documents/search?page=2".to_string()),
                    api_url: "/api/posts".to_string(),
                },
            )
            .unwrap();

        assert!(html.contains("Carregar mais posts"));
        assert!(html.contains(r#"id="load-more""#));
        assert!(html.find("Title a").unwrap() < html.find("Title b").unwrap());
        assert!(html.contains("19 abr 2022"));
    }

    #[test]
    fn test_index_without_cursor_hides_button() {
        let renderer = TemplateRenderer::new().unwrap();
        let html = renderer
            .render_index(
                &base(),
                &ListingData {
                    posts: vec![card("a")],
                    next_page: None,
                    api_url: "/api/posts".to_string(),
                },
            )
            .unwrap();

        assert!(html.contains("Title a"));
        assert!(!html.contains("Carregar mais posts"));
        assert!(!html.contains("load-more"));
    }

    #[test]
    fn test_cards_fragment() {
        let renderer = TemplateRenderer::new().unwrap();
        let html = renderer.render_cards(&base(), &[card("c")]).unwrap();
        assert!(html.contains(r#"href="/post/c/""#));
        assert!(!html.contains("<html"));
    }

    #[test]
    fn test_post_page() {
        let renderer = TemplateRenderer::new().unwrap();
        let html = renderer
            .render_post(
                &base(),
                &PostViewData {
                    uid: "hooks".to_string(),
                    title: "Como utilizar Hooks".to_string(),
                    banner: "https://images.prismic.io/banner.png".to_string(),
                    author: "Joseph Oliveira".to_string(),
                    date: None,
                    date_iso: None,
                    reading_time: 4,
                    blocks: vec![BlockData {
                        heading: "Proin et varius".to_string(),
                        paragraphs: vec!["<script>alert(1)</script>".to_string()],
                    }],
                },
            )
            .unwrap();

        assert!(html.contains("<h1>Como utilizar Hooks</h1>"));
        assert!(html.contains("4 min"));
        assert!(html.contains("<h2>Proin et varius</h2>"));
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(!html.contains("<time"));
    }

    #[test]
    fn test_loading_and_not_found() {
        let renderer = TemplateRenderer::new().unwrap();
        let loading = renderer.render_loading(&base()).unwrap();
        assert!(loading.contains("Carregando..."));
        assert!(loading.contains("http-equiv=\"refresh\""));

        let missing = renderer.render_not_found(&base(), "nope").unwrap();
        assert!(missing.contains("Post não encontrado"));
        assert!(missing.contains("nope"));
    }
}
