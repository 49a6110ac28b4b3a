//! Generator module - builds the listing and post pages from the content API

use anyhow::Result;
use futures::{StreamExt, TryStreamExt};
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use walkdir::WalkDir;

use crate::api::ContentSource;
use crate::content::{Pagination, PostDetail, PostSummary, ReadingTime};
use crate::helpers::{self, DateFormatter};
use crate::templates::{
    BaseData, BlockData, ListingData, PostCardData, PostViewData, TemplateRenderer,
};
use crate::Blog;

/// Route answering the listing's "load more" button
pub const LOAD_MORE_ROUTE: &str = "/api/posts";

/// What a full build produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    /// Posts on the listing page
    pub listed: usize,
    /// Whether the listing offers "load more"
    pub has_more: bool,
    /// Post pages written
    pub posts: usize,
}

/// Static site generator using Tera templates
pub struct Generator {
    blog: Blog,
    renderer: TemplateRenderer,
    base: BaseData,
    dates: DateFormatter,
    reading: ReadingTime,
}

impl Generator {
    /// Create a new generator
    pub fn new(blog: &Blog) -> Result<Self> {
        let renderer = TemplateRenderer::new()?;
        let dates = DateFormatter::from_config(&blog.config)?;
        let reading = ReadingTime::new(
            blog.config.reading.words_per_minute,
            blog.config.reading.word_split,
        );

        Ok(Self {
            blog: blog.clone(),
            renderer,
            base: BaseData::from_config(&blog.config),
            dates,
            reading,
        })
    }

    /// Generate the entire site
    pub async fn generate<S: ContentSource>(&self, source: &S) -> Result<BuildReport> {
        // Ensure public directory exists
        fs::create_dir_all(&self.blog.public_dir)?;

        // Copy source assets (logo, etc.)
        self.copy_source_assets()?;

        // Listing page from the first page of results
        let first = Pagination::new(source.list_posts().await?);
        let listed = first.len();
        let has_more = first.has_more();
        self.generate_index_page(&first)?;

        // Post pages for every uid on every page
        let uids = self.static_paths(source, first).await?;
        let posts = self.generate_post_pages(source, &uids).await?;

        Ok(BuildReport {
            listed,
            has_more,
            posts,
        })
    }

    /// Uids of all posts, following cursors to the last page
    pub async fn static_paths<S: ContentSource>(
        &self,
        source: &S,
        mut pagination: Pagination,
    ) -> Result<Vec<String>> {
        pagination.load_all(source).await?;

        let mut seen = HashSet::new();
        let uids = pagination
            .items()
            .iter()
            .filter(|post| {
                if !helpers::is_safe_uid(&post.uid) {
                    tracing::warn!("Skipping post with unusable uid {:?}", post.uid);
                    return false;
                }
                seen.insert(post.uid.clone())
            })
            .map(|post| post.uid.clone())
            .collect();
        Ok(uids)
    }

    /// Generate the listing page
    fn generate_index_page(&self, pagination: &Pagination) -> Result<()> {
        let listing = self.listing_data(pagination.items(), pagination.cursor());
        let html = self.renderer.render_index(&self.base, &listing)?;

        let output_path = self.blog.public_dir.join("index.html");
        fs::write(&output_path, html)?;
        tracing::info!(
            "Generated index with {} posts (more: {})",
            listing.posts.len(),
            listing.next_page.is_some()
        );

        Ok(())
    }

    /// Fetch and write post pages, a few at a time
    async fn generate_post_pages<S: ContentSource>(
        &self,
        source: &S,
        uids: &[String],
    ) -> Result<usize> {
        let written: Vec<PathBuf> = futures::stream::iter(uids)
            .map(|uid| self.build_post(source, uid))
            .buffer_unordered(self.blog.config.build.concurrency)
            .try_collect()
            .await?;

        tracing::info!("Generated {} post pages", written.len());
        Ok(written.len())
    }

    /// Fetch one post, render it, and write it under `post/{uid}/`
    pub async fn build_post<S: ContentSource>(&self, source: &S, uid: &str) -> Result<PathBuf> {
        if !helpers::is_safe_uid(uid) {
            anyhow::bail!("Refusing to build post with uid {:?}", uid);
        }

        let post = source.post_by_uid(uid).await?;
        let html = self.render_post_page(&post)?;
        let output_path = self.write_post_page(uid, &html)?;
        tracing::debug!("Generated post: {:?}", output_path);

        Ok(output_path)
    }

    /// Render a fetched post
    pub fn render_post_page(&self, post: &PostDetail) -> Result<String> {
        let view = self.post_view(post);
        self.renderer.render_post(&self.base, &view)
    }

    fn write_post_page(&self, uid: &str, html: &str) -> Result<PathBuf> {
        let output_path = self.post_output_path(uid);
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| anyhow::anyhow!("Failed to create dir {:?}: {}", parent, e))?;
        }
        // Readers only ever see a complete page
        let dir = output_path.parent().unwrap_or(&self.blog.public_dir);
        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(html.as_bytes())?;
        file.persist(&output_path)
            .map_err(|e| anyhow::anyhow!("Failed to write {:?}: {}", output_path, e))?;
        Ok(output_path)
    }

    /// Where the page of `uid` lives under the public dir
    pub fn post_output_path(&self, uid: &str) -> PathBuf {
        helpers::post_output_path(&self.blog.public_dir, uid)
    }

    /// Listing items rendered for the "load more" response
    pub fn render_cards(&self, posts: &[PostSummary]) -> Result<String> {
        let cards: Vec<_> = posts.iter().map(|p| self.card(p)).collect();
        self.renderer.render_cards(&self.base, &cards)
    }

    pub fn render_loading(&self) -> Result<String> {
        self.renderer.render_loading(&self.base)
    }

    pub fn render_not_found(&self, uid: &str) -> Result<String> {
        self.renderer.render_not_found(&self.base, uid)
    }

    /// Template data for a listing
    pub fn listing_data(&self, posts: &[PostSummary], cursor: Option<&str>) -> ListingData {
        ListingData {
            posts: posts.iter().map(|p| self.card(p)).collect(),
            next_page: cursor.map(str::to_string),
            api_url: helpers::url_for(&self.blog.config, LOAD_MORE_ROUTE),
        }
    }

    fn card(&self, post: &PostSummary) -> PostCardData {
        let (date, date_iso) = self.publication_date(post.first_publication_date.as_deref());
        PostCardData {
            uid: post.uid.clone(),
            url: helpers::post_url(&self.blog.config, &post.uid),
            title: post.title.clone(),
            subtitle: post.subtitle.clone(),
            author: post.author.clone(),
            date,
            date_iso,
        }
    }

    /// Template data for a post, including its reading time
    pub fn post_view(&self, post: &PostDetail) -> PostViewData {
        let (date, date_iso) = self.publication_date(post.first_publication_date.as_deref());
        PostViewData {
            uid: post.uid.clone(),
            title: post.title.clone(),
            banner: post.banner.clone(),
            author: post.author.clone(),
            date,
            date_iso,
            reading_time: self.reading.estimate(&post.content),
            blocks: post
                .content
                .iter()
                .map(|block| BlockData {
                    heading: block.heading.clone(),
                    paragraphs: block.body.iter().map(|span| span.text.clone()).collect(),
                })
                .collect(),
        }
    }

    fn publication_date(&self, raw: Option<&str>) -> (Option<String>, Option<String>) {
        match raw.and_then(helpers::parse_timestamp) {
            Some(date) => (Some(self.dates.format(&date)), Some(helpers::date_xml(&date))),
            None => (self.dates.format_publication(raw), None),
        }
    }

    /// Copy source assets (images, etc.) to public directory
    fn copy_source_assets(&self) -> Result<()> {
        let source_dir = &self.blog.source_dir;
        if !source_dir.exists() {
            return Ok(());
        }

        for entry in WalkDir::new(source_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_file() {
                let relative = path.strip_prefix(source_dir)?;
                copy_asset(path, &self.blog.public_dir.join(relative))?;
            }
        }

        Ok(())
    }
}

fn copy_asset(from: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(from, dest)?;
    Ok(())
}
