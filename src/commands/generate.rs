//! Generate static files

use anyhow::Result;

use crate::generator::{BuildReport, Generator};
use crate::Blog;

/// Build the site from the configured repository
pub async fn run(blog: &Blog) -> Result<()> {
    let client = blog.client()?;
    let report = run_with(blog, &client).await?;
    tracing::info!(
        "Listed {} posts, wrote {} post pages",
        report.listed,
        report.posts
    );
    Ok(())
}

/// Build the site from any content source
pub async fn run_with<S: crate::api::ContentSource>(blog: &Blog, source: &S) -> Result<BuildReport> {
    let start = std::time::Instant::now();

    let generator = Generator::new(blog)?;
    let report = generator.generate(source).await?;

    let duration = start.elapsed();
    tracing::info!("Generated in {:.2}s", duration.as_secs_f64());

    Ok(report)
}
