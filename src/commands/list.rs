//! List posts from the content repository

use anyhow::Result;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::api::ContentSource;
use crate::content::{LoadMore, Pagination, PostSummary};
use crate::helpers::DateFormatter;
use crate::Blog;

/// How far the listing follows cursors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMode {
    /// Only the first page
    FirstPage,
    /// Every page
    All,
    /// Ask before each further page
    Interactive,
}

/// List posts on stdout
pub async fn run(blog: &Blog, mode: ListMode) -> Result<()> {
    let client = blog.client()?;
    let dates = DateFormatter::from_config(&blog.config)?;
    let mut stdin = BufReader::new(tokio::io::stdin());
    let stdout = std::io::stdout();

    let pagination = run_with(
        &client,
        &dates,
        &blog.config.labels.load_more,
        mode,
        &mut stdin,
        &mut stdout.lock(),
    )
    .await?;

    tracing::debug!("Listed {} posts", pagination.len());
    Ok(())
}

/// List posts from `source`, reading "load more" answers from `input`
pub async fn run_with<S, R, W>(
    source: &S,
    dates: &DateFormatter,
    prompt: &str,
    mode: ListMode,
    input: &mut R,
    output: &mut W,
) -> Result<Pagination>
where
    S: ContentSource,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut pagination = Pagination::new(source.list_posts().await?);
    print_posts(output, dates, pagination.items())?;

    loop {
        if !pagination.has_more() {
            break;
        }

        match mode {
            ListMode::FirstPage => {
                writeln!(output, "(more posts available, use --all or --interactive)")?;
                break;
            }
            ListMode::All => {}
            ListMode::Interactive => {
                write!(output, "{}? [Enter = yes, q = quit] ", prompt)?;
                output.flush()?;

                let mut answer = String::new();
                if input.read_line(&mut answer).await? == 0 || answer.trim().eq_ignore_ascii_case("q") {
                    break;
                }
            }
        }

        let shown = pagination.len();
        match pagination.load_more(source).await {
            Ok(LoadMore::Loaded { .. }) => {
                print_posts(output, dates, &pagination.items()[shown..])?;
            }
            Ok(LoadMore::Exhausted) => break,
            Err(e) if mode == ListMode::Interactive => {
                tracing::warn!("Failed to load more posts: {}", e);
                writeln!(output, "Failed to load more posts: {}", e)?;
            }
            Err(e) => return Err(e.into()),
        }
    }

    writeln!(output, "{} posts listed", pagination.len())?;
    Ok(pagination)
}

fn print_posts<W: Write>(output: &mut W, dates: &DateFormatter, posts: &[PostSummary]) -> Result<()> {
    for post in posts {
        let date = dates
            .format_publication(post.first_publication_date.as_deref())
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            output,
            "  {} - {} by {} [{}]",
            date, post.title, post.author, post.uid
        )?;
    }
    Ok(())
}
