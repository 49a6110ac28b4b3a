//! Post models

use serde::{Deserialize, Deserializer, Serialize};

/// A post as shown in the listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    /// Unique identifier, used as route and list key
    pub uid: String,

    /// First publication timestamp (ISO-8601)
    pub first_publication_date: Option<String>,

    pub title: String,

    pub subtitle: String,

    pub author: String,
}

/// A full post as shown on its own page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDetail {
    /// Unique identifier, used as route key
    pub uid: String,

    /// First publication timestamp (ISO-8601)
    pub first_publication_date: Option<String>,

    pub title: String,

    /// Banner image URL
    pub banner: String,

    pub author: String,

    /// Rich-text content in document order
    pub content: Vec<ContentBlock>,
}

/// A `{heading, body}` unit of a post's rich text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ContentBlock {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub heading: String,

    #[serde(default)]
    pub body: Vec<RichTextSpan>,
}

impl ContentBlock {
    /// Body rendered to plain text, fragments joined by a single space
    pub fn body_text(&self) -> String {
        self.body
            .iter()
            .map(|span| span.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// One rich-text fragment (paragraph, list item, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RichTextSpan {
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub text: String,
}

impl RichTextSpan {
    pub fn paragraph(text: &str) -> Self {
        Self {
            kind: "paragraph".to_string(),
            text: text.to_string(),
        }
    }
}

/// One page of listing results together with its cursor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PostPage {
    pub results: Vec<PostSummary>,

    /// URL of the next page; absent on the last page
    #[serde(default, deserialize_with = "cursor")]
    pub next_page: Option<String>,
}

/// Treat `null` text fields the same as missing ones
pub(crate) fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// An empty cursor means there is no next page
pub(crate) fn cursor<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|url| !url.trim().is_empty()))
}
