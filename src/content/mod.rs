//! Content module - post models, reading time, and listing pagination

pub mod pagination;
mod post;
mod reading;

pub use pagination::{LoadMore, Pagination};
pub(crate) use post::{cursor, null_as_empty};
pub use post::{ContentBlock, PostDetail, PostPage, PostSummary, RichTextSpan};
pub use reading::{ReadingTime, WordSplit};
