//! Helper functions for templates
//!
//! Date display and URL generation shared by the generator and the server.

mod date;
mod url;

pub use date::*;
pub use url::*;
