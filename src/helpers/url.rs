//! URL helper functions

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::path::{Path, PathBuf};

use crate::config::SiteConfig;

/// Characters escaped inside one path segment
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'%');

/// Generate a URL with the root path
///
/// # Examples
/// ```ignore
/// url_for(&config, "/logo.svg") // -> "/blog/logo.svg"
/// ```
pub fn url_for(config: &SiteConfig, path: &str) -> String {
    let root = config.root.trim_end_matches('/');
    let path = path.trim_start_matches('/');

    if path.is_empty() {
        format!("{}/", root)
    } else {
        format!("{}/{}", root, path)
    }
}

/// Link to a post page
///
/// # Examples
/// ```ignore
/// post_url(&config, "como-utilizar-hooks") // -> "/post/como-utilizar-hooks/"
/// ```
pub fn post_url(config: &SiteConfig, uid: &str) -> String {
    url_for(config, &format!("post/{}/", encode_segment(uid)))
}

/// Percent-encode a single path segment
pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

/// Whether a uid can be used as a directory name under the public dir
pub fn is_safe_uid(uid: &str) -> bool {
    !uid.is_empty()
        && uid != "."
        && !uid.contains("..")
        && !uid.contains(['/', '\\', '\0'])
}

/// File a post page is written to
pub fn post_output_path(public_dir: &Path, uid: &str) -> PathBuf {
    public_dir.join("post").join(uid).join("index.html")
}
