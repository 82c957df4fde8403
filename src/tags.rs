use regex::Regex;
use std::sync::LazyLock;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult, TAG_OPERATION_FAILED},
    models::Tag,
    repository::Repository,
};

// `#` followed by one or more non-whitespace characters.
static RE_HASHTAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#[^\s]+").expect("valid hashtag regex"));

/// How parsed tags are linked to a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagMode {
    /// Keep the post's current tags and add the new ones (post creation).
    Append,
    /// Drop every current link first (post update).
    Replace,
}

/// parse_tag_names
///
/// Extracts the canonical tag names from free text: every `#token` with the `#` stripped
/// and the rest lowercased. Duplicates are dropped, first occurrence wins the position.
///
/// ```
/// use blog_api::tags::parse_tag_names;
///
/// assert_eq!(parse_tag_names("#Go #go #RUST"), vec!["go", "rust"]);
/// assert!(parse_tag_names("no tags here").is_empty());
/// ```
pub fn parse_tag_names(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for token in RE_HASHTAG.find_iter(text) {
        let name = token.as_str()[1..].to_lowercase();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// attach_tags
///
/// Parses `text`, find-or-creates each tag and links the set to `post_id` in a single
/// gateway call. Any failure is reported as the fixed "tag operation failed" error.
pub async fn attach_tags(
    repo: &dyn Repository,
    post_id: Uuid,
    text: &str,
    mode: TagMode,
) -> ApiResult<Vec<Tag>> {
    let names = parse_tag_names(text);
    if names.is_empty() && mode == TagMode::Append {
        return Ok(Vec::new());
    }

    let tags = repo
        .attach_tags(post_id, &names, mode == TagMode::Replace)
        .await
        .map_err(|e| ApiError::persistence(TAG_OPERATION_FAILED, e))?;

    tracing::debug!(%post_id, ?mode, count = tags.len(), "tags attached");
    Ok(tags)
}
