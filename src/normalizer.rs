//! Conversion of raw feed entries into canonical [`Article`]s.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::fetcher::RawItem;
use crate::registry::{Category, FeedSource};

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));
static ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(amp|lt|gt|quot|#39|nbsp);").expect("valid regex"));
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static IMG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<img\b[^>]*?\bsrc\s*=\s*["']([^"']+)["']"#).expect("valid regex")
});

const SUMMARY_CHARS: usize = 100;
const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleSource {
    pub name: String,
    pub url: String,
    pub category: Category,
    pub sport: String,
}

impl From<&FeedSource> for ArticleSource {
    fn from(source: &FeedSource) -> Self {
        Self {
            name: source.name.clone(),
            url: source.url.clone(),
            category: source.category,
            sport: source.sport.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub url: String,
    pub author: Option<String>,
    pub published_at: DateTime<Utc>,
    pub source: ArticleSource,
    pub image: Option<String>,
    pub tags: Vec<String>,
    pub summary: String,
}

#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    description_limit: Option<usize>,
}

impl Normalizer {
    pub fn new(description_limit: Option<usize>) -> Self {
        Self { description_limit }
    }

    /// Builds an article from a raw entry. Entries without a title or a link
    /// yield `None`; a guid counts as the link only when it is a URL. `now`
    /// stands in for a missing publish date.
    ///
    /// Tags are left empty for the categorizer.
    pub fn normalize(
        &self,
        item: &RawItem,
        source: &FeedSource,
        now: DateTime<Utc>,
    ) -> Option<Article> {
        let title = clean_html(item.title.as_deref().unwrap_or_default());
        if title.is_empty() {
            return None;
        }

        let guid_link = item.guid.as_deref().filter(|g| g.starts_with("http"));
        let url = item.link.as_deref().or(guid_link)?.trim().to_string();
        if url.is_empty() {
            return None;
        }

        let raw_description = item.description.as_deref().or(item.content.as_deref());
        let raw_content = item.content.as_deref().or(item.description.as_deref());

        let description = clean_html(raw_description.unwrap_or_default());
        let description = match self.description_limit {
            Some(limit) => truncate_chars(&description, limit),
            None => description,
        };

        Some(Article {
            id: article_id(item.guid.as_deref(), &url),
            summary: summarize(&description),
            content: clean_html(raw_content.unwrap_or_default()),
            description,
            url,
            author: item.author.clone(),
            published_at: item.published.unwrap_or(now),
            source: ArticleSource::from(source),
            image: extract_image(item),
            tags: Vec::new(),
            title,
        })
    }
}

/// Strips tags, decodes the common entities and collapses whitespace.
pub fn clean_html(html: &str) -> String {
    let without_tags = TAG_RE.replace_all(html, " ");
    let decoded = decode_entities(&without_tags);
    WS_RE.replace_all(decoded.trim(), " ").into_owned()
}

/// Decodes `&amp; &lt; &gt; &quot; &#39; &nbsp;` in a single pass. Other
/// entities are left untouched.
pub fn decode_entities(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |caps: &regex::Captures| {
            match &caps[1] {
                "amp" => "&",
                "lt" => "<",
                "gt" => ">",
                "quot" => "\"",
                "#39" => "'",
                _ => " ",
            }
            .to_string()
        })
        .into_owned()
}

/// Image lookup order: media:content, media:thumbnail, image enclosure, then
/// the first `<img>` in the body.
pub fn extract_image(item: &RawItem) -> Option<String> {
    let media_content = item
        .media_content
        .iter()
        .find(|m| m.mime_type.is_none() || m.is_image())
        .map(|m| m.url.clone());

    media_content
        .or_else(|| item.media_thumbnails.first().cloned())
        .or_else(|| {
            item.enclosures
                .iter()
                .find(|e| e.is_image())
                .map(|e| e.url.clone())
        })
        .or_else(|| {
            [item.content.as_deref(), item.description.as_deref()]
                .into_iter()
                .flatten()
                .find_map(first_img_src)
        })
}

fn first_img_src(html: &str) -> Option<String> {
    IMG_RE
        .captures(html)
        .map(|caps| caps[1].trim().to_string())
        .filter(|src| !src.is_empty())
}

/// Shortens `text` to at most `limit` characters, ending in an ellipsis when
/// the limit leaves room for one.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    if limit <= ELLIPSIS.len() {
        return text.chars().take(limit).collect();
    }
    let keep = limit - ELLIPSIS.len();
    let mut out: String = text.chars().take(keep).collect();
    out.truncate(out.trim_end().len());
    out.push_str(ELLIPSIS);
    out
}

/// First sentence of the description, or its first 100 characters.
pub fn summarize(description: &str) -> String {
    let mut chars = description.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let at_boundary = chars.peek().map_or(true, |(_, next)| next.is_whitespace());
        if at_boundary {
            let sentence = &description[..i + c.len_utf8()];
            if sentence.chars().count() <= SUMMARY_CHARS {
                return sentence.to_string();
            }
            break;
        }
    }
    truncate_chars(description, SUMMARY_CHARS)
}

/// Stable article id: the first 16 hex digits of SHA-256 over the guid, or
/// over the article link when the entry has no guid.
pub fn article_id(guid: Option<&str>, link: &str) -> String {
    let seed = guid
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .unwrap_or_else(|| link.trim());
    let digest = Sha256::digest(seed.as_bytes());
    hex::encode(&digest[..8])
}
