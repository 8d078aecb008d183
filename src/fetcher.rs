use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feed_rs::model::{Entry, Feed};
use feed_rs::parser;
use regex::Regex;
use reqwest::{Client, Url};
use tracing::debug;

use crate::config::FetchConfig;
use crate::error::FeedError;
use crate::normalizer::decode_entities;
use crate::registry::FeedSource;

static ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<item[\s>].*?</item>").expect("valid regex"));
static ENCLOSURE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<enclosure\b[^>]*?\burl\s*=\s*["']([^"']+)["']"#).expect("valid regex")
});

/// A media reference attached to a feed entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef {
    pub url: String,
    pub mime_type: Option<String>,
}

impl MediaRef {
    pub fn is_image(&self) -> bool {
        self.mime_type
            .as_deref()
            .map(|m| m.to_ascii_lowercase().starts_with("image/"))
            .unwrap_or(false)
    }
}

/// One syndication entry, independent of the parser that produced it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub guid: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    /// `media:content` elements (RSS enclosures also land here)
    pub media_content: Vec<MediaRef>,
    /// `media:thumbnail` URLs
    pub media_thumbnails: Vec<String>,
    /// Atom `rel="enclosure"` links
    pub enclosures: Vec<MediaRef>,
    pub categories: Vec<String>,
}

/// Retrieves the entries of one feed.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<RawItem>, FeedError>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl FeedFetcher for HttpFetcher {
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<RawItem>, FeedError> {
        debug!("Fetching feed: {} ({})", source.name, source.url);

        let response = self.client.get(&source.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        parse_feed(&bytes)
    }
}

/// Parses RSS/Atom bytes into raw items.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<RawItem>, FeedError> {
    // Entries without an id keep it empty instead of getting a synthetic one
    let feed = parser::Builder::new()
        .id_generator(|_, _, _| String::new())
        .build()
        .parse(bytes)
        .map_err(|e| FeedError::Parse(e.to_string()))?;
    Ok(raw_items(feed, &rss_enclosures(bytes)))
}

/// URLs of RSS `<enclosure>` elements for each `<item>`, in document order.
fn rss_enclosures(bytes: &[u8]) -> Vec<Vec<String>> {
    let text = String::from_utf8_lossy(bytes);
    ITEM_RE
        .find_iter(&text)
        .map(|item| {
            ENCLOSURE_RE
                .captures_iter(item.as_str())
                .filter_map(|caps| Url::parse(decode_entities(&caps[1]).trim()).ok())
                .map(|url| url.to_string())
                .collect()
        })
        .collect()
}

/// Adapts the feed-rs model into [`RawItem`]s. `enclosures` lists the RSS
/// enclosure URLs of each entry; it is ignored unless it lines up with the
/// entries.
fn raw_items(feed: Feed, enclosures: &[Vec<String>]) -> Vec<RawItem> {
    let aligned = enclosures.len() == feed.entries.len();
    feed.entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| {
            let urls: &[String] = if aligned { &enclosures[i] } else { &[] };
            raw_item(entry, urls)
        })
        .collect()
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn raw_item(entry: Entry, enclosure_urls: &[String]) -> RawItem {
    // The article link is the first non-enclosure link
    let link = entry
        .links
        .iter()
        .find(|l| !is_enclosure_rel(l.rel.as_deref()))
        .and_then(|l| non_empty(l.href.clone()));

    let mut enclosures: Vec<MediaRef> = entry
        .links
        .iter()
        .filter(|l| is_enclosure_rel(l.rel.as_deref()))
        .filter_map(|l| {
            non_empty(l.href.clone()).map(|url| MediaRef {
                url,
                mime_type: l.media_type.clone(),
            })
        })
        .collect();

    // feed-rs folds RSS enclosures into the item's media object; each
    // enclosure URL claims one matching media entry
    let mut unclaimed: Vec<&str> = enclosure_urls.iter().map(String::as_str).collect();
    let mut media_content = Vec::new();
    let mut media_thumbnails = Vec::new();
    for object in &entry.media {
        for content in &object.content {
            let Some(url) = content.url.as_ref().and_then(|u| non_empty(u.to_string())) else {
                continue;
            };
            let media = MediaRef {
                url,
                mime_type: content.content_type.as_ref().map(|m| m.to_string()),
            };
            match unclaimed.iter().position(|u| *u == media.url) {
                Some(pos) => {
                    unclaimed.swap_remove(pos);
                    enclosures.push(media);
                }
                None => media_content.push(media),
            }
        }
        for thumbnail in &object.thumbnails {
            if let Some(url) = non_empty(thumbnail.image.uri.clone()) {
                media_thumbnails.push(url);
            }
        }
    }

    RawItem {
        title: entry.title.map(|t| t.content),
        link,
        guid: non_empty(entry.id),
        published: entry.published.or(entry.updated),
        description: entry.summary.map(|s| s.content),
        content: entry.content.and_then(|c| c.body),
        author: entry.authors.into_iter().next().and_then(|a| non_empty(a.name)),
        media_content,
        media_thumbnails,
        enclosures,
        categories: entry.categories.into_iter().map(|c| c.term).collect(),
    }
}

fn is_enclosure_rel(rel: Option<&str>) -> bool {
    rel.map(|r| r.eq_ignore_ascii_case("enclosure")).unwrap_or(false)
}
