use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{debug, error, info, warn};

use crate::cache::{CacheKey, Clock, TtlCache};
use crate::categorizer::Categorizer;
use crate::config::{Config, FetchConfig};
use crate::dedupe::dedupe;
use crate::error::{AggregatorError, FeedError};
use crate::fetcher::{FeedFetcher, RawItem};
use crate::normalizer::{Article, Normalizer};
use crate::registry::{Category, FeedRegistry, FeedSource, GENERAL};
use crate::trending::{rank_topics, topic_articles, TrendingTopic};

pub const DEFAULT_NEWS_LIMIT: usize = 20;
pub const DEFAULT_TRENDING_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 100;

#[derive(Debug, Clone)]
pub struct AggregatorSettings {
    /// Feeds fetched concurrently per batch
    pub concurrency: usize,
    pub fetch_timeout: Duration,
    pub trending_pool: usize,
}

impl From<&FetchConfig> for AggregatorSettings {
    fn from(config: &FetchConfig) -> Self {
        Self {
            concurrency: config.concurrency,
            fetch_timeout: config.timeout(),
            trending_pool: config.trending_pool,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewsQuery {
    pub sport: String,
    pub category: Option<Category>,
    pub limit: usize,
    pub fresh: bool,
}

impl NewsQuery {
    pub fn new(sport: impl Into<String>, limit: usize) -> Self {
        Self {
            sport: sport.into(),
            category: None,
            limit,
            fresh: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewsResult {
    pub articles: Vec<Article>,
    pub sport: String,
    pub category: Option<Category>,
    pub cached: bool,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct TrendingResult {
    pub topics: Vec<TrendingTopic>,
    pub articles: Vec<Article>,
    pub sport: String,
    pub cached: bool,
    pub last_updated: DateTime<Utc>,
}

/// Runs the fetch → normalize → categorize → dedupe → sort pipeline behind
/// the result caches.
pub struct Aggregator {
    registry: FeedRegistry,
    fetcher: Arc<dyn FeedFetcher>,
    normalizer: Normalizer,
    categorizer: Categorizer,
    news_cache: TtlCache<Vec<Article>>,
    trending_cache: TtlCache<Vec<TrendingTopic>>,
    clock: Arc<dyn Clock>,
    settings: AggregatorSettings,
}

impl Aggregator {
    pub fn new(
        registry: FeedRegistry,
        fetcher: Arc<dyn FeedFetcher>,
        normalizer: Normalizer,
        categorizer: Categorizer,
        ttl: Duration,
        clock: Arc<dyn Clock>,
        settings: AggregatorSettings,
    ) -> Self {
        Self {
            registry,
            fetcher,
            normalizer,
            categorizer,
            news_cache: TtlCache::new(ttl, clock.clone()),
            trending_cache: TtlCache::new(ttl, clock.clone()),
            clock,
            settings,
        }
    }

    pub fn from_config(config: &Config, fetcher: Arc<dyn FeedFetcher>, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            FeedRegistry::new(config.feeds.clone()),
            fetcher,
            Normalizer::new(config.normalize.limit()),
            Categorizer::new(config.keywords.clone()),
            config.cache.ttl(),
            clock,
            AggregatorSettings::from(&config.fetch),
        )
    }

    pub fn registry(&self) -> &FeedRegistry {
        &self.registry
    }

    pub async fn news(&self, query: &NewsQuery) -> Result<NewsResult, AggregatorError> {
        let sport = self.registry.validate_sport(&query.sport)?;
        let key = CacheKey::news(&sport, query.category, query.limit)?;

        let (target, category, limit) = (sport.as_str(), query.category, query.limit);
        let result = self
            .news_cache
            .get_or_compute(&key, query.fresh, || async move {
                Ok::<_, AggregatorError>(self.collect(target, category, limit).await)
            })
            .await?;

        Ok(NewsResult {
            articles: result.value,
            sport,
            category: query.category,
            cached: result.cached,
            last_updated: result.stored_at,
        })
    }

    /// Topics ranked by tag frequency over a pool of recent articles.
    pub async fn trending(
        &self,
        sport: &str,
        limit: usize,
        fresh: bool,
    ) -> Result<TrendingResult, AggregatorError> {
        let sport = self.registry.validate_sport(sport)?;
        let key = CacheKey::trending(&sport, limit)?;
        let pool_query = NewsQuery {
            sport: sport.clone(),
            category: None,
            limit: self.settings.trending_pool,
            fresh,
        };

        let pool_query = &pool_query;
        let result = self
            .trending_cache
            .get_or_compute(&key, fresh, || async move {
                let pool = self.news(pool_query).await?;
                let excluded = self.excluded_topics();
                Ok::<_, AggregatorError>(rank_topics(&pool.articles, &excluded, limit))
            })
            .await?;

        Ok(TrendingResult {
            articles: topic_articles(&result.value, limit),
            topics: result.value,
            sport,
            cached: result.cached,
            last_updated: result.stored_at,
        })
    }

    /// Empties both result caches, returning the number of entries dropped.
    pub async fn clear_cache(&self) -> usize {
        let cleared = self.news_cache.clear().await + self.trending_cache.clear().await;
        info!("Cleared {} cache entries", cleared);
        cleared
    }

    fn excluded_topics(&self) -> Vec<String> {
        let mut sports = self.registry.sports();
        sports.extend(self.categorizer.sport_tags());
        sports
    }

    async fn collect(&self, sport: &str, category: Option<Category>, limit: usize) -> Vec<Article> {
        let sources: Vec<&FeedSource> = self
            .registry
            .resolve(sport)
            .iter()
            .filter(|s| category.map_or(true, |c| s.category == c))
            .collect();

        info!("Refreshing {} feeds for '{}'", sources.len(), sport);

        let width = self.settings.concurrency.max(1);
        let mut merged = Vec::new();
        let mut failed = 0;

        for batch in sources.chunks(width) {
            let results = join_all(batch.iter().map(|source| self.fetch_source(source))).await;
            let now = self.clock.now();

            for (source, result) in batch.iter().zip(results) {
                match result {
                    Ok(items) => {
                        let before = merged.len();
                        merged.extend(self.prepare(&items, source, now));
                        debug!("Feed '{}' yielded {} articles", source.name, merged.len() - before);
                    }
                    Err(e) => {
                        failed += 1;
                        warn!("{}", e);
                    }
                }
            }
        }

        let mut articles = dedupe(merged);
        articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        articles.truncate(limit);

        info!(
            "Aggregated {} articles for '{}' ({} of {} feeds failed)",
            articles.len(),
            sport,
            failed,
            sources.len()
        );
        articles
    }

    async fn fetch_source(&self, source: &FeedSource) -> Result<Vec<RawItem>, AggregatorError> {
        let timeout = self.settings.fetch_timeout;
        let result = match tokio::time::timeout(timeout, self.fetcher.fetch(source)).await {
            Ok(result) => result,
            Err(_) => Err(FeedError::Timeout(timeout)),
        };
        result.map_err(|reason| AggregatorError::FeedUnavailable {
            source_name: source.name.clone(),
            reason,
        })
    }

    fn prepare(&self, items: &[RawItem], source: &FeedSource, now: DateTime<Utc>) -> Vec<Article> {
        items
            .iter()
            .filter_map(|item| {
                let Some(mut article) = self.normalizer.normalize(item, source, now) else {
                    debug!("Dropping entry without title or link from '{}'", source.name);
                    return None;
                };
                // feed-provided category terms count as body text
                let scan = std::iter::once(article.description.as_str())
                    .chain(item.categories.iter().map(String::as_str))
                    .collect::<Vec<_>>()
                    .join(" ");
                article.tags = self
                    .categorizer
                    .categorize(&article.title, &scan, &source.sport);
                Some(article)
            })
            .collect()
    }
}

/// Periodically recomputes the default `general` result set so the first
/// request after expiry is served warm.
pub async fn start_background_refresh(aggregator: Arc<Aggregator>, interval_minutes: u64) {
    if interval_minutes == 0 {
        info!("Background refresh disabled");
        return;
    }
    let interval = Duration::from_secs(interval_minutes * 60);
    let query = NewsQuery {
        fresh: true,
        ..NewsQuery::new(GENERAL, DEFAULT_NEWS_LIMIT)
    };

    loop {
        info!("Starting scheduled feed refresh");
        if let Err(e) = aggregator.news(&query).await {
            error!("Scheduled feed refresh failed: {}", e);
        }
        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone)]
    enum Stub {
        Items(Vec<RawItem>),
        Fail,
        Hang,
    }

    #[derive(Default)]
    struct StubFetcher {
        feeds: HashMap<String, Stub>,
        delay: Duration,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl StubFetcher {
        fn new(feeds: Vec<(&str, Stub)>) -> Self {
            Self {
                feeds: feeds
                    .into_iter()
                    .map(|(name, stub)| (feed_url(name), stub))
                    .collect(),
                ..Default::default()
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FeedFetcher for StubFetcher {
        async fn fetch(&self, source: &FeedSource) -> Result<Vec<RawItem>, FeedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let stub = self.feeds.get(&source.url).cloned().unwrap_or(Stub::Fail);
            if let Stub::Hang = stub {
                tokio::time::sleep(Duration::from_secs(60)).await;
                return Ok(Vec::new());
            }

            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            match stub {
                Stub::Items(items) => Ok(items),
                _ => Err(FeedError::Status(500)),
            }
        }
    }

    fn feed_url(name: &str) -> String {
        format!("https://{}.example.com/rss", name)
    }

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 8, 18, 0, 0).unwrap()
    }

    fn raw(title: &str, hours_ago: i64) -> RawItem {
        let slug = title.to_lowercase().replace(' ', "-");
        RawItem {
            title: Some(title.to_string()),
            link: Some(format!("https://news.example.com/{}", slug)),
            published: Some(base() - chrono::Duration::hours(hours_ago)),
            ..Default::default()
        }
    }

    fn config(feeds: &[(&str, &str, Category)]) -> Config {
        let mut config = Config::from_str("feeds = []").unwrap();
        config.feeds = feeds
            .iter()
            .map(|(name, sport, category)| FeedSource {
                name: name.to_string(),
                url: feed_url(name),
                sport: sport.to_string(),
                category: *category,
            })
            .collect();
        config
    }

    fn aggregator(config: &Config, fetcher: Arc<StubFetcher>) -> (Aggregator, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(base()));
        (Aggregator::from_config(config, fetcher, clock.clone()), clock)
    }

    fn titles(articles: &[Article]) -> Vec<&str> {
        articles.iter().map(|a| a.title.as_str()).collect()
    }

    fn three_nfl_feeds() -> Config {
        config(&[
            ("one", "nfl", Category::News),
            ("two", "nfl", Category::News),
            ("three", "nfl", Category::Rumor),
        ])
    }

    mod pipeline_tests {
        use super::*;

        #[tokio::test]
        async fn test_partial_failure_returns_remaining_feeds() {
            let fetcher = Arc::new(StubFetcher::new(vec![
                ("one", Stub::Items(vec![raw("Chiefs Win!!", 1), raw("Ravens Lose", 3)])),
                ("two", Stub::Fail),
                ("three", Stub::Items(vec![raw("chiefs win", 2), raw("Bills Trade", 0)])),
            ]));
            let (aggregator, _clock) = aggregator(&three_nfl_feeds(), fetcher.clone());

            let result = aggregator.news(&NewsQuery::new("nfl", 20)).await.unwrap();

            assert_eq!(titles(&result.articles), vec!["Bills Trade", "Chiefs Win!!", "Ravens Lose"]);
            assert_eq!(result.articles[1].source.name, "one");
            assert!(!result.cached);
            assert_eq!(fetcher.calls(), 3);
        }

        #[tokio::test]
        async fn test_all_feeds_failing_is_empty_not_error() {
            let fetcher = Arc::new(StubFetcher::new(vec![]));
            let (aggregator, _clock) = aggregator(&three_nfl_feeds(), fetcher.clone());

            let result = aggregator.news(&NewsQuery::new("nfl", 20)).await.unwrap();
            assert!(result.articles.is_empty());
            assert_eq!(result.sport, "nfl");
            assert_eq!(fetcher.calls(), 3);
        }

        #[tokio::test]
        async fn test_sorted_newest_first_with_stable_ties() {
            let fetcher = Arc::new(StubFetcher::new(vec![
                ("one", Stub::Items(vec![raw("Old", 9), raw("Tie A", 4)])),
                ("two", Stub::Items(vec![raw("Tie B", 4), raw("New", 1)])),
            ]));
            let config = config(&[("one", "nfl", Category::News), ("two", "nfl", Category::News)]);
            let (aggregator, _clock) = aggregator(&config, fetcher);

            let result = aggregator.news(&NewsQuery::new("nfl", 20)).await.unwrap();
            assert_eq!(titles(&result.articles), vec!["New", "Tie A", "Tie B", "Old"]);
            assert!(result
                .articles
                .windows(2)
                .all(|pair| pair[0].published_at >= pair[1].published_at));
        }

        #[tokio::test]
        async fn test_limit_truncates_after_sorting() {
            let items = (0..10).map(|i| raw(&format!("Story {}", i), i)).collect();
            let fetcher = Arc::new(StubFetcher::new(vec![("one", Stub::Items(items))]));
            let config = config(&[("one", "nfl", Category::News)]);
            let (aggregator, _clock) = aggregator(&config, fetcher);

            let result = aggregator.news(&NewsQuery::new("nfl", 3)).await.unwrap();
            assert_eq!(titles(&result.articles), vec!["Story 0", "Story 1", "Story 2"]);
        }

        #[tokio::test]
        async fn test_category_filter_limits_feeds() {
            let fetcher = Arc::new(StubFetcher::new(vec![
                ("one", Stub::Items(vec![raw("Official Word", 1)])),
                ("three", Stub::Items(vec![raw("Rumor Mill", 1)])),
            ]));
            let (aggregator, _clock) = aggregator(&three_nfl_feeds(), fetcher.clone());

            let query = NewsQuery {
                category: Some(Category::Rumor),
                ..NewsQuery::new("nfl", 20)
            };
            let result = aggregator.news(&query).await.unwrap();
            assert_eq!(titles(&result.articles), vec!["Rumor Mill"]);
            assert_eq!(result.category, Some(Category::Rumor));
            assert_eq!(fetcher.calls(), 1);
        }

        #[tokio::test]
        async fn test_articles_are_tagged() {
            let fetcher = Arc::new(StubFetcher::new(vec![
                ("wire", Stub::Items(vec![raw("NFL Quarterback Throws Touchdown", 1)])),
                ("official", Stub::Items(vec![raw("Draft recap", 2)])),
            ]));
            let config = config(&[
                ("wire", "general", Category::News),
                ("official", "nfl", Category::Official),
            ]);
            let (aggregator, _clock) = aggregator(&config, fetcher);

            let general = aggregator.news(&NewsQuery::new("general", 20)).await.unwrap();
            assert_eq!(general.articles[0].tags[0], "nfl");
            assert_eq!(general.articles[0].source.sport, "general");

            let nfl = aggregator.news(&NewsQuery::new("nfl", 20)).await.unwrap();
            assert_eq!(nfl.articles[0].tags, vec!["nfl", "draft", "recap"]);
        }

        #[tokio::test]
        async fn test_feed_categories_feed_the_tagger() {
            let mut item = raw("Sunday slate", 1);
            item.categories = vec!["Injury Report".to_string()];
            let fetcher = Arc::new(StubFetcher::new(vec![("one", Stub::Items(vec![item]))]));
            let config = config(&[("one", "nfl", Category::News)]);
            let (aggregator, _clock) = aggregator(&config, fetcher);

            let result = aggregator.news(&NewsQuery::new("nfl", 20)).await.unwrap();
            assert_eq!(result.articles[0].tags, vec!["nfl", "injury"]);
        }

        #[tokio::test]
        async fn test_unusable_entries_dropped() {
            let untitled = RawItem {
                link: Some("https://news.example.com/untitled".to_string()),
                ..Default::default()
            };
            let fetcher = Arc::new(StubFetcher::new(vec![(
                "one",
                Stub::Items(vec![untitled, raw("Kept", 1)]),
            )]));
            let config = config(&[("one", "nfl", Category::News)]);
            let (aggregator, _clock) = aggregator(&config, fetcher);

            let result = aggregator.news(&NewsQuery::new("nfl", 20)).await.unwrap();
            assert_eq!(titles(&result.articles), vec!["Kept"]);
        }
    }

    mod concurrency_tests {
        use super::*;

        #[tokio::test]
        async fn test_batches_bound_parallelism() {
            let names = ["a", "b", "c", "d", "e"];
            let fetcher = Arc::new(
                StubFetcher::new(names.iter().map(|n| (*n, Stub::Items(vec![]))).collect())
                    .with_delay(Duration::from_millis(20)),
            );
            let mut config = config(
                &names
                    .iter()
                    .map(|n| (*n, "nfl", Category::News))
                    .collect::<Vec<_>>(),
            );
            config.fetch.concurrency = 2;
            let (aggregator, _clock) = aggregator(&config, fetcher.clone());

            aggregator.news(&NewsQuery::new("nfl", 20)).await.unwrap();
            assert_eq!(fetcher.calls(), 5);
            assert_eq!(fetcher.max_in_flight.load(Ordering::SeqCst), 2);
        }

        #[tokio::test]
        async fn test_hanging_feed_times_out() {
            let fetcher = Arc::new(StubFetcher::new(vec![
                ("one", Stub::Items(vec![raw("Fast Feed Story", 1)])),
                ("two", Stub::Hang),
            ]));
            let config = config(&[("one", "nfl", Category::News), ("two", "nfl", Category::News)]);
            let settings = AggregatorSettings {
                fetch_timeout: Duration::from_millis(50),
                ..AggregatorSettings::from(&config.fetch)
            };
            let aggregator = Aggregator::new(
                FeedRegistry::new(config.feeds.clone()),
                fetcher,
                Normalizer::default(),
                Categorizer::default(),
                Duration::from_secs(60),
                Arc::new(ManualClock::new(base())),
                settings,
            );

            let result = tokio::time::timeout(
                Duration::from_secs(5),
                aggregator.news(&NewsQuery::new("nfl", 20)),
            )
            .await
            .expect("hanging feed must not stall the request")
            .unwrap();
            assert_eq!(titles(&result.articles), vec!["Fast Feed Story"]);
        }

        #[tokio::test]
        async fn test_concurrent_identical_requests_fetch_once() {
            let fetcher = Arc::new(
                StubFetcher::new(vec![
                    ("one", Stub::Items(vec![raw("A", 1)])),
                    ("two", Stub::Items(vec![raw("B", 2)])),
                    ("three", Stub::Items(vec![raw("C", 3)])),
                ])
                .with_delay(Duration::from_millis(30)),
            );
            let (aggregator, _clock) = aggregator(&three_nfl_feeds(), fetcher.clone());
            let query = NewsQuery::new("nfl", 20);

            let (a, b) = tokio::join!(aggregator.news(&query), aggregator.news(&query));
            let (a, b) = (a.unwrap(), b.unwrap());

            assert_eq!(fetcher.calls(), 3);
            assert_eq!(titles(&a.articles), titles(&b.articles));
            assert!(a.cached != b.cached);
        }
    }

    mod cache_tests {
        use super::*;

        fn single_feed() -> (Aggregator, Arc<ManualClock>, Arc<StubFetcher>) {
            let fetcher = Arc::new(StubFetcher::new(vec![(
                "one",
                Stub::Items(vec![raw("Cached Story", 1)]),
            )]));
            let config = config(&[("one", "nfl", Category::News)]);
            let (aggregator, clock) = aggregator(&config, fetcher.clone());
            (aggregator, clock, fetcher)
        }

        #[tokio::test]
        async fn test_repeat_request_served_from_cache() {
            let (aggregator, _clock, fetcher) = single_feed();
            let query = NewsQuery::new("nfl", 20);

            let first = aggregator.news(&query).await.unwrap();
            let second = aggregator.news(&query).await.unwrap();

            assert!(!first.cached);
            assert!(second.cached);
            assert_eq!(second.last_updated, first.last_updated);
            assert_eq!(fetcher.calls(), 1);
        }

        #[tokio::test]
        async fn test_expiry_triggers_recompute() {
            let (aggregator, clock, fetcher) = single_feed();
            let query = NewsQuery::new("nfl", 20);

            aggregator.news(&query).await.unwrap();
            clock.advance(Duration::from_secs(15 * 60));
            let result = aggregator.news(&query).await.unwrap();

            assert!(!result.cached);
            assert_eq!(result.last_updated, base() + chrono::Duration::minutes(15));
            assert_eq!(fetcher.calls(), 2);
        }

        #[tokio::test]
        async fn test_fresh_bypasses_cache() {
            let (aggregator, _clock, fetcher) = single_feed();
            aggregator.news(&NewsQuery::new("nfl", 20)).await.unwrap();

            let fresh = NewsQuery {
                fresh: true,
                ..NewsQuery::new("nfl", 20)
            };
            let result = aggregator.news(&fresh).await.unwrap();
            assert!(!result.cached);
            assert_eq!(fetcher.calls(), 2);

            let cached = aggregator.news(&NewsQuery::new("nfl", 20)).await.unwrap();
            assert!(cached.cached);
            assert_eq!(fetcher.calls(), 2);
        }

        #[tokio::test]
        async fn test_clear_cache_forces_recompute() {
            let (aggregator, _clock, fetcher) = single_feed();
            let query = NewsQuery::new("nfl", 20);
            aggregator.news(&query).await.unwrap();

            assert_eq!(aggregator.clear_cache().await, 1);
            let result = aggregator.news(&query).await.unwrap();
            assert!(!result.cached);
            assert_eq!(fetcher.calls(), 2);
        }

        #[tokio::test]
        async fn test_different_limits_are_cached_separately() {
            let (aggregator, _clock, fetcher) = single_feed();
            aggregator.news(&NewsQuery::new("nfl", 20)).await.unwrap();
            aggregator.news(&NewsQuery::new("nfl", 10)).await.unwrap();
            assert_eq!(fetcher.calls(), 2);
        }
    }

    mod validation_tests {
        use super::*;

        #[tokio::test]
        async fn test_unknown_sport_rejected() {
            let fetcher = Arc::new(StubFetcher::new(vec![]));
            let (aggregator, _clock) = aggregator(&three_nfl_feeds(), fetcher.clone());

            let err = aggregator.news(&NewsQuery::new("curling", 20)).await.unwrap_err();
            match err {
                AggregatorError::InvalidQuery { field, valid, .. } => {
                    assert_eq!(field, "sport");
                    assert_eq!(valid, vec!["general", "nfl"]);
                }
                other => panic!("expected InvalidQuery, got {:?}", other),
            }
            assert_eq!(fetcher.calls(), 0);
        }

        #[tokio::test]
        async fn test_zero_limit_is_internal_failure() {
            let fetcher = Arc::new(StubFetcher::new(vec![]));
            let (aggregator, _clock) = aggregator(&three_nfl_feeds(), fetcher);

            let err = aggregator.news(&NewsQuery::new("nfl", 0)).await.unwrap_err();
            assert!(matches!(err, AggregatorError::Internal(_)));
        }
    }

    mod trending_tests {
        use super::*;

        fn trending_pool() -> Vec<RawItem> {
            (0..20)
                .map(|i| {
                    let title = match i {
                        0..=4 => format!("Team {} clinches playoff berth", i),
                        5..=7 => format!("Player {} out with injury", i),
                        _ => format!("Note number {}", i),
                    };
                    raw(&title, i)
                })
                .collect()
        }

        #[tokio::test]
        async fn test_trending_ranks_by_frequency() {
            let fetcher = Arc::new(StubFetcher::new(vec![("one", Stub::Items(trending_pool()))]));
            let config = config(&[("one", "nfl", Category::News)]);
            let (aggregator, _clock) = aggregator(&config, fetcher);

            let result = aggregator.trending("nfl", 2, false).await.unwrap();

            let topics: Vec<_> = result.topics.iter().map(|t| (t.topic.as_str(), t.count)).collect();
            assert_eq!(topics, vec![("playoff", 5), ("injury", 3)]);
            assert_eq!(result.topics[0].sample_articles.len(), 3);
            assert_eq!(result.articles.len(), 2);
            assert!(!result.cached);
        }

        #[tokio::test]
        async fn test_trending_is_cached() {
            let fetcher = Arc::new(StubFetcher::new(vec![("one", Stub::Items(trending_pool()))]));
            let config = config(&[("one", "nfl", Category::News)]);
            let (aggregator, _clock) = aggregator(&config, fetcher.clone());

            aggregator.trending("nfl", 5, false).await.unwrap();
            let second = aggregator.trending("nfl", 5, false).await.unwrap();

            assert!(second.cached);
            assert_eq!(fetcher.calls(), 1);
        }

        #[tokio::test]
        async fn test_trending_unknown_sport_rejected() {
            let fetcher = Arc::new(StubFetcher::new(vec![]));
            let (aggregator, _clock) = aggregator(&three_nfl_feeds(), fetcher);
            assert!(aggregator.trending("curling", 5, false).await.is_err());
        }
    }
}
