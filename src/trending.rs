use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::normalizer::Article;

pub const SAMPLES_PER_TOPIC: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingTopic {
    pub topic: String,
    pub count: usize,
    pub sample_articles: Vec<Article>,
}

/// Ranks tags across `pool` by the number of articles carrying them.
///
/// Equal counts keep the order in which tags were first seen. Tags listed in
/// `excluded` (sport names) are not ranked.
pub fn rank_topics(pool: &[Article], excluded: &[String], limit: usize) -> Vec<TrendingTopic> {
    let mut topics: Vec<TrendingTopic> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for article in pool {
        for tag in &article.tags {
            if excluded.iter().any(|e| e == tag) {
                continue;
            }
            let slot = *index.entry(tag.as_str()).or_insert_with(|| {
                topics.push(TrendingTopic {
                    topic: tag.clone(),
                    count: 0,
                    sample_articles: Vec::new(),
                });
                topics.len() - 1
            });
            let topic = &mut topics[slot];
            topic.count += 1;
            if topic.sample_articles.len() < SAMPLES_PER_TOPIC {
                topic.sample_articles.push(article.clone());
            }
        }
    }

    // stable: ties stay in first-seen order
    topics.sort_by(|a, b| b.count.cmp(&a.count));
    topics.truncate(limit);
    topics
}

/// Sample articles of the ranked topics, in rank order, without repeats.
pub fn topic_articles(topics: &[TrendingTopic], limit: usize) -> Vec<Article> {
    let mut seen = HashSet::new();
    topics
        .iter()
        .flat_map(|t| t.sample_articles.iter())
        .filter(|a| seen.insert(a.id.as_str()))
        .take(limit)
        .cloned()
        .collect()
}
