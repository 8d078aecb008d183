use std::collections::HashSet;

use crate::normalizer::Article;

/// Normalized title used to detect the same story across sources: lowercase,
/// alphanumerics only, single spaces, trimmed.
pub fn fingerprint(title: &str) -> String {
    let kept: String = title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keeps the first article for each fingerprint, preserving order.
pub fn dedupe(articles: Vec<Article>) -> Vec<Article> {
    let mut seen = HashSet::with_capacity(articles.len());
    articles
        .into_iter()
        .filter(|article| seen.insert(fingerprint(&article.title)))
        .collect()
}
