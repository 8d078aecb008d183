use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AggregatorError;

pub const GENERAL: &str = "general";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    News,
    Official,
    Rumor,
    Analysis,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::News,
        Category::Official,
        Category::Rumor,
        Category::Analysis,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::News => "news",
            Category::Official => "official",
            Category::Rumor => "rumor",
            Category::Analysis => "analysis",
        }
    }

    pub fn valid_values() -> Vec<String> {
        Self::ALL.iter().map(|c| c.as_str().to_string()).collect()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = AggregatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == lower)
            .ok_or_else(|| AggregatorError::invalid("category", s, Self::valid_values()))
    }
}

/// One configured syndication feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
    pub sport: String,
    #[serde(default)]
    pub category: Category,
}

/// Static table of feed sources grouped by sport.
#[derive(Debug, Clone, Default)]
pub struct FeedRegistry {
    by_sport: BTreeMap<String, Vec<FeedSource>>,
}

impl FeedRegistry {
    pub fn new(sources: Vec<FeedSource>) -> Self {
        let mut by_sport: BTreeMap<String, Vec<FeedSource>> = BTreeMap::new();
        for mut source in sources {
            source.sport = source.sport.trim().to_lowercase();
            by_sport.entry(source.sport.clone()).or_default().push(source);
        }
        by_sport.entry(GENERAL.to_string()).or_default();
        Self { by_sport }
    }

    /// Feeds for a sport, falling back to the `general` set when the sport is
    /// unknown.
    pub fn resolve(&self, sport: &str) -> &[FeedSource] {
        let key = sport.trim().to_lowercase();
        self.by_sport
            .get(&key)
            .or_else(|| self.by_sport.get(GENERAL))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_known(&self, sport: &str) -> bool {
        self.by_sport.contains_key(&sport.trim().to_lowercase())
    }

    /// Validates a requested sport, returning its canonical lowercase form.
    pub fn validate_sport(&self, sport: &str) -> Result<String, AggregatorError> {
        let key = sport.trim().to_lowercase();
        if self.by_sport.contains_key(&key) {
            Ok(key)
        } else {
            Err(AggregatorError::invalid("sport", sport, self.sports()))
        }
    }

    pub fn sports(&self) -> Vec<String> {
        self.by_sport.keys().cloned().collect()
    }

    pub fn groups(&self) -> impl Iterator<Item = (&str, &[FeedSource])> {
        self.by_sport
            .iter()
            .map(|(sport, sources)| (sport.as_str(), sources.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.by_sport.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
