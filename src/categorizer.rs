use std::collections::HashMap;

use serde::Deserialize;

use crate::registry::GENERAL;

/// Keyword data driving categorization. Every table can be replaced from the
/// `[keywords]` section of the config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KeywordTables {
    /// Topic keywords tested for articles of a known sport
    pub topics: HashMap<String, Vec<String>>,
    /// Topic keywords tested for every article
    pub general: Vec<String>,
    /// Signals used to guess the sport of an article from a general feed.
    /// Earlier entries win ties.
    pub signals: Vec<SportSignals>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SportSignals {
    pub sport: String,
    pub terms: Vec<String>,
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

impl Default for KeywordTables {
    fn default() -> Self {
        let topics = HashMap::from([
            (
                "nfl".to_string(),
                words(&[
                    "touchdown",
                    "quarterback",
                    "playoff",
                    "draft",
                    "injury",
                    "trade",
                    "contract",
                    "super bowl",
                ]),
            ),
            (
                "nba".to_string(),
                words(&[
                    "playoff", "draft", "injury", "trade", "contract", "finals", "all-star", "dunk",
                ]),
            ),
            (
                "mlb".to_string(),
                words(&[
                    "home run",
                    "pitcher",
                    "world series",
                    "playoff",
                    "injury",
                    "trade",
                    "contract",
                    "strikeout",
                ]),
            ),
        ]);

        Self {
            topics,
            general: words(&["breaking", "update", "analysis", "preview", "recap", "highlights"]),
            signals: vec![
                SportSignals {
                    sport: "nfl".to_string(),
                    terms: words(&["nfl", "football", "quarterback", "touchdown"]),
                },
                SportSignals {
                    sport: "nba".to_string(),
                    terms: words(&["nba", "basketball", "lebron", "curry"]),
                },
                SportSignals {
                    sport: "mlb".to_string(),
                    terms: words(&["mlb", "baseball", "pitcher", "home run"]),
                },
            ],
        }
    }
}

impl KeywordTables {
    fn lowercased(mut self) -> Self {
        let lower = |list: &mut Vec<String>| {
            for word in list.iter_mut() {
                *word = word.to_lowercase();
            }
        };
        self.topics = self
            .topics
            .into_iter()
            .map(|(sport, mut list)| {
                lower(&mut list);
                (sport.to_lowercase(), list)
            })
            .collect();
        lower(&mut self.general);
        for signal in &mut self.signals {
            signal.sport = signal.sport.to_lowercase();
            lower(&mut signal.terms);
        }
        self
    }
}

/// Keyword-based tagger for articles.
#[derive(Debug, Clone)]
pub struct Categorizer {
    tables: KeywordTables,
}

impl Default for Categorizer {
    fn default() -> Self {
        Self::new(KeywordTables::default())
    }
}

impl Categorizer {
    pub fn new(tables: KeywordTables) -> Self {
        Self {
            tables: tables.lowercased(),
        }
    }

    /// Tags for an article. The first tag is always the sport: either the
    /// given one or, for `general`, the sport guessed from the text.
    pub fn categorize(&self, title: &str, body: &str, sport: &str) -> Vec<String> {
        let text = format!("{} {}", title, body).to_lowercase();
        let sport = sport.trim().to_lowercase();
        let sport = if sport == GENERAL {
            self.classify_lowercase(&text).to_string()
        } else {
            sport
        };

        let mut tags = vec![sport.clone()];
        let topic_words = self.tables.topics.get(&sport).into_iter().flatten();
        for keyword in topic_words.chain(self.tables.general.iter()) {
            if text.contains(keyword.as_str()) && !tags.contains(keyword) {
                tags.push(keyword.clone());
            }
        }
        tags
    }

    /// Every sport name the categorizer can emit as a tag.
    pub fn sport_tags(&self) -> Vec<String> {
        let mut sports: Vec<String> = self.tables.topics.keys().cloned().collect();
        sports.extend(self.tables.signals.iter().map(|s| s.sport.clone()));
        sports.push(GENERAL.to_string());
        sports.sort();
        sports.dedup();
        sports
    }

    /// Guess the sport of free text, defaulting to `general`.
    pub fn classify_sport(&self, text: &str) -> &str {
        self.classify_lowercase(&text.to_lowercase())
    }

    fn classify_lowercase(&self, text: &str) -> &str {
        let mut best: Option<(&str, usize)> = None;
        for signal in &self.tables.signals {
            let hits = signal
                .terms
                .iter()
                .filter(|term| text.contains(term.as_str()))
                .count();
            if hits > 0 && best.map_or(true, |(_, top)| hits > top) {
                best = Some((signal.sport.as_str(), hits));
            }
        }
        best.map(|(sport, _)| sport).unwrap_or(GENERAL)
    }
}
