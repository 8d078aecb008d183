//! Sports News - A Sports RSS Aggregator
//!
//! This crate fetches sports RSS/Atom feeds, normalizes and tags their
//! entries, and serves merged, deduplicated article lists and trending
//! topics over a JSON API. Results are held in a TTL cache that collapses
//! concurrent refreshes of the same query into one.

pub mod aggregator;
pub mod cache;
pub mod categorizer;
pub mod config;
pub mod dedupe;
pub mod error;
pub mod fetcher;
pub mod normalizer;
pub mod registry;
pub mod routes;
pub mod trending;
