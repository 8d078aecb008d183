use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::aggregator::{
    Aggregator, NewsQuery, DEFAULT_NEWS_LIMIT, DEFAULT_TRENDING_LIMIT, MAX_LIMIT,
};
use crate::error::AggregatorError;
use crate::normalizer::Article;
use crate::registry::{Category, GENERAL};
use crate::trending::TrendingTopic;

pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    /// Expose internal error detail in 500 responses
    pub development: bool,
}

impl AppState {
    fn error(&self, error: AggregatorError) -> AppError {
        AppError {
            error,
            development: self.development,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/news", get(news))
        .route("/news/trending", get(trending))
        .route("/news/cache", delete(clear_cache))
        .route("/news/sources", get(sources))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// Response bodies
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub cached: bool,
    pub count: usize,
    pub data: T,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsData {
    pub articles: Vec<Article>,
    pub sport: String,
    pub category: Option<Category>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingData {
    pub articles: Vec<Article>,
    pub topics: Vec<TrendingTopic>,
    pub sport: String,
    pub last_updated: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct SourceEntry {
    pub name: String,
    pub url: String,
    pub category: Category,
}

#[derive(Serialize)]
pub struct SportSources {
    pub count: usize,
    pub sources: Vec<SourceEntry>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourcesResponse {
    pub success: bool,
    pub count: usize,
    pub data: BTreeMap<String, SportSources>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_values: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

// Custom error type
pub struct AppError {
    error: AggregatorError,
    development: bool,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self.error {
            AggregatorError::InvalidQuery {
                field,
                value,
                valid,
            } => (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    success: false,
                    error: format!("Invalid {} '{}'", field, value),
                    valid_values: Some(valid),
                    detail: None,
                }),
            )
                .into_response(),
            other => {
                error!("News aggregation failed: {}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        success: false,
                        error: "Failed to fetch news".to_string(),
                        valid_values: None,
                        detail: self.development.then(|| other.to_string()),
                    }),
                )
                    .into_response()
            }
        }
    }
}

// Query parameters
fn default_sport() -> String {
    GENERAL.to_string()
}

#[derive(Debug, Deserialize)]
pub struct NewsParams {
    #[serde(default = "default_sport")]
    pub sport: String,
    pub category: Option<String>,
    pub limit: Option<String>,
    pub fresh: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TrendingParams {
    #[serde(default = "default_sport")]
    pub sport: String,
    pub limit: Option<String>,
    pub fresh: Option<String>,
}

// Numbers and flags arrive as text so malformed values get the JSON 400
fn parse_limit(limit: Option<&str>, default: usize) -> Result<usize, AggregatorError> {
    match limit.map(str::trim) {
        None | Some("") => Ok(default),
        Some(value) => value.parse::<usize>().map(|n| n.clamp(1, MAX_LIMIT)).map_err(|_| {
            AggregatorError::invalid("limit", value, vec![format!("1-{}", MAX_LIMIT)])
        }),
    }
}

fn parse_fresh(fresh: Option<&str>) -> Result<bool, AggregatorError> {
    let Some(value) = fresh.map(str::trim) else {
        return Ok(false);
    };
    match value.to_ascii_lowercase().as_str() {
        "" | "false" | "0" => Ok(false),
        "true" | "1" => Ok(true),
        _ => Err(AggregatorError::invalid(
            "fresh",
            value,
            vec!["true".to_string(), "false".to_string()],
        )),
    }
}

fn parse_category(category: Option<&str>) -> Result<Option<Category>, AggregatorError> {
    match category.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some),
    }
}

// Route handlers
pub async fn news(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NewsParams>,
) -> Result<impl IntoResponse, AppError> {
    let query = NewsQuery {
        category: parse_category(params.category.as_deref()).map_err(|e| state.error(e))?,
        limit: parse_limit(params.limit.as_deref(), DEFAULT_NEWS_LIMIT)
            .map_err(|e| state.error(e))?,
        fresh: parse_fresh(params.fresh.as_deref()).map_err(|e| state.error(e))?,
        sport: params.sport,
    };

    let result = state
        .aggregator
        .news(&query)
        .await
        .map_err(|e| state.error(e))?;

    Ok(Json(ApiResponse {
        success: true,
        cached: result.cached,
        count: result.articles.len(),
        data: NewsData {
            articles: result.articles,
            sport: result.sport,
            category: result.category,
            last_updated: result.last_updated,
        },
    }))
}

pub async fn trending(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TrendingParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = parse_limit(params.limit.as_deref(), DEFAULT_TRENDING_LIMIT)
        .map_err(|e| state.error(e))?;
    let fresh = parse_fresh(params.fresh.as_deref()).map_err(|e| state.error(e))?;
    let result = state
        .aggregator
        .trending(&params.sport, limit, fresh)
        .await
        .map_err(|e| state.error(e))?;

    Ok(Json(ApiResponse {
        success: true,
        cached: result.cached,
        count: result.articles.len(),
        data: TrendingData {
            articles: result.articles,
            topics: result.topics,
            sport: result.sport,
            last_updated: result.last_updated,
        },
    }))
}

pub async fn clear_cache(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let cleared = state.aggregator.clear_cache().await;
    Json(MessageResponse {
        success: true,
        message: format!("Cleared {} cache entries", cleared),
    })
}

pub async fn sources(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let registry = state.aggregator.registry();
    let data = registry
        .groups()
        .map(|(sport, sources)| {
            let entries = sources
                .iter()
                .map(|s| SourceEntry {
                    name: s.name.clone(),
                    url: s.url.clone(),
                    category: s.category,
                })
                .collect::<Vec<_>>();
            (
                sport.to_string(),
                SportSources {
                    count: entries.len(),
                    sources: entries,
                },
            )
        })
        .collect();

    Json(SourcesResponse {
        success: true,
        count: registry.len(),
        data,
    })
}

pub async fn health() -> impl IntoResponse {
    Html("OK")
}
