/// Movie catalog
///
/// Catalog reads/writes and the genre-based recommendation query.

mod manager;

pub use manager::CatalogManager;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Sentiment label and numeric rank from the reference scale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ranking {
    pub ranking_name: String,
    pub ranking_value: i64,
}

/// Movie record keyed by its IMDB identifier
#[derive(Debug, Clone, Serialize)]
pub struct Movie {
    pub imdb_id: String,
    pub title: String,
    pub genres: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_review: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranking: Option<Ranking>,
}

/// Insert payload. The ranking is computed from the admin review and is
/// not settable by clients.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewMovie {
    #[validate(length(min = 1, message = "imdb_id is required"))]
    pub imdb_id: String,
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    #[serde(default)]
    pub genres: Vec<String>,
    pub admin_review: Option<String>,
}

/// Admin review update payload
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateReviewRequest {
    pub admin_review: String,
}

/// Admin review update response
#[derive(Debug, Clone, Serialize)]
pub struct UpdateReviewResponse {
    pub ranking_name: String,
    pub admin_review: String,
}
