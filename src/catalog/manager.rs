/// Catalog manager implementation using runtime queries
use crate::{
    catalog::{Movie, NewMovie, Ranking},
    db,
    error::{ApiError, ApiResult},
};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::time::Duration;

/// Movie catalog service
pub struct CatalogManager {
    db: SqlitePool,
    query_timeout: Duration,
    recommendation_limit: i64,
}

impl CatalogManager {
    pub fn new(db: SqlitePool, query_timeout: Duration, recommendation_limit: i64) -> Self {
        Self {
            db,
            query_timeout,
            recommendation_limit,
        }
    }

    /// List every movie in the catalog
    pub async fn list_movies(&self) -> ApiResult<Vec<Movie>> {
        let rows = db::with_timeout(
            self.query_timeout,
            sqlx::query("SELECT * FROM movies").fetch_all(&self.db),
        )
        .await?;

        rows.iter().map(movie_from_row).collect()
    }

    /// Point lookup by the natural key
    pub async fn get_movie(&self, imdb_id: &str) -> ApiResult<Movie> {
        let row = db::with_timeout(
            self.query_timeout,
            sqlx::query("SELECT * FROM movies WHERE imdb_id = ?1")
                .bind(imdb_id)
                .fetch_optional(&self.db),
        )
        .await?
        .ok_or_else(|| ApiError::NotFound("movie not found".to_string()))?;

        movie_from_row(&row)
    }

    /// Insert a movie; a duplicate IMDB id surfaces as Conflict
    pub async fn add_movie(&self, movie: NewMovie) -> ApiResult<Movie> {
        let genres = serde_json::to_string(&movie.genres)
            .map_err(|e| ApiError::Internal(format!("failed to encode genres: {}", e)))?;

        db::with_timeout(
            self.query_timeout,
            sqlx::query(
                "INSERT INTO movies (imdb_id, title, genres, admin_review) VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(&movie.imdb_id)
            .bind(&movie.title)
            .bind(&genres)
            .bind(&movie.admin_review)
            .execute(&self.db),
        )
        .await
        .map_err(|e| match e {
            ApiError::Database(ref err)
                if err
                    .as_database_error()
                    .map(|d| d.is_unique_violation())
                    .unwrap_or(false) =>
            {
                ApiError::Conflict("a movie with this imdb_id already exists".to_string())
            }
            other => other,
        })?;

        Ok(Movie {
            imdb_id: movie.imdb_id,
            title: movie.title,
            genres: movie.genres,
            admin_review: movie.admin_review,
            ranking: None,
        })
    }

    /// Movies whose genre list intersects the given set, ascending by
    /// ranking value, capped at the configured limit.
    pub async fn recommended_movies(&self, genres: &[String]) -> ApiResult<Vec<Movie>> {
        let wanted = serde_json::to_string(genres)
            .map_err(|e| ApiError::Internal(format!("failed to encode genres: {}", e)))?;

        let rows = db::with_timeout(
            self.query_timeout,
            sqlx::query(
                "SELECT * FROM movies
                 WHERE EXISTS (
                     SELECT 1 FROM json_each(movies.genres)
                     WHERE json_each.value IN (SELECT value FROM json_each(?1))
                 )
                 ORDER BY ranking_value ASC
                 LIMIT ?2",
            )
            .bind(&wanted)
            .bind(self.recommendation_limit)
            .fetch_all(&self.db),
        )
        .await?;

        rows.iter().map(movie_from_row).collect()
    }

    /// Store an admin review and its computed ranking on one movie.
    /// Matching zero rows means the movie does not exist.
    pub async fn apply_review(
        &self,
        imdb_id: &str,
        admin_review: &str,
        ranking: &Ranking,
    ) -> ApiResult<()> {
        let result = db::with_timeout(
            self.query_timeout,
            sqlx::query(
                "UPDATE movies SET admin_review = ?1, ranking_name = ?2, ranking_value = ?3
                 WHERE imdb_id = ?4",
            )
            .bind(admin_review)
            .bind(&ranking.ranking_name)
            .bind(ranking.ranking_value)
            .bind(imdb_id)
            .execute(&self.db),
        )
        .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("movie not found".to_string()));
        }

        Ok(())
    }
}

fn movie_from_row(row: &SqliteRow) -> ApiResult<Movie> {
    let raw_genres: String = row.get("genres");
    let genres = serde_json::from_str(&raw_genres)
        .map_err(|e| ApiError::Internal(format!("corrupt genres: {}", e)))?;

    let ranking_name: Option<String> = row.get("ranking_name");
    let ranking_value: Option<i64> = row.get("ranking_value");
    let ranking = match (ranking_name, ranking_value) {
        (Some(ranking_name), Some(ranking_value)) => Some(Ranking {
            ranking_name,
            ranking_value,
        }),
        _ => None,
    };

    Ok(Movie {
        imdb_id: row.get("imdb_id"),
        title: row.get("title"),
        genres,
        admin_review: row.get("admin_review"),
        ranking,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_manager(limit: i64) -> CatalogManager {
        CatalogManager::new(db::test_pool().await, Duration::from_secs(5), limit)
    }

    fn new_movie(imdb_id: &str, title: &str, genres: &[&str]) -> NewMovie {
        NewMovie {
            imdb_id: imdb_id.to_string(),
            title: title.to_string(),
            genres: genres.iter().map(|g| g.to_string()).collect(),
            admin_review: None,
        }
    }

    #[tokio::test]
    async fn add_and_get_round_trip() {
        let manager = test_manager(5).await;
        manager
            .add_movie(new_movie("tt0111161", "The Shawshank Redemption", &["Drama"]))
            .await
            .expect("add");

        let movie = manager.get_movie("tt0111161").await.expect("get");
        assert_eq!(movie.title, "The Shawshank Redemption");
        assert_eq!(movie.genres, vec!["Drama"]);
        assert!(movie.ranking.is_none());

        assert!(matches!(
            manager.get_movie("tt0000000").await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_imdb_id_is_conflict() {
        let manager = test_manager(5).await;
        manager
            .add_movie(new_movie("tt0068646", "The Godfather", &["Crime"]))
            .await
            .expect("add");

        let result = manager
            .add_movie(new_movie("tt0068646", "The Godfather", &["Crime"]))
            .await;
        assert!(matches!(result, Err(ApiError::Conflict(_))));
    }

    #[tokio::test]
    async fn recommendations_filter_sort_and_cap() {
        let manager = test_manager(2).await;

        for (id, title, genres, rank) in [
            ("tt1", "Alpha", vec!["Action"], Some(3)),
            ("tt2", "Beta", vec!["Comedy", "Romance"], Some(1)),
            ("tt3", "Gamma", vec!["Horror"], Some(1)),
            ("tt4", "Delta", vec!["Action", "Sci-Fi"], Some(2)),
            ("tt5", "Epsilon", vec!["Documentary"], None),
        ] {
            manager
                .add_movie(NewMovie {
                    imdb_id: id.to_string(),
                    title: title.to_string(),
                    genres: genres.into_iter().map(String::from).collect(),
                    admin_review: None,
                })
                .await
                .expect("add");
            if let Some(value) = rank {
                manager
                    .apply_review(
                        id,
                        "seeded",
                        &Ranking {
                            ranking_name: "Seeded".to_string(),
                            ranking_value: value,
                        },
                    )
                    .await
                    .expect("rank");
            }
        }

        let favorites = vec!["Action".to_string(), "Comedy".to_string()];
        let recommended = manager
            .recommended_movies(&favorites)
            .await
            .expect("recommend");

        // Horror and Documentary never match; the rest sort ascending by
        // ranking value and the limit keeps the best two
        let ids: Vec<&str> = recommended.iter().map(|m| m.imdb_id.as_str()).collect();
        assert_eq!(ids, vec!["tt2", "tt4"]);
    }

    #[tokio::test]
    async fn no_matching_genres_is_empty() {
        let manager = test_manager(5).await;
        manager
            .add_movie(new_movie("tt1", "Alpha", &["Action"]))
            .await
            .expect("add");

        let recommended = manager
            .recommended_movies(&["Musical".to_string()])
            .await
            .expect("recommend");
        assert!(recommended.is_empty());

        let recommended = manager.recommended_movies(&[]).await.expect("recommend");
        assert!(recommended.is_empty());
    }

    #[tokio::test]
    async fn review_update_on_missing_movie_is_not_found() {
        let manager = test_manager(5).await;
        manager
            .add_movie(new_movie("tt1", "Alpha", &["Action"]))
            .await
            .expect("add");

        let ranking = Ranking {
            ranking_name: "Positive".to_string(),
            ranking_value: 1,
        };
        let result = manager.apply_review("tt-missing", "great", &ranking).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));

        // The existing movie was not touched
        let untouched = manager.get_movie("tt1").await.expect("get");
        assert!(untouched.admin_review.is_none());
        assert!(untouched.ranking.is_none());
    }

    #[tokio::test]
    async fn review_update_sets_review_and_ranking() {
        let manager = test_manager(5).await;
        manager
            .add_movie(new_movie("tt1", "Alpha", &["Action"]))
            .await
            .expect("add");

        let ranking = Ranking {
            ranking_name: "Positive".to_string(),
            ranking_value: 1,
        };
        manager
            .apply_review("tt1", "a triumph", &ranking)
            .await
            .expect("update");

        let movie = manager.get_movie("tt1").await.expect("get");
        assert_eq!(movie.admin_review.as_deref(), Some("a triumph"));
        assert_eq!(movie.ranking, Some(ranking));
    }
}
