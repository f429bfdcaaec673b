/// Movie catalog endpoints
use crate::{
    auth::AuthContext,
    catalog::{Movie, NewMovie, Ranking, UpdateReviewRequest, UpdateReviewResponse},
    context::AppContext,
    error::ApiResult,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use validator::Validate;

/// Build movie routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/movies", get(list_movies))
        .route("/movie/:imdb_id", get(get_movie))
        .route("/addmovie", post(add_movie))
        .route("/recommendedmovies", get(recommended_movies))
        .route("/updatereview/:imdb_id", patch(update_review))
}

/// List all movies (public)
async fn list_movies(State(ctx): State<AppContext>) -> ApiResult<Json<Vec<Movie>>> {
    Ok(Json(ctx.catalog.list_movies().await?))
}

/// Fetch one movie by IMDB id
async fn get_movie(
    _auth: AuthContext,
    State(ctx): State<AppContext>,
    Path(imdb_id): Path<String>,
) -> ApiResult<Json<Movie>> {
    Ok(Json(ctx.catalog.get_movie(&imdb_id).await?))
}

/// Insert a movie
async fn add_movie(
    _auth: AuthContext,
    State(ctx): State<AppContext>,
    Json(movie): Json<NewMovie>,
) -> ApiResult<(StatusCode, Json<Movie>)> {
    movie.validate()?;

    let created = ctx.catalog.add_movie(movie).await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// Recommend movies matching the caller's favorite genres
async fn recommended_movies(
    auth: AuthContext,
    State(ctx): State<AppContext>,
) -> ApiResult<Json<Vec<Movie>>> {
    let genres = ctx.users.favorite_genres(&auth.user_id).await?;
    let movies = ctx.catalog.recommended_movies(&genres).await?;

    Ok(Json(movies))
}

/// Classify the submitted admin review and store it together with the
/// computed ranking
async fn update_review(
    State(ctx): State<AppContext>,
    Path(imdb_id): Path<String>,
    Json(req): Json<UpdateReviewRequest>,
) -> ApiResult<Json<UpdateReviewResponse>> {
    let classification = ctx.review.classify(&req.admin_review).await?;

    let ranking = Ranking {
        ranking_name: classification.label.clone(),
        ranking_value: classification.value,
    };
    ctx.catalog
        .apply_review(&imdb_id, &req.admin_review, &ranking)
        .await?;

    Ok(Json(UpdateReviewResponse {
        ranking_name: classification.label,
        admin_review: req.admin_review,
    }))
}
