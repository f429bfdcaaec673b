/// Registration and login endpoints
use crate::{
    context::AppContext,
    error::ApiResult,
    users::{LoginRequest, LoginResponse, RegisterRequest, User},
};
use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use validator::Validate;

/// Build user routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// Create user endpoint
async fn register(
    State(ctx): State<AppContext>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    req.validate()?;

    let user = ctx.users.register(req).await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// Login endpoint: verifies credentials and returns the profile with a
/// fresh token pair
async fn login(
    State(ctx): State<AppContext>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    req.validate()?;

    let response = ctx.users.login(req).await?;

    Ok(Json(response))
}
