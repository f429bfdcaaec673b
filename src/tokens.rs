/// Session token issuance, validation and persistence
use crate::{
    config::AuthConfig,
    db,
    error::{ApiError, ApiResult},
    users::User,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::time::Duration;

/// Access tokens are valid for 24 hours from issuance
pub const ACCESS_TOKEN_TTL_HOURS: i64 = 24;

/// Identity payload embedded in both session tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

/// A freshly issued access/refresh token pair
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Issues and validates signed session tokens and stores the latest
/// pair per user. Secrets are read-only after startup; an empty secret
/// is rejected by config validation before the service is constructed.
pub struct TokenService {
    db: SqlitePool,
    auth: AuthConfig,
    query_timeout: Duration,
}

impl TokenService {
    pub fn new(db: SqlitePool, auth: AuthConfig, query_timeout: Duration) -> Self {
        Self {
            db,
            auth,
            query_timeout,
        }
    }

    /// Issue an access/refresh token pair carrying the user's identity.
    /// Both are HS256-signed, each with its own secret.
    pub fn issue_pair(&self, user: &User) -> ApiResult<TokenPair> {
        let now = Utc::now();

        let access_claims = Claims {
            sub: user.user_id.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role.clone(),
            iss: self.auth.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + chrono::Duration::hours(ACCESS_TOKEN_TTL_HOURS)).timestamp(),
        };
        let access_token = sign(&access_claims, &self.auth.access_secret)?;

        let refresh_claims = Claims {
            exp: (now + chrono::Duration::days(self.auth.refresh_ttl_days)).timestamp(),
            ..access_claims
        };
        let refresh_token = sign(&refresh_claims, &self.auth.refresh_secret)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Overwrite the stored token pair for a user. Matching zero rows is
    /// not an error; a later login simply supersedes the previous pair.
    pub async fn persist_pair(&self, user_id: &str, pair: &TokenPair) -> ApiResult<()> {
        let result = db::with_timeout(
            self.query_timeout,
            sqlx::query(
                "UPDATE users SET token = ?1, refresh_token = ?2, updated_at = ?3 WHERE user_id = ?4",
            )
            .bind(&pair.access_token)
            .bind(&pair.refresh_token)
            .bind(Utc::now())
            .bind(user_id)
            .execute(&self.db),
        )
        .await?;

        if result.rows_affected() == 0 {
            tracing::warn!(user_id, "token update matched no user");
        }

        Ok(())
    }

    /// Parse and verify an access token, returning its claims.
    ///
    /// Rejects tokens signed with anything but HS256, tokens whose
    /// signature does not verify against the access secret, and tokens
    /// past their expiry.
    pub fn validate(&self, token: &str) -> ApiResult<Claims> {
        let decoding_key = DecodingKey::from_secret(self.auth.access_secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        // Allow some clock skew (5 minutes)
        validation.leeway = 300;

        let data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
            tracing::warn!("token verification failed: {}", e);
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    ApiError::Authentication("token has expired".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    ApiError::Authentication("invalid token signature".to_string())
                }
                _ => ApiError::Authentication(format!("invalid token: {}", e)),
            }
        })?;

        Ok(data.claims)
    }
}

fn sign(claims: &Claims, secret: &str) -> ApiResult<String> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("token signing failed: {}", e)))
}
