/// User manager implementation using runtime queries
use crate::{
    db,
    error::{ApiError, ApiResult},
    tokens::TokenService,
    users::{LoginRequest, LoginResponse, RegisterRequest, User},
};
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const DEFAULT_ROLE: &str = "USER";

/// User account service
pub struct UserManager {
    db: SqlitePool,
    tokens: Arc<TokenService>,
    query_timeout: Duration,
}

impl UserManager {
    pub fn new(db: SqlitePool, tokens: Arc<TokenService>, query_timeout: Duration) -> Self {
        Self {
            db,
            tokens,
            query_timeout,
        }
    }

    /// Create a new user. Email uniqueness is enforced by the store's
    /// UNIQUE constraint; a violation surfaces as Conflict.
    pub async fn register(&self, req: RegisterRequest) -> ApiResult<User> {
        let password_hash = bcrypt::hash(&req.password, bcrypt::DEFAULT_COST)
            .map_err(|e| ApiError::Internal(format!("password hashing failed: {}", e)))?;

        let now = Utc::now();
        let user = User {
            user_id: Uuid::new_v4().to_string(),
            email: req.email,
            first_name: req.first_name,
            last_name: req.last_name,
            password: password_hash,
            role: req.role.unwrap_or_else(|| DEFAULT_ROLE.to_string()),
            favorite_genres: req.favorite_genres,
            token: None,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };

        let genres = serde_json::to_string(&user.favorite_genres)
            .map_err(|e| ApiError::Internal(format!("failed to encode genres: {}", e)))?;

        db::with_timeout(
            self.query_timeout,
            sqlx::query(
                "INSERT INTO users (user_id, email, first_name, last_name, password, role, favorite_genres, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )
            .bind(&user.user_id)
            .bind(&user.email)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.password)
            .bind(&user.role)
            .bind(&genres)
            .bind(user.created_at)
            .bind(user.updated_at)
            .execute(&self.db),
        )
        .await
        .map_err(|e| match e {
            ApiError::Database(ref err) if is_unique_violation(err) => {
                ApiError::Conflict("a user with this email already exists".to_string())
            }
            other => other,
        })?;

        tracing::info!(user_id = %user.user_id, "user created");
        Ok(user)
    }

    /// Verify credentials, then issue and persist a fresh token pair.
    /// Unknown email and wrong password produce the same error so the
    /// response never reveals which one failed.
    pub async fn login(&self, req: LoginRequest) -> ApiResult<LoginResponse> {
        let user = self
            .find_by_email(&req.email)
            .await?
            .ok_or_else(invalid_credentials)?;

        let valid = bcrypt::verify(&req.password, &user.password)
            .map_err(|e| ApiError::Internal(format!("password verification failed: {}", e)))?;
        if !valid {
            return Err(invalid_credentials());
        }

        let pair = self.tokens.issue_pair(&user)?;
        self.tokens.persist_pair(&user.user_id, &pair).await?;

        Ok(LoginResponse {
            user_id: user.user_id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            role: user.role,
            token: pair.access_token,
            refresh_token: pair.refresh_token,
            favorite_genres: user.favorite_genres,
        })
    }

    /// A user's stored favorite genres; empty when the user is unknown
    /// or has none recorded.
    pub async fn favorite_genres(&self, user_id: &str) -> ApiResult<Vec<String>> {
        let row = db::with_timeout(
            self.query_timeout,
            sqlx::query("SELECT favorite_genres FROM users WHERE user_id = ?1")
                .bind(user_id)
                .fetch_optional(&self.db),
        )
        .await?;

        let Some(row) = row else {
            tracing::info!(user_id, "no favorite genres found for user");
            return Ok(Vec::new());
        };

        let raw: String = row.get("favorite_genres");
        serde_json::from_str(&raw)
            .map_err(|e| ApiError::Internal(format!("corrupt favorite_genres: {}", e)))
    }

    async fn find_by_email(&self, email: &str) -> ApiResult<Option<User>> {
        let row = db::with_timeout(
            self.query_timeout,
            sqlx::query("SELECT * FROM users WHERE email = ?1")
                .bind(email)
                .fetch_optional(&self.db),
        )
        .await?;

        row.map(|r| user_from_row(&r)).transpose()
    }
}

fn user_from_row(row: &SqliteRow) -> ApiResult<User> {
    let raw_genres: String = row.get("favorite_genres");
    let favorite_genres = serde_json::from_str(&raw_genres)
        .map_err(|e| ApiError::Internal(format!("corrupt favorite_genres: {}", e)))?;

    Ok(User {
        user_id: row.get("user_id"),
        email: row.get("email"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        password: row.get("password"),
        role: row.get("role"),
        favorite_genres,
        token: row.get("token"),
        refresh_token: row.get("refresh_token"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|e| e.is_unique_violation())
        .unwrap_or(false)
}

fn invalid_credentials() -> ApiError {
    ApiError::Authentication("invalid email or password".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;

    fn test_auth() -> AuthConfig {
        AuthConfig {
            access_secret: "test-access-secret-test-access-secret".to_string(),
            refresh_secret: "test-refresh-secret-test-refresh-secret".to_string(),
            issuer: "reelbase".to_string(),
            refresh_ttl_days: 7,
        }
    }

    async fn test_manager() -> UserManager {
        let pool = db::test_pool().await;
        let tokens = Arc::new(TokenService::new(
            pool.clone(),
            test_auth(),
            Duration::from_secs(5),
        ));
        UserManager::new(pool, tokens, Duration::from_secs(5))
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: "secret123".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            role: Some("ADMIN".to_string()),
            favorite_genres: vec!["Action".to_string(), "Comedy".to_string()],
        }
    }

    #[tokio::test]
    async fn register_stores_hash_not_plaintext() {
        let manager = test_manager().await;
        let user = manager
            .register(register_request("a@b.com"))
            .await
            .expect("register");

        assert_ne!(user.password, "secret123");
        assert!(bcrypt::verify("secret123", &user.password).expect("verify"));
        assert!(!bcrypt::verify("wrong-password", &user.password).expect("verify"));
    }

    #[tokio::test]
    async fn duplicate_email_is_conflict() {
        let manager = test_manager().await;
        manager
            .register(register_request("a@b.com"))
            .await
            .expect("first register");

        let result = manager.register(register_request("a@b.com")).await;
        assert!(matches!(result, Err(ApiError::Conflict(_))));
    }

    #[tokio::test]
    async fn login_issues_decodable_pair() {
        let manager = test_manager().await;
        let user = manager
            .register(register_request("a@b.com"))
            .await
            .expect("register");

        let response = manager
            .login(LoginRequest {
                email: "a@b.com".to_string(),
                password: "secret123".to_string(),
            })
            .await
            .expect("login");

        let claims = manager.tokens.validate(&response.token).expect("claims");
        assert_eq!(claims.sub, user.user_id);
        assert_eq!(claims.role, "ADMIN");
        assert!(!response.refresh_token.is_empty());
        assert_eq!(response.favorite_genres, vec!["Action", "Comedy"]);

        // The issued pair was persisted on the user row
        let stored = manager
            .find_by_email("a@b.com")
            .await
            .expect("lookup")
            .expect("user");
        assert_eq!(stored.token.as_deref(), Some(response.token.as_str()));
    }

    #[tokio::test]
    async fn login_failures_are_uniform() {
        let manager = test_manager().await;
        manager
            .register(register_request("a@b.com"))
            .await
            .expect("register");

        let unknown = manager
            .login(LoginRequest {
                email: "nobody@b.com".to_string(),
                password: "secret123".to_string(),
            })
            .await;
        let wrong = manager
            .login(LoginRequest {
                email: "a@b.com".to_string(),
                password: "not-the-password".to_string(),
            })
            .await;

        let unknown_msg = match unknown {
            Err(ApiError::Authentication(msg)) => msg,
            other => panic!("expected auth error, got {:?}", other.map(|_| ())),
        };
        let wrong_msg = match wrong {
            Err(ApiError::Authentication(msg)) => msg,
            other => panic!("expected auth error, got {:?}", other.map(|_| ())),
        };
        assert_eq!(unknown_msg, wrong_msg);
    }
}
