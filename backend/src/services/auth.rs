//! Authentication service for staff registration, login, and token management

use std::sync::Arc;

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shared::{check_name, check_password, normalize_email, normalize_required, User, UserRole};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::config::JwtConfig;
use crate::error::{AppError, AppResult};

const USER_COLUMNS: &str =
    "id, name, email, password_hash, role, is_active, last_login_at, created_at, updated_at";

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    keys: Arc<TokenKeys>,
}

/// Input for registering a staff account
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(custom = "check_name")]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(custom = "check_password")]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

/// Authentication tokens
#[derive(Debug, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Returned by register, login and refresh
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    #[serde(flatten)]
    pub tokens: AuthTokens,
}

/// User row including the password hash
#[derive(Debug, sqlx::FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    fn role(&self) -> AppResult<UserRole> {
        self.role
            .parse()
            .map_err(|e: String| AppError::Internal(format!("Corrupt user row {}: {}", self.id, e)))
    }

    pub fn into_user(self) -> AppResult<User> {
        let role = self.role()?;
        Ok(User {
            id: self.id,
            name: self.name,
            email: self.email,
            role,
            is_active: self.is_active,
            last_login_at: self.last_login_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Signing and verification keys for access tokens, built once at startup
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_token_expiry: i64,
    refresh_token_expiry: i64,
}

impl TokenKeys {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            access_token_expiry: config.access_token_expiry,
            refresh_token_expiry: config.refresh_token_expiry,
        }
    }

    pub fn access_token_expiry(&self) -> i64 {
        self.access_token_expiry
    }

    pub fn refresh_token_expiry(&self) -> i64 {
        self.refresh_token_expiry
    }

    /// Issue an HS256 access token for a user
    pub fn issue_access_token(&self, user_id: Uuid, role: UserRole) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            role: role.as_str().to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.access_token_expiry)).timestamp(),
        };
        self.encode_claims(&claims)
    }

    pub fn encode_claims(&self, claims: &Claims) -> AppResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }

    /// Validate signature and expiry, returning the claims
    pub fn decode_access_token(&self, token: &str) -> AppResult<Claims> {
        decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Rejected access token: {}", e);
                AppError::InvalidToken
            })
    }
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(db: PgPool, keys: Arc<TokenKeys>) -> Self {
        Self { db, keys }
    }

    /// Register a staff account. The very first account becomes the admin.
    pub async fn register(&self, input: RegisterInput) -> AppResult<AuthResponse> {
        let input = RegisterInput {
            name: normalize_required(&input.name),
            email: normalize_email(&input.email),
            password: input.password,
        };
        input.validate()?;

        let password_hash = hash_password(input.password.clone()).await?;

        let mut tx = self.db.begin().await?;

        // Serializes concurrent registrations so only one can be "first"
        sqlx::query("LOCK TABLE users IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;

        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)",
        )
        .bind(&input.email)
        .fetch_one(&mut *tx)
        .await?;

        if taken {
            return Err(AppError::DuplicateEntry("email".to_string()));
        }

        let has_users = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users)")
            .fetch_one(&mut *tx)
            .await?;
        let role = if has_users {
            UserRole::Cashier
        } else {
            UserRole::Admin
        };

        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&input.name)
        .bind(&input.email)
        .bind(&password_hash)
        .bind(role.as_str())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(user_id = %row.id, role = %role, "Registered user");

        let user = row.into_user()?;
        let tokens = self.issue_tokens(user.id, user.role).await?;
        Ok(AuthResponse { user, tokens })
    }

    /// Authenticate user with email and password
    pub async fn login(&self, input: LoginInput) -> AppResult<AuthResponse> {
        let email = normalize_email(&input.email);

        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(&email)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

        if !verify_password(input.password, row.password_hash.clone()).await? {
            return Err(AppError::InvalidCredentials);
        }

        // Checked after the password so a disabled account is not revealed to guessers
        if !row.is_active {
            return Err(AppError::Unauthorized("Account is disabled".to_string()));
        }

        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET last_login_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(row.id)
        .fetch_one(&self.db)
        .await?;

        let user = row.into_user()?;
        let tokens = self.issue_tokens(user.id, user.role).await?;
        Ok(AuthResponse { user, tokens })
    }

    /// Exchange a refresh token for a new token pair. Refresh tokens are single use.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<AuthResponse> {
        let token_hash = hash_token(refresh_token);

        let user_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = NOW()
            WHERE token_hash = $1
              AND revoked_at IS NULL
              AND expires_at > NOW()
            RETURNING user_id
            "#,
        )
        .bind(&token_hash)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired refresh token".to_string()))?;

        let user = self.get_user(user_id).await?;
        if !user.is_active {
            return Err(AppError::Unauthorized("Account is disabled".to_string()));
        }

        let tokens = self.issue_tokens(user.id, user.role).await?;
        Ok(AuthResponse { user, tokens })
    }

    /// Fetch a user by id
    pub async fn get_user(&self, user_id: Uuid) -> AppResult<User> {
        sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))?
            .into_user()
    }

    /// Generate access and refresh tokens and persist the refresh token hash
    async fn issue_tokens(&self, user_id: Uuid, role: UserRole) -> AppResult<AuthTokens> {
        let access_token = self.keys.issue_access_token(user_id, role)?;
        let refresh_token = Uuid::new_v4().to_string();

        self.store_refresh_token(user_id, &refresh_token).await?;

        Ok(AuthTokens {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.keys.access_token_expiry(),
        })
    }

    /// Store refresh token in database
    async fn store_refresh_token(&self, user_id: Uuid, token: &str) -> AppResult<()> {
        let expires_at = Utc::now() + Duration::seconds(self.keys.refresh_token_expiry());

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user_id)
        .bind(hash_token(token))
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }
}

/// SHA-256 hex digest of a refresh token, as stored
pub fn hash_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

/// bcrypt hash on the blocking pool
pub async fn hash_password(password: String) -> AppResult<String> {
    tokio::task::spawn_blocking(move || hash(password, DEFAULT_COST))
        .await
        .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// bcrypt verify on the blocking pool
pub async fn verify_password(password: String, password_hash: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || verify(password, &password_hash))
        .await
        .map_err(|e| AppError::Internal(format!("Password verification task failed: {}", e)))?
        .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(secret: &str) -> TokenKeys {
        TokenKeys::new(&JwtConfig {
            secret: secret.to_string(),
            access_token_expiry: 3600,
            refresh_token_expiry: 604800,
        })
    }

    #[test]
    fn test_hash_token_is_sha256_hex() {
        let digest = hash_token("abc");
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(hash_token("abc"), hash_token("abc"));
        assert_ne!(hash_token("abc"), hash_token("abd"));
    }

    #[test]
    fn test_access_token_carries_role() {
        let keys = keys("secret");
        let user_id = Uuid::new_v4();
        let token = keys.issue_access_token(user_id, UserRole::Manager).unwrap();

        let claims = keys.decode_access_token(&token).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.role, "manager");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(matches!(
            keys("secret").decode_access_token("not-a-jwt"),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_register_input_validation() {
        let input = RegisterInput {
            name: "Ann".to_string(),
            email: "ann@example.com".to_string(),
            password: "short".to_string(),
        };
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password"));

        let input = RegisterInput {
            name: "Ann".to_string(),
            email: "not-an-email".to_string(),
            password: "long enough".to_string(),
        };
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
    }
}
