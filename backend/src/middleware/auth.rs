//! Authentication middleware
//!
//! JWT authentication and role-based access control

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use shared::UserRole;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    AppState,
};

/// Authenticated user information extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl AuthUser {
    /// Admins and managers may delete records and read reports
    pub fn can_manage(&self) -> bool {
        self.role.can_manage()
    }
}

/// Authentication middleware that validates the bearer token and stores the
/// caller in the request extensions
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let bearer = request
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(|| AppError::Unauthorized("Missing or invalid Authorization header".into()))?;

    let claims = state.keys.decode_access_token(bearer.token())?;

    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken)?;
    let role = claims
        .role
        .parse::<UserRole>()
        .map_err(|_| AppError::InvalidToken)?;

    request.extensions_mut().insert(AuthUser { user_id, role });

    Ok(next.run(request).await)
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))
    }
}

/// Role guard for destructive and reporting operations
pub fn require_manager(user: &AuthUser) -> AppResult<()> {
    if user.can_manage() {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}
