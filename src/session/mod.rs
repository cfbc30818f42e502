use axum::{extract::FromRequestParts, http::request::Parts};
use diesel::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

use crate::shared::error::ApiError;
use crate::shared::models::schema::users;
use crate::shared::models::User;
use crate::shared::state::AppState;

/// Authenticated admin session, resolved per request from the bearer token.
/// Handlers receive it as a value; there is no ambient global session.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub email: String,
}

pub fn parse_bearer(header: &str) -> Option<&str> {
    let rest = header.strip_prefix("Bearer ")?;
    let rest = rest.trim();
    if rest.is_empty() {
        None
    } else {
        Some(rest)
    }
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("missing authorization header".to_string()))?;

        let bearer = parse_bearer(header)
            .ok_or_else(|| ApiError::Unauthorized("malformed authorization header".to_string()))?;

        let mut conn = state.conn.get().map_err(ApiError::db)?;

        let row: Option<User> = users::table
            .filter(users::token.eq(bearer))
            .filter(users::is_active.eq(true))
            .first(&mut conn)
            .optional()
            .map_err(ApiError::db)?;

        match row {
            Some(user) => Ok(Session {
                user_id: user.id,
                email: user.email,
            }),
            None => Err(ApiError::Unauthorized("invalid token".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_prefix_is_required() {
        assert_eq!(parse_bearer("Bearer abc123"), Some("abc123"));
        assert_eq!(parse_bearer("Basic abc123"), None);
        assert_eq!(parse_bearer("abc123"), None);
    }

    #[test]
    fn empty_token_is_rejected() {
        assert_eq!(parse_bearer("Bearer "), None);
        assert_eq!(parse_bearer("Bearer    "), None);
    }
}
