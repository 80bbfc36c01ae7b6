use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use rusqlite::{params, OptionalExtension};

use crate::db::models::{User, UserRead};
use crate::error::AppError;
use crate::state::AppState;

/// The authenticated, active user behind a request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    /// Session token the request authenticated with.
    pub token: String,
}

impl CurrentUser {
    pub fn id(&self) -> &str {
        &self.user.id
    }

    pub fn read(&self) -> UserRead {
        UserRead::from(&self.user)
    }
}

/// Extractor that requires authentication.
/// Accepts `Authorization: Bearer <token>` or the session cookie.
/// Returns 401 if no valid session is found or the account is inactive.
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .or_else(|| cookie_value(parts, &state.config.auth.cookie_name))
            .ok_or(AppError::Unauthorized)?
            .to_string();

        let conn = state.db.get()?;
        let user = conn
            .query_row(
                "SELECT u.id, u.email, u.password_hash, u.is_active, u.is_superuser, \
                        u.is_verified, u.created_at \
                 FROM sessions s JOIN users u ON u.id = s.user_id \
                 WHERE s.token = ?1 AND s.expires_at > datetime('now')",
                params![token],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        password_hash: row.get(2)?,
                        is_active: row.get(3)?,
                        is_superuser: row.get(4)?,
                        is_verified: row.get(5)?,
                        created_at: row.get(6)?,
                    })
                },
            )
            .optional()?
            .ok_or(AppError::Unauthorized)?;

        if !user.is_active {
            tracing::debug!(user_id = %user.id, "Rejected session of inactive user");
            return Err(AppError::Unauthorized);
        }

        Ok(CurrentUser { user, token })
    }
}

/// Authenticated user that must also be a superuser; 403 otherwise.
pub struct SuperUser(pub CurrentUser);

impl FromRequestParts<AppState> for SuperUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let current = CurrentUser::from_request_parts(parts, state).await?;
        if !current.user.is_superuser {
            return Err(AppError::Forbidden("Forbidden".into()));
        }
        Ok(SuperUser(current))
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

fn cookie_value<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == name && !val.is_empty() {
                Some(val)
            } else {
                None
            }
        })
}
