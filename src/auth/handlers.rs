use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::auth::password::{hash_password, normalize_email, validate_password, verify_password};
use crate::auth::session;
use crate::auth::tokens::{self, TokenPurpose};
use crate::db::models::UserRead;
use crate::db::users;
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::state::AppState;

// -- Request types --

/// OAuth2 password-flow form: `username` carries the email.
#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct VerifyRequest {
    pub token: String,
}

// -- Cookie helpers --

fn session_cookie(name: &str, token: &str, max_age_hours: u64) -> String {
    let max_age_secs = max_age_hours * 3600;
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        name, token, max_age_secs
    )
}

fn clear_session_cookie(name: &str) -> String {
    format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", name)
}

// -- Login / logout --

/// POST /auth/jwt/login — exchange email + password for a bearer token
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    let auth = &state.config.auth;
    let bad_credentials = || AppError::BadRequest("LOGIN_BAD_CREDENTIALS".into());

    let user = {
        let conn = state.db.get()?;
        users::find_by_email(&conn, &normalize_email(&form.username))?
    };

    let Some(user) = user else {
        // Spend the same hashing time as a real check
        hash_password(&form.password, auth.password_cost).await?;
        return Err(bad_credentials());
    };
    if !verify_password(&form.password, &user.password_hash).await? || !user.is_active {
        return Err(bad_credentials());
    }

    let conn = state.db.get()?;
    let token = session::create_session(&conn, &user.id, auth.session_hours)?;
    tracing::info!(user_id = %user.id, "User logged in");

    Ok((
        StatusCode::OK,
        [(
            header::SET_COOKIE,
            session_cookie(&auth.cookie_name, &token, auth.session_hours),
        )],
        Json(json!({ "access_token": token, "token_type": "bearer" })),
    )
        .into_response())
}

/// POST /auth/jwt/logout — revoke the session used for this request
pub async fn logout(State(state): State<AppState>, user: CurrentUser) -> AppResult<Response> {
    let conn = state.db.get()?;
    session::delete_session(&conn, &user.token)?;

    Ok((
        StatusCode::NO_CONTENT,
        [(
            header::SET_COOKIE,
            clear_session_cookie(&state.config.auth.cookie_name),
        )],
    )
        .into_response())
}

// -- Registration --

/// POST /auth/register — create an account; privilege flags cannot be set here
pub async fn register(
    State(state): State<AppState>,
    Json(mut req): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<UserRead>)> {
    req.email = normalize_email(&req.email);
    req.validate().map_err(|e| AppError::Invalid {
        code: "REGISTER_INVALID_EMAIL",
        reason: e.to_string(),
    })?;

    validate_password(&req.password, &req.email).map_err(|reason| AppError::Invalid {
        code: "REGISTER_INVALID_PASSWORD",
        reason,
    })?;

    {
        let conn = state.db.get()?;
        if users::find_by_email(&conn, &req.email)?.is_some() {
            return Err(AppError::BadRequest("REGISTER_USER_ALREADY_EXISTS".into()));
        }
    }

    let hash = hash_password(&req.password, state.config.auth.password_cost).await?;
    let conn = state.db.get()?;
    let user = users::insert(&conn, &req.email, &hash)?;
    state.notifier.registered(&user);

    Ok((StatusCode::CREATED, Json(UserRead::from(&user))))
}

// -- Password reset --

/// POST /auth/forgot-password — always 202 so addresses cannot be enumerated
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> AppResult<StatusCode> {
    let conn = state.db.get()?;
    if let Some(user) = users::find_by_email(&conn, &normalize_email(&req.email))? {
        if user.is_active {
            let token = tokens::issue(
                &conn,
                &user.id,
                TokenPurpose::ResetPassword,
                state.config.auth.reset_token_minutes,
            )?;
            state.notifier.reset_password_requested(&user, &token);
        }
    }

    Ok(StatusCode::ACCEPTED)
}

/// POST /auth/reset-password — redeem a reset token for a new password
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> AppResult<StatusCode> {
    let bad_token = || AppError::BadRequest("RESET_PASSWORD_BAD_TOKEN".into());

    let mut user = {
        let conn = state.db.get()?;
        let user_id = tokens::lookup(&conn, &req.token, TokenPurpose::ResetPassword)?
            .ok_or_else(bad_token)?;
        users::find_by_id(&conn, &user_id)?.ok_or_else(bad_token)?
    };
    if !user.is_active {
        return Err(bad_token());
    }

    validate_password(&req.password, &user.email).map_err(|reason| AppError::Invalid {
        code: "RESET_PASSWORD_INVALID_PASSWORD",
        reason,
    })?;

    user.password_hash = hash_password(&req.password, state.config.auth.password_cost).await?;

    // New hash, spent token and dropped sessions land together or not at all
    let conn = state.db.get()?;
    let tx = conn.unchecked_transaction()?;
    if tokens::lookup(&tx, &req.token, TokenPurpose::ResetPassword)?.as_deref()
        != Some(user.id.as_str())
    {
        return Err(bad_token());
    }
    users::save(&tx, &user)?;
    tokens::revoke(&tx, &req.token)?;
    let dropped = session::delete_user_sessions(&tx, &user.id)?;
    tx.commit()?;
    tracing::info!(user_id = %user.id, dropped, "Password reset");

    Ok(StatusCode::OK)
}

// -- Email verification --

/// POST /auth/request-verify-token — always 202
pub async fn request_verify_token(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> AppResult<StatusCode> {
    let conn = state.db.get()?;
    if let Some(user) = users::find_by_email(&conn, &normalize_email(&req.email))? {
        if user.is_active && !user.is_verified {
            let token = tokens::issue(
                &conn,
                &user.id,
                TokenPurpose::Verify,
                state.config.auth.verify_token_minutes,
            )?;
            state.notifier.verification_requested(&user, &token);
        }
    }

    Ok(StatusCode::ACCEPTED)
}

/// POST /auth/verify — redeem a verification token
pub async fn verify(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> AppResult<Json<UserRead>> {
    let bad_token = || AppError::BadRequest("VERIFY_USER_BAD_TOKEN".into());

    let conn = state.db.get()?;
    let user_id = tokens::lookup(&conn, &req.token, TokenPurpose::Verify)?
        .ok_or_else(bad_token)?;
    let mut user = users::find_by_id(&conn, &user_id)?.ok_or_else(bad_token)?;

    if user.is_verified {
        tokens::revoke(&conn, &req.token)?;
        return Err(AppError::BadRequest("VERIFY_USER_ALREADY_VERIFIED".into()));
    }

    user.is_verified = true;
    let tx = conn.unchecked_transaction()?;
    users::save(&tx, &user)?;
    tokens::revoke(&tx, &req.token)?;
    tx.commit()?;
    tracing::info!(user_id = %user.id, "User verified");

    Ok(Json(UserRead::from(&user)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_sets_max_age_in_seconds() {
        let cookie = session_cookie("snapfeed_session", "abc", 2);
        assert!(cookie.starts_with("snapfeed_session=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.ends_with("Max-Age=7200"));
    }

    #[test]
    fn register_rejects_malformed_addresses() {
        let malformed = [
            "a@b..com",
            "a@-.io",
            "a,b@c.io",
            "a@b.c(d",
            "<x>@y.io",
            "a@b.io\0",
            "not-an-email",
            "@example.com",
        ];
        for email in malformed {
            let req = RegisterRequest {
                email: normalize_email(email),
                password: "s3cret-pass".into(),
            };
            assert!(req.validate().is_err(), "{:?} should be rejected", email);
        }
    }

    #[test]
    fn register_accepts_ordinary_addresses() {
        for email in ["alice@example.com", " Bob.Smith+feed@Mail.Example.org "] {
            let req = RegisterRequest {
                email: normalize_email(email),
                password: "s3cret-pass".into(),
            };
            assert!(req.validate().is_ok(), "{:?} should be accepted", email);
        }
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let cookie = clear_session_cookie("snapfeed_session");
        assert!(cookie.starts_with("snapfeed_session=;"));
        assert!(cookie.ends_with("Max-Age=0"));
    }
}
