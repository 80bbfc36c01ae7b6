use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use validator::Validate;

use crate::auth::password::{hash_password, normalize_email, validate_password};
use crate::db::models::{User, UserRead};
use crate::db::users;
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, SuperUser};
use crate::state::AppState;

/// Partial update. Flag fields only take effect for superusers.
#[derive(Debug, Deserialize, Default, Validate)]
pub struct UserUpdate {
    #[validate(email)]
    pub email: Option<String>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
    pub is_superuser: Option<bool>,
    pub is_verified: Option<bool>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/me", get(me).patch(update_me))
        .route(
            "/users/{id}",
            get(get_user).patch(update_user).delete(delete_user),
        )
}

async fn me(user: CurrentUser) -> Json<UserRead> {
    Json(user.read())
}

async fn update_me(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(update): Json<UserUpdate>,
) -> AppResult<Json<UserRead>> {
    let user = apply_update(&state, current.user, update, false).await?;
    Ok(Json(UserRead::from(&user)))
}

async fn get_user(
    State(state): State<AppState>,
    _admin: SuperUser,
    Path(id): Path<String>,
) -> AppResult<Json<UserRead>> {
    let conn = state.db.get()?;
    let user = users::find_by_id(&conn, &id)?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    Ok(Json(UserRead::from(&user)))
}

async fn update_user(
    State(state): State<AppState>,
    _admin: SuperUser,
    Path(id): Path<String>,
    Json(update): Json<UserUpdate>,
) -> AppResult<Json<UserRead>> {
    let target = {
        let conn = state.db.get()?;
        users::find_by_id(&conn, &id)?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?
    };
    let user = apply_update(&state, target, update, true).await?;
    Ok(Json(UserRead::from(&user)))
}

async fn delete_user(
    State(state): State<AppState>,
    SuperUser(admin): SuperUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let conn = state.db.get()?;
    if !users::delete(&conn, &id)? {
        return Err(AppError::NotFound("User not found".into()));
    }
    tracing::info!(user_id = %id, by = %admin.id(), "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn apply_update(
    state: &AppState,
    mut user: User,
    mut update: UserUpdate,
    privileged: bool,
) -> AppResult<User> {
    update.email = update.email.as_deref().map(normalize_email);
    update.validate().map_err(|e| AppError::Invalid {
        code: "UPDATE_USER_INVALID_EMAIL",
        reason: e.to_string(),
    })?;

    if let Some(email) = update.email {
        if email != user.email {
            let conn = state.db.get()?;
            if users::find_by_email(&conn, &email)?.is_some() {
                return Err(AppError::BadRequest(
                    "UPDATE_USER_EMAIL_ALREADY_EXISTS".into(),
                ));
            }
            user.email = email;
            user.is_verified = false;
        }
    }

    if let Some(password) = update.password {
        validate_password(&password, &user.email).map_err(|reason| AppError::Invalid {
            code: "UPDATE_USER_INVALID_PASSWORD",
            reason,
        })?;
        user.password_hash = hash_password(&password, state.config.auth.password_cost).await?;
    }

    if privileged {
        if let Some(active) = update.is_active {
            user.is_active = active;
        }
        if let Some(superuser) = update.is_superuser {
            user.is_superuser = superuser;
        }
        if let Some(verified) = update.is_verified {
            user.is_verified = verified;
        }
    }

    let conn = state.db.get()?;
    users::save(&conn, &user)?;
    Ok(user)
}
