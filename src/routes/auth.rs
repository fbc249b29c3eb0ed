use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Json;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::{
    auth::{self, AuthUser},
    errors::AppError,
    models::users::{LoginPayload, NewUser, RegisterPayload, User, UserResponse},
    routes::success,
    schema::users,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register_handler))
        .route("/login", post(login_handler))
        .route("/me", get(me_handler))
}

#[instrument(skip(state, payload), err)]
pub async fn register_handler(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<impl IntoResponse, AppError> {
    // Validate and sanitize before touching the DB.
    let sanitized = payload.validate().map_err(AppError::Validation)?;

    let password_hash = auth::hash_password(sanitized.password).await?;

    let conn = state.pool.get().await?;
    let username = sanitized.username.clone();
    let email = sanitized.email.clone();
    let created = conn
        .interact(move |conn| {
            let new_user = NewUser {
                username,
                email,
                password_hash,
            };
            diesel::insert_into(users::table)
                .values(&new_user)
                .returning(User::as_select())
                .get_result::<User>(conn)
        })
        .await?;

    let user = match created {
        Ok(user) => user,
        Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, db_info)) => {
            let constraint = db_info.constraint_name().unwrap_or_default().to_string();
            warn!(constraint, "Registration hit unique constraint");
            if constraint.contains("email") {
                return Err(AppError::Conflict("Email is already registered".to_string()));
            }
            // Non-email unique constraint hit; still a 409, not a 500.
            return Err(AppError::Conflict(
                "A user with those credentials already exists".to_string(),
            ));
        }
        Err(e) => return Err(AppError::from(e)),
    };

    info!(user_id = %user.id, "User registration successful");
    Ok(success(
        StatusCode::CREATED,
        UserResponse::from(user),
        Some("User Successfully Registered!"),
    ))
}

#[instrument(skip(state, payload), err)]
pub async fn login_handler(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<impl IntoResponse, AppError> {
    let email = payload
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_lowercase);
    let password = payload.password.filter(|p| !p.is_empty());
    let (email, password) = match (email, password) {
        (Some(email), Some(password)) => (email, password),
        _ => {
            return Err(AppError::InvalidInput(
                "Email and password are required".to_string(),
            ));
        }
    };

    let conn = state.pool.get().await?;
    let lookup_email = email.clone();
    let user = conn
        .interact(move |conn| {
            users::table
                .filter(users::email.eq(lookup_email))
                .select(User::as_select())
                .first::<User>(conn)
                .optional()
                .map_err(AppError::from)
        })
        .await??
        .ok_or_else(|| AppError::NotFound(format!("User with email {email} not found")))?;

    if !auth::verify_password(password, user.password_hash.clone()).await? {
        return Err(AppError::Unauthorized("Invalid password".to_string()));
    }

    let secret = state
        .config
        .jwt_secret
        .as_deref()
        .ok_or_else(|| AppError::Config("JWT_SECRET is not configured".to_string()))?;
    let token = auth::issue_token(
        secret,
        user.id,
        &user.email,
        state.config.jwt_expires_in_hours,
    )?;

    info!(user_id = %user.id, "User logged in");
    Ok(success(
        StatusCode::OK,
        json!({
            "user": UserResponse::from(user),
            "token": token,
        }),
        None,
    ))
}

#[instrument(skip(state, auth_user), err)]
pub async fn me_handler(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let user_id = auth_user.id;
    let conn = state.pool.get().await?;
    let user = conn
        .interact(move |conn| {
            users::table
                .filter(users::id.eq(user_id))
                .select(User::as_select())
                .first::<User>(conn)
                .optional()
                .map_err(AppError::from)
        })
        .await??
        .ok_or_else(|| AppError::NotFound(format!("User with id {user_id} not found")))?;

    Ok(success(StatusCode::OK, UserResponse::from(user), None))
}
