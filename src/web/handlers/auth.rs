//! Authentication handlers.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::activity::{Action, NewActivity, ResourceType};
use crate::auth::{self, RegistrationRequest};
use crate::db::{User, UserRepository};
use crate::web::dto::{
    ApiResponse, ChangePasswordRequest, LoginRequest, LoginResponse, RegisterRequest,
    UserResponse, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::{AuthUser, ClientIp};

fn login_response(state: &AppState, user: User) -> Result<LoginResponse, ApiError> {
    let access_token = state.jwt.issue(user.id, &user.username)?;
    Ok(LoginResponse {
        access_token,
        token_type: "bearer".to_string(),
        expires_in: state.jwt.expiry_secs,
        user: user.into(),
    })
}

/// POST /api/auth/register - Create an account and sign in.
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = LoginResponse),
        (status = 409, description = "Email already registered"),
        (status = 422, description = "Invalid input")
    )
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<LoginResponse>>), ApiError> {
    let repo = UserRepository::new(state.db.pool());
    let user = auth::register(
        &repo,
        RegistrationRequest::new(req.username, req.email, req.password),
    )
    .await?;

    let response = login_response(&state, user)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(response))))
}

/// POST /api/auth/login - Exchange email and password for an access token.
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 401, description = "Invalid email or password"),
        (status = 429, description = "Too many login attempts")
    )
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let repo = UserRepository::new(state.db.pool());
    let user = auth::authenticate(&repo, req.email.trim(), &req.password).await?;

    state
        .record(
            NewActivity::new(user.id, Action::Login, ResourceType::User)
                .resource(user.id)
                .ip(ip),
        )
        .await;
    tracing::info!(user_id = user.id, "User logged in");

    Ok(Json(ApiResponse::new(login_response(&state, user)?)))
}

/// GET /api/auth/me - Current user, including storage used.
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn me(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let user = UserRepository::new(state.db.pool())
        .get_by_id(user.id())
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired token"))?;

    Ok(Json(ApiResponse::new(user.into())))
}

/// PUT /api/auth/password - Change the current user's password.
#[utoipa::path(
    put,
    path = "/auth/password",
    tag = "auth",
    request_body = ChangePasswordRequest,
    responses(
        (status = 204, description = "Password changed"),
        (status = 401, description = "Current password is incorrect"),
        (status = 422, description = "Invalid new password")
    ),
    security(("bearer_auth" = []))
)]
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ClientIp(ip): ClientIp,
    ValidatedJson(req): ValidatedJson<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    let repo = UserRepository::new(state.db.pool());
    auth::change_password(&repo, user.id(), &req.current_password, &req.new_password).await?;

    state
        .record(
            NewActivity::new(user.id(), Action::ChangePassword, ResourceType::User)
                .resource(user.id())
                .ip(ip),
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}
