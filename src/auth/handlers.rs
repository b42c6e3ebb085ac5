use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        claims::Role,
        credentials::{hash_password, is_valid_email, normalize_email, verify_password, MIN_PASSWORD_LEN},
        dto::{AuthResponse, LoginRequest, PublicUser, RefreshRequest, RegisterRequest, SetRoleRequest},
        extractors::{with_session, without_session, AuthContext, REFRESH_COOKIE},
        jwt::JwtKeys,
        repo_types::User,
    },
    errors::{is_unique_violation, ApiError, ApiResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/users/:id/role", put(set_user_role))
}

/// Role of every self-registered account, whatever the request says.
pub const SIGNUP_ROLE: Role = Role::Client;

fn issue_session(
    state: &AppState,
    jar: CookieJar,
    user: &User,
) -> ApiResult<(CookieJar, Json<AuthResponse>)> {
    let tokens = JwtKeys::from_ref(state).issue(user.id, user.role)?;
    let jar = with_session(jar, &tokens.access, &tokens.refresh, state.config.cookie_secure);
    Ok((
        jar,
        Json(AuthResponse {
            access_token: tokens.access,
            refresh_token: tokens.refresh,
            user: PublicUser {
                id: user.id,
                email: user.email.clone(),
                role: user.role,
            },
        }),
    ))
}

#[instrument(skip(state, jar, payload))]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, CookieJar, Json<AuthResponse>)> {
    let email = normalize_email(&payload.email);

    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(ApiError::invalid_input("Invalid email"));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(ApiError::invalid_input("Password too short"));
    }
    if User::find_by_email(&state.db, &email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(ApiError::Conflict("Email already registered".into()));
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(&state.db, &email, &hash, SIGNUP_ROLE)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::Conflict("Email already registered".into())
            } else {
                e.into()
            }
        })?;

    let (jar, body) = issue_session(&state, jar, &user)?;
    info!(user_id = %user.id, role = %user.role, "user registered");
    Ok((StatusCode::CREATED, jar, body))
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<(CookieJar, Json<AuthResponse>)> {
    let email = normalize_email(&payload.email);
    if !is_valid_email(&email) {
        return Err(ApiError::invalid_input("Invalid email"));
    }

    let Some(user) = User::find_by_email(&state.db, &email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    }

    info!(user_id = %user.id, "user logged in");
    issue_session(&state, jar, &user)
}

#[instrument(skip(state, jar, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Option<Json<RefreshRequest>>,
) -> ApiResult<(CookieJar, Json<AuthResponse>)> {
    let token = payload
        .and_then(|Json(p)| p.refresh_token)
        .or_else(|| jar.get(REFRESH_COOKIE).map(|c| c.value().to_string()))
        .ok_or_else(|| ApiError::Unauthorized("missing refresh token".into()))?;

    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&token)
        .map_err(|e| ApiError::Unauthorized(e.to_string()))?;

    // Role is re-read so a promotion takes effect on the next refresh.
    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;

    issue_session(&state, jar, &user)
}

pub async fn logout(jar: CookieJar) -> (StatusCode, CookieJar) {
    (StatusCode::NO_CONTENT, without_session(jar))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<PublicUser>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;

    Ok(Json(PublicUser {
        id: user.id,
        email: user.email,
        role: user.role,
    }))
}

#[instrument(skip(state))]
pub async fn set_user_role(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(user_id): Path<Uuid>,
    Json(body): Json<SetRoleRequest>,
) -> ApiResult<Json<PublicUser>> {
    auth.require_role(&[Role::Admin])?;
    if user_id == auth.user_id {
        return Err(ApiError::invalid_input("admins cannot change their own role"));
    }
    let user = User::set_role(&state.db, user_id, body.role)
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;

    info!(user_id = %user.id, role = %user.role, by = %auth.user_id, "role changed");
    Ok(Json(PublicUser {
        id: user.id,
        email: user.email,
        role: user.role,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requested_role_is_ignored_at_signup() {
        let payload: RegisterRequest = serde_json::from_value(serde_json::json!({
            "email": "eve@example.com",
            "password": "long-enough-password",
            "role": "nutritionist"
        }))
        .unwrap();
        assert_eq!(payload.email, "eve@example.com");
        assert_eq!(SIGNUP_ROLE, Role::Client);
    }

    #[test]
    fn public_user_serializes_role_lowercase() {
        let response = PublicUser {
            id: uuid::Uuid::new_v4(),
            email: "test@example.com".to_string(),
            role: Role::Nutritionist,
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("test@example.com"));
        assert!(json.contains(r#""role":"nutritionist""#));
    }
}
