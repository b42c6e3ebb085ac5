use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::warn;
use uuid::Uuid;

use super::{
    claims::{Role, TokenKind},
    jwt::JwtKeys,
};
use crate::errors::ApiError;

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

/// The authenticated caller, resolved once per request from the access
/// cookie or, failing that, an `Authorization: Bearer` header.
#[derive(Debug, Clone, Copy)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub role: Role,
}

impl AuthContext {
    pub fn require_role(&self, allowed: &[Role]) -> Result<(), ApiError> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            warn!(user_id = %self.user_id, role = %self.role, "role not allowed");
            Err(ApiError::Forbidden(format!(
                "role {} may not perform this action",
                self.role
            )))
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self.role, Role::Nutritionist | Role::Admin)
    }
}

fn token_from_parts(parts: &Parts) -> Option<String> {
    let jar = CookieJar::from_headers(&parts.headers);
    if let Some(c) = jar.get(ACCESS_COOKIE) {
        return Some(c.value().to_string());
    }
    let header = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())?;
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::to_string)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = token_from_parts(parts)
            .ok_or_else(|| ApiError::Unauthorized("missing session".into()))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(&token).map_err(|_| {
            warn!("invalid or expired token");
            ApiError::Unauthorized("invalid or expired token".into())
        })?;

        if claims.kind != TokenKind::Access {
            return Err(ApiError::Unauthorized("access token required".into()));
        }

        Ok(AuthContext {
            user_id: claims.sub,
            role: claims.role,
        })
    }
}

fn session_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

pub fn with_session(jar: CookieJar, access: &str, refresh: &str, secure: bool) -> CookieJar {
    jar.add(session_cookie(ACCESS_COOKIE, access.to_string(), secure))
        .add(session_cookie(REFRESH_COOKIE, refresh.to_string(), secure))
}

pub fn without_session(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(ACCESS_COOKIE).path("/"))
        .remove(Cookie::build(REFRESH_COOKIE).path("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use axum::http::{header, Request};

    async fn extract(req: Request<()>) -> Result<AuthContext, ApiError> {
        let state = AppState::fake();
        let (mut parts, _) = req.into_parts();
        AuthContext::from_request_parts(&mut parts, &state).await
    }

    fn keys() -> JwtKeys {
        JwtKeys::from_ref(&AppState::fake())
    }

    #[tokio::test]
    async fn resolves_from_cookie() {
        let user_id = Uuid::new_v4();
        let token = keys().sign_access(user_id, Role::Client).unwrap();
        let req = Request::builder()
            .header(header::COOKIE, format!("theme=dark; {ACCESS_COOKIE}={token}"))
            .body(())
            .unwrap();
        let ctx = extract(req).await.expect("cookie session");
        assert_eq!(ctx.user_id, user_id);
        assert_eq!(ctx.role, Role::Client);
    }

    #[tokio::test]
    async fn falls_back_to_bearer_header() {
        let user_id = Uuid::new_v4();
        let token = keys().sign_access(user_id, Role::Admin).unwrap();
        let req = Request::builder()
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(())
            .unwrap();
        let ctx = extract(req).await.expect("bearer session");
        assert!(ctx.is_staff());
    }

    #[tokio::test]
    async fn rejects_refresh_tokens_and_missing_sessions() {
        let token = keys().sign_refresh(Uuid::new_v4(), Role::Client).unwrap();
        let req = Request::builder()
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(())
            .unwrap();
        assert!(matches!(extract(req).await, Err(ApiError::Unauthorized(_))));

        let bare = Request::builder().body(()).unwrap();
        assert!(matches!(extract(bare).await, Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn require_role_guards() {
        let ctx = AuthContext { user_id: Uuid::new_v4(), role: Role::Client };
        assert!(ctx.require_role(&[Role::Client]).is_ok());
        assert!(matches!(
            ctx.require_role(&[Role::Nutritionist, Role::Admin]),
            Err(ApiError::Forbidden(_))
        ));
    }
}
