use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::claims::{Claims, Role, TokenKind};
use crate::{config::JwtConfig, state::AppState};

/// HS256 keys plus the issuer/audience pair every token is bound to.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

/// Access and refresh token issued together at login.
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub access: String,
    pub refresh: String,
}

impl From<&JwtConfig> for JwtKeys {
    fn from(cfg: &JwtConfig) -> Self {
        let secret = cfg.secret.as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            access_ttl: Duration::minutes(cfg.ttl_minutes.max(1)),
            refresh_ttl: Duration::minutes(cfg.refresh_ttl_minutes.max(1)),
        }
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::from(&state.config.jwt)
    }
}

impl JwtKeys {
    fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        }
    }

    fn sign(&self, user_id: Uuid, role: Role, kind: TokenKind) -> anyhow::Result<String> {
        let issued = OffsetDateTime::now_utc();
        let expires = issued + self.ttl(kind);
        let claims = Claims {
            sub: user_id,
            iat: issued.unix_timestamp() as usize,
            exp: expires.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind,
            role,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(%user_id, %role, ?kind, "token signed");
        Ok(token)
    }

    pub fn sign_access(&self, user_id: Uuid, role: Role) -> anyhow::Result<String> {
        self.sign(user_id, role, TokenKind::Access)
    }

    pub fn sign_refresh(&self, user_id: Uuid, role: Role) -> anyhow::Result<String> {
        self.sign(user_id, role, TokenKind::Refresh)
    }

    pub fn issue(&self, user_id: Uuid, role: Role) -> anyhow::Result<SessionTokens> {
        Ok(SessionTokens {
            access: self.sign_access(user_id, role)?,
            refresh: self.sign_refresh(user_id, role)?,
        })
    }

    /// Checks signature, expiry, issuer and audience. The token kind is
    /// left to the caller.
    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_audience(&[self.audience.as_str()]);
        let claims = decode::<Claims>(token, &self.decoding, &validation)?.claims;
        debug!(user_id = %claims.sub, kind = ?claims.kind, "token verified");
        Ok(claims)
    }

    pub fn verify_refresh(&self, token: &str) -> anyhow::Result<Claims> {
        let claims = self.verify(token)?;
        anyhow::ensure!(claims.kind == TokenKind::Refresh, "not a refresh token");
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys_for(secret: &str, issuer: &str, audience: &str) -> JwtKeys {
        JwtKeys::from(&JwtConfig {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            ttl_minutes: 5,
            refresh_ttl_minutes: 60,
        })
    }

    #[test]
    fn access_token_carries_role() {
        let keys = keys_for("dev-secret", "nutriplan", "nutriplan-web");
        let user_id = Uuid::new_v4();
        let token = keys.sign_access(user_id, Role::Nutritionist).expect("sign access");
        let claims = keys.verify(&token).expect("verify token");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.kind, TokenKind::Access);
        assert_eq!(claims.role, Role::Nutritionist);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn issued_pair_has_one_token_of_each_kind() {
        let keys = keys_for("dev-secret", "iss", "aud");
        let user_id = Uuid::new_v4();
        let tokens = keys.issue(user_id, Role::Client).expect("issue");

        assert_eq!(keys.verify_refresh(&tokens.refresh).expect("refresh").sub, user_id);
        let err = keys.verify_refresh(&tokens.access).unwrap_err();
        assert!(err.to_string().contains("not a refresh token"));
    }

    #[test]
    fn foreign_issuer_is_rejected() {
        let ours = keys_for("same-secret", "good-iss", "good-aud");
        let theirs = keys_for("same-secret", "bad-iss", "bad-aud");
        let token = ours.sign_access(Uuid::new_v4(), Role::Client).expect("sign access");
        assert!(theirs.verify(&token).is_err());
    }
}
