//! Turning a bearer credential into a [`Principal`].

use std::time::Duration;

use async_trait::async_trait;
use recipebox_core::UserId;
use serde::Serialize;
use time::OffsetDateTime;

use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::policy::Role;
use crate::token::{AppMetadata, JwtService, TokenClaims};

/// The verified caller of one request. Built per request, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub id: UserId,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339::option")]
    pub subscription_expires_at: Option<OffsetDateTime>,
}

impl Principal {
    pub fn new(id: UserId, role: Role) -> Self {
        Self {
            id,
            role,
            subscription_expires_at: None,
        }
    }

    #[must_use]
    pub fn with_subscription_expiry(mut self, expires_at: OffsetDateTime) -> Self {
        self.subscription_expires_at = Some(expires_at);
        self
    }

    /// `true` when a subscription expiry is set and lies before `now`.
    pub fn subscription_expired_at(&self, now: OffsetDateTime) -> bool {
        self.subscription_expires_at
            .is_some_and(|expires_at| expires_at < now)
    }
}

/// Validates a bearer credential and extracts the principal.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// # Errors
    ///
    /// `Unauthenticated` for a bad signature, format or audience, `Expired`
    /// when `exp` has passed, `MalformedIdentity` when `sub` is missing or
    /// not a user id.
    async fn verify(&self, credential: &str) -> AuthResult<Principal>;
}

/// [`IdentityVerifier`] for HS256 tokens signed with a shared secret.
#[derive(Debug)]
pub struct JwtIdentityVerifier {
    jwt: JwtService,
}

impl JwtIdentityVerifier {
    pub fn new(secret: impl AsRef<[u8]>, audience: impl Into<String>) -> Self {
        Self {
            jwt: JwtService::new(secret.as_ref(), audience, Duration::ZERO),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            jwt: JwtService::new(config.jwt_secret.as_bytes(), &*config.audience, config.leeway),
        }
    }

    /// Sign a token for `principal` valid for `ttl`.
    pub fn issue(&self, principal: &Principal, ttl: Duration) -> AuthResult<String> {
        let exp = OffsetDateTime::now_utc() + ttl;
        let claims = TokenClaims {
            sub: Some(principal.id.to_string()),
            exp: exp.unix_timestamp(),
            aud: Some(self.jwt.audience().to_string()),
            email: None,
            app_metadata: AppMetadata {
                role: Some(principal.role.as_str().to_string()),
                subscription_expires_at: principal
                    .subscription_expires_at
                    .map(|t| t.unix_timestamp()),
            },
        };
        Ok(self.jwt.encode(&claims)?)
    }

    /// Sign arbitrary claims. Useful for tokens a real issuer would produce
    /// but [`issue`](Self::issue) cannot express.
    pub fn sign(&self, claims: &TokenClaims) -> AuthResult<String> {
        Ok(self.jwt.encode(claims)?)
    }

    fn principal_from(claims: TokenClaims) -> AuthResult<Principal> {
        let sub = claims
            .sub
            .ok_or_else(|| AuthError::malformed_identity("token has no subject"))?;
        let id: UserId = sub
            .parse()
            .map_err(|_| AuthError::malformed_identity(format!("subject '{sub}' is not a user id")))?;

        let role = Role::from_claim(claims.app_metadata.role.as_deref());

        let subscription_expires_at = claims
            .app_metadata
            .subscription_expires_at
            .map(OffsetDateTime::from_unix_timestamp)
            .transpose()
            .map_err(|e| {
                AuthError::malformed_identity(format!("invalid subscription expiry: {e}"))
            })?;

        Ok(Principal {
            id,
            role,
            subscription_expires_at,
        })
    }
}

#[async_trait]
impl IdentityVerifier for JwtIdentityVerifier {
    async fn verify(&self, credential: &str) -> AuthResult<Principal> {
        let claims = self.jwt.decode(credential).map_err(|e| {
            tracing::debug!(error = %e, "credential rejected");
            AuthError::from(e)
        })?;
        Self::principal_from(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::block_on;

    const SECRET: &str = "test-secret";

    fn verifier() -> JwtIdentityVerifier {
        JwtIdentityVerifier::new(SECRET, "authenticated")
    }

    fn claims() -> TokenClaims {
        TokenClaims {
            sub: Some(UserId::new().to_string()),
            exp: OffsetDateTime::now_utc().unix_timestamp() + 300,
            aud: Some("authenticated".into()),
            email: Some("cook@example.com".into()),
            app_metadata: AppMetadata::default(),
        }
    }

    #[tokio::test]
    async fn test_issue_and_verify_round_trip() {
        let v = verifier();
        let expiry = OffsetDateTime::from_unix_timestamp(2_000_000_000).unwrap();
        let principal = Principal::new(UserId::new(), Role::Premium).with_subscription_expiry(expiry);
        let token = v.issue(&principal, Duration::from_secs(60)).unwrap();
        assert_eq!(v.verify(&token).await.unwrap(), principal);
    }

    #[tokio::test]
    async fn test_missing_role_defaults_to_member() {
        let v = verifier();
        let token = v.sign(&claims()).unwrap();
        let principal = v.verify(&token).await.unwrap();
        assert_eq!(principal.role, Role::Member);
        assert_eq!(principal.subscription_expires_at, None);
    }

    #[tokio::test]
    async fn test_unknown_role_defaults_to_member() {
        let v = verifier();
        let mut c = claims();
        c.app_metadata.role = Some("overlord".into());
        let principal = v.verify(&v.sign(&c).unwrap()).await.unwrap();
        assert_eq!(principal.role, Role::Member);
    }

    #[tokio::test]
    async fn test_missing_subject_is_malformed() {
        let v = verifier();
        let mut c = claims();
        c.sub = None;
        let err = v.verify(&v.sign(&c).unwrap()).await.unwrap_err();
        assert!(matches!(err, AuthError::MalformedIdentity { .. }));
    }

    #[tokio::test]
    async fn test_non_uuid_subject_is_malformed() {
        let v = verifier();
        let mut c = claims();
        c.sub = Some("user-42".into());
        let err = v.verify(&v.sign(&c).unwrap()).await.unwrap_err();
        assert_eq!(err.code(), "malformed_identity");
    }

    #[tokio::test]
    async fn test_expired_token() {
        let v = verifier();
        let mut c = claims();
        c.exp = OffsetDateTime::now_utc().unix_timestamp() - 600;
        let err = v.verify(&v.sign(&c).unwrap()).await.unwrap_err();
        assert!(matches!(err, AuthError::Expired));
    }

    #[tokio::test]
    async fn test_audience_mismatch_is_unauthenticated() {
        let v = verifier();
        let other = JwtIdentityVerifier::new(SECRET, "service_role");
        let token = other.sign(&TokenClaims {
            aud: Some("service_role".into()),
            ..claims()
        }).unwrap();
        let err = v.verify(&token).await.unwrap_err();
        assert_eq!(err.code(), "unauthenticated");
    }

    #[test]
    fn test_bad_signature_is_unauthenticated() {
        let v = verifier();
        let forged = JwtIdentityVerifier::new("not-the-secret", "authenticated");
        let token = forged.sign(&claims()).unwrap();
        let err = block_on(v.verify(&token)).unwrap_err();
        assert_eq!(err.code(), "unauthenticated");
    }

    #[test]
    fn test_subscription_expiry() {
        let now = OffsetDateTime::now_utc();
        let p = Principal::new(UserId::new(), Role::Premium);
        assert!(!p.subscription_expired_at(now));
        let p = p.with_subscription_expiry(now - time::Duration::seconds(1));
        assert!(p.subscription_expired_at(now));
    }
}
