use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::services::auth::codec::{SigningConfig, TokenClaims, TokenCodec, TokenError};
use crate::services::auth::principal::Principal;

/// Token lifecycle: issue, validate, refresh, introspect.
///
/// Every time-dependent operation has an `*_at` form taking the instant explicitly; the plain
/// form reads the wall clock. Nothing here mutates shared state, so the service is shared as a
/// plain `Arc` across requests.
#[derive(Clone, Debug)]
pub struct TokenService {
    codec: TokenCodec,
    signing: SigningConfig,
}

/// Service-level return type to keep handlers thin.
#[derive(Clone, Debug)]
pub struct IssuedToken {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl IssuedToken {
    /// Whole seconds between issuance and expiry.
    pub fn expires_in(&self) -> i64 {
        (self.expires_at - self.issued_at).num_seconds()
    }
}

/// Diagnostic view of a token. Never carries the signature.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenIntrospection {
    pub subject: String,
    pub issuer: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub expired: bool,
    pub millis_remaining: i64,
}

/// Payload returned by `introspect` when the token cannot be read.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IntrospectionError {
    pub error: String,
    pub valid: bool,
}

impl TokenService {
    pub fn new(signing: SigningConfig) -> Self {
        Self {
            codec: TokenCodec::new(&signing),
            signing,
        }
    }

    pub fn issue(&self, username: &str) -> Result<IssuedToken, TokenError> {
        self.issue_at(username, Utc::now())
    }

    pub fn issue_at(&self, username: &str, now: DateTime<Utc>) -> Result<IssuedToken, TokenError> {
        self.sign(Map::new(), username, now)
    }

    /// Issue a token carrying `extra_claims`. Reserved claim names in the map are ignored.
    pub fn issue_with_claims(
        &self,
        username: &str,
        extra_claims: Map<String, Value>,
    ) -> Result<IssuedToken, TokenError> {
        self.sign(extra_claims, username, Utc::now())
    }

    pub fn validate(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.validate_at(token, Utc::now())
    }

    /// Signature and structure are checked first; only a genuine token can be reported as
    /// `Expired`.
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        let claims = self.codec.decode(token)?;

        if claims.is_expired_at(now) {
            debug!(subject = %claims.sub, expired_at = %claims.exp, "token expired");
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    pub fn validate_against_principal(&self, token: &str, principal: &Principal) -> bool {
        self.validate_against_principal_at(token, principal, Utc::now())
    }

    pub fn validate_against_principal_at(
        &self,
        token: &str,
        principal: &Principal,
        now: DateTime<Utc>,
    ) -> bool {
        matches!(self.validate_at(token, now), Ok(claims) if claims.sub == principal.username)
    }

    pub fn refresh(&self, token: &str) -> Result<IssuedToken, TokenError> {
        self.refresh_at(token, Utc::now())
    }

    /// Re-sign the claims of a still-valid token with fresh timing claims.
    ///
    /// Expired tokens are rejected here as well, not only by callers that validate first.
    pub fn refresh_at(&self, token: &str, now: DateTime<Utc>) -> Result<IssuedToken, TokenError> {
        let claims = self.validate_at(token, now)?;
        self.sign(claims.extra, &claims.sub, now)
    }

    pub fn introspect(&self, token: &str) -> Result<TokenIntrospection, IntrospectionError> {
        self.introspect_at(token, Utc::now())
    }

    pub fn introspect_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<TokenIntrospection, IntrospectionError> {
        let claims = self.codec.decode(token).map_err(|e| IntrospectionError {
            error: e.to_string(),
            valid: false,
        })?;

        Ok(TokenIntrospection {
            expired: claims.is_expired_at(now),
            millis_remaining: millis_until(claims.exp, now),
            subject: claims.sub,
            issuer: claims.iss,
            issued_at: claims.iat,
            expires_at: claims.exp,
        })
    }

    /// Informational only: zero for expired or unreadable tokens. Not an expiry check.
    pub fn time_remaining(&self, token: &str) -> Duration {
        self.time_remaining_at(token, Utc::now())
    }

    pub fn time_remaining_at(&self, token: &str, now: DateTime<Utc>) -> Duration {
        match self.codec.decode(token) {
            Ok(claims) => Duration::from_millis(millis_until(claims.exp, now) as u64),
            Err(_) => Duration::ZERO,
        }
    }

    fn sign(
        &self,
        extra: Map<String, Value>,
        username: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let token = self.codec.encode(
            extra,
            username,
            self.signing.issuer(),
            now,
            self.signing.ttl(),
        )?;
        // Read timing back from what was actually signed (second granularity).
        let claims = self.codec.decode(&token)?;

        Ok(IssuedToken {
            token,
            issued_at: claims.iat,
            expires_at: claims.exp,
        })
    }
}

fn millis_until(instant: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (instant - now).num_milliseconds().max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth::principal::AccountStatus;
    use crate::services::auth::role::Role;
    use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
    use chrono::{TimeDelta, TimeZone};
    use serde_json::json;
    use uuid::Uuid;

    const SECRET: &str = "test-secret-key-that-is-long-enough-for-hs512-signing-0123456789";

    fn service_with_ttl(ttl: Duration) -> TokenService {
        TokenService::new(SigningConfig::new(SECRET, "rolegate-test", ttl).unwrap())
    }

    fn service() -> TokenService {
        service_with_ttl(Duration::from_secs(3600))
    }

    fn principal(username: &str) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            full_name: username.to_string(),
            roles: [Role::User].into_iter().collect(),
            status: AccountStatus::active(),
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn issued_token_validates_immediately() {
        let service = service();
        for username in ["alice", "bob.smith", "carol@example.com", "dörte"] {
            let issued = service.issue(username).unwrap();
            let claims = service.validate(&issued.token).unwrap();

            assert_eq!(claims.sub, username);
            assert_eq!(claims.iss, "rolegate-test");
            assert_eq!(claims.exp, issued.expires_at);
            assert!(issued.expires_at > issued.issued_at);
        }
    }

    #[test]
    fn expires_at_matches_configured_ttl() {
        let issued = service().issue_at("alice", t0()).unwrap();

        assert_eq!(issued.issued_at, t0());
        assert_eq!(issued.expires_at, t0() + TimeDelta::hours(1));
        assert_eq!(issued.expires_in(), 3600);
    }

    #[test]
    fn expiry_is_strictly_before_now() {
        let service = service();
        let issued = service.issue_at("alice", t0()).unwrap();

        // Exactly at the expiry instant the token is still accepted.
        assert!(service.validate_at(&issued.token, issued.expires_at).is_ok());
        assert_eq!(
            service
                .validate_at(&issued.token, issued.expires_at + TimeDelta::milliseconds(1))
                .unwrap_err(),
            TokenError::Expired
        );
    }

    #[test]
    fn signature_failure_is_reported_before_expiry() {
        let service = service();
        let issued = service.issue_at("alice", t0()).unwrap();
        let (signed, signature) = issued.token.rsplit_once('.').unwrap();
        let mut bytes = URL_SAFE_NO_PAD.decode(signature).unwrap();
        bytes[0] ^= 0x01;
        let forged = format!("{}.{}", signed, URL_SAFE_NO_PAD.encode(bytes));

        let later = t0() + TimeDelta::days(2);
        assert_eq!(
            service.validate_at(&forged, later).unwrap_err(),
            TokenError::SignatureInvalid
        );
        assert_eq!(
            service.validate_at(&issued.token, later).unwrap_err(),
            TokenError::Expired
        );
    }

    #[tokio::test]
    async fn short_lived_token_expires_on_the_wall_clock() {
        let service = service_with_ttl(Duration::from_millis(1000));
        let issued = service.issue("alice").unwrap();
        assert!(service.validate(&issued.token).is_ok());

        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert_eq!(service.validate(&issued.token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn issue_with_claims_merges_extras() {
        let service = service();
        let mut extra = Map::new();
        extra.insert("tenant".into(), json!("north"));
        extra.insert("sub".into(), json!("mallory"));

        let issued = service.issue_with_claims("alice", extra).unwrap();
        let claims = service.validate(&issued.token).unwrap();

        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.extra.get("tenant"), Some(&json!("north")));
        assert!(!claims.extra.contains_key("sub"));
    }

    #[test]
    fn empty_username_cannot_be_issued() {
        assert_eq!(service().issue("").unwrap_err(), TokenError::EmptySubject);
    }

    #[test]
    fn validate_against_principal_requires_exact_username() {
        let service = service();
        let token = service.issue("alice").unwrap().token;

        assert!(service.validate_against_principal(&token, &principal("alice")));
        assert!(!service.validate_against_principal(&token, &principal("Alice")));
        assert!(!service.validate_against_principal(&token, &principal("bob")));
        assert!(!service.validate_against_principal("garbage", &principal("alice")));
    }

    #[test]
    fn validate_against_principal_rejects_expired_token() {
        let service = service();
        let issued = service.issue_at("alice", t0()).unwrap();
        let later = issued.expires_at + TimeDelta::seconds(1);

        assert!(!service.validate_against_principal_at(&issued.token, &principal("alice"), later));
    }

    #[test]
    fn refresh_keeps_subject_and_extras_and_extends_expiry() {
        let service = service();
        let mut extra = Map::new();
        extra.insert("tenant".into(), json!("north"));
        let original = service.sign(extra, "alice", t0()).unwrap();

        let later = t0() + TimeDelta::minutes(10);
        let refreshed = service.refresh_at(&original.token, later).unwrap();
        let claims = service.validate_at(&refreshed.token, later).unwrap();

        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.extra.get("tenant"), Some(&json!("north")));
        assert_eq!(claims.iat, later);
        assert!(refreshed.expires_at > original.expires_at);
    }

    #[test]
    fn refresh_rejects_expired_token() {
        let service = service();
        let issued = service.issue_at("alice", t0()).unwrap();
        let later = issued.expires_at + TimeDelta::seconds(1);

        assert_eq!(
            service.refresh_at(&issued.token, later).unwrap_err(),
            TokenError::Expired
        );
    }

    #[test]
    fn refresh_rejects_garbage() {
        assert_eq!(
            service().refresh("not.a.token").unwrap_err(),
            TokenError::Malformed
        );
    }

    #[test]
    fn introspection_reports_timing_without_signature() {
        let service = service();
        let issued = service.issue_at("alice", t0()).unwrap();
        let now = t0() + TimeDelta::minutes(15);

        let info = service.introspect_at(&issued.token, now).unwrap();
        assert_eq!(info.subject, "alice");
        assert_eq!(info.issuer, "rolegate-test");
        assert_eq!(info.issued_at, t0());
        assert_eq!(info.expires_at, t0() + TimeDelta::hours(1));
        assert!(!info.expired);
        assert_eq!(info.millis_remaining, 45 * 60 * 1000);

        let json = serde_json::to_value(&info).unwrap();
        let signature = issued.token.rsplit('.').next().unwrap();
        assert!(!json.to_string().contains(signature));
        assert!(json.get("millisRemaining").is_some());
    }

    #[test]
    fn introspection_of_expired_and_invalid_tokens() {
        let service = service();
        let issued = service.issue_at("alice", t0()).unwrap();

        let info = service
            .introspect_at(&issued.token, t0() + TimeDelta::days(1))
            .unwrap();
        assert!(info.expired);
        assert_eq!(info.millis_remaining, 0);

        let err = service.introspect("nope").unwrap_err();
        assert!(!err.valid);
        assert_eq!(err.error, "malformed token");
    }

    #[test]
    fn time_remaining_is_never_negative() {
        let service = service();
        let issued = service.issue_at("alice", t0()).unwrap();

        assert_eq!(
            service.time_remaining_at(&issued.token, t0() + TimeDelta::minutes(59)),
            Duration::from_secs(60)
        );
        assert_eq!(
            service.time_remaining_at(&issued.token, t0() + TimeDelta::hours(2)),
            Duration::ZERO
        );
        assert_eq!(service.time_remaining("garbage"), Duration::ZERO);
    }
}
