//! Token codec: signs claim sets into compact JWTs (HS512) and verifies them back.
//!
//! The codec only answers "is this a structurally valid token signed with our key". Expiry is
//! judged by `TokenService`, so an expired token still decodes here.

use std::time::Duration;

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error};

/// HS512 needs at least a 512-bit key.
pub const MIN_SECRET_BYTES: usize = 64;

/// Longest accepted token lifetime, roughly a century.
pub const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 86_400);

/// Claims computed by the codec itself; callers can never override them through extra claims.
pub const RESERVED_CLAIMS: [&str; 4] = ["sub", "iss", "iat", "exp"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("token signature mismatch")]
    SignatureInvalid,
    #[error("token expired")]
    Expired,
    #[error("token subject must not be empty")]
    EmptySubject,
    #[error("failed to sign token")]
    Signing,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SigningConfigError {
    #[error("signing secret must be at least {MIN_SECRET_BYTES} bytes, got {0}")]
    SecretTooShort(usize),
    #[error("issuer must not be empty")]
    EmptyIssuer,
    #[error("token ttl must be at least one second")]
    TtlTooShort,
    #[error("token ttl must not exceed {} seconds", MAX_TTL.as_secs())]
    TtlTooLong,
}

/// Process-wide signing parameters. Built once at startup and never mutated.
#[derive(Clone)]
pub struct SigningConfig {
    secret: Vec<u8>,
    issuer: String,
    ttl: TimeDelta,
}

impl std::fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("SigningConfig")
            .field("issuer", &self.issuer)
            .field("ttl_ms", &self.ttl.num_milliseconds())
            .finish()
    }
}

impl SigningConfig {
    pub fn new(
        secret: impl Into<Vec<u8>>,
        issuer: impl Into<String>,
        ttl: Duration,
    ) -> Result<Self, SigningConfigError> {
        let secret = secret.into();
        if secret.len() < MIN_SECRET_BYTES {
            return Err(SigningConfigError::SecretTooShort(secret.len()));
        }

        let issuer = issuer.into();
        if issuer.trim().is_empty() {
            return Err(SigningConfigError::EmptyIssuer);
        }

        // Expiry is truncated to whole seconds on the wire; anything shorter could produce
        // exp <= iat.
        if ttl < Duration::from_secs(1) {
            return Err(SigningConfigError::TtlTooShort);
        }
        if ttl > MAX_TTL {
            return Err(SigningConfigError::TtlTooLong);
        }
        let ttl = TimeDelta::from_std(ttl).map_err(|_| SigningConfigError::TtlTooLong)?;

        Ok(Self {
            secret,
            issuer,
            ttl,
        })
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    pub(crate) fn secret(&self) -> &[u8] {
        &self.secret
    }
}

/// Decoded claim set.
///
/// `iat`/`exp` are UNIX seconds on the wire. Everything that is not a reserved claim lands in
/// `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub iss: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub iat: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub exp: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TokenClaims {
    /// Expired iff the expiry instant is strictly before `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.exp < now
    }
}

#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &Algorithm::HS512)
            .finish()
    }
}

impl TokenCodec {
    pub fn new(signing: &SigningConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS512);
        // Expiry is the caller's decision.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["sub", "iss", "exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(signing.secret()),
            decoding_key: DecodingKey::from_secret(signing.secret()),
            validation,
        }
    }

    /// Sign `extra` together with the computed subject/issuer/timing claims.
    ///
    /// `iat` is `issued_at` truncated to the second; `exp` is `issued_at + ttl` truncated to the
    /// second, so the token never outlives `ttl`.
    pub fn encode(
        &self,
        mut extra: Map<String, Value>,
        subject: &str,
        issuer: &str,
        issued_at: DateTime<Utc>,
        ttl: TimeDelta,
    ) -> Result<String, TokenError> {
        if subject.trim().is_empty() {
            return Err(TokenError::EmptySubject);
        }

        for key in RESERVED_CLAIMS {
            extra.remove(key);
        }

        let expires_at = issued_at.checked_add_signed(ttl).ok_or_else(|| {
            error!(issued_at = %issued_at, "token expiry out of range");
            TokenError::Signing
        })?;

        let claims = TokenClaims {
            sub: subject.to_string(),
            iss: issuer.to_string(),
            iat: issued_at.trunc_subsecs(0),
            exp: expires_at.trunc_subsecs(0),
            extra,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS512), &claims, &self.encoding_key).map_err(
            |e| {
                error!(error = %e, "failed to sign token");
                TokenError::Signing
            },
        )
    }

    /// Verify signature and structure and return the raw claims. No expiry judgment.
    pub fn decode(&self, token: &str) -> Result<TokenClaims, TokenError> {
        jsonwebtoken::decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::SignatureInvalid,
                _ => {
                    debug!(error = %e, "token structure rejected");
                    TokenError::Malformed
                }
            })
    }
}
