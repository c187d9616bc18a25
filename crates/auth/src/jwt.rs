//! HS256 token signing and verification.

use chrono::{DateTime, Duration, Utc};
use core::str::FromStr;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::{JwtClaims, TokenValidationError, User, validate_claims};

/// Mints bearer tokens for authenticated users.
pub trait JwtIssuer: Send + Sync {
    fn issue(&self, user: &User, now: DateTime<Utc>) -> Result<String, SigningError>;
}

/// Verifies bearer tokens and returns their claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError>;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("failed to sign token: {0}")]
pub struct SigningError(pub String);

/// Token lifetime, parsed from strings like `3600`, `90s`, `15m`, `12h`, `1d`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TokenTtl(Duration);

impl TokenTtl {
    pub fn new(duration: Duration) -> Self {
        Self(duration)
    }

    pub fn duration(&self) -> Duration {
        self.0
    }
}

impl Default for TokenTtl {
    fn default() -> Self {
        Self(Duration::days(1))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid token lifetime '{0}' (expected e.g. 3600, 15m, 12h, 1d)")]
pub struct InvalidTtl(pub String);

impl FromStr for TokenTtl {
    type Err = InvalidTtl;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || InvalidTtl(s.to_string());
        let (digits, unit) = match s.find(|c: char| !c.is_ascii_digit()) {
            Some(idx) => s.split_at(idx),
            None => (s, "s"),
        };
        let n: i64 = digits.parse().map_err(|_| err())?;
        if n <= 0 {
            return Err(err());
        }
        let duration = match unit {
            "s" => Duration::try_seconds(n),
            "m" => Duration::try_minutes(n),
            "h" => Duration::try_hours(n),
            "d" => Duration::try_days(n),
            _ => return Err(err()),
        };
        duration.map(Self).ok_or_else(err)
    }
}

/// Symmetric HS256 signer/verifier sharing one secret.
pub struct Hs256Jwt {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: TokenTtl,
}

impl Hs256Jwt {
    pub fn new(secret: &[u8], ttl: TokenTtl) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked by `validate_claims` against the caller's clock.
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation
    }
}

impl JwtIssuer for Hs256Jwt {
    fn issue(&self, user: &User, now: DateTime<Utc>) -> Result<String, SigningError> {
        let expires = now
            .checked_add_signed(self.ttl.duration())
            .ok_or_else(|| SigningError("token expiry is out of range".to_string()))?;
        let claims = JwtClaims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: expires.timestamp(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| SigningError(e.to_string()))
    }
}

impl JwtValidator for Hs256Jwt {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError> {
        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding, &Self::validation())
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenValidationError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenValidationError::Expired,
                _ => TokenValidationError::Malformed(e.to_string()),
            })?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}
