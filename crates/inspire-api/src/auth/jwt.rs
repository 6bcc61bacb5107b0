//! JWT access token issuance and validation
//!
//! Tokens are HMAC-signed with a secret and algorithm fixed at construction.
//! The claim set is deliberately small: the account id as subject, a
//! per-token session id, and the issue and expiry instants. Everything else
//! about the caller is looked up server-side on each request.

use chrono::{DateTime, Duration, TimeZone, Utc};
use inspire_core::config::MIN_SECRET_LEN;
use inspire_core::{AccountId, AuthConfig, JwtAlgorithm};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Claims carried by an access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject - numeric account id rendered as a string
    pub sub: String,
    /// Session id; the revocation handle for this token
    pub uid: Uuid,
    /// Issued at (Unix seconds)
    pub iat: u64,
    /// Expiration (Unix seconds)
    pub exp: u64,
}

impl TokenClaims {
    /// Parse the subject back into an account id
    pub fn account_id(&self) -> Result<AccountId, JwtError> {
        self.sub.parse().map_err(|_| JwtError::InvalidSubject)
    }

    /// Absolute expiry as a timestamp
    pub fn expires_at(&self) -> DateTime<Utc> {
        i64::try_from(self.exp)
            .ok()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// A freshly signed token together with the claims it encodes
#[derive(Debug, Clone)]
pub struct SignedToken {
    pub token: String,
    pub claims: TokenClaims,
}

/// JWT token generation and validation errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode JWT: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),

    #[error("Signing secret is shorter than 32 bytes")]
    WeakSecret,

    #[error("Invalid token format")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token subject is not an account id")]
    InvalidSubject,

    #[error("Token lifetime is out of range")]
    InvalidLifetime,
}

/// Signs and validates access tokens with one secret and algorithm
pub struct TokenIssuer {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenIssuer {
    /// Create an issuer for the given HMAC secret
    pub fn new(secret: &[u8], algorithm: JwtAlgorithm) -> Result<Self, JwtError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(JwtError::WeakSecret);
        }

        let algorithm = match algorithm {
            JwtAlgorithm::Hs256 => Algorithm::HS256,
            JwtAlgorithm::Hs384 => Algorithm::HS384,
            JwtAlgorithm::Hs512 => Algorithm::HS512,
        };

        // Only the configured algorithm is accepted; expiry has no grace period.
        let mut validation = Validation::new(algorithm);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        })
    }

    /// Create an issuer from the auth configuration
    pub fn from_config(config: &AuthConfig) -> Result<Self, JwtError> {
        Self::new(config.jwt_secret.as_bytes(), config.jwt_algorithm)
    }

    /// Sign a token for `subject` bound to `session_id`, valid for `ttl`
    pub fn issue(
        &self,
        subject: AccountId,
        session_id: Uuid,
        ttl: Duration,
    ) -> Result<SignedToken, JwtError> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or(JwtError::InvalidLifetime)?;
        let claims = TokenClaims {
            sub: subject.to_string(),
            uid: session_id,
            iat: unix_seconds(now),
            exp: unix_seconds(expires_at),
        };

        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding_key)?;
        Ok(SignedToken { token, claims })
    }

    /// Verify the signature, algorithm and expiry of a token and return its claims
    pub fn decode(&self, token: &str) -> Result<TokenClaims, JwtError> {
        let token_data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
                ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                _ => JwtError::InvalidToken,
            })?;

        Ok(token_data.claims)
    }
}

fn unix_seconds(at: DateTime<Utc>) -> u64 {
    u64::try_from(at.timestamp()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(SECRET, JwtAlgorithm::Hs256).unwrap()
    }

    #[test]
    fn test_issue_and_decode_token() {
        let issuer = issuer();
        let session_id = Uuid::new_v4();

        let signed = issuer
            .issue(42, session_id, Duration::minutes(30))
            .expect("Failed to issue token");
        let claims = issuer.decode(&signed.token).expect("Failed to decode token");

        assert_eq!(claims, signed.claims);
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.account_id().unwrap(), 42);
        assert_eq!(claims.uid, session_id);
        assert_eq!(claims.exp - claims.iat, 30 * 60);
    }

    #[test]
    fn test_tokens_for_same_subject_differ() {
        let issuer = issuer();
        let a = issuer.issue(1, Uuid::new_v4(), Duration::minutes(5)).unwrap();
        let b = issuer.issue(1, Uuid::new_v4(), Duration::minutes(5)).unwrap();
        assert_ne!(a.token, b.token);
    }

    #[test]
    fn test_invalid_token() {
        let result = issuer().decode("invalid.token.here");
        assert!(matches!(result, Err(JwtError::InvalidToken)));
        assert!(issuer().decode("").is_err());
    }

    #[test]
    fn test_wrong_secret() {
        let other = TokenIssuer::new(b"fedcba9876543210fedcba9876543210", JwtAlgorithm::Hs256)
            .unwrap();
        let signed = other.issue(1, Uuid::new_v4(), Duration::minutes(5)).unwrap();

        let result = issuer().decode(&signed.token);
        assert!(matches!(result, Err(JwtError::InvalidSignature)));
    }

    #[test]
    fn test_other_algorithm_rejected() {
        let hs512 = TokenIssuer::new(SECRET, JwtAlgorithm::Hs512).unwrap();
        let signed = hs512.issue(1, Uuid::new_v4(), Duration::minutes(5)).unwrap();

        assert!(hs512.decode(&signed.token).is_ok());
        assert!(matches!(
            issuer().decode(&signed.token),
            Err(JwtError::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_token() {
        let issuer = issuer();
        let signed = issuer
            .issue(1, Uuid::new_v4(), Duration::seconds(-5))
            .unwrap();

        let result = issuer.decode(&signed.token);
        assert!(matches!(result, Err(JwtError::ExpiredToken)));
    }

    #[test]
    fn test_non_numeric_subject() {
        let now = unix_seconds(Utc::now());
        let claims = TokenClaims {
            sub: "someone@example.com".to_string(),
            uid: Uuid::new_v4(),
            iat: now,
            exp: now + 60,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        let decoded = issuer().decode(&token).unwrap();
        assert!(matches!(decoded.account_id(), Err(JwtError::InvalidSubject)));
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(matches!(
            TokenIssuer::new(b"short", JwtAlgorithm::Hs256),
            Err(JwtError::WeakSecret)
        ));
    }

    #[test]
    fn test_overflowing_lifetime_rejected() {
        let result = issuer().issue(1, Uuid::new_v4(), Duration::days(365 * 1_000_000));
        assert!(matches!(result, Err(JwtError::InvalidLifetime)));
    }

    #[test]
    fn test_expires_at_matches_claim() {
        let signed = issuer().issue(1, Uuid::new_v4(), Duration::minutes(1)).unwrap();
        assert_eq!(signed.claims.expires_at().timestamp() as u64, signed.claims.exp);
    }
}
