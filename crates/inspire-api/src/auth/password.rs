/// Password hashing and verification using Argon2id
///
/// Digests are PHC strings (algorithm, parameters, salt and hash in one
/// value), so verification needs nothing but the stored string:
/// - Algorithm: Argon2id
/// - Memory: 64 MB
/// - Iterations: 3
/// - Parallelism: 4 lanes
/// - Salt: 16 bytes random
/// - Output: 32 bytes hash
use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};
use inspire_core::AuthConfig;
use thiserror::Error;
use tracing::warn;

/// Hashed once at startup; unknown-email logins verify against it so that
/// they cost the same as a wrong password.
const DUMMY_PASSWORD: &str = "inspire-dummy-password-Aa1!";

/// Password hashing errors
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashingFailed(String),

    #[error("Invalid Argon2 parameters: {0}")]
    InvalidParams(String),
}

/// Password hashing configuration
///
/// Increasing memory or iterations improves resistance to offline guessing
/// but slows down every login.
#[derive(Debug, Clone)]
pub struct PasswordConfig {
    /// Memory cost in KiB (default: 65536 = 64 MB)
    pub memory_cost: u32,
    /// Time cost (iterations, default: 3)
    pub time_cost: u32,
    /// Parallelism (lanes, default: 4)
    pub parallelism: u32,
    /// Output length in bytes (default: 32)
    pub output_len: Option<usize>,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_cost: 65536, // 64 MB
            time_cost: 3,
            parallelism: 4,
            output_len: Some(32),
        }
    }
}

impl PasswordConfig {
    /// Lowest-cost parameters Argon2 accepts. For tests and local tooling only.
    pub fn minimal() -> Self {
        Self {
            memory_cost: Params::MIN_M_COST,
            time_cost: 1,
            parallelism: 1,
            output_len: Some(32),
        }
    }

    fn to_params(&self) -> Result<Params, PasswordError> {
        Params::new(
            self.memory_cost,
            self.time_cost,
            self.parallelism,
            self.output_len,
        )
        .map_err(|e| PasswordError::InvalidParams(e.to_string()))
    }
}

impl From<&AuthConfig> for PasswordConfig {
    fn from(config: &AuthConfig) -> Self {
        Self {
            memory_cost: config.password_memory_kib,
            time_cost: config.password_iterations,
            parallelism: config.password_parallelism,
            ..Self::default()
        }
    }
}

/// Argon2id hasher with fixed cost parameters
pub struct PasswordHasher {
    params: Params,
    dummy_hash: String,
}

impl PasswordHasher {
    /// Build a hasher; fails if the parameters are out of Argon2's range
    pub fn new(config: &PasswordConfig) -> Result<Self, PasswordError> {
        let params = config.to_params()?;
        let dummy_hash = hash_with_params(DUMMY_PASSWORD, params.clone())?;
        Ok(Self { params, dummy_hash })
    }

    /// Hash a plaintext password with a fresh random salt
    ///
    /// Two calls with the same input produce different digests.
    pub fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        hash_with_params(plaintext, self.params.clone())
    }

    /// Check a plaintext password against a stored digest
    ///
    /// The cost parameters are read from the digest itself, so hashes created
    /// under older settings keep verifying. A malformed digest is a mismatch.
    pub fn verify(&self, plaintext: &str, digest: &str) -> bool {
        let parsed = match PasswordHash::new(digest) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Stored password hash is malformed: {}", e);
                return false;
            }
        };

        Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }

    /// Run a verification that always fails, at the cost of a real one
    pub fn verify_dummy(&self, plaintext: &str) -> bool {
        let _ = self.verify(plaintext, &self.dummy_hash);
        false
    }
}

fn hash_with_params(plaintext: &str, params: Params) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    argon2
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))
}

/// Validate password strength
///
/// Requires at least 8 characters with an uppercase letter, a lowercase
/// letter, a digit and a special character. The error names the first
/// missing requirement.
pub fn validate_password_strength(password: &str) -> Result<(), String> {
    if password.chars().count() < 8 {
        return Err("Password must be at least 8 characters long".to_string());
    }

    if !password.chars().any(|c| c.is_uppercase()) {
        return Err("Password must contain at least one uppercase letter".to_string());
    }

    if !password.chars().any(|c| c.is_lowercase()) {
        return Err("Password must contain at least one lowercase letter".to_string());
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain at least one digit".to_string());
    }

    if !password
        .chars()
        .any(|c| !c.is_alphanumeric() && !c.is_whitespace())
    {
        return Err("Password must contain at least one special character".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(&PasswordConfig::minimal()).unwrap()
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hasher = hasher();
        let hash = hasher.hash("SecureP@ssw0rd!").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("SecureP@ssw0rd!", &hash));
        assert!(!hasher.verify("WrongPassword", &hash));
    }

    #[test]
    fn test_same_password_produces_different_hashes() {
        let hasher = hasher();
        let hash1 = hasher.hash("SamePassword123!").unwrap();
        let hash2 = hasher.hash("SamePassword123!").unwrap();

        assert_ne!(hash1, hash2);
        assert!(hasher.verify("SamePassword123!", &hash1));
        assert!(hasher.verify("SamePassword123!", &hash2));
    }

    #[test]
    fn test_empty_password_hashes() {
        let hasher = hasher();
        let hash = hasher.hash("").unwrap();
        assert!(hasher.verify("", &hash));
        assert!(!hasher.verify(" ", &hash));
    }

    #[test]
    fn test_malformed_hash_is_mismatch() {
        let hasher = hasher();
        assert!(!hasher.verify("password", "invalid-hash-format"));
        assert!(!hasher.verify("password", ""));
    }

    #[test]
    fn test_verify_dummy_never_matches() {
        let hasher = hasher();
        assert!(!hasher.verify_dummy(DUMMY_PASSWORD));
        assert!(!hasher.verify_dummy("anything"));
    }

    #[test]
    fn test_custom_config_encoded_in_hash() {
        let config = PasswordConfig {
            memory_cost: 4096,
            time_cost: 2,
            parallelism: 2,
            output_len: Some(32),
        };
        let hasher = PasswordHasher::new(&config).unwrap();
        let hash = hasher.hash("TestPassword123!").unwrap();

        assert!(hash.contains("m=4096"));
        assert!(hash.contains("t=2"));
        assert!(hash.contains("p=2"));

        // A hasher with different settings still verifies it
        assert!(self::hasher().verify("TestPassword123!", &hash));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let config = PasswordConfig {
            time_cost: 0,
            ..PasswordConfig::minimal()
        };
        assert!(matches!(
            PasswordHasher::new(&config),
            Err(PasswordError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_config_from_auth_settings() {
        let auth = AuthConfig {
            password_memory_kib: 19456,
            password_iterations: 2,
            password_parallelism: 1,
            ..Default::default()
        };
        let config = PasswordConfig::from(&auth);
        assert_eq!(config.memory_cost, 19456);
        assert_eq!(config.time_cost, 2);
        assert_eq!(config.parallelism, 1);
    }

    #[test]
    fn test_password_strength_validation() {
        assert!(validate_password_strength("SecureP@ssw0rd!").is_ok());
        assert!(validate_password_strength("Abcdef1!").is_ok());

        // Too short
        assert!(validate_password_strength("Abc123!").is_err());
        // No uppercase
        assert!(validate_password_strength("password123!").is_err());
        // No lowercase
        assert!(validate_password_strength("PASSWORD123!").is_err());
        // No digit
        assert!(validate_password_strength("Password!").is_err());
        // No special character
        assert!(validate_password_strength("Password123").is_err());
        assert!(validate_password_strength("Password 123").is_err());
    }

    proptest! {
        #[test]
        fn prop_alphanumeric_only_is_weak(password in "[a-zA-Z0-9]{0,32}") {
            prop_assert!(validate_password_strength(&password).is_err());
        }

        #[test]
        fn prop_all_classes_present_is_strong(
            upper in "[A-Z]{1,4}",
            lower in "[a-z]{1,4}",
            digit in "[0-9]{1,4}",
            special in "[!@#$%^&*]{1,4}",
        ) {
            let password = format!("{upper}{lower}{digit}{special}xxxx");
            prop_assert!(validate_password_strength(&password).is_ok());
        }
    }
}
