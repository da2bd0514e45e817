//! Password hashing for patient and doctor accounts.
//!
//! Stored format: `pbkdf2-sha256$<iterations>$<salt b64>$<hash b64>`.
//! The iteration count travels with the hash so it can be raised without
//! invalidating existing accounts.

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

const SCHEME: &str = "pbkdf2-sha256";
const SALT_LENGTH: usize = 16;
const HASH_LENGTH: usize = 32;

#[cfg(not(test))]
pub const PBKDF2_ITERATIONS: u32 = 600_000;
#[cfg(test)]
pub const PBKDF2_ITERATIONS: u32 = 1_000;

#[derive(Error, Debug, PartialEq)]
pub enum AuthError {
    #[error("Malformed password hash")]
    MalformedHash,

    #[error("Unsupported password hash scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Password must not be empty")]
    EmptyPassword,
}

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    if password.is_empty() {
        return Err(AuthError::EmptyPassword);
    }
    let salt = generate_salt();
    let hash = derive(password, &salt, PBKDF2_ITERATIONS);
    Ok(format!(
        "{SCHEME}${PBKDF2_ITERATIONS}${}${}",
        STANDARD_NO_PAD.encode(salt),
        STANDARD_NO_PAD.encode(hash)
    ))
}

/// Check a password against a stored hash in constant time.
///
/// A wrong password is `Ok(false)`; only an unparseable stored value is an
/// error.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, AuthError> {
    let mut parts = stored.split('$');
    let (Some(scheme), Some(iterations), Some(salt), Some(hash), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return Err(AuthError::MalformedHash);
    };
    if scheme != SCHEME {
        return Err(AuthError::UnsupportedScheme(scheme.to_string()));
    }
    let iterations: u32 = iterations.parse().map_err(|_| AuthError::MalformedHash)?;
    if iterations == 0 {
        return Err(AuthError::MalformedHash);
    }
    let salt = STANDARD_NO_PAD
        .decode(salt)
        .map_err(|_| AuthError::MalformedHash)?;
    let expected = STANDARD_NO_PAD
        .decode(hash)
        .map_err(|_| AuthError::MalformedHash)?;
    if expected.len() != HASH_LENGTH {
        return Err(AuthError::MalformedHash);
    }

    let actual = derive(password, &salt, iterations);
    Ok(actual.ct_eq(expected.as_slice()).into())
}

fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; HASH_LENGTH] {
    let mut out = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut out);
    out
}

fn generate_salt() -> [u8; SALT_LENGTH] {
    use rand::RngCore;
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}
