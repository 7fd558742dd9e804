use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::CryptoError;

pub const SALT_LENGTH: usize = 16;
pub const HASH_LENGTH: usize = 32;

const SCHEME: &str = "pbkdf2-sha256";

/// Stored for guest patients. Never parses as a hash, so it never verifies.
pub const GUEST_PASSWORD_PLACEHOLDER: &str = "!guest";

/// Generate a cryptographically random salt
pub fn generate_salt() -> [u8; SALT_LENGTH] {
    use rand::RngCore;
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; HASH_LENGTH] {
    let mut out = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut out);
    out
}

/// Hash a password as `pbkdf2-sha256$<iterations>$<salt>$<hash>`.
///
/// CPU-bound; call from `spawn_blocking` in async code.
pub fn hash_password(password: &str, iterations: u32) -> String {
    let salt = generate_salt();
    let hash = derive(password, &salt, iterations);
    format!(
        "{SCHEME}${iterations}${}${}",
        STANDARD_NO_PAD.encode(salt),
        STANDARD_NO_PAD.encode(hash)
    )
}

struct ParsedHash {
    iterations: u32,
    salt: Vec<u8>,
    hash: Vec<u8>,
}

fn parse(stored: &str) -> Result<ParsedHash, CryptoError> {
    let mut parts = stored.split('$');
    if parts.next() != Some(SCHEME) {
        return Err(CryptoError::MalformedHash);
    }
    let iterations = parts
        .next()
        .and_then(|s| s.parse::<u32>().ok())
        .filter(|n| *n > 0)
        .ok_or(CryptoError::MalformedHash)?;
    let salt = parts
        .next()
        .and_then(|s| STANDARD_NO_PAD.decode(s).ok())
        .ok_or(CryptoError::MalformedHash)?;
    let hash = parts
        .next()
        .and_then(|s| STANDARD_NO_PAD.decode(s).ok())
        .filter(|h| h.len() == HASH_LENGTH)
        .ok_or(CryptoError::MalformedHash)?;
    if parts.next().is_some() {
        return Err(CryptoError::MalformedHash);
    }
    Ok(ParsedHash {
        iterations,
        salt,
        hash,
    })
}

/// Check `password` against a stored hash. Anything that is not a
/// well-formed hash (the guest placeholder included) is a mismatch.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Ok(parsed) = parse(stored) else {
        return false;
    };
    let candidate = derive(password, &parsed.salt, parsed.iterations);
    candidate.ct_eq(parsed.hash.as_slice()).into()
}
