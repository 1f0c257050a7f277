//! Short code and API key generation.

use rand::Rng;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

pub const DEFAULT_CODE_LENGTH: usize = 6;

const API_KEY_LENGTH: usize = 32;
const API_KEY_PREFIX: &str = "snip_";

/// Draw `length` characters uniformly and independently from the 62-character
/// alphanumeric alphabet. 62^6 candidate codes keep the collision rate
/// negligible at realistic table sizes; the store's unique constraint catches
/// the remainder.
pub fn generate_code(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Custom codes accept alphanumerics plus `_` and `-`, nothing else. The
/// caller checks the storage length limit separately.
pub fn is_valid_custom_code(code: &str) -> bool {
    !code.is_empty()
        && code
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// Generate a bearer API key. `ThreadRng` reseeds from the operating system
/// and is suitable for credentials, unlike what short codes require.
pub fn generate_api_key() -> String {
    let mut rng = rand::rng();
    let body: String = (0..API_KEY_LENGTH)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect();
    format!("{API_KEY_PREFIX}{body}")
}
