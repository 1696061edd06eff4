use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Number of random base-36 digits in a generated identifier.
const RANDOM_DIGITS: usize = 11;

/// Opaque identifier scoping server-side chat ownership to this client.
///
/// Not a credential: it is random but not cryptographically strong, and the
/// server trusts it as-is. Generated once and persisted indefinitely.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    /// Generate a new identifier: random base-36 digits followed by the
    /// current time in milliseconds, also in base 36.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut id: String = (0..RANDOM_DIGITS)
            .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
            .collect();
        id.push_str(&to_base36(Utc::now().timestamp_millis().unsigned_abs()));
        Self(id)
    }

    /// Wrap a previously persisted identifier.
    pub fn from_stored(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return None;
        }
        Some(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE36[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_id_is_alphanumeric() {
        let id = ClientId::generate();
        assert!(id.as_str().len() > RANDOM_DIGITS);
        assert!(id
            .as_str()
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn test_generated_ids_differ() {
        assert_ne!(ClientId::generate(), ClientId::generate());
    }

    #[test]
    fn test_to_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }

    #[test]
    fn test_from_stored_rejects_blank() {
        assert!(ClientId::from_stored("  ").is_none());
        assert_eq!(ClientId::from_stored("abc").unwrap().as_str(), "abc");
    }
}
