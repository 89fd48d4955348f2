//! ID generation utilities for Postforge
//!
//! Provides identifiers that tie log lines, artifacts and failure reports
//! back to a single loop run.

use rand::Rng;

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Generate a unique run ID for one request's loop
///
/// Format: `{platform}-{ticker}-{timestamp_ms}-{random_hex}`
/// Example: `twitter-aapl-1738300800123-a1b2`
pub fn generate_run_id(platform: &str, ticker: &str) -> String {
    let random: u16 = rand::rng().random();
    format!(
        "{}-{}-{}-{:04x}",
        platform,
        ticker.to_lowercase(),
        now_ms(),
        random
    )
}

/// Short content fingerprint: the first 16 hex chars of the SHA-256 digest
pub fn fingerprint(text: &str) -> String {
    use sha2::{Digest, Sha256};

    let digest = Sha256::digest(text.as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(16);
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_ms_returns_reasonable_timestamp() {
        let ts = now_ms();
        assert!(ts > 1577836800000); // 2020-01-01
        assert!(ts < 4102444800000); // 2100-01-01
    }

    #[test]
    fn test_generate_run_id_format() {
        let id = generate_run_id("twitter", "AAPL");
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "twitter");
        assert_eq!(parts[1], "aapl");
        assert!(parts[2].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[3].len(), 4);
        assert!(parts[3].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generate_run_id_unique() {
        let ids: std::collections::HashSet<String> =
            (0..50).map(|_| generate_run_id("xueqiu", "tsm")).collect();
        // Random suffix makes collisions within one millisecond very unlikely
        assert!(ids.len() > 45);
    }

    #[test]
    fn test_fingerprint_stable() {
        let a = fingerprint("hello world");
        let b = fingerprint("hello world");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert_eq!(a, "b94d27b9934d3e08");
    }

    #[test]
    fn test_fingerprint_differs() {
        assert_ne!(fingerprint("a"), fingerprint("b"));
    }
}
