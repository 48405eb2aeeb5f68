//! Small helpers shared across the filesystem: wall-clock seconds and the
//! random shard-prefixed blob path assigned to every new file (§3, "path").

use rand::RngCore;
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the epoch, truncated to the 32-bit width the index stores.
pub fn now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as u32
}

/// A fresh `XX/YYYY…` backing-store-relative path: 20 random bytes, hex
/// encoded, split into a two-hex-digit shard prefix and a 38-hex-digit
/// suffix.
pub fn fresh_blob_path() -> String {
    let mut bytes = [0u8; 20];
    rand::thread_rng().fill_bytes(&mut bytes);
    let hex = hex::encode(bytes);
    format!("{}/{}", &hex[..2], &hex[2..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_blob_path_has_expected_shape() {
        let path = fresh_blob_path();
        assert_eq!(path.len(), 41);
        let (shard, suffix) = path.split_once('/').unwrap();
        assert_eq!(shard.len(), 2);
        assert_eq!(suffix.len(), 38);
        assert!(path.chars().all(|c| c == '/' || c.is_ascii_hexdigit()));
    }

    #[test]
    fn fresh_blob_path_is_random() {
        assert_ne!(fresh_blob_path(), fresh_blob_path());
    }
}
