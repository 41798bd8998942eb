use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 digest of normalized (LF-terminated, trimmed) raw
/// content, used to detect re-ingestion of byte-identical documents.
pub fn content_hash(raw: &str) -> String {
    let normalized = normalize(raw);
    let digest = Sha256::digest(normalized.as_bytes());
    hex_encode(&digest)
}

fn normalize(raw: &str) -> String {
    let unified = raw.replace("\r\n", "\n");
    let trimmed = unified.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}\n")
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_content_hashes_equal() {
        assert_eq!(content_hash("hello\n"), content_hash("hello"));
    }

    #[test]
    fn crlf_and_lf_hash_equal() {
        assert_eq!(content_hash("a\r\nb"), content_hash("a\nb"));
    }

    #[test]
    fn different_content_hashes_differ() {
        assert_ne!(content_hash("a"), content_hash("b"));
    }
}
