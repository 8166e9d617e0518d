//! Record fingerprints
//!
//! A run reports the digest of the record it was given so callers can check
//! the input was never mutated along the way.

use crate::models::Record;
use sha2::{Digest, Sha256};
use std::io::Write;

/// SHA-256 over the record's ordered JSON form, hex encoded
/// Streams the serialization straight into the hasher
pub fn compute_record_fingerprint(record: &Record) -> String {
    let mut hasher = Sha256::new();

    if serde_json::to_writer(&mut HashWriter(&mut hasher), record).is_err() {
        return String::new();
    }

    hex::encode(hasher.finalize())
}

/// Adapter to allow writing into Sha256 via std::io::Write
struct HashWriter<'a, H: Digest>(&'a mut H);

impl<'a, H: Digest> Write for HashWriter<'a, H> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Record {
        Record::new()
            .with_field("subject_id", "AI_CORP")
            .with_field("market_report", "bullish")
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let record = sample();
        let digest = compute_record_fingerprint(&record);
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, compute_record_fingerprint(&record.clone()));
    }

    #[test]
    fn test_fingerprint_changes_with_content() {
        let changed = sample().with_field("market_report", "bearish");
        assert_ne!(
            compute_record_fingerprint(&sample()),
            compute_record_fingerprint(&changed)
        );
    }

    #[test]
    fn test_fingerprint_is_order_sensitive() {
        let reordered = Record::new()
            .with_field("market_report", "bullish")
            .with_field("subject_id", "AI_CORP");
        assert_ne!(
            compute_record_fingerprint(&sample()),
            compute_record_fingerprint(&reordered)
        );
    }
}
