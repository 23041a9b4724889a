//! Deterministic fingerprinting of conflict reports using blake3.
//!
//! A [`ConflictReport`] is kept in canonical order and contains no
//! `HashMap`, so its `serde_json` encoding is byte-stable. Two analysis runs
//! over the same catalog therefore yield the same fingerprint.

use procset_core::ConflictReport;

use crate::error::StorageError;

/// Computes a blake3 hash of the report's canonical JSON encoding.
pub fn report_fingerprint(report: &ConflictReport) -> Result<blake3::Hash, StorageError> {
    let bytes = serde_json::to_vec(report)?;
    Ok(blake3::hash(&bytes))
}

/// Hex form of [`report_fingerprint`], as stored in the registry.
pub fn report_fingerprint_hex(report: &ConflictReport) -> Result<String, StorageError> {
    Ok(report_fingerprint(report)?.to_hex().to_string())
}
