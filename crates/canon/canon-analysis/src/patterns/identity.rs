//! Stable pattern identity.

use xxhash_rust::xxh3::xxh3_64;

use super::content::PatternContent;

/// Stable id: xxh3 of the pattern type and the canonical content JSON.
///
/// The same logical rule always hashes to the same id, across runs and
/// across projects.
pub fn pattern_id(content: &PatternContent) -> String {
    let mut input = String::from(content.pattern_type().name());
    input.push('\0');
    input.push_str(&content.canonical_json());
    format!("{:016x}", xxh3_64(input.as_bytes()))
}
