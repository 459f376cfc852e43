/// Canonical form of a raw field name: trimmed, internal spaces replaced
/// with underscores, lower-cased.
///
/// This is the single normalization routine in the crate. Source
/// extraction and the write path both go through it; a second
/// implementation anywhere would break the both/source-only classification.
pub fn normalize(raw: &str) -> String {
    raw.trim().replace(' ', "_").to_lowercase()
}

#[cfg(test)]
mod tests;
