//! Release tag parsing.
//!
//! Upstream tags look like `v7.2.0`. Anything before the first digit is
//! dropped and the remainder must be a full semantic version.

use semver::Version;
use thiserror::Error;

/// Errors produced while turning a release tag into a version.
#[derive(Error, Debug)]
pub enum VersionError {
    /// The tag has no digit to start a version from.
    #[error("no version number in '{0}'")]
    NoVersion(String),

    /// The numeric part is not a valid semantic version.
    #[error("invalid semantic version '{text}': {source}")]
    Invalid {
        /// The text after prefix stripping.
        text: String,
        /// Underlying parse failure.
        #[source]
        source: semver::Error,
    },
}

/// Parse a release tag into a semantic version, stripping any leading
/// non-numeric prefix.
///
/// # Example
///
/// ```
/// use cfpack_schema::parse_release_tag;
///
/// assert_eq!(parse_release_tag("v7.2.0").unwrap().to_string(), "7.2.0");
/// assert_eq!(parse_release_tag("7.2.0").unwrap().to_string(), "7.2.0");
/// assert!(parse_release_tag("latest").is_err());
/// ```
///
/// # Errors
///
/// Returns [`VersionError::NoVersion`] if the tag contains no digit and
/// [`VersionError::Invalid`] if the remainder is not valid semver.
pub fn parse_release_tag(tag: &str) -> Result<Version, VersionError> {
    let trimmed = tag.trim();
    let start = trimmed
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(|| VersionError::NoVersion(tag.to_string()))?;
    let text = &trimmed[start..];

    Version::parse(text).map_err(|source| VersionError::Invalid {
        text: text.to_string(),
        source,
    })
}
