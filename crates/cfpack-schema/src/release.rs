//! GitHub release metadata.

use serde::Deserialize;

/// The subset of a GitHub release object used to resolve versions.
#[derive(Debug, Clone, Deserialize)]
pub struct GithubRelease {
    /// Git tag the release was cut from, e.g. `v7.2.0`.
    #[serde(default)]
    pub tag_name: String,
    /// Human-readable release title, used when the tag is blank.
    #[serde(default)]
    pub name: Option<String>,
}
