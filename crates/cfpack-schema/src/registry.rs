//! NuGet v3 protocol documents consumed by the publication check.
//!
//! Only the fields the check needs are modelled; everything else in the
//! responses is ignored during deserialization.

use serde::Deserialize;

/// `@type` of the service-index resource that points at registration metadata.
pub const REGISTRATIONS_BASE_URL: &str = "RegistrationsBaseUrl";

/// The service index (`/v3/index.json`) listing a feed's resources.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceIndex {
    /// Advertised resources.
    #[serde(default)]
    pub resources: Vec<ServiceResource>,
}

/// A single resource entry in the service index.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceResource {
    /// Resource URL.
    #[serde(rename = "@id")]
    pub id: String,
    /// Resource type, e.g. `RegistrationsBaseUrl` or `PackagePublish/2.0.0`.
    #[serde(rename = "@type")]
    pub kind: String,
}

impl ServiceIndex {
    /// Return the URL of the first resource whose type is exactly `kind`.
    pub fn find(&self, kind: &str) -> Option<&str> {
        self.resources
            .iter()
            .find(|r| r.kind == kind)
            .map(|r| r.id.as_str())
    }

    /// Base URL for registration (package metadata) queries.
    pub fn registrations_base_url(&self) -> Option<&str> {
        self.find(REGISTRATIONS_BASE_URL)
    }
}

/// Registration index for one package id (`{base}{id}/index.json`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationIndex {
    /// Pages of versions. Small packages inline their leaves; large ones
    /// only link to the page document.
    #[serde(default)]
    pub items: Vec<RegistrationPage>,
}

/// A page of the registration index.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationPage {
    /// URL of the page document.
    #[serde(rename = "@id", default)]
    pub id: String,
    /// Inlined leaves, absent when the page must be fetched separately.
    #[serde(default)]
    pub items: Option<Vec<RegistrationLeaf>>,
}

/// A single published version.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationLeaf {
    /// Catalog metadata for the version.
    #[serde(rename = "catalogEntry")]
    pub catalog_entry: CatalogEntry,
}

/// The part of a catalog entry the publication check reads.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    /// Normalized version string.
    pub version: String,
}

impl RegistrationPage {
    /// Whether the page has to be fetched from [`Self::id`] to see its versions.
    pub fn needs_fetch(&self) -> bool {
        self.items.is_none()
    }

    /// Versions inlined on this page.
    pub fn versions(&self) -> impl Iterator<Item = &str> {
        self.items
            .iter()
            .flatten()
            .map(|leaf| leaf.catalog_entry.version.as_str())
    }
}
