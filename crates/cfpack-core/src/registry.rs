//! NuGet v3 registry queries.
//!
//! Publication is checked through the feed's service index: the
//! `RegistrationsBaseUrl` resource is looked up there, then the package's
//! registration index lists every published version. A package that was
//! never published answers 404, which is not an error.

use cfpack_schema::{RegistrationIndex, RegistrationPage, ServiceIndex};
use reqwest::{Client, StatusCode};
use semver::Version;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::PipelineError;

/// Read-only client for one NuGet v3 feed.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    client: Client,
    service_index_url: String,
}

impl RegistryClient {
    /// Query the feed whose service index lives at `service_index_url`.
    pub fn new(client: Client, service_index_url: impl Into<String>) -> Self {
        Self {
            client,
            service_index_url: service_index_url.into(),
        }
    }

    /// Resolve the registration base URL from the service index.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::RegistryUnavailable`] if the index cannot be
    /// fetched or lacks a `RegistrationsBaseUrl` resource.
    pub async fn registrations_base_url(&self) -> Result<String, PipelineError> {
        let index: ServiceIndex = self
            .get_json(&self.service_index_url)
            .await?
            .ok_or_else(|| {
                PipelineError::RegistryUnavailable(format!(
                    "service index not found at {}",
                    self.service_index_url
                ))
            })?;

        index
            .registrations_base_url()
            .map(str::to_owned)
            .ok_or_else(|| {
                PipelineError::RegistryUnavailable(format!(
                    "{} has no RegistrationsBaseUrl resource",
                    self.service_index_url
                ))
            })
    }

    /// Every version of `package_id` the feed knows about, in feed order.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::RegistryUnavailable`] for any failure other
    /// than the package being absent.
    pub async fn published_versions(&self, package_id: &str) -> Result<Vec<String>, PipelineError> {
        let base = self.registrations_base_url().await?;
        let url = format!(
            "{}/{}/index.json",
            base.trim_end_matches('/'),
            package_id.to_lowercase()
        );
        debug!(%url, "querying registration index");

        let Some(index) = self.get_json::<RegistrationIndex>(&url).await? else {
            debug!(package_id, "package has never been published");
            return Ok(Vec::new());
        };

        let mut versions = Vec::new();
        for page in &index.items {
            if page.needs_fetch() {
                let fetched: RegistrationPage =
                    self.get_json(&page.id).await?.ok_or_else(|| {
                        PipelineError::RegistryUnavailable(format!(
                            "registration page {} not found",
                            page.id
                        ))
                    })?;
                versions.extend(fetched.versions().map(str::to_owned));
            } else {
                versions.extend(page.versions().map(str::to_owned));
            }
        }
        Ok(versions)
    }

    /// Whether `version` of `package_id` is already on the feed.
    ///
    /// The version's canonical string must appear exactly in the feed's list.
    ///
    /// # Errors
    ///
    /// See [`RegistryClient::published_versions`].
    pub async fn is_version_published(
        &self,
        package_id: &str,
        version: &Version,
    ) -> Result<bool, PipelineError> {
        let wanted = version.to_string();
        let published = self
            .published_versions(package_id)
            .await?
            .contains(&wanted);
        debug!(package_id, %version, published, "publication check");
        Ok(published)
    }

    /// GET and decode JSON; `None` on 404.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>, PipelineError> {
        let unavailable = |e: reqwest::Error| PipelineError::RegistryUnavailable(format!("{url}: {e}"));

        let response = self.client.get(url).send().await.map_err(unavailable)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response.error_for_status().map_err(unavailable)?;
        response.json().await.map(Some).map_err(unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Server, ServerGuard};

    const PACKAGE: &str = "CloudFoundry.CommandLine.linux-x64";

    async fn server_with_index() -> ServerGuard {
        let mut server = Server::new_async().await;
        let body = format!(
            r#"{{
                "version": "3.0.0",
                "resources": [
                    {{ "@id": "{0}/search", "@type": "SearchQueryService" }},
                    {{ "@id": "{0}/registration/", "@type": "RegistrationsBaseUrl" }},
                    {{ "@id": "{0}/gz/", "@type": "RegistrationsBaseUrl/3.4.0" }}
                ]
            }}"#,
            server.url()
        );
        server
            .mock("GET", "/v3/index.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;
        server
    }

    fn inline_index(versions: &[&str]) -> String {
        let leaves: Vec<String> = versions
            .iter()
            .map(|v| format!(r#"{{ "catalogEntry": {{ "id": "{PACKAGE}", "version": "{v}" }} }}"#))
            .collect();
        format!(
            r#"{{ "count": 1, "items": [ {{ "@id": "page0", "count": {}, "items": [ {} ] }} ] }}"#,
            versions.len(),
            leaves.join(",")
        )
    }

    fn registry(server: &ServerGuard) -> RegistryClient {
        RegistryClient::new(Client::new(), format!("{}/v3/index.json", server.url()))
    }

    #[tokio::test]
    async fn test_version_published() {
        let mut server = server_with_index().await;
        let _m = server
            .mock("GET", "/registration/cloudfoundry.commandline.linux-x64/index.json")
            .with_status(200)
            .with_body(inline_index(&["7.1.0", "7.2.0"]))
            .create_async()
            .await;

        let published = registry(&server)
            .is_version_published(PACKAGE, &Version::new(7, 2, 0))
            .await
            .unwrap();
        assert!(published);
    }

    #[tokio::test]
    async fn test_version_not_yet_published() {
        let mut server = server_with_index().await;
        let _m = server
            .mock("GET", "/registration/cloudfoundry.commandline.linux-x64/index.json")
            .with_status(200)
            .with_body(inline_index(&["7.1.0"]))
            .create_async()
            .await;

        let published = registry(&server)
            .is_version_published(PACKAGE, &Version::new(7, 2, 0))
            .await
            .unwrap();
        assert!(!published);
    }

    #[tokio::test]
    async fn test_unknown_package_is_unpublished() {
        let mut server = server_with_index().await;
        let _m = server
            .mock("GET", "/registration/cloudfoundry.commandline.linux-x64/index.json")
            .with_status(404)
            .create_async()
            .await;

        let client = registry(&server);
        assert!(client.published_versions(PACKAGE).await.unwrap().is_empty());
        assert!(
            !client
                .is_version_published(PACKAGE, &Version::new(7, 2, 0))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_linked_pages_are_fetched() {
        let mut server = server_with_index().await;
        let index = format!(
            r#"{{ "items": [ {{ "@id": "{}/registration/page/1.json", "lower": "6.0.0", "upper": "7.2.0" }} ] }}"#,
            server.url()
        );
        let _index = server
            .mock("GET", "/registration/cloudfoundry.commandline.linux-x64/index.json")
            .with_status(200)
            .with_body(index)
            .create_async()
            .await;
        let page = server
            .mock("GET", "/registration/page/1.json")
            .with_status(200)
            .with_body(
                r#"{ "items": [
                    { "catalogEntry": { "version": "6.0.0" } },
                    { "catalogEntry": { "version": "7.2.0" } }
                ] }"#,
            )
            .expect(1)
            .create_async()
            .await;

        let versions = registry(&server).published_versions(PACKAGE).await.unwrap();
        assert_eq!(versions, ["6.0.0", "7.2.0"]);
        page.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_is_registry_unavailable() {
        let mut server = server_with_index().await;
        let _m = server
            .mock("GET", "/registration/cloudfoundry.commandline.linux-x64/index.json")
            .with_status(503)
            .create_async()
            .await;

        let err = registry(&server)
            .is_version_published(PACKAGE, &Version::new(7, 2, 0))
            .await
            .unwrap_err();
        assert!(err.is_registry_unavailable(), "{err}");
    }

    #[tokio::test]
    async fn test_missing_registration_resource() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/v3/index.json")
            .with_status(200)
            .with_body(r#"{ "resources": [ { "@id": "x", "@type": "SearchQueryService" } ] }"#)
            .create_async()
            .await;

        let err = registry(&server).registrations_base_url().await.unwrap_err();
        assert!(err.is_registry_unavailable());
        assert!(err.to_string().contains("RegistrationsBaseUrl"));
    }
}
