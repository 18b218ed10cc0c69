//! End-to-end pipeline runs against mocked upstream and feed endpoints.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, bail};
use async_trait::async_trait;
use cfpack_core::pack::artifact_digest;
use cfpack_core::pipeline::{Pipeline, PushOutcome};
use cfpack_core::{NullReporter, PackageTool, PipelineConfig, PipelineError};
use cfpack_schema::{ArchiveFormat, PACKAGE_ID_PREFIX, PLATFORMS, PlatformDescriptor};
use flate2::Compression;
use flate2::write::GzEncoder;
use mockito::{Matcher, Mock, Server, ServerGuard};
use semver::Version;
use tempfile::TempDir;

/// Packs by concatenating the nuspec and the normalized binary, so output
/// depends only on its inputs.
#[derive(Default)]
struct FakeNuget {
    pushed: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl PackageTool for FakeNuget {
    async fn pack(&self, nuspec: &Path, version: &Version, output_dir: &Path) -> anyhow::Result<()> {
        let stem = nuspec
            .file_stem()
            .context("nuspec has no name")?
            .to_string_lossy()
            .into_owned();
        let rid = stem
            .strip_prefix(&format!("{PACKAGE_ID_PREFIX}."))
            .context("unexpected nuspec name")?;
        let platform = PlatformDescriptor::find(rid).context("unknown platform")?;
        let working = nuspec.parent().context("nuspec has no parent")?;

        let binary = working.join(platform.platform_id).join(platform.binary_name);
        if !binary.exists() {
            bail!("{} missing", binary.display());
        }

        let mut package = std::fs::read(nuspec)?;
        package.extend(std::fs::read(binary)?);
        std::fs::write(output_dir.join(format!("{stem}.{version}.nupkg")), package)?;
        Ok(())
    }

    async fn push(&self, artifact: &Path, _: &str, _: Option<&str>) -> anyhow::Result<()> {
        self.pushed.lock().unwrap().push(artifact.to_path_buf());
        Ok(())
    }
}

fn zip_archive(binary: &str) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    writer.start_file(binary, options).unwrap();
    writer.write_all(b"MZ windows cf").unwrap();
    writer.start_file("LICENSE", options).unwrap();
    writer.write_all(b"Apache-2.0").unwrap();
    writer.finish().unwrap().into_inner()
}

fn tgz_archive(binary: &str) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, body) in [(binary, b"\x7fELF cf".as_slice()), ("LICENSE", b"Apache-2.0".as_slice())] {
        let mut header = tar::Header::new_gnu();
        header.set_size(body.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder.append_data(&mut header, name, body).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

struct Upstream {
    server: ServerGuard,
    downloads: Vec<Mock>,
}

/// Mock the release API (hit `lookups` times) and one download per platform
/// (each hit exactly once).
async fn upstream(lookups: usize) -> Upstream {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/repos/cloudfoundry/cli/releases/latest")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{ "tag_name": "v7.2.0", "name": "v7.2.0", "draft": false, "prerelease": false }"#)
        .expect(lookups)
        .create_async()
        .await;

    let mut downloads = Vec::new();
    for platform in PLATFORMS {
        let body = match platform.archive_format {
            ArchiveFormat::Zip => zip_archive("cf.exe"),
            ArchiveFormat::TarGz => tgz_archive("cf7"),
        };
        let mock = server
            .mock("GET", "/stable")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("release".into(), platform.release_channel.into()),
                Matcher::UrlEncoded("version".into(), "7.2.0".into()),
            ]))
            .with_status(200)
            .with_body(body)
            .expect(1)
            .create_async()
            .await;
        downloads.push(mock);
    }
    Upstream { server, downloads }
}

fn workspace(server: &ServerGuard) -> (TempDir, PipelineConfig) {
    let temp = tempfile::tempdir().unwrap();
    let config = PipelineConfig::new(temp.path())
        .with_release_api_url(server.url())
        .with_download_base_url(format!("{}/stable", server.url()))
        .with_service_index_url(format!("{}/v3/index.json", server.url()))
        .with_push_source(format!("{}/v3/index.json", server.url()))
        .with_api_key(Some("secret".to_string()));

    std::fs::create_dir_all(&config.nuspec_dir).unwrap();
    for platform in PLATFORMS {
        let nuspec = format!(
            "<package><metadata><id>{}</id></metadata><files><file src=\"{}/{}\" target=\"tools/{}\" /></files></package>",
            platform.package_id(),
            platform.platform_id,
            platform.binary_name,
            platform.binary_name
        );
        std::fs::write(config.nuspec_path(&platform), nuspec).unwrap();
    }
    (temp, config)
}

async fn mock_feed(server: &mut ServerGuard, versions: &[&str]) {
    let index = format!(
        r#"{{ "resources": [ {{ "@id": "{}/registration/", "@type": "RegistrationsBaseUrl" }} ] }}"#,
        server.url()
    );
    server
        .mock("GET", "/v3/index.json")
        .with_status(200)
        .with_body(index)
        .create_async()
        .await;

    let leaves: Vec<String> = versions
        .iter()
        .map(|v| format!(r#"{{ "catalogEntry": {{ "version": "{v}" }} }}"#))
        .collect();
    server
        .mock("GET", "/registration/cloudfoundry.commandline.linux-x64/index.json")
        .with_status(200)
        .with_body(format!(r#"{{ "items": [ {{ "@id": "p", "items": [ {} ] }} ] }}"#, leaves.join(",")))
        .create_async()
        .await;
}

fn digests(artifacts: &[PathBuf]) -> Vec<String> {
    artifacts.iter().map(|a| artifact_digest(a).unwrap()).collect()
}

#[tokio::test]
async fn test_repeated_pack_is_deterministic_and_downloads_once() {
    let upstream = upstream(2).await;
    let (_temp, config) = workspace(&upstream.server);
    let tool = FakeNuget::default();
    let pipeline = Pipeline::new(&config, &tool, &NullReporter).unwrap();

    let first = pipeline.pack().await.unwrap();
    assert_eq!(first.version, Version::new(7, 2, 0));
    assert_eq!(first.artifacts.len(), PLATFORMS.len());
    let first_digests = digests(&first.artifacts);

    let second = pipeline.pack().await.unwrap();
    assert_eq!(second.artifacts, first.artifacts);
    assert_eq!(digests(&second.artifacts), first_digests);

    for mock in &upstream.downloads {
        mock.assert_async().await;
    }

    let linux = config.platform_dir(&PlatformDescriptor::find("linux-x64").unwrap());
    assert!(linux.join("cf").exists());
    assert!(!linux.join("cf7").exists());
}

#[tokio::test]
async fn test_parallel_jobs_keep_platform_order() {
    let upstream = upstream(1).await;
    let (_temp, config) = workspace(&upstream.server);
    let config = config.with_jobs(3);
    let tool = FakeNuget::default();

    let outcome = Pipeline::new(&config, &tool, &NullReporter)
        .unwrap()
        .pack()
        .await
        .unwrap();

    let expected: Vec<PathBuf> = PLATFORMS
        .iter()
        .map(|p| config.artifacts_dir.join(p.package_file_name(&outcome.version)))
        .collect();
    assert_eq!(outcome.artifacts, expected);
}

#[tokio::test]
async fn test_failed_platform_does_not_stop_others() {
    let upstream = upstream(1).await;
    let (_temp, config) = workspace(&upstream.server);
    std::fs::remove_file(config.nuspec_path(&PlatformDescriptor::find("osx-x64").unwrap())).unwrap();
    let tool = FakeNuget::default();

    let err = Pipeline::new(&config, &tool, &NullReporter)
        .unwrap()
        .pack()
        .await
        .unwrap_err();

    match err {
        PipelineError::Incomplete(failures) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].platform, "osx-x64");
            assert!(matches!(failures[0].error, PipelineError::PackagingFailed { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    let built = std::fs::read_dir(&config.artifacts_dir).unwrap().count();
    assert_eq!(built, PLATFORMS.len() - 1);
}

#[tokio::test]
async fn test_release_skips_push_when_published() {
    let mut upstream = upstream(1).await;
    mock_feed(&mut upstream.server, &["7.1.0", "7.2.0"]).await;
    let (_temp, config) = workspace(&upstream.server);
    let tool = FakeNuget::default();

    let outcome = Pipeline::new(&config, &tool, &NullReporter)
        .unwrap()
        .release(false)
        .await
        .unwrap();

    assert_eq!(outcome, PushOutcome::AlreadyPublished(Version::new(7, 2, 0)));
    assert!(tool.pushed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_release_pushes_every_package() {
    let mut upstream = upstream(1).await;
    mock_feed(&mut upstream.server, &["7.1.0"]).await;
    let (_temp, config) = workspace(&upstream.server);
    let tool = FakeNuget::default();

    let outcome = Pipeline::new(&config, &tool, &NullReporter)
        .unwrap()
        .release(false)
        .await
        .unwrap();

    let PushOutcome::Pushed { version, artifacts } = outcome else {
        panic!("expected a push, got {outcome:?}");
    };
    assert_eq!(version, Version::new(7, 2, 0));
    assert_eq!(artifacts.len(), PLATFORMS.len());
    assert_eq!(tool.pushed.lock().unwrap().len(), PLATFORMS.len());
}

#[tokio::test]
async fn test_dry_run_push_invokes_nothing() {
    let mut server = Server::new_async().await;
    mock_feed(&mut server, &[]).await;
    let (_temp, config) = workspace(&server);
    let config = config
        .with_explicit_version(Some("7.2.0".to_string()))
        .with_platforms(vec![PlatformDescriptor::find("win-x64").unwrap()]);
    std::fs::create_dir_all(&config.artifacts_dir).unwrap();
    std::fs::write(
        config.artifacts_dir.join("CloudFoundry.CommandLine.win-x64.7.2.0.nupkg"),
        b"pkg",
    )
    .unwrap();
    let tool = FakeNuget::default();

    let outcome = Pipeline::new(&config, &tool, &NullReporter)
        .unwrap()
        .push(true)
        .await
        .unwrap();

    assert!(matches!(outcome, PushOutcome::DryRun { ref artifacts, .. } if artifacts.len() == 1));
    assert!(tool.pushed.lock().unwrap().is_empty());
}

fn seed_artifacts(config: &PipelineConfig, names: &[&str]) {
    std::fs::create_dir_all(&config.artifacts_dir).unwrap();
    for name in names {
        std::fs::write(config.artifacts_dir.join(name), b"pkg").unwrap();
    }
}

#[tokio::test]
async fn test_push_ignores_stale_version_packages() {
    let mut server = Server::new_async().await;
    mock_feed(&mut server, &["7.1.0"]).await;
    let (_temp, config) = workspace(&server);
    let config = config
        .with_explicit_version(Some("7.2.0".to_string()))
        .with_platforms(vec![PlatformDescriptor::find("linux-x64").unwrap()]);
    seed_artifacts(&config, &["CloudFoundry.CommandLine.linux-x64.7.1.0.nupkg"]);
    let tool = FakeNuget::default();

    let err = Pipeline::new(&config, &tool, &NullReporter)
        .unwrap()
        .push(false)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::NoArtifacts(_)), "{err}");
    assert!(tool.pushed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_push_sends_only_expected_packages() {
    let mut server = Server::new_async().await;
    mock_feed(&mut server, &["7.1.0"]).await;
    let (_temp, config) = workspace(&server);
    let config = config
        .with_explicit_version(Some("7.2.0".to_string()))
        .with_platforms(vec![
            PlatformDescriptor::find("win-x64").unwrap(),
            PlatformDescriptor::find("linux-x64").unwrap(),
        ]);
    seed_artifacts(
        &config,
        &[
            "CloudFoundry.CommandLine.linux-x64.7.1.0.nupkg",
            "CloudFoundry.CommandLine.linux-x64.7.2.0.nupkg",
            "CloudFoundry.CommandLine.osx-x64.7.2.0.nupkg",
            "CloudFoundry.CommandLine.win-x64.7.2.0.nupkg",
        ],
    );
    let tool = FakeNuget::default();

    let outcome = Pipeline::new(&config, &tool, &NullReporter)
        .unwrap()
        .push(false)
        .await
        .unwrap();

    let expected = vec![
        config.artifacts_dir.join("CloudFoundry.CommandLine.linux-x64.7.2.0.nupkg"),
        config.artifacts_dir.join("CloudFoundry.CommandLine.win-x64.7.2.0.nupkg"),
    ];
    let mut pushed = tool.pushed.lock().unwrap().clone();
    pushed.sort();
    assert_eq!(pushed, expected);
    assert!(matches!(outcome, PushOutcome::Pushed { ref artifacts, .. } if artifacts.len() == 2));
}

#[tokio::test]
async fn test_push_fails_when_a_platform_package_is_missing() {
    let mut server = Server::new_async().await;
    mock_feed(&mut server, &["7.1.0"]).await;
    let (_temp, config) = workspace(&server);
    let config = config
        .with_explicit_version(Some("7.2.0".to_string()))
        .with_platforms(vec![
            PlatformDescriptor::find("win-x64").unwrap(),
            PlatformDescriptor::find("linux-x64").unwrap(),
        ]);
    seed_artifacts(&config, &["CloudFoundry.CommandLine.win-x64.7.2.0.nupkg"]);
    let tool = FakeNuget::default();

    let err = Pipeline::new(&config, &tool, &NullReporter)
        .unwrap()
        .push(false)
        .await
        .unwrap_err();

    match err {
        PipelineError::MissingArtifacts(missing) => assert_eq!(
            missing,
            [config.artifacts_dir.join("CloudFoundry.CommandLine.linux-x64.7.2.0.nupkg")]
        ),
        other => panic!("unexpected error: {other}"),
    }
    assert!(tool.pushed.lock().unwrap().is_empty());
}
