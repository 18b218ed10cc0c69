//! The shipped package descriptors must match the platform table.

use std::path::PathBuf;

use cfpack_schema::PLATFORMS;

fn nuspec_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../nuspec")
}

#[test]
fn test_every_platform_has_a_descriptor() {
    for platform in PLATFORMS {
        let path = nuspec_dir().join(platform.nuspec_file_name());
        let nuspec = std::fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("{}: {e}", path.display()));

        assert!(
            nuspec.contains(&format!("<id>{}</id>", platform.package_id())),
            "{platform}: wrong id"
        );
        let file = format!(
            r#"<file src="{}/{}" target="tools/{}" />"#,
            platform.platform_id, platform.binary_name, platform.binary_name
        );
        assert!(nuspec.contains(&file), "{platform}: expected {file}");
    }
}

#[test]
fn test_no_stray_descriptors() {
    let count = std::fs::read_dir(nuspec_dir())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "nuspec"))
        .count();
    assert_eq!(count, PLATFORMS.len());
}
