//! The fixed set of platforms a release is mirrored for.
//!
//! Upstream publishes one archive per platform. Windows builds ship as a zip
//! holding `cf.exe`; Unix builds ship as a gzip tarball whose binary name
//! carries the major version (`cf7`, `cf8`), so the canonical name has to be
//! restored after extraction.
//!
//! # Example
//!
//! ```
//! use cfpack_schema::{ArchiveFormat, PlatformDescriptor};
//!
//! let linux = PlatformDescriptor::find("linux-x64").unwrap();
//! assert_eq!(linux.archive_format, ArchiveFormat::TarGz);
//! assert_eq!(linux.package_id(), "CloudFoundry.CommandLine.linux-x64");
//! ```

use semver::Version;

use crate::PACKAGE_ID_PREFIX;

/// Container format of an upstream release archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    /// Zip archive (`.zip`), used for Windows builds.
    Zip,
    /// Gzip-compressed tar archive (`.tgz`), used for Linux and macOS builds.
    TarGz,
}

impl ArchiveFormat {
    /// File extension used for cached archives of this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::TarGz => "tgz",
        }
    }
}

impl std::fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Zip => write!(f, "zip"),
            Self::TarGz => write!(f, "tar.gz"),
        }
    }
}

/// A platform the upstream CLI is released for.
///
/// `platform_id` is unique across [`PLATFORMS`]. It is used as the extraction
/// directory name and as the package identifier suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlatformDescriptor {
    /// Runtime identifier, e.g. `linux-x64`.
    pub platform_id: &'static str,
    /// Upstream's name for this platform's artifact, e.g. `windows64-exe`.
    pub release_channel: &'static str,
    /// Container format of the upstream archive.
    pub archive_format: ArchiveFormat,
    /// Canonical name of the executable inside the package.
    pub binary_name: &'static str,
}

/// Every platform a release is packaged for, in packaging order.
pub const PLATFORMS: [PlatformDescriptor; 5] = [
    PlatformDescriptor {
        platform_id: "win-x64",
        release_channel: "windows64-exe",
        archive_format: ArchiveFormat::Zip,
        binary_name: "cf.exe",
    },
    PlatformDescriptor {
        platform_id: "win-x32",
        release_channel: "windows32-exe",
        archive_format: ArchiveFormat::Zip,
        binary_name: "cf.exe",
    },
    PlatformDescriptor {
        platform_id: "linux-x64",
        release_channel: "linux64-binary",
        archive_format: ArchiveFormat::TarGz,
        binary_name: "cf",
    },
    PlatformDescriptor {
        platform_id: "linux-x32",
        release_channel: "linux32-binary",
        archive_format: ArchiveFormat::TarGz,
        binary_name: "cf",
    },
    PlatformDescriptor {
        platform_id: "osx-x64",
        release_channel: "macosx64-binary",
        archive_format: ArchiveFormat::TarGz,
        binary_name: "cf",
    },
];

impl PlatformDescriptor {
    /// Look up a platform by its runtime identifier (case-insensitive).
    pub fn find(platform_id: &str) -> Option<Self> {
        PLATFORMS
            .iter()
            .find(|p| p.platform_id.eq_ignore_ascii_case(platform_id))
            .copied()
    }

    /// Package identifier this platform is published under.
    pub fn package_id(&self) -> String {
        format!("{PACKAGE_ID_PREFIX}.{}", self.platform_id)
    }

    /// File name of the package descriptor for this platform.
    pub fn nuspec_file_name(&self) -> String {
        format!("{}.nuspec", self.package_id())
    }

    /// File name of the package the packaging tool writes for `version`.
    pub fn package_file_name(&self, version: &Version) -> String {
        format!("{}.{version}.nupkg", self.package_id())
    }

    /// File name under which the upstream archive for `version` is cached.
    pub fn archive_file_name(&self, version: &Version) -> String {
        format!(
            "cf-{}-{version}.{}",
            self.platform_id,
            self.archive_format.extension()
        )
    }

    /// Binary name without its extension (`cf.exe` -> `cf`).
    pub fn binary_stem(&self) -> &'static str {
        self.binary_name
            .rsplit_once('.')
            .map_or(self.binary_name, |(stem, _)| stem)
    }
}

impl std::fmt::Display for PlatformDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.platform_id)
    }
}

impl std::str::FromStr for PlatformDescriptor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::find(s).ok_or_else(|| {
            let known: Vec<&str> = PLATFORMS.iter().map(|p| p.platform_id).collect();
            format!("Unknown platform: {s} (expected one of {})", known.join(", "))
        })
    }
}
