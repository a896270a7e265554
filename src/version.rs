//! Application version display
//!
//! The UI shows the running version as `vMAJOR.MINOR`, with the build
//! component appended only when it is non-zero (`v1.4` vs `v1.4.2`).

use semver::Version;
use std::fmt;

/// Version of the running application
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AppVersion {
    /// Major component
    pub major: u64,
    /// Minor component
    pub minor: u64,
    /// Build component (the third semver component)
    pub build: u64,
}

impl AppVersion {
    /// Create a version from its components
    pub const fn new(major: u64, minor: u64, build: u64) -> Self {
        Self {
            major,
            minor,
            build,
        }
    }

    /// Version this binary was compiled as
    pub fn current() -> Self {
        // CARGO_PKG_VERSION is always valid semver
        Version::parse(env!("CARGO_PKG_VERSION"))
            .map(|v| Self::from(&v))
            .unwrap_or(Self::new(0, 0, 0))
    }

    /// Display string, e.g. `v1.4` or `v1.4.2`
    pub fn version_string(&self) -> String {
        self.to_string()
    }

    /// Full semver form, used for update comparison and settings stamping
    pub fn to_semver(self) -> Version {
        Version::new(self.major, self.minor, self.build)
    }
}

impl From<&Version> for AppVersion {
    fn from(version: &Version) -> Self {
        Self::new(version.major, version.minor, version.patch)
    }
}

impl fmt::Display for AppVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}", self.major, self.minor)?;
        if self.build != 0 {
            write!(f, ".{}", self.build)?;
        }
        Ok(())
    }
}
