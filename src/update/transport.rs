//! Update transport client
//!
//! The checker only needs two things from the transport: a way to connect to
//! a repository and a single "check and apply" call that returns the release
//! it found. [`GitHubTransport`] implements that against GitHub releases,
//! staging the release package next to the install directory for the
//! installer to pick up.

use crate::error::{StringError, UploaderError, Result};
use semver::Version;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A release found by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseInfo {
    /// Version of the release
    pub version: Version,
    /// Page describing the release
    pub release_url: String,
    /// Downloaded package, if the release carried one
    pub staged_package: Option<PathBuf>,
}

/// Connected update transport client
pub trait UpdateTransport: Send + Sync {
    /// Look for a newer release and stage it for installation.
    ///
    /// Returns `Ok(None)` when the running version is current.
    fn check_and_apply_update(&self) -> Result<Option<ReleaseInfo>>;
}

/// Constructs transport clients for a repository locator
pub trait UpdateTransportFactory: Send + Sync {
    /// Connect to the repository named by `repository_locator`
    fn connect(&self, repository_locator: &str) -> Result<Arc<dyn UpdateTransport>>;
}

/// GitHub API response for a release
#[derive(Debug, Deserialize)]
struct GitHubRelease {
    /// Release tag name (e.g., "v1.2.3" or "1.2.3")
    tag_name: String,
    /// Release page
    html_url: String,
    /// Whether this is a prerelease
    prerelease: bool,
    /// Downloadable release assets
    #[serde(default)]
    assets: Vec<GitHubAsset>,
}

#[derive(Debug, Deserialize)]
struct GitHubAsset {
    name: String,
    browser_download_url: String,
}

/// Parse `https://github.com/<owner>/<repo>` or `<owner>/<repo>`
pub fn parse_repository_locator(locator: &str) -> Result<(String, String)> {
    let trimmed = locator.trim().trim_end_matches('/');
    let path = trimmed
        .strip_prefix("https://github.com/")
        .or_else(|| trimmed.strip_prefix("http://github.com/"))
        .or_else(|| trimmed.strip_prefix("github.com/"))
        .unwrap_or(trimmed);
    let path = path.strip_suffix(".git").unwrap_or(path);

    let mut parts = path.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(repo), None) if !owner.is_empty() && !repo.is_empty() => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(UploaderError::InvalidRepositoryLocator(locator.to_string())),
    }
}

/// Parse a release tag, stripping a leading `v`
pub fn parse_release_tag(tag: &str) -> Result<Version> {
    let tag = tag.trim_start_matches('v');
    Version::parse(tag).map_err(|e| {
        warn!("Failed to parse version from tag '{}': {}", tag, e);
        UploaderError::UpdateTransportError(Box::new(e))
    })
}

/// Transport backed by the GitHub releases API
pub struct GitHubTransport {
    owner: String,
    repo: String,
    current_version: Version,
    staging_dir: PathBuf,
    client: reqwest::blocking::Client,
}

impl GitHubTransport {
    /// Connect to the repository and build the HTTP client
    pub fn connect(locator: &str, current_version: Version, staging_dir: impl Into<PathBuf>) -> Result<Self> {
        let (owner, repo) = parse_repository_locator(locator)?;

        // Create HTTP client with timeout
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(format!("ReplayUploader/{current_version}"))
            .build()
            .map_err(|e| UploaderError::UpdateTransportError(Box::new(e)))?;

        info!("Update transport connected to {}/{}", owner, repo);
        Ok(Self {
            owner,
            repo,
            current_version,
            staging_dir: staging_dir.into(),
            client,
        })
    }

    fn fetch_latest_release(&self) -> Result<GitHubRelease> {
        let api_url = format!(
            "https://api.github.com/repos/{}/{}/releases/latest",
            self.owner, self.repo
        );
        debug!("Fetching latest release from: {}", api_url);

        let response = self
            .client
            .get(&api_url)
            .send()
            .map_err(|e| UploaderError::UpdateTransportError(Box::new(e)))?;

        if !response.status().is_success() {
            return Err(UploaderError::UpdateTransportError(StringError::new(
                format!("GitHub API returned error status: {}", response.status()),
            )));
        }

        response
            .json()
            .map_err(|e| UploaderError::UpdateTransportError(Box::new(e)))
    }

    fn stage_package(&self, asset: &GitHubAsset) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.staging_dir)?;
        let file_name = Path::new(&asset.name)
            .file_name()
            .ok_or_else(|| {
                UploaderError::UpdateTransportError(StringError::new(format!(
                    "Invalid asset name '{}'",
                    asset.name
                )))
            })?
            .to_owned();
        let dest = self.staging_dir.join(file_name);

        debug!("Downloading {} to {}", asset.browser_download_url, dest.display());
        let mut response = self
            .client
            .get(&asset.browser_download_url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|e| UploaderError::UpdateTransportError(Box::new(e)))?;

        let mut temp = tempfile::NamedTempFile::new_in(&self.staging_dir)?;
        response
            .copy_to(temp.as_file_mut())
            .map_err(|e| UploaderError::UpdateTransportError(Box::new(e)))?;
        temp.persist(&dest)
            .map_err(|e| UploaderError::IoError(e.error))?;

        Ok(dest)
    }
}

impl UpdateTransport for GitHubTransport {
    fn check_and_apply_update(&self) -> Result<Option<ReleaseInfo>> {
        let release = self.fetch_latest_release()?;

        if release.prerelease {
            info!("Latest release is a prerelease, skipping");
            return Ok(None);
        }

        let latest = parse_release_tag(&release.tag_name)?;
        info!(
            "Current version: {}, Latest version: {}",
            self.current_version, latest
        );
        if latest <= self.current_version {
            info!("Application is up to date");
            return Ok(None);
        }

        let staged_package = match release.assets.first() {
            Some(asset) => Some(self.stage_package(asset)?),
            None => {
                warn!("Release {} has no downloadable package", latest);
                None
            }
        };

        Ok(Some(ReleaseInfo {
            version: latest,
            release_url: release.html_url,
            staged_package,
        }))
    }
}

/// Factory producing [`GitHubTransport`] clients
#[derive(Debug, Clone)]
pub struct GitHubTransportFactory {
    current_version: Version,
    staging_dir: PathBuf,
}

impl GitHubTransportFactory {
    /// Factory for the running version, staging packages into `staging_dir`
    pub fn new(current_version: Version, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            current_version,
            staging_dir: staging_dir.into(),
        }
    }
}

impl UpdateTransportFactory for GitHubTransportFactory {
    fn connect(&self, repository_locator: &str) -> Result<Arc<dyn UpdateTransport>> {
        let transport = GitHubTransport::connect(
            repository_locator,
            self.current_version.clone(),
            self.staging_dir.clone(),
        )?;
        Ok(Arc::new(transport))
    }
}
