//! npm registry HTTP fetcher.
//!
//! Talks to the registry directly over HTTPS (no npm CLI, so no lifecycle
//! scripts): resolve version → download tarball → verify SRI → write
//! `<name>-<version>.tgz` into the caller's download directory. Extraction
//! and validation are left to the installer.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tracing::{debug, info};

use super::integrity::verify_sri;
use super::spec::NpmSpec;
use super::types::PackageMetadata;
use crate::error::{PluginError, PluginResult};
use crate::install::PackageFetcher;

/// Default npm registry URL.
pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org";

/// Default maximum tarball size (50 MB).
const DEFAULT_MAX_SIZE: u64 = 50 * 1024 * 1024;

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum number of redirects followed per request.
const MAX_REDIRECTS: u32 = 10;

/// HTTP fetcher for npm registry packages.
#[derive(Debug, Clone)]
pub struct NpmFetcher {
    client: reqwest::Client,
    registry_url: String,
    max_tarball_size: u64,
}

impl NpmFetcher {
    /// Create a fetcher for the public npm registry.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::RegistryError`] if the HTTP client cannot be
    /// built (e.g. no TLS backend).
    pub fn new() -> PluginResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            // Redirects are followed by hand so every hop can be checked.
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("harbor/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PluginError::RegistryError {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            registry_url: DEFAULT_REGISTRY.to_string(),
            max_tarball_size: DEFAULT_MAX_SIZE,
        })
    }

    /// Use a different registry (trailing `/` is ignored).
    #[must_use]
    pub fn with_registry_url(mut self, url: impl Into<String>) -> Self {
        self.registry_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the maximum tarball size in bytes.
    #[must_use]
    pub fn with_max_size(mut self, bytes: u64) -> Self {
        self.max_tarball_size = bytes;
        self
    }

    /// The configured registry URL.
    #[must_use]
    pub fn registry_url(&self) -> &str {
        &self.registry_url
    }

    async fn metadata(&self, spec: &NpmSpec) -> PluginResult<PackageMetadata> {
        let url = format!("{}/{}", self.registry_url, spec.registry_path());
        debug!(url = %url, "fetching package metadata");

        let response = self.get_following_redirects(&url, "metadata").await?;
        if !response.status().is_success() {
            return Err(PluginError::RegistryError {
                message: format!(
                    "registry returned {} for {}",
                    response.status(),
                    spec.full_name()
                ),
            });
        }

        response
            .json::<PackageMetadata>()
            .await
            .map_err(|e| PluginError::RegistryError {
                message: format!("failed to parse registry response: {e}"),
            })
    }

    /// Require HTTPS and the registry's origin (host and port).
    fn check_origin(&self, candidate: &str) -> PluginResult<()> {
        let blocked = || PluginError::SsrfBlocked {
            url: candidate.to_string(),
        };
        let url = url::Url::parse(candidate).map_err(|_| blocked())?;
        let registry =
            url::Url::parse(&self.registry_url).map_err(|e| PluginError::RegistryError {
                message: format!("invalid registry URL: {e}"),
            })?;

        if url.scheme() != "https"
            || url.host_str() != registry.host_str()
            || url.port_or_known_default() != registry.port_or_known_default()
        {
            return Err(blocked());
        }
        Ok(())
    }

    async fn get_following_redirects(
        &self,
        url: &str,
        context: &str,
    ) -> PluginResult<reqwest::Response> {
        self.check_origin(url)?;
        let mut current = url::Url::parse(url).map_err(|_| PluginError::SsrfBlocked {
            url: url.to_string(),
        })?;

        for _ in 0..MAX_REDIRECTS {
            let response = self
                .client
                .get(current.clone())
                .send()
                .await
                .map_err(|e| PluginError::RegistryError {
                    message: format!("failed to fetch {context}: {e}"),
                })?;

            if !response.status().is_redirection() {
                return Ok(response);
            }

            let location = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| PluginError::RegistryError {
                    message: format!("redirect without Location header for {context}"),
                })?;
            let next = current.join(location).map_err(|_| PluginError::SsrfBlocked {
                url: location.to_string(),
            })?;
            self.check_origin(next.as_str())?;
            debug!(redirect = %next, context, "following redirect");
            current = next;
        }

        Err(PluginError::RegistryError {
            message: format!("too many redirects for {context}"),
        })
    }

    async fn download(&self, url: &str, package: &str) -> PluginResult<Vec<u8>> {
        let response = self.get_following_redirects(url, package).await?;
        if !response.status().is_success() {
            return Err(PluginError::RegistryError {
                message: format!(
                    "tarball download failed with status {} for {package}",
                    response.status()
                ),
            });
        }

        if let Some(declared) = response.content_length()
            && declared > self.max_tarball_size
        {
            return Err(PluginError::PackageTooLarge {
                size: declared,
                limit: self.max_tarball_size,
            });
        }

        // Content-Length may be absent or wrong; count while streaming.
        let mut body = Vec::new();
        let mut received: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| PluginError::RegistryError {
                message: format!("failed to read tarball body for {package}: {e}"),
            })?;
            received = received.saturating_add(chunk.len() as u64);
            if received > self.max_tarball_size {
                return Err(PluginError::PackageTooLarge {
                    size: received,
                    limit: self.max_tarball_size,
                });
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

#[async_trait]
impl PackageFetcher for NpmFetcher {
    async fn fetch(&self, spec: &NpmSpec, dest: &Path) -> PluginResult<PathBuf> {
        let package = spec.full_name();
        let metadata = self.metadata(spec).await?;
        let version = metadata
            .resolve(spec.version.as_deref())
            .ok_or_else(|| PluginError::RegistryError {
                message: format!(
                    "version {} not found for {package}",
                    spec.version.as_deref().unwrap_or("latest")
                ),
            })?;

        info!(package = %package, version = %version.version, "downloading package");
        let data = self.download(&version.dist.tarball, &package).await?;

        let integrity =
            version
                .dist
                .integrity
                .as_deref()
                .ok_or_else(|| PluginError::RegistryError {
                    message: format!(
                        "no integrity hash provided for {package}@{}, refusing to install",
                        version.version
                    ),
                })?;
        verify_sri(&data, integrity, &package)?;

        let path = dest.join(spec.tarball_file_name(&version.version));
        tokio::fs::write(&path, &data)
            .await
            .map_err(|e| PluginError::fs("failed to write", &path, e))?;
        debug!(package = %package, path = %path.display(), "tarball saved");
        Ok(path)
    }
}
