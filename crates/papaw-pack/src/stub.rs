//! Stub retrieval and validation.
//!
//! Stubs are prebuilt per (algorithm, architecture) and published as release
//! assets named `{project}-{algorithm}-{arch}`. The packer only needs bytes;
//! where they come from is behind the [`StubProvider`] trait.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{debug, info};

use crate::arch::Arch;
use crate::compress::Algorithm;
use crate::elf::ElfHeader;
use crate::{PackError, Result};

/// Default location of published stubs.
pub const DEFAULT_STUB_BASE_URL: &str = "https://github.com/dimkr/papaw";

/// Default project prefix of stub asset names.
pub const DEFAULT_STUB_PROJECT: &str = "papaw";

/// Default bound on a stub download.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Where stubs are published and how long to wait for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubSource {
    /// Base URL of the project hosting release assets.
    pub base_url: String,
    /// Project prefix of asset names.
    pub project: String,
    /// Timeout for the whole download.
    pub timeout: Duration,
}

impl Default for StubSource {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_STUB_BASE_URL.to_string(),
            project: DEFAULT_STUB_PROJECT.to_string(),
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

impl StubSource {
    /// Asset name of the stub for an algorithm and architecture.
    pub fn stub_name(&self, algorithm: Algorithm, arch: Arch) -> String {
        format!("{}-{}-{}", self.project, algorithm, arch)
    }

    /// Download URL of the stub for an algorithm and architecture.
    pub fn stub_url(&self, algorithm: Algorithm, arch: Arch) -> String {
        format!(
            "{}/releases/latest/download/{}",
            self.base_url.trim_end_matches('/'),
            self.stub_name(algorithm, arch)
        )
    }
}

/// Source of stub executables.
pub trait StubProvider {
    /// Return the raw stub bytes for an algorithm and architecture.
    ///
    /// Fails with [`PackError::StubUnavailable`] if no bytes can be delivered.
    fn fetch(&self, algorithm: Algorithm, arch: Arch) -> Result<Vec<u8>>;
}

impl<P: StubProvider + ?Sized> StubProvider for Box<P> {
    fn fetch(&self, algorithm: Algorithm, arch: Arch) -> Result<Vec<u8>> {
        (**self).fetch(algorithm, arch)
    }
}

/// Downloads stubs from release assets over HTTP(S).
pub struct HttpStubProvider {
    client: Client,
    source: StubSource,
}

impl HttpStubProvider {
    /// Create a provider for the given source.
    pub fn new(source: StubSource) -> Result<Self> {
        let client = Client::builder()
            .timeout(source.timeout)
            .user_agent(concat!("papaw/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PackError::StubUnavailable(format!("http client setup failed: {}", e)))?;

        Ok(Self { client, source })
    }
}

impl StubProvider for HttpStubProvider {
    fn fetch(&self, algorithm: Algorithm, arch: Arch) -> Result<Vec<u8>> {
        let url = self.source.stub_url(algorithm, arch);
        info!(url = %url, "downloading stub");

        let unavailable = |e: reqwest::Error| {
            if e.is_timeout() {
                PackError::StubUnavailable(format!(
                    "{}: timed out after {:?}",
                    url, self.source.timeout
                ))
            } else {
                PackError::StubUnavailable(format!("{}: {}", url, e))
            }
        };

        let response = self.client.get(&url).send().map_err(unavailable)?;

        let status = response.status();
        if !status.is_success() {
            return Err(PackError::StubUnavailable(format!(
                "{}: HTTP {}",
                url,
                status.as_u16()
            )));
        }

        let body = response.bytes().map_err(unavailable)?;
        if body.is_empty() {
            return Err(PackError::StubUnavailable(format!("{}: empty response", url)));
        }

        debug!(size = body.len(), "stub downloaded");
        Ok(body.to_vec())
    }
}

/// Reads stubs from a local directory using the release asset names.
pub struct FileStubProvider {
    dir: PathBuf,
    source: StubSource,
}

impl FileStubProvider {
    /// Create a provider reading from `dir`.
    pub fn new(dir: impl Into<PathBuf>, source: StubSource) -> Self {
        Self {
            dir: dir.into(),
            source,
        }
    }
}

impl StubProvider for FileStubProvider {
    fn fetch(&self, algorithm: Algorithm, arch: Arch) -> Result<Vec<u8>> {
        let path = self.dir.join(self.source.stub_name(algorithm, arch));
        info!(path = %path.display(), "reading stub");

        let data = std::fs::read(&path)
            .map_err(|e| PackError::StubUnavailable(format!("{}: {}", path.display(), e)))?;
        if data.is_empty() {
            return Err(PackError::StubUnavailable(format!(
                "{}: empty file",
                path.display()
            )));
        }
        Ok(data)
    }
}

/// Check that stub bytes are a structurally valid ELF file.
pub fn validate_stub(stub: &[u8]) -> Result<()> {
    ElfHeader::parse(stub).map_err(PackError::InvalidStub)?;
    Ok(())
}
