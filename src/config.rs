//! Packing configuration.
//!
//! Settings are resolved once at startup: command-line flags win, then
//! environment variables (handled by clap), then the defaults published by
//! `papaw-pack`.

use std::path::PathBuf;
use std::time::Duration;

use papaw_pack::{FileStubProvider, HttpStubProvider, StubProvider, StubSource};
use tracing::debug;

use crate::error::{Error, Result};

/// Environment variable overriding the stub base URL.
pub const ENV_STUB_URL: &str = "PAPAW_STUB_URL";
/// Environment variable selecting a local stub directory.
pub const ENV_STUB_DIR: &str = "PAPAW_STUB_DIR";
/// Environment variable overriding the download timeout, in seconds.
pub const ENV_FETCH_TIMEOUT: &str = "PAPAW_FETCH_TIMEOUT";

/// Resolved packing configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackConfig {
    /// Where stubs are published.
    pub source: StubSource,
    /// Read stubs from this directory instead of downloading them.
    pub stub_dir: Option<PathBuf>,
}

impl PackConfig {
    /// Build a configuration from optional overrides.
    pub fn resolve(
        stub_url: Option<String>,
        stub_dir: Option<PathBuf>,
        timeout_secs: Option<u64>,
    ) -> Result<Self> {
        let mut source = StubSource::default();

        if let Some(url) = stub_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(Error::config(
                    "stub url",
                    format!("expected an http(s) url, got '{}'", url),
                ));
            }
            source.base_url = url;
        }

        if let Some(secs) = timeout_secs {
            if secs == 0 {
                return Err(Error::config("timeout", "must be greater than zero"));
            }
            source.timeout = Duration::from_secs(secs);
        }

        Ok(Self { source, stub_dir })
    }

    /// Create the stub provider this configuration describes.
    pub fn provider(&self) -> Result<Box<dyn StubProvider>> {
        match &self.stub_dir {
            Some(dir) => {
                debug!(dir = %dir.display(), "using local stubs");
                Ok(Box::new(FileStubProvider::new(dir.clone(), self.source.clone())))
            }
            None => {
                debug!(url = %self.source.base_url, timeout = ?self.source.timeout, "using remote stubs");
                Ok(Box::new(HttpStubProvider::new(self.source.clone())?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PackConfig::resolve(None, None, None).unwrap();
        assert_eq!(config, PackConfig::default());
        assert_eq!(config.source.base_url, papaw_pack::DEFAULT_STUB_BASE_URL);
        assert_eq!(config.source.timeout, papaw_pack::DEFAULT_FETCH_TIMEOUT);
        assert!(config.stub_dir.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = PackConfig::resolve(
            Some("http://127.0.0.1:8080/mirror".to_string()),
            Some(PathBuf::from("/opt/stubs")),
            Some(2),
        )
        .unwrap();
        assert_eq!(config.source.base_url, "http://127.0.0.1:8080/mirror");
        assert_eq!(config.source.timeout, Duration::from_secs(2));
        assert_eq!(config.stub_dir, Some(PathBuf::from("/opt/stubs")));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        assert!(matches!(
            PackConfig::resolve(None, None, Some(0)),
            Err(Error::Config { key: "timeout", .. })
        ));
    }

    #[test]
    fn test_rejects_non_http_url() {
        assert!(matches!(
            PackConfig::resolve(Some("ftp://example.org".to_string()), None, None),
            Err(Error::Config { key: "stub url", .. })
        ));
    }

    #[test]
    fn test_local_provider_reads_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(temp_dir.path().join("papaw-deflate-arm"), b"\x7fELF").unwrap();

        let config =
            PackConfig::resolve(None, Some(temp_dir.path().to_path_buf()), None).unwrap();
        let provider = config.provider().unwrap();
        let bytes = provider
            .fetch(papaw_pack::Algorithm::Deflate, papaw_pack::Arch::Arm)
            .unwrap();
        assert_eq!(bytes, b"\x7fELF");
    }
}
