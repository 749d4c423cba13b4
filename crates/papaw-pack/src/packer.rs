//! Packed executable assembly.
//!
//! This module runs the packing pipeline: load the input, detect its
//! architecture, obtain and validate a stub, compress, concatenate
//! stub + payload + trailer, and write the result atomically.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::arch::{self, Arch};
use crate::compress::{self, Algorithm};
use crate::format::{read_trailer, split_container, Trailer, TRAILER_SIZE};
use crate::stub::{validate_stub, StubProvider};
use crate::{PackError, Result};

/// Concatenate stub, payload and trailer into a packed container.
pub fn assemble(stub: &[u8], payload: &[u8], original_size: u32) -> Result<Vec<u8>> {
    let mut packed = Vec::with_capacity(stub.len() + payload.len() + TRAILER_SIZE);
    packed.extend_from_slice(stub);
    packed.extend_from_slice(payload);

    let appended = packed.len() - stub.len();
    let compressed_size = u32::try_from(appended).map_err(|_| {
        PackError::CompressionFailed(format!(
            "payload of {} bytes does not fit the trailer",
            appended
        ))
    })?;

    let trailer = Trailer {
        original_size,
        compressed_size,
    };
    packed.extend_from_slice(&trailer.to_bytes());
    Ok(packed)
}

/// Decode a container's payload and check it against its trailer.
///
/// Returns the decoded executable.
pub fn verify_container(container: &[u8], algorithm: Algorithm) -> Result<Vec<u8>> {
    let parts = split_container(container)?;
    validate_stub(parts.stub)?;

    let decoded = compress::decompress(algorithm, parts.payload, parts.trailer.original_size)?;
    if decoded.len() != parts.trailer.original_size as usize {
        return Err(PackError::VerificationFailed(format!(
            "decoded {} bytes, trailer declares {}",
            decoded.len(),
            parts.trailer.original_size
        )));
    }
    Ok(decoded)
}

/// Information about a packed binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackedInfo {
    /// Detected architecture.
    pub arch: Arch,
    /// Compression algorithm.
    pub algorithm: Algorithm,
    /// Size of stub executable.
    pub stub_size: u64,
    /// Size of the original executable.
    pub original_size: u64,
    /// Size of the compressed payload.
    pub compressed_size: u64,
    /// Total size of the packed binary.
    pub total_size: u64,
}

impl PackedInfo {
    /// How much smaller the packed binary is than the original, in percent.
    ///
    /// Negative when packing made the file larger.
    pub fn reduction_percent(&self) -> f64 {
        100.0 - (self.total_size as f64) * 100.0 / (self.original_size as f64)
    }
}

/// Binary packer for creating self-extracting executables.
pub struct Packer {
    algorithm: Algorithm,
    provider: Box<dyn StubProvider>,
    verify: bool,
}

impl Packer {
    /// Create a new packer using `provider` for stubs.
    pub fn new(algorithm: Algorithm, provider: impl StubProvider + 'static) -> Self {
        Self {
            algorithm,
            provider: Box::new(provider),
            verify: false,
        }
    }

    /// Decode the assembled container before writing it.
    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Pack an in-memory executable.
    ///
    /// Returns the container bytes and a summary of the result.
    pub fn pack(&self, image: &[u8]) -> Result<(Vec<u8>, PackedInfo)> {
        let original_size = check_input_size(image)?;

        let arch = arch::detect(image)?;
        if !arch.is_supported() {
            let machine = arch::parse_executable(image)?.machine;
            return Err(PackError::UnsupportedArchitecture { machine });
        }
        info!(arch = %arch, algorithm = %self.algorithm, "packing executable");

        let stub = self.provider.fetch(self.algorithm, arch)?;
        validate_stub(&stub)?;
        debug!(stub_size = stub.len(), "stub validated");

        let payload = compress::compress(self.algorithm, image)?;
        let packed = assemble(&stub, &payload, original_size)?;
        debug!(total = packed.len(), "container assembled");

        if self.verify {
            let decoded = verify_container(&packed, self.algorithm)?;
            if decoded != image {
                return Err(PackError::VerificationFailed(
                    "decoded payload differs from the input".to_string(),
                ));
            }
            debug!("container verified");
        }

        let info = PackedInfo {
            arch,
            algorithm: self.algorithm,
            stub_size: stub.len() as u64,
            original_size: image.len() as u64,
            compressed_size: payload.len() as u64,
            total_size: packed.len() as u64,
        };
        Ok((packed, info))
    }

    /// Pack the executable at `input` into `output`.
    ///
    /// Nothing is created at `output` unless every stage succeeds.
    pub fn pack_file(&self, input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<PackedInfo> {
        let image = load_input(input.as_ref())?;
        let (packed, info) = self.pack(&image)?;
        write_output(output.as_ref(), &packed)?;

        if self.verify {
            check_written_trailer(output.as_ref(), &info)?;
        }

        info!(
            output = %output.as_ref().display(),
            size = info.total_size,
            "packed binary written"
        );
        Ok(info)
    }
}

/// Confirm the trailer read back from disk matches what was packed.
fn check_written_trailer(path: &Path, info: &PackedInfo) -> Result<()> {
    let trailer = read_trailer(path)?;
    if trailer.original_size as u64 != info.original_size
        || trailer.compressed_size as u64 != info.compressed_size
    {
        return Err(PackError::VerificationFailed(format!(
            "{}: trailer declares {}/{} bytes, packed {}/{}",
            path.display(),
            trailer.original_size,
            trailer.compressed_size,
            info.original_size,
            info.compressed_size
        )));
    }
    debug!(path = %path.display(), "written trailer verified");
    Ok(())
}

fn check_input_size(image: &[u8]) -> Result<u32> {
    if image.is_empty() {
        return Err(PackError::InvalidInput("executable is empty".to_string()));
    }
    u32::try_from(image.len()).map_err(|_| {
        PackError::InvalidInput(format!(
            "executable is {} bytes, larger than 4 GiB",
            image.len()
        ))
    })
}

/// Read an input executable fully into memory.
pub fn load_input(path: &Path) -> Result<Vec<u8>> {
    let data = fs::read(path)
        .map_err(|e| PackError::InvalidInput(format!("{}: {}", path.display(), e)))?;
    check_input_size(&data)?;
    debug!(path = %path.display(), size = data.len(), "input loaded");
    Ok(data)
}

/// Write a packed binary with mode 0755.
///
/// The data goes to a temporary file next to `path` that is renamed into
/// place, so a failure never leaves a partial file at `path`.
pub fn write_output(path: &Path, data: &[u8]) -> Result<()> {
    let write_error = |source: std::io::Error| PackError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(&dir).map_err(write_error)?;
    temp.write_all(data).map_err(write_error)?;
    temp.as_file().sync_all().map_err(write_error)?;

    // Make executable
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(temp.path(), fs::Permissions::from_mode(0o755))
            .map_err(write_error)?;
    }

    temp.persist(path).map_err(|e| write_error(e.error))?;
    Ok(())
}
