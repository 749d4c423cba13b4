//! Self-extracting executable packing for papaw.
//!
//! This crate turns a native ELF executable into a single self-extracting
//! binary. A prebuilt stub for the executable's architecture is fetched, the
//! executable is compressed, and the pieces are concatenated.
//!
//! # Binary Format
//!
//! ```text
//! +---------------------------+
//! | Stub Executable (ELF)     |  prebuilt per (algorithm, arch)
//! +---------------------------+
//! | Compressed Payload        |  deflate, or lzma with byte 5 = 8
//! +---------------------------+
//! | Trailer (8 bytes)         |
//! |  - original size (u32 BE) |
//! |  - payload size  (u32 BE) |
//! +---------------------------+
//! ```
//!
//! The stub reads the trailer from the end of its own file at startup,
//! decompresses the payload and executes it.

#![deny(missing_docs)]

pub mod arch;
pub mod compress;
pub mod elf;
pub mod format;
pub mod packer;
pub mod stub;

pub use arch::{detect, Arch};
pub use compress::{compress, decompress, Algorithm, BytePatch};
pub use format::{read_trailer, split_container, ContainerParts, Trailer, TRAILER_SIZE};
pub use packer::{assemble, verify_container, PackedInfo, Packer};
pub use stub::{
    validate_stub, FileStubProvider, HttpStubProvider, StubProvider, StubSource,
    DEFAULT_FETCH_TIMEOUT, DEFAULT_STUB_BASE_URL, DEFAULT_STUB_PROJECT,
};

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during pack operations.
///
/// Every error is terminal: the pipeline stops at the failing stage and no
/// output file is left behind.
#[derive(Debug, Error)]
pub enum PackError {
    /// The input executable is unreadable, empty, too large or not an ELF executable.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The input targets a machine with no stub.
    #[error("unsupported architecture: machine type {machine}")]
    UnsupportedArchitecture {
        /// ELF `e_machine` value of the input.
        machine: u16,
    },

    /// Unknown compression algorithm selector.
    #[error("unsupported compression algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The stub could not be retrieved.
    #[error("stub unavailable: {0}")]
    StubUnavailable(String),

    /// The retrieved stub is not a valid executable.
    #[error("invalid stub: {0}")]
    InvalidStub(String),

    /// The compressor did not consume the whole input.
    #[error("compression failed: {0}")]
    CompressionFailed(String),

    /// The packed binary could not be written.
    #[error("output write failed: {}: {source}", path.display())]
    OutputWriteFailed {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A packed binary could not be split into stub, payload and trailer.
    #[error("invalid container: {0}")]
    InvalidContainer(String),

    /// Decoding the payload did not reproduce the original executable.
    #[error("verification failed: {0}")]
    VerificationFailed(String),
}

/// Result type for pack operations.
pub type Result<T> = std::result::Result<T, PackError>;
