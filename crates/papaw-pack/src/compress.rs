//! Compression dispatch for packed payloads.
//!
//! Each algorithm produces a payload that is ready to be appended after the
//! stub as-is. Algorithm-specific framing tweaks the stub depends on are
//! expressed as a patch table applied after compression.

use std::fmt;
use std::io::{self, Read, Write};
use std::str::FromStr;

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use lzma_rust2::{LzmaOptions, LzmaReader, LzmaWriter};
use serde::Serialize;
use tracing::debug;

use crate::{PackError, Result};

/// LZMA preset (9 = best compression).
pub const LZMA_PRESET: u32 = 9;

/// Offset at which the stub expects an extra byte in LZMA payloads.
///
/// The LZMA header is 1 byte of properties, 4 bytes of dictionary size and
/// 8 bytes of little-endian uncompressed size. The extra byte sits between
/// the dictionary size and the size field, which moves to offsets 6..14.
pub const LZMA_PATCH_OFFSET: usize = 5;

/// Value inserted at [`LZMA_PATCH_OFFSET`].
pub const LZMA_PATCH_VALUE: u8 = 8;

/// A fixed byte inserted into a compressed payload.
///
/// Bytes at and after `offset` shift up by one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BytePatch {
    /// Offset from the start of the payload, at most its length.
    pub offset: usize,
    /// Inserted value.
    pub value: u8,
}

const NO_PATCHES: &[BytePatch] = &[];

const LZMA_PATCHES: &[BytePatch] = &[BytePatch {
    offset: LZMA_PATCH_OFFSET,
    value: LZMA_PATCH_VALUE,
}];

/// Compression algorithm for the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Raw deflate at best compression.
    #[default]
    Deflate,
    /// LZMA with a declared size header and an extra header byte.
    Lzma,
}

impl Algorithm {
    /// All supported algorithms.
    pub const ALL: [Algorithm; 2] = [Algorithm::Deflate, Algorithm::Lzma];

    /// Name used in stub names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Deflate => "deflate",
            Algorithm::Lzma => "lzma",
        }
    }

    /// Post-compression byte patches the stub expects.
    pub fn patches(&self) -> &'static [BytePatch] {
        match self {
            Algorithm::Deflate => NO_PATCHES,
            Algorithm::Lzma => LZMA_PATCHES,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = PackError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "deflate" => Ok(Algorithm::Deflate),
            "lzma" | "lzma-variant" => Ok(Algorithm::Lzma),
            _ => Err(PackError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

/// Compress an executable image into a stub-ready payload.
pub fn compress(algorithm: Algorithm, image: &[u8]) -> Result<Vec<u8>> {
    let mut payload = match algorithm {
        Algorithm::Deflate => deflate(image)?,
        Algorithm::Lzma => lzma(image)?,
    };
    apply_patches(&mut payload, algorithm.patches())?;

    debug!(
        algorithm = %algorithm,
        input = image.len(),
        output = payload.len(),
        "compressed payload"
    );
    Ok(payload)
}

fn deflate(image: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
    let accepted = write_counted(&mut encoder, image).map_err(compression_error)?;
    check_accepted(accepted, image.len())?;

    // Sync flush so the stream is decodable without further input.
    encoder.flush().map_err(compression_error)?;
    encoder.finish().map_err(compression_error)
}

fn lzma(image: &[u8]) -> Result<Vec<u8>> {
    let options = LzmaOptions::with_preset(LZMA_PRESET);
    let mut writer = LzmaWriter::new_use_header(Vec::new(), &options, Some(image.len() as u64))
        .map_err(compression_error)?;
    let accepted = write_counted(&mut writer, image).map_err(compression_error)?;
    check_accepted(accepted, image.len())?;
    writer.finish().map_err(compression_error)
}

/// Feed `data` to `writer`, returning how many bytes it accepted.
///
/// Stops early if the writer accepts nothing.
fn write_counted<W: Write>(writer: &mut W, data: &[u8]) -> io::Result<usize> {
    let mut accepted = 0;
    while accepted < data.len() {
        match writer.write(&data[accepted..]) {
            Ok(0) => break,
            Ok(n) => accepted += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(accepted)
}

fn check_accepted(accepted: usize, expected: usize) -> Result<()> {
    if accepted != expected {
        return Err(PackError::CompressionFailed(format!(
            "compressor accepted {} of {} bytes",
            accepted, expected
        )));
    }
    Ok(())
}

fn compression_error(e: impl fmt::Display) -> PackError {
    PackError::CompressionFailed(e.to_string())
}

/// Insert fixed bytes into a payload, in table order.
pub fn apply_patches(payload: &mut Vec<u8>, patches: &[BytePatch]) -> Result<()> {
    for patch in patches {
        if patch.offset > payload.len() {
            return Err(PackError::CompressionFailed(format!(
                "payload too short to patch offset {} ({} bytes)",
                patch.offset,
                payload.len()
            )));
        }
        payload.insert(patch.offset, patch.value);
    }
    Ok(())
}

/// Remove the bytes inserted by [`apply_patches`], in reverse table order.
fn strip_patches(payload: &mut Vec<u8>, patches: &[BytePatch]) -> Result<()> {
    for patch in patches.iter().rev() {
        match payload.get(patch.offset) {
            Some(&value) if value == patch.value => {
                payload.remove(patch.offset);
            }
            Some(&value) => {
                return Err(PackError::VerificationFailed(format!(
                    "expected {:#04x} at payload offset {}, found {:#04x}",
                    patch.value, patch.offset, value
                )))
            }
            None => {
                return Err(PackError::VerificationFailed(format!(
                    "payload too short for offset {} ({} bytes)",
                    patch.offset,
                    payload.len()
                )))
            }
        }
    }
    Ok(())
}

/// Decode a payload with a reference decoder.
///
/// `original_size` only sizes the output buffer.
pub fn decompress(algorithm: Algorithm, payload: &[u8], original_size: u32) -> Result<Vec<u8>> {
    let mut output = Vec::with_capacity(original_size as usize);
    match algorithm {
        Algorithm::Deflate => {
            DeflateDecoder::new(payload)
                .read_to_end(&mut output)
                .map_err(verification_error)?;
        }
        Algorithm::Lzma => {
            let mut restored = payload.to_vec();
            strip_patches(&mut restored, algorithm.patches())?;

            let mut reader = LzmaReader::new_mem_limit(restored.as_slice(), u32::MAX, None)
                .map_err(verification_error)?;
            reader.read_to_end(&mut output).map_err(verification_error)?;
        }
    }
    Ok(output)
}

fn verification_error(e: impl fmt::Display) -> PackError {
    PackError::VerificationFailed(format!("payload decode failed: {}", e))
}
