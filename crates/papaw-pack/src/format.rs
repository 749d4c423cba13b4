//! Container format definitions.
//!
//! A packed executable is the stub, followed by the compressed payload,
//! followed by a fixed 8-byte trailer that the stub reads from the end of its
//! own file.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::{PackError, Result};

/// Trailer size in bytes (fixed).
pub const TRAILER_SIZE: usize = 8;

/// Fixed-size trailer at the end of a packed binary.
///
/// Layout (8 bytes total):
/// ```text
/// Offset  Size  Field
/// 0       4     original_size (u32 BE) - size of the uncompressed executable
/// 4       4     compressed_size (u32 BE) - size of the payload before the trailer
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trailer {
    /// Size of the original executable.
    pub original_size: u32,
    /// Size of the compressed payload.
    pub compressed_size: u32,
}

impl Trailer {
    /// Serialize trailer to bytes.
    pub fn to_bytes(&self) -> [u8; TRAILER_SIZE] {
        let mut buf = [0u8; TRAILER_SIZE];
        buf[0..4].copy_from_slice(&self.original_size.to_be_bytes());
        buf[4..8].copy_from_slice(&self.compressed_size.to_be_bytes());
        buf
    }

    /// Deserialize trailer from bytes.
    pub fn from_bytes(buf: &[u8; TRAILER_SIZE]) -> Self {
        Self {
            original_size: u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]),
            compressed_size: u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
        }
    }
}

/// The parts of a packed container.
#[derive(Debug, Clone, Copy)]
pub struct ContainerParts<'a> {
    /// Stub executable bytes.
    pub stub: &'a [u8],
    /// Compressed payload bytes.
    pub payload: &'a [u8],
    /// Decoded trailer.
    pub trailer: Trailer,
}

/// Split an in-memory container into stub, payload and trailer.
pub fn split_container(container: &[u8]) -> Result<ContainerParts<'_>> {
    if container.len() < TRAILER_SIZE {
        return Err(PackError::InvalidContainer(format!(
            "{} bytes is too small to contain a trailer",
            container.len()
        )));
    }

    let trailer_start = container.len() - TRAILER_SIZE;
    let mut trailer_bytes = [0u8; TRAILER_SIZE];
    trailer_bytes.copy_from_slice(&container[trailer_start..]);
    let trailer = Trailer::from_bytes(&trailer_bytes);

    let payload_len = trailer.compressed_size as usize;
    if payload_len > trailer_start {
        return Err(PackError::InvalidContainer(format!(
            "payload size {} exceeds the {} bytes before the trailer",
            payload_len, trailer_start
        )));
    }

    let payload_start = trailer_start - payload_len;
    Ok(ContainerParts {
        stub: &container[..payload_start],
        payload: &container[payload_start..trailer_start],
        trailer,
    })
}

/// Read the trailer from a packed binary on disk.
pub fn read_trailer(path: impl AsRef<Path>) -> Result<Trailer> {
    let path = path.as_ref();
    let read_error =
        |e: std::io::Error| PackError::InvalidContainer(format!("{}: {}", path.display(), e));

    let mut file = File::open(path).map_err(read_error)?;
    let file_size = file.metadata().map_err(read_error)?.len();

    if file_size < TRAILER_SIZE as u64 {
        return Err(PackError::InvalidContainer(format!(
            "{}: file too small to contain trailer",
            path.display()
        )));
    }

    file.seek(SeekFrom::End(-(TRAILER_SIZE as i64)))
        .map_err(read_error)?;
    let mut trailer_bytes = [0u8; TRAILER_SIZE];
    file.read_exact(&mut trailer_bytes).map_err(read_error)?;

    let trailer = Trailer::from_bytes(&trailer_bytes);
    if trailer.compressed_size as u64 > file_size - TRAILER_SIZE as u64 {
        return Err(PackError::InvalidContainer(format!(
            "{}: payload size {} exceeds file size",
            path.display(),
            trailer.compressed_size
        )));
    }
    Ok(trailer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailer_layout_is_big_endian() {
        let trailer = Trailer {
            original_size: 1024,
            compressed_size: 0x0102_0304,
        };
        assert_eq!(
            trailer.to_bytes(),
            [0x00, 0x00, 0x04, 0x00, 0x01, 0x02, 0x03, 0x04]
        );
    }

    #[test]
    fn test_trailer_from_bytes() {
        let trailer = Trailer::from_bytes(&[0xff, 0xff, 0xff, 0xff, 0x00, 0x00, 0x00, 0x10]);
        assert_eq!(trailer.original_size, u32::MAX);
        assert_eq!(trailer.compressed_size, 16);
    }

    #[test]
    fn test_split_container() {
        let mut container = b"STUB".to_vec();
        container.extend_from_slice(b"payload");
        container.extend_from_slice(
            &Trailer {
                original_size: 100,
                compressed_size: 7,
            }
            .to_bytes(),
        );

        let parts = split_container(&container).unwrap();
        assert_eq!(parts.stub, b"STUB");
        assert_eq!(parts.payload, b"payload");
        assert_eq!(parts.trailer.original_size, 100);
    }

    #[test]
    fn test_split_container_too_small() {
        assert!(matches!(
            split_container(b"short"),
            Err(PackError::InvalidContainer(_))
        ));
    }

    #[test]
    fn test_split_container_oversized_payload() {
        let mut container = b"xy".to_vec();
        container.extend_from_slice(
            &Trailer {
                original_size: 1,
                compressed_size: 3,
            }
            .to_bytes(),
        );
        assert!(matches!(
            split_container(&container),
            Err(PackError::InvalidContainer(_))
        ));
    }

    #[test]
    fn test_read_trailer_from_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("packed");

        let mut data = vec![0xaa; 32];
        data.extend_from_slice(
            &Trailer {
                original_size: 4096,
                compressed_size: 20,
            }
            .to_bytes(),
        );
        std::fs::write(&path, &data).unwrap();

        let trailer = read_trailer(&path).unwrap();
        assert_eq!(trailer.original_size, 4096);
        assert_eq!(trailer.compressed_size, 20);
    }

    #[test]
    fn test_read_trailer_small_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("tiny");
        std::fs::write(&path, b"abc").unwrap();

        assert!(matches!(
            read_trailer(&path),
            Err(PackError::InvalidContainer(_))
        ));
    }
}
