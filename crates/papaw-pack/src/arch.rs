//! Architecture detection from ELF headers.
//!
//! The architecture tag selects which prebuilt stub to embed. Mapping is
//! purely table driven on `e_machine` and the declared byte order.

use std::fmt;

use object::{elf, Endianness};
use serde::Serialize;
use tracing::debug;

use crate::elf::ElfHeader;
use crate::{PackError, Result};

/// Canonical architecture tag, as used in stub names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    /// x86 and x86-64.
    I386,
    /// Little-endian ARM and AArch64.
    Arm,
    /// Big-endian ARM and AArch64.
    Armeb,
    /// Big-endian MIPS.
    Mips,
    /// Little-endian MIPS.
    Mipsel,
    /// No stub exists for this machine.
    Unsupported,
}

impl Arch {
    /// Tag string used in stub names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::I386 => "i386",
            Arch::Arm => "arm",
            Arch::Armeb => "armeb",
            Arch::Mips => "mips",
            Arch::Mipsel => "mipsel",
            Arch::Unsupported => "unsupported",
        }
    }

    /// Whether a stub can exist for this tag.
    pub fn is_supported(&self) -> bool {
        *self != Arch::Unsupported
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Byte order a table row applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteOrder {
    Any,
    Little,
    Big,
}

impl ByteOrder {
    fn matches(self, endian: Endianness) -> bool {
        match self {
            ByteOrder::Any => true,
            ByteOrder::Little => endian == Endianness::Little,
            ByteOrder::Big => endian == Endianness::Big,
        }
    }
}

/// Machine to tag mapping. Rows are scanned in order, so the `Any` row of a
/// machine is its default byte order.
const ARCH_TABLE: &[(u16, ByteOrder, Arch)] = &[
    (elf::EM_386, ByteOrder::Any, Arch::I386),
    (elf::EM_X86_64, ByteOrder::Any, Arch::I386),
    (elf::EM_ARM, ByteOrder::Big, Arch::Armeb),
    (elf::EM_ARM, ByteOrder::Any, Arch::Arm),
    (elf::EM_AARCH64, ByteOrder::Big, Arch::Armeb),
    (elf::EM_AARCH64, ByteOrder::Any, Arch::Arm),
    (elf::EM_MIPS, ByteOrder::Little, Arch::Mipsel),
    (elf::EM_MIPS, ByteOrder::Any, Arch::Mips),
];

/// Look up the tag for a machine and byte order.
pub fn arch_for(machine: u16, endian: Endianness) -> Arch {
    ARCH_TABLE
        .iter()
        .find(|(m, order, _)| *m == machine && order.matches(endian))
        .map(|(_, _, arch)| *arch)
        .unwrap_or(Arch::Unsupported)
}

/// Detect the architecture of an executable image.
///
/// Fails with [`PackError::InvalidInput`] if the image is not an ELF
/// executable or shared object. An unknown machine is not an error here;
/// it yields [`Arch::Unsupported`].
pub fn detect(image: &[u8]) -> Result<Arch> {
    let header = parse_executable(image)?;
    let arch = arch_for(header.machine, header.endian);
    debug!(
        machine = header.machine,
        endian = ?header.endian,
        arch = %arch,
        "detected architecture"
    );
    Ok(arch)
}

/// Parse the header of an input executable.
pub(crate) fn parse_executable(image: &[u8]) -> Result<ElfHeader> {
    let header = ElfHeader::parse(image).map_err(PackError::InvalidInput)?;
    if !header.is_executable() {
        return Err(PackError::InvalidInput(format!(
            "not an executable (e_type {})",
            header.file_type
        )));
    }
    Ok(header)
}
