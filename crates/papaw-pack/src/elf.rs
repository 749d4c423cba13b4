//! Structural ELF validation.
//!
//! Both the input executable and the downloaded stub must be well-formed ELF
//! files. This module parses just enough of the file (identification, file
//! header, program and section header tables) to reject truncated or foreign
//! data, and exposes the header fields the packer cares about.

use object::read::elf::{ElfFile32, ElfFile64, FileHeader};
use object::{elf, Endianness, FileKind};

/// ELF file class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfClass {
    /// 32-bit objects.
    Elf32,
    /// 64-bit objects.
    Elf64,
}

/// Header fields of a parsed ELF file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElfHeader {
    /// File class (32 or 64 bit).
    pub class: ElfClass,
    /// Byte order declared in `e_ident[EI_DATA]`.
    pub endian: Endianness,
    /// `e_machine`.
    pub machine: u16,
    /// `e_type`.
    pub file_type: u16,
}

impl ElfHeader {
    /// Parse and structurally validate an ELF image.
    pub fn parse(data: &[u8]) -> std::result::Result<Self, String> {
        let kind = FileKind::parse(data).map_err(|e| e.to_string())?;
        match kind {
            FileKind::Elf32 => {
                let file = ElfFile32::<Endianness>::parse(data).map_err(|e| e.to_string())?;
                Ok(Self::from_header(ElfClass::Elf32, file.elf_header(), file.endian()))
            }
            FileKind::Elf64 => {
                let file = ElfFile64::<Endianness>::parse(data).map_err(|e| e.to_string())?;
                Ok(Self::from_header(ElfClass::Elf64, file.elf_header(), file.endian()))
            }
            other => Err(format!("not an ELF file (detected {:?})", other)),
        }
    }

    fn from_header<H>(class: ElfClass, header: &H, endian: Endianness) -> Self
    where
        H: FileHeader<Endian = Endianness>,
    {
        Self {
            class,
            endian,
            machine: header.e_machine(endian),
            file_type: header.e_type(endian),
        }
    }

    /// Whether the file is a runnable image (`ET_EXEC` or `ET_DYN`).
    pub fn is_executable(&self) -> bool {
        self.file_type == elf::ET_EXEC || self.file_type == elf::ET_DYN
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::build_elf;
    use super::*;

    #[test]
    fn test_parse_elf32_little() {
        let data = build_elf(ElfClass::Elf32, false, elf::EM_386, elf::ET_EXEC, 256);
        let header = ElfHeader::parse(&data).unwrap();
        assert_eq!(header.class, ElfClass::Elf32);
        assert_eq!(header.endian, Endianness::Little);
        assert_eq!(header.machine, elf::EM_386);
        assert!(header.is_executable());
    }

    #[test]
    fn test_parse_elf64_big() {
        let data = build_elf(ElfClass::Elf64, true, elf::EM_MIPS, elf::ET_DYN, 256);
        let header = ElfHeader::parse(&data).unwrap();
        assert_eq!(header.class, ElfClass::Elf64);
        assert_eq!(header.endian, Endianness::Big);
        assert_eq!(header.machine, elf::EM_MIPS);
        assert!(header.is_executable());
    }

    #[test]
    fn test_relocatable_is_not_executable() {
        let data = build_elf(ElfClass::Elf64, false, elf::EM_X86_64, elf::ET_REL, 128);
        let header = ElfHeader::parse(&data).unwrap();
        assert!(!header.is_executable());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(ElfHeader::parse(b"#!/bin/sh\necho stub").is_err());
        assert!(ElfHeader::parse(&[]).is_err());
    }

    #[test]
    fn test_parse_rejects_truncated_header() {
        let data = build_elf(ElfClass::Elf64, false, elf::EM_X86_64, elf::ET_EXEC, 64);
        assert!(ElfHeader::parse(&data[..40]).is_err());
    }
}
