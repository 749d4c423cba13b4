//! papaw - self-extracting executable packer
//!
//! papaw compresses a native ELF executable and prepends a small prebuilt
//! stub that decompresses and runs it at startup. The packing format and
//! pipeline live in the `papaw-pack` crate; this crate holds the command-line
//! configuration layer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │  papaw CLI                                      │
//! ├─────────────────────────────────────────────────┤
//! │  Packer (detect → fetch stub → compress → pack) │
//! ├─────────────────────────────────────────────────┤
//! │  Stub provider (HTTP release assets / local dir)│
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! # Supported Targets
//!
//! | Machine | Byte order | Stub tag |
//! |---------|------------|----------|
//! | x86, x86-64 | any | `i386` |
//! | ARM, AArch64 | little | `arm` |
//! | ARM, AArch64 | big | `armeb` |
//! | MIPS | big | `mips` |
//! | MIPS | little | `mipsel` |

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;

pub use config::PackConfig;
pub use error::{Error, Result};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
