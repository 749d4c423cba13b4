//! Pack command for creating self-extracting binaries.
//!
//! Reads a native executable, picks the stub matching its architecture and
//! writes `[stub][compressed executable][trailer]` to the output path.

use std::path::PathBuf;

use clap::Parser;
use papaw::config::{ENV_FETCH_TIMEOUT, ENV_STUB_DIR, ENV_STUB_URL};
use papaw::PackConfig;
use papaw_pack::{Algorithm, PackedInfo, Packer};
use tracing::info;

use super::format_size;

/// Pack a native executable into a self-extracting compressed binary.
///
/// Examples:
///   papaw -i ./server -o ./server.packed
///   papaw -i ./busybox -o ./busybox.packed --algo lzma
///   papaw -i ./app -o ./app.packed --stub-dir ./stubs --verify
#[derive(Parser, Debug)]
#[command(name = "papaw")]
#[command(version)]
pub struct PackCmd {
    /// Executable to pack
    #[arg(short = 'i', long, value_name = "PATH")]
    pub input: PathBuf,

    /// Output path for the packed binary
    #[arg(short = 'o', long, value_name = "PATH")]
    pub output: PathBuf,

    /// Compression algorithm (deflate, lzma)
    #[arg(short = 'a', long, default_value = "deflate", value_name = "ALGO")]
    pub algo: Algorithm,

    /// Base URL of the project publishing stub release assets
    #[arg(long, env = ENV_STUB_URL, value_name = "URL")]
    pub stub_url: Option<String>,

    /// Read stubs from a local directory instead of downloading them
    #[arg(long, env = ENV_STUB_DIR, value_name = "DIR", conflicts_with = "stub_url")]
    pub stub_dir: Option<PathBuf>,

    /// Stub download timeout in seconds (default: 5)
    #[arg(long, env = ENV_FETCH_TIMEOUT, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Decode the packed payload before writing and check the written trailer
    #[arg(long)]
    pub verify: bool,

    /// Print the pack report as JSON
    #[arg(long)]
    pub json: bool,
}

impl PackCmd {
    pub fn run(self) -> papaw::Result<()> {
        let config = PackConfig::resolve(self.stub_url.clone(), self.stub_dir.clone(), self.timeout)?;
        info!(
            input = %self.input.display(),
            output = %self.output.display(),
            algorithm = %self.algo,
            "packing"
        );

        let packer = Packer::new(self.algo, config.provider()?).with_verify(self.verify);
        let info = packer.pack_file(&self.input, &self.output)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&info)?);
        } else {
            self.print_summary(&info);
        }
        Ok(())
    }

    fn print_summary(&self, info: &PackedInfo) {
        println!(
            "Packed: {} ({}, {}, stub: {}, payload: {}, total: {})",
            self.output.display(),
            info.arch,
            info.algorithm,
            format_size(info.stub_size),
            format_size(info.compressed_size),
            format_size(info.total_size)
        );
        println!("Done: output is {:.2}% smaller.", info.reduction_percent());
    }
}
