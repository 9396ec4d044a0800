//! qzcodec CLI: probe the direct path and run files through the adapter.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use qzcodec_adapter::CompressionAdapter;
use qzcodec_core::buffer::BufferRegion;
use qzcodec_core::config::CodecConfig;
use qzcodec_core::kind::CompressionKind;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// First byte of every file written by `compress`.
const TAG_STORED: u8 = 0;
const TAG_COMPRESSED: u8 = 1;

#[derive(Parser)]
#[command(name = "qzcodec")]
#[command(about = "Compression codec adapter with a hardware direct-decompression fast path", long_about = None)]
struct Cli {
    /// JSON codec config (overrides environment)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report whether the direct decompression path is available
    Probe {
        /// Compression kind to probe (overrides config)
        #[arg(long)]
        kind: Option<CompressionKind>,
    },

    /// Compress a file. The output starts with a one-byte tag: 0 when the
    /// input was stored raw, 1 when it holds compressed bytes.
    Compress {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        /// Working buffer size in bytes (overrides config)
        #[arg(long)]
        buffer_size: Option<usize>,

        /// Compression level (overrides config)
        #[arg(long)]
        level: Option<i32>,

        /// Overflow region capacity in bytes; the primary region holds as many
        /// bytes as the input
        #[arg(long)]
        overflow: Option<usize>,
    },

    /// Decompress a file written by `compress`
    Decompress {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        /// Output region capacity in bytes
        #[arg(long)]
        size: usize,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("warning: tracing subscriber already installed");
    }
}

/// Defaults, then environment, then the config file. Flags are applied last by
/// each subcommand.
fn load_config(path: Option<&Path>) -> Result<CodecConfig> {
    let cfg = CodecConfig::from_env();
    match path {
        Some(p) => cfg
            .merge_json_file(p)
            .with_context(|| format!("loading config {}", p.display())),
        None => Ok(cfg),
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut cfg = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Probe { kind } => {
            if let Some(kind) = kind {
                cfg.kind = kind;
            }
            let adapter = CompressionAdapter::with_zstd(&cfg)?;
            let available = adapter.is_available();
            println!(
                "{}: direct decompression {}",
                cfg.kind,
                if available { "available" } else { "unavailable" }
            );
        }
        Commands::Compress {
            input,
            output,
            buffer_size,
            level,
            overflow,
        } => {
            apply_compress_flags(&mut cfg, buffer_size, level);
            compress_file(&cfg, &input, &output, overflow)?;
        }
        Commands::Decompress {
            input,
            output,
            size,
        } => decompress_file(&cfg, &input, &output, size)?,
    }
    Ok(())
}

fn apply_compress_flags(cfg: &mut CodecConfig, buffer_size: Option<usize>, level: Option<i32>) {
    if let Some(size) = buffer_size {
        cfg.buffer_size = size;
    }
    if let Some(level) = level {
        cfg.level = level;
    }
}

/// Tagged file contents for `data`, and whether the payload is compressed.
fn encode_file(adapter: &CompressionAdapter, data: Vec<u8>, overflow: Option<usize>) -> Result<(Vec<u8>, bool)> {
    let len = data.len();
    let mut src = BufferRegion::wrap(data);
    let mut primary = BufferRegion::allocate(len);
    let mut spill = overflow.map(BufferRegion::allocate);

    let not_beneficial = adapter.compress(&mut src, &mut primary, spill.as_mut())?;
    if not_beneficial {
        let mut bytes = Vec::with_capacity(len + 1);
        bytes.push(TAG_STORED);
        bytes.extend_from_slice(src.remaining_slice());
        return Ok((bytes, false));
    }

    let mut bytes = vec![TAG_COMPRESSED];
    bytes.extend_from_slice(primary.written());
    if let Some(spill) = &spill {
        bytes.extend_from_slice(spill.written());
    }
    Ok((bytes, true))
}

/// Original bytes from a tagged file, decompressed into a region of `size` bytes.
fn decode_file(adapter: &CompressionAdapter, data: &[u8], size: usize) -> Result<Vec<u8>> {
    let (tag, payload) = data
        .split_first()
        .ok_or_else(|| anyhow::anyhow!("input is empty; missing stored/compressed tag"))?;
    match *tag {
        TAG_STORED => {
            if payload.len() > size {
                bail!("stored payload of {} bytes exceeds --size {size}", payload.len());
            }
            Ok(payload.to_vec())
        }
        TAG_COMPRESSED => {
            let (mut src, mut dst) = if adapter.is_available() {
                (BufferRegion::wrap_direct(payload.to_vec()), adapter.allocate_direct(size)?)
            } else {
                (BufferRegion::wrap(payload.to_vec()), BufferRegion::allocate(size))
            };
            adapter.decompress(&mut src, &mut dst)?;
            Ok(dst.remaining_slice().to_vec())
        }
        other => bail!("unknown file tag {other}"),
    }
}

fn compress_file(cfg: &CodecConfig, input: &Path, output: &Path, overflow: Option<usize>) -> Result<()> {
    let adapter = CompressionAdapter::with_zstd(cfg)?;
    let data = fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let len = data.len();

    let (bytes, compressed) = encode_file(&adapter, data, overflow)?;
    fs::write(output, &bytes).with_context(|| format!("writing {}", output.display()))?;
    if compressed {
        info!(input = len, output = bytes.len(), library = %adapter.library_name(), "compressed");
        println!("compressed {len} -> {} bytes", bytes.len() - 1);
    } else {
        println!("stored {len} bytes");
    }
    Ok(())
}

fn decompress_file(cfg: &CodecConfig, input: &Path, output: &Path, size: usize) -> Result<()> {
    let adapter = CompressionAdapter::with_zstd(cfg)?;
    let data = fs::read(input).with_context(|| format!("reading {}", input.display()))?;

    let restored = decode_file(&adapter, &data, size)?;
    fs::write(output, &restored).with_context(|| format!("writing {}", output.display()))?;
    println!("decompressed {} bytes", restored.len());
    Ok(())
}
