use anyhow::{Context, Result};
use clap::Parser;
use humansize::{format_size, BINARY};
use log::{info, warn};
use muxer::{ExiftoolWriter, HeifCliConverter, MuxConfig, Pipeline};
use std::path::PathBuf;

/// Apple Live Photos to Google Motion Photos converter
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (JSON or TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory containing HEIC/JPEG/MOV/MP4 files
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Directory receiving muxed containers
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Move files that were neither paired nor excluded into <output>/other_files
    #[arg(long)]
    move_other_files: bool,

    /// Convert every HEIC even when no matching video exists
    #[arg(long)]
    convert_all: bool,

    /// Delete converted originals that found no matching video
    #[arg(long)]
    delete_unmatched_converted: bool,

    /// Delete originals that were part of a successful mux
    #[arg(long)]
    delete_paired: bool,
}

fn main() -> Result<()> {
    // RUST_LOG overrides; default to info so the run summary is visible
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let args = Args::parse();

    let mut cfg = MuxConfig::load_config(args.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(input) = args.input {
        cfg.input_dir = input;
    }
    if let Some(output) = args.output {
        cfg.output_dir = output;
    }
    if args.move_other_files {
        cfg.move_other_files = true;
    }
    if args.convert_all {
        cfg.convert_all_convertible_stills = true;
    }
    if args.delete_unmatched_converted {
        cfg.delete_converted_originals_without_match = true;
    }
    if args.delete_paired {
        cfg.delete_paired_originals = true;
    }

    info!("Motion Photo Muxer starting");
    info!("Configuration loaded:");
    info!("  Input dir: {}", cfg.input_dir.display());
    info!("  Output dir: {}", cfg.output_dir.display());
    info!("  Move other files: {}", cfg.move_other_files);
    info!("  Convert all HEICs: {}", cfg.convert_all_convertible_stills);
    info!(
        "  Delete unmatched converted originals: {}",
        cfg.delete_converted_originals_without_match
    );
    info!("  Delete paired originals: {}", cfg.delete_paired_originals);

    let converter = HeifCliConverter::new(&cfg.heif_convert_bin, &cfg.exiftool_bin);
    let writer = ExiftoolWriter::new(&cfg.exiftool_bin);
    let summary = Pipeline::new(&cfg, &converter, &writer)
        .run()
        .context("Run failed")?;

    info!("Conversion complete.");
    info!("  Matching pairs found: {}", summary.pairs_found);
    info!("  Bytes muxed: {}", format_size(summary.bytes_muxed, BINARY));
    info!(
        "  HEIC conversions: {} ({} failed)",
        summary.conversions, summary.conversion_failures
    );
    if cfg.move_other_files {
        info!("  Files relocated: {}", summary.relocated);
    }
    if summary.deleted > 0 {
        info!("  Originals deleted: {}", summary.deleted);
    }
    if let Some(report) = &summary.report {
        warn!(
            "Some files could not be converted; report written to {}",
            report.display()
        );
    }

    Ok(())
}
