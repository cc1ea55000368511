use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::classify::{MediaAsset, MediaKind};
use crate::config::MuxConfig;
use crate::convert::StillConverter;
use crate::error::MuxError;
use crate::ledger::Ledger;
use crate::matching::find_matching_video;
use crate::mux::{mux_pair, validate_pair};
use crate::report::write_problem_report;
use crate::xmp::MetadataWriter;

/// End-of-run counters for reporting
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub pairs_found: u64,
    pub conversions: u64,
    pub conversion_failures: u64,
    pub relocated: u64,
    pub deleted: u64,
    pub bytes_muxed: u64,
    pub report: Option<PathBuf>,
}

/// Orchestrates one run: convert+match+mux over the input tree, then the
/// relocation pass, then the strictly-gated deletion pass. Owns the
/// Ledger; nothing here is ambient state.
pub struct Pipeline<'a> {
    cfg: &'a MuxConfig,
    converter: &'a dyn StillConverter,
    writer: &'a dyn MetadataWriter,
    ledger: Ledger,
    summary: RunSummary,
    // Canonical forms of the configured roots, resolved at the start of
    // a run. Configured paths may be relative (the defaults are "." and
    // "output") and Path::starts_with compares component-wise, so the
    // output-subtree guard only works on resolved paths.
    input_root: PathBuf,
    output_root: PathBuf,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        cfg: &'a MuxConfig,
        converter: &'a dyn StillConverter,
        writer: &'a dyn MetadataWriter,
    ) -> Self {
        Self {
            cfg,
            converter,
            writer,
            ledger: Ledger::new(),
            summary: RunSummary::default(),
            input_root: cfg.input_dir.clone(),
            output_root: cfg.output_dir.clone(),
        }
    }

    /// Run all passes. Only an unusable input root aborts; every per-file
    /// failure is recorded or logged and the run continues.
    pub fn run(mut self) -> Result<RunSummary> {
        if !self.cfg.input_dir.exists() || !self.cfg.input_dir.is_dir() {
            return Err(MuxError::InvalidRoot(self.cfg.input_dir.clone()).into());
        }
        fs::create_dir_all(&self.cfg.output_dir).with_context(|| {
            format!(
                "Failed to create output directory: {}",
                self.cfg.output_dir.display()
            )
        })?;

        self.input_root = fs::canonicalize(&self.cfg.input_dir).with_context(|| {
            format!(
                "Failed to resolve input root: {}",
                self.cfg.input_dir.display()
            )
        })?;
        self.output_root = fs::canonicalize(&self.cfg.output_dir).with_context(|| {
            format!(
                "Failed to resolve output root: {}",
                self.cfg.output_dir.display()
            )
        })?;

        info!("Processing files in: {}", self.input_root.display());

        // Snapshot the tree before converting anything so JPEGs produced
        // mid-run are not re-processed as stills
        let files = self.collect_input_files();
        info!("Found {} file(s) under input root", files.len());

        for path in &files {
            let asset = MediaAsset::from_path(path);
            match asset.kind {
                MediaKind::Still => self.process_still(&asset),
                MediaKind::ConvertibleStill => self.process_convertible(&asset),
                MediaKind::Video | MediaKind::Other => {
                    debug!("Not a still, skipping: {}", path.display());
                }
            }
        }

        info!(
            "Matching pass complete: {} pair(s) muxed, {} conversion failure(s)",
            self.ledger.pairs_found(),
            self.ledger.problematic().len()
        );

        if self.cfg.move_other_files {
            let skip_converted = self.cfg.delete_converted_originals_without_match;
            self.summary.relocated = self.ledger.relocate_unmatched(
                &self.input_root,
                &self.output_root,
                skip_converted,
            )?;
            info!("Relocation pass complete: {} file(s) moved", self.summary.relocated);
        }

        if self.cfg.delete_paired_originals {
            self.summary.deleted += self.ledger.delete_paired();
        }
        if self.cfg.delete_converted_originals_without_match {
            self.summary.deleted += self.ledger.delete_converted_unmatched();
        }

        if !self.ledger.problematic().is_empty() {
            warn!(
                "{} file(s) could not be converted; see the problem report",
                self.ledger.problematic().len()
            );
        }
        self.summary.report =
            write_problem_report(&self.output_root, self.ledger.problematic())?;

        self.summary.pairs_found = self.ledger.pairs_found();
        self.summary.conversion_failures = self.ledger.problematic().len() as u64;
        Ok(self.summary)
    }

    /// Sorted recursive file listing of the input root, excluding
    /// anything under the output root when the two overlap
    fn collect_input_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.input_root)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("Error reading directory entry: {}", e);
                    continue;
                }
            };
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if path.starts_with(&self.output_root) {
                continue;
            }
            files.push(path.to_path_buf());
        }
        files
    }

    fn process_still(&mut self, asset: &MediaAsset) {
        match find_matching_video(&asset.stem, &self.input_root) {
            Some(video) => self.mux_one(&asset.path, &video, None),
            None => debug!("No matching video for {}", asset.path.display()),
        }
    }

    fn process_convertible(&mut self, asset: &MediaAsset) {
        // Match on the HEIC's stem before paying for a conversion
        let video = find_matching_video(&asset.stem, &self.input_root);
        if video.is_none() && !self.cfg.convert_all_convertible_stills {
            debug!(
                "No matching video for {}; leaving unconverted",
                asset.path.display()
            );
            return;
        }

        let jpeg = match self.converter.convert(&asset.path) {
            Ok(p) => p,
            Err(e) => {
                warn!("{}", e);
                self.ledger.record_problematic(&asset.path);
                return;
            }
        };
        self.summary.conversions += 1;

        match video {
            Some(video) => self.mux_one(&jpeg, &video, Some(&asset.path)),
            None => {
                info!(
                    "Converted {} but no matching video found",
                    asset.path.display()
                );
                self.ledger.record_converted_unmatched(&asset.path);
            }
        }
    }

    /// Mux one validated pair and tag the container. `source` is the
    /// convertible original behind `still`, if any; it shares the fate
    /// of the pair in the Ledger.
    fn mux_one(&mut self, still: &Path, video: &Path, source: Option<&Path>) {
        if let Err(e) = validate_pair(still, video) {
            warn!("Skipping pair: {}", e);
            return;
        }

        let out = match mux_pair(still, video, &self.output_root) {
            Ok(o) => o,
            Err(e) => {
                warn!(
                    "Failed to merge {} and {}: {:#}",
                    still.display(),
                    video.display(),
                    e
                );
                return;
            }
        };

        if let Err(e) = self.writer.write_motion_tags(&out.container, out.offset) {
            warn!(
                "Failed to write motion tags to {}: {:#}",
                out.container.display(),
                e
            );
            // The container stays on disk for inspection, but the inputs
            // are not recorded as paired so nothing deletes them
            return;
        }

        self.ledger.record_paired(still, video);
        if let Some(src) = source {
            self.ledger.record_paired_original(src);
        }
        self.summary.bytes_muxed += fs::metadata(&out.container).map(|m| m.len()).unwrap_or(0);
    }
}
