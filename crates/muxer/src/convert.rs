use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use log::{info, warn};

use crate::error::MuxError;

/// Produces a muxable JPEG from a convertible still.
///
/// Trait seam so the pipeline can run under test without the external
/// codec installed.
pub trait StillConverter {
    /// Convert `path` to a JPEG next to the source and return its path.
    /// Must leave no partial output behind on failure.
    fn convert(&self, path: &Path) -> Result<PathBuf, MuxError>;
}

/// Production converter shelling out to heif-convert (libheif), with
/// best-effort EXIF carry-over via exiftool.
pub struct HeifCliConverter {
    heif_convert_bin: PathBuf,
    exiftool_bin: PathBuf,
}

impl HeifCliConverter {
    pub fn new(heif_convert_bin: impl Into<PathBuf>, exiftool_bin: impl Into<PathBuf>) -> Self {
        Self {
            heif_convert_bin: heif_convert_bin.into(),
            exiftool_bin: exiftool_bin.into(),
        }
    }

    /// Copy capture metadata from the HEIC original to the converted
    /// JPEG. Missing or uncopyable metadata is a warning, never an error.
    fn copy_capture_metadata(&self, src: &Path, dst: &Path) {
        let result = Command::new(&self.exiftool_bin)
            .arg("-TagsFromFile")
            .arg(src)
            .arg("-exif:all")
            .arg("-overwrite_original")
            .arg(dst)
            .output();

        match result {
            Ok(output) if output.status.success() => {
                info!("EXIF data copied from {} to {}", src.display(), dst.display());
            }
            Ok(output) => {
                warn!(
                    "No EXIF data copied from {}: {}",
                    src.display(),
                    String::from_utf8_lossy(&output.stderr).trim()
                );
            }
            Err(e) => {
                warn!(
                    "Could not run {} to copy EXIF data: {}",
                    self.exiftool_bin.display(),
                    e
                );
            }
        }
    }
}

impl StillConverter for HeifCliConverter {
    fn convert(&self, path: &Path) -> Result<PathBuf, MuxError> {
        info!("Converting HEIC file to JPEG: {}", path.display());
        let jpeg_path = path.with_extension("jpg");

        let output = Command::new(&self.heif_convert_bin)
            .arg(path)
            .arg(&jpeg_path)
            .output()
            .map_err(|e| MuxError::Conversion {
                path: path.to_path_buf(),
                reason: format!("failed to run {}: {}", self.heif_convert_bin.display(), e),
            })?;

        if !output.status.success() {
            // Leave no partial output the rest of the run could mistake
            // for an asset
            if jpeg_path.exists() {
                let _ = fs::remove_file(&jpeg_path);
            }
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MuxError::Conversion {
                path: path.to_path_buf(),
                reason: format!(
                    "{} exited with code {}: {}",
                    self.heif_convert_bin.display(),
                    output.status.code().unwrap_or(-1),
                    stderr.trim()
                ),
            });
        }

        if !jpeg_path.exists() {
            return Err(MuxError::Conversion {
                path: path.to_path_buf(),
                reason: "converter reported success but produced no output".to_string(),
            });
        }

        info!("HEIC file converted to JPEG: {}", jpeg_path.display());
        self.copy_capture_metadata(path, &jpeg_path);
        Ok(jpeg_path)
    }
}
