use std::path::{Path, PathBuf};
use std::process::Command;
use anyhow::{Context, Result};
use log::{debug, info, warn};

/// In Apple Live Photos the chosen still sits 1.5s into the clip
pub const PRESENTATION_TIMESTAMP_US: u64 = 1_500_000;

/// Writes the motion-photo marker tags into a finished container.
///
/// Kept behind a trait so the pipeline can be exercised without the
/// external tool installed.
pub trait MetadataWriter {
    fn write_motion_tags(&self, container: &Path, offset: u64) -> Result<()>;
}

/// Production writer shelling out to exiftool for the XMP-GCamera tags
pub struct ExiftoolWriter {
    exiftool_bin: PathBuf,
}

impl ExiftoolWriter {
    pub fn new(exiftool_bin: impl Into<PathBuf>) -> Self {
        Self {
            exiftool_bin: exiftool_bin.into(),
        }
    }

    /// Best-effort probe for pre-existing XMP in the container. A probe
    /// failure only means we can't warn, so it is swallowed at debug.
    fn has_existing_xmp(&self, container: &Path) -> bool {
        let output = Command::new(&self.exiftool_bin)
            .arg("-json")
            .arg("-XMP:all")
            .arg(container)
            .output();

        let output = match output {
            Ok(o) if o.status.success() => o,
            Ok(o) => {
                debug!(
                    "exiftool XMP probe failed for {}: {}",
                    container.display(),
                    String::from_utf8_lossy(&o.stderr).trim()
                );
                return false;
            }
            Err(e) => {
                debug!("Could not run exiftool XMP probe: {}", e);
                return false;
            }
        };

        // exiftool -json emits one object per file; anything beyond the
        // SourceFile key is an existing XMP tag
        match serde_json::from_slice::<serde_json::Value>(&output.stdout) {
            Ok(serde_json::Value::Array(objects)) => objects
                .first()
                .and_then(|o| o.as_object())
                .map(|o| o.keys().any(|k| k != "SourceFile"))
                .unwrap_or(false),
            _ => false,
        }
    }
}

impl MetadataWriter for ExiftoolWriter {
    fn write_motion_tags(&self, container: &Path, offset: u64) -> Result<()> {
        if self.has_existing_xmp(container) {
            warn!(
                "Found existing XMP keys in {}. They may be affected by this process.",
                container.display()
            );
        }

        let output = Command::new(&self.exiftool_bin)
            .arg("-overwrite_original")
            .arg("-XMP-GCamera:MicroVideo=1")
            .arg("-XMP-GCamera:MicroVideoVersion=1")
            .arg(format!("-XMP-GCamera:MicroVideoOffset={}", offset))
            .arg(format!(
                "-XMP-GCamera:MicroVideoPresentationTimestampUs={}",
                PRESENTATION_TIMESTAMP_US
            ))
            .arg(container)
            .output()
            .with_context(|| {
                format!("Failed to execute {}", self.exiftool_bin.display())
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "exiftool failed (exit code {}) writing motion tags to {}: {}",
                output.status.code().unwrap_or(-1),
                container.display(),
                stderr.trim()
            );
        }

        info!(
            "Wrote motion-photo tags to {} (video offset {})",
            container.display(),
            offset
        );
        Ok(())
    }
}
