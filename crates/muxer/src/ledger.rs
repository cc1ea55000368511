use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use log::{debug, info, warn};
use walkdir::WalkDir;

/// Subdirectory of the output root receiving relocated leftovers
pub const OTHER_FILES_DIR: &str = "other_files";

/// Run-scoped bookkeeping of what happened to every file touched.
///
/// A path belongs to at most one of the three sets. Anything in none of
/// them at the end of a run was left untouched by the matching pass.
#[derive(Debug, Default)]
pub struct Ledger {
    paired: BTreeSet<PathBuf>,
    converted_unmatched: BTreeSet<PathBuf>,
    problematic: BTreeSet<PathBuf>,
    pairs_found: u64,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful mux. Idempotent; the pair counter only moves
    /// the first time a given still is recorded.
    pub fn record_paired(&mut self, still: &Path, video: &Path) {
        if self.record_paired_original(still) {
            self.pairs_found += 1;
        }
        self.record_paired_original(video);
    }

    /// Record a single path (e.g. the HEIC source behind a converted
    /// still) as part of a successful pairing, without counting a pair.
    pub fn record_paired_original(&mut self, path: &Path) -> bool {
        self.converted_unmatched.remove(path);
        self.problematic.remove(path);
        self.paired.insert(path.to_path_buf())
    }

    /// Record a still that was converted but found no matching video
    pub fn record_converted_unmatched(&mut self, still: &Path) {
        if !self.paired.contains(still) && !self.problematic.contains(still) {
            self.converted_unmatched.insert(still.to_path_buf());
        }
    }

    /// Record a still whose conversion failed
    pub fn record_problematic(&mut self, still: &Path) {
        if !self.paired.contains(still) && !self.converted_unmatched.contains(still) {
            self.problematic.insert(still.to_path_buf());
        }
    }

    pub fn is_paired(&self, path: &Path) -> bool {
        self.paired.contains(path)
    }

    pub fn pairs_found(&self) -> u64 {
        self.pairs_found
    }

    pub fn paired(&self) -> &BTreeSet<PathBuf> {
        &self.paired
    }

    pub fn converted_unmatched(&self) -> &BTreeSet<PathBuf> {
        &self.converted_unmatched
    }

    pub fn problematic(&self) -> &BTreeSet<PathBuf> {
        &self.problematic
    }

    /// Move every file under `input_root` that was neither paired nor
    /// (when `skip_converted_unmatched` is set) converted-without-match
    /// into `output_dir/other_files`, resolving name collisions.
    ///
    /// Runs strictly after the matching pass. Per-file move failures are
    /// logged and never abort the batch. Returns the number of files moved.
    pub fn relocate_unmatched(
        &self,
        input_root: &Path,
        output_dir: &Path,
        skip_converted_unmatched: bool,
    ) -> Result<u64> {
        let dest_dir = output_dir.join(OTHER_FILES_DIR);
        fs::create_dir_all(&dest_dir)
            .with_context(|| format!("Failed to create leftover directory: {}", dest_dir.display()))?;

        let mut moved = 0;
        for entry in WalkDir::new(input_root).follow_links(false).sort_by_file_name() {
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
            // Never relocate our own output when it nests under the
            // input root. Callers pass resolved roots; the destination
            // directory is skipped explicitly as well so the walk can
            // never re-move a file it just placed there.
            if path.starts_with(output_dir) || path.starts_with(&dest_dir) {
                continue;
            }
            if self.paired.contains(path) {
                continue;
            }
            if skip_converted_unmatched && self.converted_unmatched.contains(path) {
                continue;
            }

            let file_name = match path.file_name().and_then(|n| n.to_str()) {
                Some(n) => n,
                None => {
                    warn!("Skipping file with unusable name: {}", path.display());
                    continue;
                }
            };

            let dest = unique_destination(&dest_dir, file_name);
            match move_file(path, &dest) {
                Ok(()) => {
                    info!("Moved {} -> {}", path.display(), dest.display());
                    moved += 1;
                }
                Err(e) => {
                    warn!("Failed to move {}: {:#}", path.display(), e);
                }
            }
        }

        Ok(moved)
    }

    /// Delete every path recorded as part of a successful mux that still
    /// exists on disk. Files that failed conversion or never matched are
    /// never touched here. Returns the number of files deleted.
    pub fn delete_paired(&self) -> u64 {
        delete_all(&self.paired, "paired original")
    }

    /// Delete converted originals that found no matching video.
    /// A separate opt-in from `delete_paired`.
    pub fn delete_converted_unmatched(&self) -> u64 {
        delete_all(&self.converted_unmatched, "unmatched converted original")
    }
}

fn delete_all(paths: &BTreeSet<PathBuf>, what: &str) -> u64 {
    let mut deleted = 0;
    for path in paths {
        if !path.exists() {
            debug!("Already gone, skipping delete: {}", path.display());
            continue;
        }
        match fs::remove_file(path) {
            Ok(()) => {
                info!("Deleted {}: {}", what, path.display());
                deleted += 1;
            }
            Err(e) => {
                warn!("Failed to delete {}: {}", path.display(), e);
            }
        }
    }
    deleted
}

/// First free destination for `file_name` in `dir`, appending (1), (2), ...
/// before the extension until the name doesn't collide.
pub fn unique_destination(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let name = Path::new(file_name);
    let stem = name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string());
    let ext = name.extension().map(|s| s.to_string_lossy().into_owned());

    let mut n: u64 = 1;
    loop {
        let numbered = match &ext {
            Some(ext) => format!("{}({}).{}", stem, n, ext),
            None => format!("{}({})", stem, n),
        };
        let candidate = dir.join(numbered);
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

/// Rename, falling back to copy+remove when source and destination sit
/// on different filesystems.
fn move_file(src: &Path, dest: &Path) -> Result<()> {
    if fs::rename(src, dest).is_ok() {
        return Ok(());
    }
    fs::copy(src, dest)
        .with_context(|| format!("Failed to copy {} to {}", src.display(), dest.display()))?;
    fs::remove_file(src)
        .with_context(|| format!("Failed to remove {} after copy", src.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_record_paired_is_idempotent() {
        let mut ledger = Ledger::new();
        let still = Path::new("/in/a.jpg");
        let video = Path::new("/in/a.mov");

        ledger.record_paired(still, video);
        ledger.record_paired(still, video);

        assert_eq!(ledger.pairs_found(), 1);
        assert_eq!(ledger.paired().len(), 2);
    }

    #[test]
    fn test_sets_stay_disjoint() {
        let mut ledger = Ledger::new();
        let still = Path::new("/in/a.jpg");

        ledger.record_problematic(still);
        ledger.record_converted_unmatched(still);
        assert_eq!(ledger.converted_unmatched().len(), 0);

        // A later successful pairing supersedes the failure record
        ledger.record_paired(still, Path::new("/in/a.mov"));
        assert!(ledger.problematic().is_empty());
        assert!(ledger.is_paired(still));
    }

    #[test]
    fn test_unique_destination_appends_counter() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.jpg"), b"x").unwrap();
        fs::write(dir.path().join("a(1).jpg"), b"x").unwrap();

        let dest = unique_destination(dir.path(), "a.jpg");
        assert_eq!(dest.file_name().unwrap(), "a(2).jpg");
    }

    #[test]
    fn test_unique_destination_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("README"), b"x").unwrap();

        let dest = unique_destination(dir.path(), "README");
        assert_eq!(dest.file_name().unwrap(), "README(1)");
    }

    #[test]
    fn test_relocate_skips_paired_and_resolves_collisions() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        fs::create_dir(input.path().join("sub")).unwrap();
        fs::write(input.path().join("keep.jpg"), b"paired").unwrap();
        fs::write(input.path().join("c.png"), b"one").unwrap();
        fs::write(input.path().join("sub").join("c.png"), b"two").unwrap();

        let mut ledger = Ledger::new();
        ledger.record_paired(&input.path().join("keep.jpg"), Path::new("/elsewhere/keep.mov"));

        let moved = ledger
            .relocate_unmatched(input.path(), output.path(), false)
            .unwrap();
        assert_eq!(moved, 2);

        let dest = output.path().join(OTHER_FILES_DIR);
        assert!(dest.join("c.png").exists());
        assert!(dest.join("c(1).png").exists());
        assert!(input.path().join("keep.jpg").exists());
        assert!(!input.path().join("c.png").exists());
    }

    #[test]
    fn test_relocate_ignores_output_subtree_under_input() {
        let input = tempfile::tempdir().unwrap();
        let output_dir = input.path().join("out");
        fs::create_dir_all(output_dir.join(OTHER_FILES_DIR)).unwrap();
        fs::write(output_dir.join("container.jpg"), b"muxed").unwrap();
        fs::write(output_dir.join(OTHER_FILES_DIR).join("old.png"), b"moved-earlier").unwrap();
        fs::write(input.path().join("c.png"), b"leftover").unwrap();

        let ledger = Ledger::new();
        let moved = ledger
            .relocate_unmatched(input.path(), &output_dir, false)
            .unwrap();

        // Only the leftover moves; containers and already-relocated
        // files are never picked up again
        assert_eq!(moved, 1);
        assert!(output_dir.join("container.jpg").exists());
        let other = output_dir.join(OTHER_FILES_DIR);
        assert!(other.join("c.png").exists());
        assert!(other.join("old.png").exists());
        assert!(!other.join("old(1).png").exists());
        assert!(!other.join("container.jpg").exists());
    }

    #[test]
    fn test_relocate_can_skip_converted_unmatched() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        fs::write(input.path().join("x.heic"), b"heic").unwrap();

        let mut ledger = Ledger::new();
        ledger.record_converted_unmatched(&input.path().join("x.heic"));

        let moved = ledger
            .relocate_unmatched(input.path(), output.path(), true)
            .unwrap();
        assert_eq!(moved, 0);
        assert!(input.path().join("x.heic").exists());
    }

    #[test]
    fn test_delete_paired_leaves_other_sets_alone() {
        let dir = tempfile::tempdir().unwrap();
        let paired = dir.path().join("a.jpg");
        let paired_video = dir.path().join("a.mov");
        let unmatched = dir.path().join("x.heic");
        let failed = dir.path().join("y.heic");
        for p in [&paired, &paired_video, &unmatched, &failed] {
            fs::write(p, b"data").unwrap();
        }

        let mut ledger = Ledger::new();
        ledger.record_paired(&paired, &paired_video);
        ledger.record_converted_unmatched(&unmatched);
        ledger.record_problematic(&failed);

        let deleted = ledger.delete_paired();
        assert_eq!(deleted, 2);
        assert!(!paired.exists());
        assert!(!paired_video.exists());
        assert!(unmatched.exists());
        assert!(failed.exists());
    }

    #[test]
    fn test_delete_missing_file_is_not_an_error() {
        let mut ledger = Ledger::new();
        ledger.record_paired(Path::new("/nonexistent/a.jpg"), Path::new("/nonexistent/a.mov"));
        assert_eq!(ledger.delete_paired(), 0);
    }

    proptest! {
        /// Relocating any number of identically-named files never
        /// overwrites: every file lands under a distinct name.
        #[test]
        fn prop_collision_naming_never_overwrites(count in 1usize..8) {
            let dir = tempfile::tempdir().unwrap();
            let mut names = std::collections::HashSet::new();
            for i in 0..count {
                let dest = unique_destination(dir.path(), "photo.jpg");
                fs::write(&dest, format!("{}", i)).unwrap();
                prop_assert!(names.insert(dest));
            }
            prop_assert_eq!(names.len(), count);
        }
    }
}
