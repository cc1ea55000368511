use std::path::{Path, PathBuf};
use log::{debug, warn};
use walkdir::WalkDir;

use crate::classify::{classify, stem_key, MediaKind};

/// Find the video that pairs with a still whose lowercased stem is `stem`.
///
/// The walk is sorted by file name at every directory level, so "first
/// match wins" is deterministic, lexicographic by path. A candidate
/// matches only on exact stem equality (case-insensitive), since prefix
/// matching would let IMG_001 pair with IMG_0011.mov.
pub fn find_matching_video(stem: &str, search_root: &Path) -> Option<PathBuf> {
    let want = stem.to_lowercase();

    for entry in WalkDir::new(search_root)
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
        if classify(path) != MediaKind::Video {
            continue;
        }

        match stem_key(path) {
            Some(candidate) if candidate == want => {
                debug!("Matched video for stem '{}': {}", want, path.display());
                return Some(path.to_path_buf());
            }
            _ => {}
        }
    }

    None
}
