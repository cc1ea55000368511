use std::path::{Path, PathBuf};

/// Still-image extensions that can be muxed directly
pub const STILL_EXTENSIONS: &[&str] = &["jpg", "jpeg"];

/// Still-image extensions that need conversion before muxing
pub const CONVERTIBLE_EXTENSIONS: &[&str] = &["heic"];

/// Video extensions accepted as the motion component
pub const VIDEO_EXTENSIONS: &[&str] = &["mov", "mp4"];

/// Classification of a file by its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Still,
    ConvertibleStill,
    Video,
    Other,
}

/// Classify a path by extension, case-insensitively. No I/O.
pub fn classify(path: &Path) -> MediaKind {
    let ext = match path.extension().and_then(|s| s.to_str()) {
        Some(e) => e.to_lowercase(),
        None => return MediaKind::Other,
    };

    if STILL_EXTENSIONS.contains(&ext.as_str()) {
        MediaKind::Still
    } else if CONVERTIBLE_EXTENSIONS.contains(&ext.as_str()) {
        MediaKind::ConvertibleStill
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        MediaKind::Video
    } else {
        MediaKind::Other
    }
}

/// Lowercased file stem, the join key for still/video matching
pub fn stem_key(path: &Path) -> Option<String> {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
}

/// A classified file discovered during the walk
#[derive(Debug, Clone)]
pub struct MediaAsset {
    pub path: PathBuf,
    pub kind: MediaKind,
    pub stem: String,
}

impl MediaAsset {
    pub fn from_path(path: &Path) -> Self {
        MediaAsset {
            path: path.to_path_buf(),
            kind: classify(path),
            stem: stem_key(path).unwrap_or_default(),
        }
    }
}
