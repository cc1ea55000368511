use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use log::info;

use crate::classify::{classify, MediaKind};
use crate::error::MuxError;
use crate::ledger::unique_destination;

/// A muxed container and the end-relative offset of its video payload
#[derive(Debug, Clone)]
pub struct MuxOutput {
    pub container: PathBuf,
    /// Bytes from end of file back to the start of the video payload.
    /// Equals the video's size.
    pub offset: u64,
}

/// Check that a candidate pair is muxable: recognized still and video
/// extensions, both files present on disk.
pub fn validate_pair(still: &Path, video: &Path) -> Result<(), MuxError> {
    if !still.exists() {
        return Err(MuxError::InvalidPair(format!(
            "photo does not exist: {}",
            still.display()
        )));
    }
    if !video.exists() {
        return Err(MuxError::InvalidPair(format!(
            "video does not exist: {}",
            video.display()
        )));
    }
    if classify(still) != MediaKind::Still {
        return Err(MuxError::InvalidPair(format!(
            "photo isn't a JPEG: {}",
            still.display()
        )));
    }
    if classify(video) != MediaKind::Video {
        return Err(MuxError::InvalidPair(format!(
            "video isn't a MOV or MP4: {}",
            video.display()
        )));
    }
    Ok(())
}

/// Concatenate still bytes then video bytes into a fresh container under
/// `output_dir`, named after the still with collision-safe numbering.
///
/// Preconditions: the pair passed `validate_pair`. The returned offset is
/// `container_size - still_size`.
pub fn mux_pair(still: &Path, video: &Path, output_dir: &Path) -> Result<MuxOutput> {
    info!("Merging {} and {}", still.display(), video.display());

    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    let file_name = still
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Still path has no usable file name: {}", still.display()))?;
    let container = unique_destination(output_dir, file_name);

    let mut out = BufWriter::new(
        File::create(&container)
            .with_context(|| format!("Failed to create container: {}", container.display()))?,
    );
    let mut still_in = File::open(still)
        .with_context(|| format!("Failed to open photo: {}", still.display()))?;
    let mut video_in = File::open(video)
        .with_context(|| format!("Failed to open video: {}", video.display()))?;

    io::copy(&mut still_in, &mut out)
        .with_context(|| format!("Failed to copy photo bytes into {}", container.display()))?;
    io::copy(&mut video_in, &mut out)
        .with_context(|| format!("Failed to copy video bytes into {}", container.display()))?;
    let out = out
        .into_inner()
        .with_context(|| format!("Failed to flush container: {}", container.display()))?;
    out.sync_all()
        .with_context(|| format!("Failed to sync container: {}", container.display()))?;

    let still_size = fs::metadata(still)
        .with_context(|| format!("Failed to stat photo: {}", still.display()))?
        .len();
    let container_size = fs::metadata(&container)
        .with_context(|| format!("Failed to stat container: {}", container.display()))?
        .len();
    let offset = container_size - still_size;

    info!(
        "Merged photo and video into {} ({} bytes, video offset {})",
        container.display(),
        container_size,
        offset
    );

    Ok(MuxOutput { container, offset })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_validate_pair_rejects_wrong_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("a.png");
        let mov = dir.path().join("a.mov");
        let jpg = dir.path().join("a.jpg");
        let avi = dir.path().join("a.avi");
        for p in [&png, &mov, &jpg, &avi] {
            fs::write(p, b"x").unwrap();
        }

        assert!(validate_pair(&png, &mov).is_err());
        assert!(validate_pair(&jpg, &avi).is_err());
        assert!(validate_pair(&jpg, &mov).is_ok());
    }

    #[test]
    fn test_validate_pair_rejects_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let jpg = dir.path().join("a.jpg");
        fs::write(&jpg, b"x").unwrap();

        assert!(validate_pair(&jpg, &dir.path().join("a.mov")).is_err());
        assert!(validate_pair(&dir.path().join("b.jpg"), &jpg).is_err());
    }

    #[test]
    fn test_container_layout_and_offset() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("out");
        let still = dir.path().join("a.jpg");
        let video = dir.path().join("a.mov");
        fs::write(&still, b"PHOTOBYTES").unwrap();
        fs::write(&video, b"VIDEO").unwrap();

        let out = mux_pair(&still, &video, &out_dir).unwrap();
        assert_eq!(out.offset, 5);

        let bytes = fs::read(&out.container).unwrap();
        assert_eq!(bytes, b"PHOTOBYTESVIDEO");
        assert_eq!(out.container.file_name().unwrap(), "a.jpg");
    }

    #[test]
    fn test_second_mux_with_same_name_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("out");
        fs::create_dir(dir.path().join("one")).unwrap();
        fs::create_dir(dir.path().join("two")).unwrap();
        let still1 = dir.path().join("one").join("a.jpg");
        let video1 = dir.path().join("one").join("a.mov");
        let still2 = dir.path().join("two").join("a.jpg");
        let video2 = dir.path().join("two").join("a.mp4");
        fs::write(&still1, b"first-photo").unwrap();
        fs::write(&video1, b"first-video").unwrap();
        fs::write(&still2, b"second-photo").unwrap();
        fs::write(&video2, b"second-video").unwrap();

        let first = mux_pair(&still1, &video1, &out_dir).unwrap();
        let second = mux_pair(&still2, &video2, &out_dir).unwrap();

        assert_eq!(first.container.file_name().unwrap(), "a.jpg");
        assert_eq!(second.container.file_name().unwrap(), "a(1).jpg");
        assert_eq!(fs::read(&first.container).unwrap(), b"first-photofirst-video");
        assert_eq!(fs::read(&second.container).unwrap(), b"second-photosecond-video");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// For any non-empty payloads, the container is the exact
        /// concatenation and the offset equals the video size.
        #[test]
        fn prop_container_is_concatenation(
            photo in proptest::collection::vec(any::<u8>(), 1..4096),
            video in proptest::collection::vec(any::<u8>(), 1..4096),
        ) {
            let dir = tempfile::tempdir().unwrap();
            let out_dir = dir.path().join("out");
            let still_path = dir.path().join("p.jpg");
            let video_path = dir.path().join("p.mp4");
            fs::write(&still_path, &photo).unwrap();
            fs::write(&video_path, &video).unwrap();

            let out = mux_pair(&still_path, &video_path, &out_dir).unwrap();
            prop_assert_eq!(out.offset, video.len() as u64);

            let bytes = fs::read(&out.container).unwrap();
            prop_assert_eq!(bytes.len(), photo.len() + video.len());
            prop_assert_eq!(&bytes[..photo.len()], &photo[..]);
            prop_assert_eq!(&bytes[photo.len()..], &video[..]);
        }
    }
}
