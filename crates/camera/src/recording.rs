//! Recording source: a directory of image files played in name order.

use std::path::{Path, PathBuf};

use contracts::{ContractError, FrameSource, FrameSourceKind};
use image::RgbImage;
use tracing::{info, warn};

use crate::error::{CameraError, Result};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

pub struct RecordingSource {
    name: String,
    frames: Vec<PathBuf>,
    cursor: usize,
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

impl RecordingSource {
    pub fn open(dir: &Path) -> Result<Self> {
        let entries = std::fs::read_dir(dir).map_err(|e| CameraError::open(dir, e))?;
        let mut frames: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_image(p))
            .collect();
        frames.sort();

        if frames.is_empty() {
            return Err(CameraError::EmptyRecording {
                path: dir.to_path_buf(),
            });
        }
        info!(path = %dir.display(), frames = frames.len(), "opened recording");

        Ok(Self {
            name: format!("recording:{}", dir.display()),
            frames,
            cursor: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameSource for RecordingSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> FrameSourceKind {
        FrameSourceKind::Recording
    }

    /// Undecodable files are skipped; an error means the end was reached.
    fn read_frame(&mut self) -> std::result::Result<RgbImage, ContractError> {
        while let Some(path) = self.frames.get(self.cursor) {
            self.cursor += 1;
            match image::open(path) {
                Ok(img) => return Ok(img.to_rgb8()),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping undecodable frame"),
            }
        }
        Err(ContractError::frame_read(&self.name, "end of recording"))
    }

    fn rewind(&mut self) -> std::result::Result<(), ContractError> {
        self.cursor = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn write_frame(dir: &Path, name: &str, shade: u8) {
        RgbImage::from_pixel(8, 6, Rgb([shade, shade, shade]))
            .save(dir.join(name))
            .unwrap();
    }

    #[test]
    fn test_plays_in_name_order_then_rewinds() {
        let dir = tempfile::tempdir().unwrap();
        write_frame(dir.path(), "0002.png", 20);
        write_frame(dir.path(), "0001.png", 10);
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut src = RecordingSource::open(dir.path()).unwrap();
        assert_eq!(src.len(), 2);
        assert_eq!(src.read_frame().unwrap().get_pixel(0, 0)[0], 10);
        assert_eq!(src.read_frame().unwrap().get_pixel(0, 0)[0], 20);
        assert!(src.read_frame().is_err());

        src.rewind().unwrap();
        assert_eq!(src.read_frame().unwrap().get_pixel(0, 0)[0], 10);
    }

    #[test]
    fn test_corrupt_frame_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("0001.png"), b"not a png").unwrap();
        write_frame(dir.path(), "0002.png", 99);

        let mut src = RecordingSource::open(dir.path()).unwrap();
        assert_eq!(src.read_frame().unwrap().get_pixel(0, 0)[0], 99);
    }

    #[test]
    fn test_empty_directory_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            RecordingSource::open(dir.path()),
            Err(CameraError::EmptyRecording { .. })
        ));
    }

    #[test]
    fn test_missing_directory_rejected() {
        assert!(matches!(
            RecordingSource::open(Path::new("/nonexistent/rover/frames")),
            Err(CameraError::Open { .. })
        ));
    }
}
