//! Live snapshot source: an image file an external capture process keeps
//! overwriting. A read racing a partial write fails and is retried.

use std::path::{Path, PathBuf};

use contracts::{ContractError, FrameSource, FrameSourceKind};
use image::RgbImage;

use crate::error::{CameraError, Result};

pub struct SnapshotSource {
    name: String,
    path: PathBuf,
}

impl SnapshotSource {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::metadata(path).map_err(|e| CameraError::open(path, e))?;
        Ok(Self {
            name: format!("snapshot:{}", path.display()),
            path: path.to_path_buf(),
        })
    }
}

impl FrameSource for SnapshotSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> FrameSourceKind {
        FrameSourceKind::Live
    }

    fn read_frame(&mut self) -> std::result::Result<RgbImage, ContractError> {
        image::open(&self.path)
            .map(|img| img.to_rgb8())
            .map_err(|e| ContractError::frame_read(&self.name, e.to_string()))
    }

    fn rewind(&mut self) -> std::result::Result<(), ContractError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_reads_latest_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cam.png");
        RgbImage::from_pixel(4, 4, Rgb([1, 2, 3])).save(&path).unwrap();

        let mut src = SnapshotSource::open(&path).unwrap();
        assert_eq!(src.kind(), FrameSourceKind::Live);
        assert_eq!(*src.read_frame().unwrap().get_pixel(0, 0), Rgb([1, 2, 3]));

        RgbImage::from_pixel(4, 4, Rgb([7, 8, 9])).save(&path).unwrap();
        assert_eq!(*src.read_frame().unwrap().get_pixel(0, 0), Rgb([7, 8, 9]));
    }

    #[test]
    fn test_partial_write_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cam.png");
        std::fs::write(&path, b"\x89PNG trunc").unwrap();
        let mut src = SnapshotSource::open(&path).unwrap();
        assert!(matches!(
            src.read_frame(),
            Err(ContractError::FrameRead { .. })
        ));
    }
}
