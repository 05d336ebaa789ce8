//! Directory-backed frame source.

use std::path::{Path, PathBuf};

use dialtrack::{FrameSource, TrackError};
use image::RgbImage;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff"];

/// Image files of a directory, in file-name order.
pub struct ImageSequence {
    paths: Vec<PathBuf>,
    next: usize,
}

impl ImageSequence {
    pub fn from_dir(dir: &Path) -> Result<Self, TrackError> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_image = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
            if path.is_file() && is_image {
                paths.push(path);
            }
        }
        paths.sort();
        tracing::info!("{} frames in {}", paths.len(), dir.display());
        Ok(Self { paths, next: 0 })
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameSource for ImageSequence {
    fn next_frame(&mut self) -> Result<Option<RgbImage>, TrackError> {
        let Some(path) = self.paths.get(self.next) else {
            return Ok(None);
        };
        let img = image::open(path)?.to_rgb8();
        self.next += 1;
        tracing::debug!("frame {}: {}", self.next - 1, path.display());
        Ok(Some(img))
    }
}
