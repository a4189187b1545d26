use crate::error::{ImageError, SourceError};
use crate::models::{ColorImage, LumaImage};
use crate::scheduler::FrameSource;
use image::GenericImageView;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Failure loading an image from disk
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be opened or decoded
    #[error(transparent)]
    Image(#[from] image::ImageError),
    /// The decoded pixels did not fit the buffer type
    #[error(transparent)]
    Buffer(#[from] ImageError),
}

fn max_dim_from_env() -> Option<u32> {
    match env::var("QR_MAX_DIM") {
        Ok(value) => match value.trim().parse::<u32>() {
            Ok(0) => None,
            Ok(v) => Some(v),
            Err(_) => None,
        },
        Err(_) => None,
    }
}

fn open_scaled(path: &Path) -> Result<image::DynamicImage, image::ImageError> {
    let img = image::open(path)?;
    if let Some(max_dim) = max_dim_from_env() {
        let (w, h) = img.dimensions();
        if w.max(h) > max_dim {
            return Ok(img.resize(max_dim, max_dim, image::imageops::FilterType::Triangle));
        }
    }
    Ok(img)
}

/// Load an image as RGBA, downscaled when `QR_MAX_DIM` is set.
pub fn load_rgba<P: AsRef<Path>>(path: P) -> Result<ColorImage, LoadError> {
    let rgba = open_scaled(path.as_ref())?.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(ColorImage::rgba(width as usize, height as usize, rgba.into_raw())?)
}

/// Load an image and reduce it to luminance with the crate's reducer.
pub fn load_luma<P: AsRef<Path>>(path: P) -> Result<LumaImage, LoadError> {
    Ok(LumaImage::from_color(&load_rgba(path)?))
}

/// Summary statistics for luminance data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrayStats {
    /// Minimum value.
    pub min: u8,
    /// Maximum value.
    pub max: u8,
    /// Average value.
    pub avg: u8,
}

/// Compute min/max/avg of a luminance buffer.
pub fn grayscale_stats(gray: &[u8]) -> GrayStats {
    if gray.is_empty() {
        return GrayStats { min: 0, max: 0, avg: 0 };
    }
    let mut min = u8::MAX;
    let mut max = u8::MIN;
    let mut sum: u64 = 0;
    for &v in gray {
        min = min.min(v);
        max = max.max(v);
        sum += v as u64;
    }
    GrayStats {
        min,
        max,
        avg: (sum / gray.len() as u64) as u8,
    }
}

/// Image files under `root`, recursively, sorted by path.
pub fn collect_images<P: AsRef<Path>>(root: P) -> Vec<PathBuf> {
    let mut stack = vec![root.as_ref().to_path_buf()];
    let mut images = Vec::new();

    while let Some(dir) = stack.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => continue,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            if let Some(ext) = path.extension() {
                let ext = ext.to_string_lossy().to_lowercase();
                if matches!(ext.as_str(), "png" | "jpg" | "jpeg" | "gif" | "bmp") {
                    images.push(path);
                }
            }
        }
    }

    images.sort();
    images
}

/// Files and directories given on a command line, flattened to image files
///
/// Files pass through in order; each directory expands to its sorted images.
/// A directory holding no images is returned as the error.
pub fn expand_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, PathBuf> {
    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let found = collect_images(input);
            if found.is_empty() {
                return Err(input.clone());
            }
            paths.extend(found);
        } else {
            paths.push(input.clone());
        }
    }
    Ok(paths)
}

/// Frame source replaying a fixed list of image files
///
/// Useful for exercising the live scheduler without a camera. With
/// `repeat` set the list loops forever; otherwise the source is exhausted
/// after the last file.
#[derive(Debug, Clone)]
pub struct FileFrameSource {
    paths: Vec<PathBuf>,
    next: usize,
    repeat: bool,
}

impl FileFrameSource {
    /// Replay `paths` in order
    pub fn new(paths: Vec<PathBuf>, repeat: bool) -> Self {
        Self {
            paths,
            next: 0,
            repeat,
        }
    }

    /// Replay every image under `dir`
    pub fn from_dir<P: AsRef<Path>>(dir: P, repeat: bool) -> Self {
        Self::new(collect_images(dir), repeat)
    }

    /// Number of files in the playlist
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// True when there is nothing to replay
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameSource for FileFrameSource {
    fn next_frame(&mut self) -> Result<Option<LumaImage>, SourceError> {
        if self.paths.is_empty() {
            return Ok(None);
        }
        if self.next >= self.paths.len() {
            if !self.repeat {
                return Ok(None);
            }
            self.next = 0;
        }
        let path = &self.paths[self.next];
        self.next += 1;
        debug!(path = %path.display(), "loading frame");
        load_luma(path)
            .map(Some)
            .map_err(|e| SourceError::Unavailable(format!("{}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_png(path: &Path, value: u8) {
        let img = image::GrayImage::from_pixel(8, 6, image::Luma([value]));
        img.save(path).expect("failed to write png");
    }

    #[test]
    fn grayscale_stats_basic() {
        assert_eq!(
            grayscale_stats(&[10, 20, 30]),
            GrayStats { min: 10, max: 30, avg: 20 }
        );
        assert_eq!(grayscale_stats(&[]), GrayStats { min: 0, max: 0, avg: 0 });
    }

    #[test]
    fn load_luma_reads_png() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("frame.png");
        write_png(&path, 200);
        let luma = load_luma(&path).unwrap();
        assert_eq!((luma.width(), luma.height()), (8, 6));
        // integer luma weights sum to 255/256
        assert!(luma.data().iter().all(|&v| v == 199));
    }

    #[test]
    fn file_source_replays_and_ends() {
        let dir = tempdir().unwrap();
        write_png(&dir.path().join("b.png"), 20);
        write_png(&dir.path().join("a.png"), 10);
        fs::write(dir.path().join("notes.txt"), "skip me").unwrap();

        let mut source = FileFrameSource::from_dir(dir.path(), false);
        assert_eq!(source.len(), 2);
        let first = source.next_frame().unwrap().unwrap().get(0, 0);
        let second = source.next_frame().unwrap().unwrap().get(0, 0);
        assert!(first < 12 && second > 12, "{first} {second}");
        assert!(source.next_frame().unwrap().is_none());

        let mut looping = FileFrameSource::from_dir(dir.path(), true);
        for _ in 0..3 {
            assert!(looping.next_frame().unwrap().is_some());
        }
    }

    #[test]
    fn file_source_reports_bad_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.png");
        fs::write(&path, b"not a png").unwrap();
        let mut source = FileFrameSource::new(vec![path], false);
        assert!(matches!(source.next_frame(), Err(SourceError::Unavailable(_))));
    }

    #[test]
    fn expand_inputs_mixes_files_and_dirs() {
        let dir = tempdir().unwrap();
        let frames = dir.path().join("frames");
        fs::create_dir(&frames).unwrap();
        write_png(&frames.join("2.png"), 10);
        write_png(&frames.join("1.png"), 10);
        let single = dir.path().join("single.png");
        write_png(&single, 10);

        let paths = expand_inputs(&[single.clone(), frames.clone()]).unwrap();
        assert_eq!(paths, vec![single, frames.join("1.png"), frames.join("2.png")]);

        let empty = dir.path().join("empty");
        fs::create_dir(&empty).unwrap();
        assert_eq!(expand_inputs(&[empty.clone()]), Err(empty));
    }
}
