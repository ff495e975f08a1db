//! Grayscale pixel feature extraction

use crate::config::ImageConfig;
use crate::error::{Error, Result};
use crate::media::MediaKind;
use crate::scan::collect_media;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageBuffer, ImageReader, Luma};
use ndarray::Array2;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

// Luma weights applied to 8-bit RGB
const RED_WEIGHT: f32 = 0.2989;
const GREEN_WEIGHT: f32 = 0.5870;
const BLUE_WEIGHT: f32 = 0.1140;

/// Feature vectors of a dataset, row `i` belonging to `paths[i]`
#[derive(Debug, Clone)]
pub struct ImageDataset {
    pub paths: Vec<PathBuf>,
    pub vectors: Array2<f64>,
}

impl ImageDataset {
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Turns images into fixed-length intensity vectors
#[derive(Debug, Clone)]
pub struct ImageExtractor {
    width: u32,
    height: u32,
    recursive: bool,
}

impl ImageExtractor {
    pub fn new(config: &ImageConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            recursive: config.recursive,
        }
    }

    /// Length of every vector this extractor produces
    pub fn dimension(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Decode and vectorise one image file
    pub fn extract_file(&self, path: &Path) -> Result<Vec<f64>> {
        // Failing to open or read is an I/O error; anything after that is a decode error.
        // The format comes from the file's magic bytes, falling back to its extension.
        let img = ImageReader::open(path)?
            .with_guessed_format()?
            .decode()
            .map_err(|e| Error::decode(path, e))?;
        Ok(self.extract_image(&img))
    }

    /// Grayscale, resize and flatten row-major
    pub fn extract_image(&self, img: &DynamicImage) -> Vec<f64> {
        let rgb = img.to_rgb8();
        let gray: ImageBuffer<Luma<f32>, Vec<f32>> =
            ImageBuffer::from_fn(rgb.width(), rgb.height(), |x, y| {
                let [r, g, b] = rgb.get_pixel(x, y).0;
                Luma([RED_WEIGHT * f32::from(r)
                    + GREEN_WEIGHT * f32::from(g)
                    + BLUE_WEIGHT * f32::from(b)])
            });

        let resized = imageops::resize(&gray, self.width, self.height, FilterType::Triangle);
        resized.into_raw().into_iter().map(f64::from).collect()
    }

    /// Extract every image in `dir`.
    ///
    /// Undecodable files are skipped with a warning; any other failure
    /// aborts. Fails with `EmptyDataset` when nothing could be decoded.
    pub fn load_dataset(&self, dir: &Path) -> Result<ImageDataset> {
        let candidates = collect_media(dir, MediaKind::Image, self.recursive)?;

        let extracted: Vec<(PathBuf, Result<Vec<f64>>)> = candidates
            .into_par_iter()
            .map(|path| {
                let vector = self.extract_file(&path);
                (path, vector)
            })
            .collect();

        let mut paths = Vec::with_capacity(extracted.len());
        let mut flat = Vec::with_capacity(extracted.len() * self.dimension());

        for (path, vector) in extracted {
            match vector {
                Ok(vector) => {
                    flat.extend(vector);
                    paths.push(path);
                }
                Err(e) if e.is_recoverable_per_file() => {
                    log::warn!("Skipping {}: {}", path.display(), e);
                }
                Err(e) => return Err(e),
            }
        }

        if paths.is_empty() {
            return Err(Error::EmptyDataset(dir.to_path_buf()));
        }

        let vectors = Array2::from_shape_vec((paths.len(), self.dimension()), flat)
            .map_err(|e| Error::InvalidInput(e.to_string()))?;

        log::info!("Extracted {} images from {}", paths.len(), dir.display());
        Ok(ImageDataset { paths, vectors })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::{Rgb, RgbImage};

    fn small_config() -> ImageConfig {
        ImageConfig {
            width: 8,
            height: 8,
            n_components: 2,
            ..ImageConfig::default()
        }
    }

    fn solid(width: u32, height: u32, color: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb(color))
    }

    #[test]
    fn test_luma_weights() {
        let extractor = ImageExtractor::new(&small_config());
        let vector =
            extractor.extract_image(&DynamicImage::ImageRgb8(solid(4, 4, [255, 0, 0])));

        assert_eq!(vector.len(), 64);
        for value in vector {
            assert_relative_eq!(value, 0.2989 * 255.0, epsilon = 1e-2);
        }
    }

    #[test]
    fn test_white_is_full_intensity() {
        let extractor = ImageExtractor::new(&small_config());
        let vector =
            extractor.extract_image(&DynamicImage::ImageRgb8(solid(20, 13, [255, 255, 255])));

        assert_eq!(vector.len(), extractor.dimension());
        for value in vector {
            assert_relative_eq!(value, 0.9999 * 255.0, epsilon = 1e-2);
        }
    }

    #[test]
    fn test_row_major_layout() {
        let config = ImageConfig {
            width: 2,
            height: 2,
            n_components: 1,
            ..ImageConfig::default()
        };
        let extractor = ImageExtractor::new(&config);
        let mut img = solid(2, 2, [0, 0, 0]);
        img.put_pixel(1, 0, Rgb([255, 255, 255]));

        let vector = extractor.extract_image(&DynamicImage::ImageRgb8(img));
        assert!(vector[1] > 200.0);
        assert!(vector[0] < 1.0 && vector[2] < 1.0 && vector[3] < 1.0);
    }

    #[test]
    fn test_load_dataset_skips_undecodable_files() {
        let dir = tempfile::tempdir().unwrap();
        solid(10, 10, [10, 20, 30]).save(dir.path().join("a.png")).unwrap();
        solid(30, 15, [200, 100, 0]).save(dir.path().join("b.jpg")).unwrap();
        std::fs::write(
            dir.path().join("broken.png"),
            b"this is not an image, only some plain text",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let extractor = ImageExtractor::new(&small_config());
        let dataset = extractor.load_dataset(dir.path()).unwrap();

        let names: Vec<_> = dataset
            .paths
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.png", "b.jpg"]);
        assert_eq!(dataset.vectors.shape(), &[2, 64]);
    }

    #[test]
    fn test_format_follows_content_not_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disguised.jpg");
        solid(6, 6, [255, 255, 255])
            .save_with_format(&path, image::ImageFormat::Png)
            .unwrap();

        let extractor = ImageExtractor::new(&small_config());
        let vector = extractor.extract_file(&path).unwrap();
        assert_eq!(vector.len(), 64);
        assert!(vector.iter().all(|&v| v > 250.0));
    }

    #[test]
    fn test_load_dataset_rows_follow_paths() {
        let dir = tempfile::tempdir().unwrap();
        solid(5, 5, [0, 0, 0]).save(dir.path().join("dark.png")).unwrap();
        solid(5, 5, [255, 255, 255]).save(dir.path().join("light.png")).unwrap();

        let extractor = ImageExtractor::new(&small_config());
        let dataset = extractor.load_dataset(dir.path()).unwrap();

        assert!(dataset.paths[0].ends_with("dark.png"));
        assert!(dataset.vectors[(0, 0)] < 1.0);
        assert!(dataset.vectors[(1, 0)] > 250.0);
    }

    #[test]
    fn test_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("broken.png"),
            b"plain text pretending to be a png file",
        )
        .unwrap();

        let extractor = ImageExtractor::new(&small_config());
        assert!(matches!(
            extractor.load_dataset(dir.path()),
            Err(Error::EmptyDataset(_))
        ));
    }

    #[test]
    fn test_extract_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.png");
        std::fs::write(&broken, b"plain text pretending to be a png file").unwrap();

        let extractor = ImageExtractor::new(&small_config());
        assert!(matches!(
            extractor.extract_file(&broken),
            Err(Error::Decode { .. })
        ));
        assert!(matches!(
            extractor.extract_file(&dir.path().join("missing.png")),
            Err(Error::Io(_))
        ));
    }
}
