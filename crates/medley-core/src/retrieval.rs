//! Retrieval facades
//!
//! A facade owns one engine's fitted state behind a read-write lock. `fit`
//! holds the write side from the first file it reads until the new state is
//! installed, so concurrent `predict` and `fit` calls wait for it. The new
//! state is built apart from the old one, and a failed fit leaves the
//! previous state in place.

use crate::config::{AudioConfig, ImageConfig};
use crate::error::{Error, Result};
use crate::image::{ImageExtractor, ImageIndex, SubspaceModel};
use crate::matching::RankedMatch;
use crate::media::{MediaFormat, MediaKind, QueryInput, ScopedQueryFile};
use crate::scan::collect_media;
use crate::tone::{ToneHistogram, ToneIndex, ToneTranscriber};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Common surface of the image and audio facades
pub trait Retriever: Send + Sync {
    /// Media kind this facade indexes and accepts as queries
    fn kind(&self) -> MediaKind;

    /// Index every eligible file in `dir`, replacing any previous index
    fn fit(&self, dir: &Path) -> Result<()>;

    /// Rank indexed items against the query file at `path`.
    ///
    /// `limit` and `cutoff` override the configured defaults. The cutoff is
    /// a maximum distance for images and a minimum similarity for audio.
    fn predict(
        &self,
        path: &Path,
        limit: Option<usize>,
        cutoff: Option<f64>,
    ) -> Result<Vec<RankedMatch>>;

    fn is_fitted(&self) -> bool;

    /// Number of indexed items, 0 when unfitted
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rank against an in-memory upload.
    ///
    /// The bytes are written to a temporary file that is removed before
    /// this returns, whether or not prediction succeeds.
    fn predict_input(
        &self,
        input: &QueryInput,
        limit: Option<usize>,
        cutoff: Option<f64>,
    ) -> Result<Vec<RankedMatch>> {
        let format = input.format()?;
        if format.kind() != self.kind() {
            return Err(Error::WrongMediaKind {
                path: PathBuf::from(&input.name),
                expected: self.kind(),
            });
        }
        if !self.is_fitted() {
            return Err(Error::NotFitted);
        }

        let query = ScopedQueryFile::materialise(input)?;
        self.predict(query.path(), limit, cutoff)
    }
}

/// Fitted state behind a read-write lock.
///
/// The state is only ever replaced whole, after it has been built, so a
/// guard recovered from a poisoned lock still sees a consistent value.
#[derive(Debug)]
struct Published<T> {
    state: RwLock<Option<T>>,
}

impl<T> Published<T> {
    fn new() -> Self {
        Self {
            state: RwLock::new(None),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<T>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<T>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug)]
struct ImageState {
    model: SubspaceModel,
    index: ImageIndex,
}

/// Image retrieval: grayscale pixels, principal subspace, distance ranking
#[derive(Debug)]
pub struct ImageRetriever {
    config: ImageConfig,
    extractor: ImageExtractor,
    state: Published<ImageState>,
}

impl ImageRetriever {
    pub fn new(config: ImageConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            extractor: ImageExtractor::new(&config),
            config,
            state: Published::new(),
        })
    }

    pub fn config(&self) -> &ImageConfig {
        &self.config
    }

    fn build(&self, dir: &Path) -> Result<ImageState> {
        let dataset = self.extractor.load_dataset(dir)?;
        let mut model = SubspaceModel::new(self.config.n_components);
        let projections = model.fit_transform(&dataset.vectors)?;
        let index = ImageIndex::build(dataset.paths, &projections)?;

        log::info!(
            "Fitted image index over {} images ({} components)",
            index.len(),
            model.n_components()
        );
        Ok(ImageState { model, index })
    }
}

impl Retriever for ImageRetriever {
    fn kind(&self) -> MediaKind {
        MediaKind::Image
    }

    fn fit(&self, dir: &Path) -> Result<()> {
        let mut state = self.state.write();
        *state = Some(self.build(dir)?);
        Ok(())
    }

    fn predict(
        &self,
        path: &Path,
        limit: Option<usize>,
        cutoff: Option<f64>,
    ) -> Result<Vec<RankedMatch>> {
        MediaFormat::expect_kind(path, MediaKind::Image)?;
        let guard = self.state.read();
        let state = guard.as_ref().ok_or(Error::NotFitted)?;

        let vector = self.extractor.extract_file(path)?;
        let projection = state.model.project(&vector)?;

        let results = state.index.rank(
            &projection.to_vec(),
            limit.unwrap_or(self.config.limit),
            cutoff.or(self.config.max_distance),
            self.config.metric,
        )?;
        log::debug!("{} matched {} images", path.display(), results.len());
        Ok(results)
    }

    fn is_fitted(&self) -> bool {
        self.state.read().is_some()
    }

    fn len(&self) -> usize {
        self.state.read().as_ref().map_or(0, |s| s.index.len())
    }
}

#[derive(Debug)]
struct AudioState {
    index: ToneIndex,
}

/// Audio retrieval: note transcription, tone histograms, cosine ranking
#[derive(Debug)]
pub struct AudioRetriever {
    config: AudioConfig,
    transcriber: ToneTranscriber,
    state: Published<AudioState>,
}

impl AudioRetriever {
    pub fn new(config: AudioConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            transcriber: ToneTranscriber::new(&config),
            config,
            state: Published::new(),
        })
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    fn histogram(&self, path: &Path) -> Result<ToneHistogram> {
        let notes = self.transcriber.transcribe(path)?;
        Ok(ToneHistogram::from_notes(&notes, self.config.reference_note))
    }

    fn build(&self, dir: &Path) -> Result<AudioState> {
        let candidates = collect_media(dir, MediaKind::Audio, self.config.recursive)?;
        let histograms: Vec<(PathBuf, Result<ToneHistogram>)> = candidates
            .into_par_iter()
            .map(|path| {
                let histogram = self.histogram(&path);
                (path, histogram)
            })
            .collect();

        let mut entries = Vec::with_capacity(histograms.len());
        for (path, histogram) in histograms {
            match histogram {
                Ok(histogram) => entries.push((path, histogram)),
                Err(e) if e.is_recoverable_per_file() => {
                    log::warn!("Skipping {}: {}", path.display(), e);
                }
                Err(e) => return Err(e),
            }
        }

        if entries.is_empty() {
            return Err(Error::EmptyDataset(dir.to_path_buf()));
        }

        let index = ToneIndex::build(entries);
        log::info!(
            "Fitted tone index over {} files from {}",
            index.len(),
            dir.display()
        );
        Ok(AudioState { index })
    }
}

impl Retriever for AudioRetriever {
    fn kind(&self) -> MediaKind {
        MediaKind::Audio
    }

    fn fit(&self, dir: &Path) -> Result<()> {
        let mut state = self.state.write();
        *state = Some(self.build(dir)?);
        Ok(())
    }

    fn predict(
        &self,
        path: &Path,
        limit: Option<usize>,
        cutoff: Option<f64>,
    ) -> Result<Vec<RankedMatch>> {
        MediaFormat::expect_kind(path, MediaKind::Audio)?;
        let guard = self.state.read();
        let state = guard.as_ref().ok_or(Error::NotFitted)?;

        let histogram = self.histogram(path)?;
        let results = state.index.rank(
            &histogram,
            cutoff.unwrap_or(self.config.similarity_threshold),
            limit.or(self.config.limit),
        );
        log::debug!("{} matched {} files", path.display(), results.len());
        Ok(results)
    }

    fn is_fitted(&self) -> bool {
        self.state.read().is_some()
    }

    fn len(&self) -> usize {
        self.state.read().as_ref().map_or(0, |s| s.index.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    fn small_image_config() -> ImageConfig {
        ImageConfig {
            width: 8,
            height: 8,
            n_components: 2,
            ..ImageConfig::default()
        }
    }

    fn write_gallery(dir: &Path) {
        for (name, color) in [
            ("a.png", [250, 10, 10]),
            ("b.png", [10, 250, 10]),
            ("c.png", [10, 10, 250]),
        ] {
            RgbImage::from_pixel(12, 12, Rgb(color))
                .save(dir.join(name))
                .unwrap();
        }
    }

    #[test]
    fn test_new_validates_config() {
        let config = ImageConfig {
            n_components: 0,
            ..ImageConfig::default()
        };
        assert!(matches!(
            ImageRetriever::new(config),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_unfitted_guard() {
        let dir = tempfile::tempdir().unwrap();
        write_gallery(dir.path());

        let retriever = ImageRetriever::new(small_image_config()).unwrap();
        assert!(!retriever.is_fitted());
        assert_eq!(retriever.len(), 0);
        assert!(matches!(
            retriever.predict(&dir.path().join("a.png"), None, None),
            Err(Error::NotFitted)
        ));
    }

    #[test]
    fn test_failed_refit_keeps_previous_state() {
        let gallery = tempfile::tempdir().unwrap();
        write_gallery(gallery.path());
        let empty = tempfile::tempdir().unwrap();

        let retriever = ImageRetriever::new(small_image_config()).unwrap();
        retriever.fit(gallery.path()).unwrap();
        assert_eq!(retriever.len(), 3);

        assert!(matches!(
            retriever.fit(empty.path()),
            Err(Error::EmptyDataset(_))
        ));
        assert!(retriever.is_fitted());
        assert_eq!(retriever.len(), 3);

        let results = retriever
            .predict(&gallery.path().join("b.png"), None, None)
            .unwrap();
        assert_eq!(results[0].name, "b.png");
    }

    #[test]
    fn test_predict_waits_for_fit_in_progress() {
        let first = tempfile::tempdir().unwrap();
        write_gallery(first.path());
        let second = tempfile::tempdir().unwrap();
        for (name, color) in [
            ("x.png", [0, 0, 0]),
            ("y.png", [128, 128, 128]),
            ("z.png", [255, 255, 255]),
        ] {
            RgbImage::from_pixel(12, 12, Rgb(color))
                .save(second.path().join(name))
                .unwrap();
        }

        let retriever = ImageRetriever::new(small_image_config()).unwrap();
        retriever.fit(first.path()).unwrap();
        let query = first.path().join("a.png");
        let answered = AtomicBool::new(false);

        std::thread::scope(|scope| {
            // Same sequence as fit, paused between taking the lock and installing
            let mut state = retriever.state.write();

            let reader = scope.spawn(|| {
                let results = retriever.predict(&query, None, None).unwrap();
                answered.store(true, Ordering::SeqCst);
                results
            });

            std::thread::sleep(Duration::from_millis(200));
            assert!(!answered.load(Ordering::SeqCst));

            *state = Some(retriever.build(second.path()).unwrap());
            drop(state);

            let results = reader.join().unwrap();
            assert!(answered.load(Ordering::SeqCst));
            let mut names: Vec<_> = results.iter().map(|r| r.name.as_str()).collect();
            names.sort_unstable();
            assert_eq!(names, vec!["x.png", "y.png", "z.png"]);
        });
    }

    #[test]
    fn test_fits_are_serialised() {
        let dir = tempfile::tempdir().unwrap();
        write_gallery(dir.path());
        let retriever = ImageRetriever::new(small_image_config()).unwrap();
        let finished = AtomicBool::new(false);

        std::thread::scope(|scope| {
            let state = retriever.state.write();
            let fitter = scope.spawn(|| {
                retriever.fit(dir.path()).unwrap();
                finished.store(true, Ordering::SeqCst);
            });

            std::thread::sleep(Duration::from_millis(200));
            assert!(!finished.load(Ordering::SeqCst));
            assert!(state.is_none());
            drop(state);

            fitter.join().unwrap();
        });
        assert_eq!(retriever.len(), 3);
    }

    #[test]
    fn test_too_few_images_for_components() {
        let gallery = tempfile::tempdir().unwrap();
        write_gallery(gallery.path());

        let config = ImageConfig {
            width: 8,
            height: 8,
            n_components: 5,
            ..ImageConfig::default()
        };
        let retriever = ImageRetriever::new(config).unwrap();
        assert!(matches!(
            retriever.fit(gallery.path()),
            Err(Error::InsufficientData { samples: 3, .. })
        ));
        assert!(!retriever.is_fitted());
    }

    #[test]
    fn test_predict_input_rejects_wrong_kind_before_fit_check() {
        let retriever = AudioRetriever::new(AudioConfig::default()).unwrap();
        let upload = QueryInput::new("cover.png", vec![0; 16]);
        assert!(matches!(
            retriever.predict_input(&upload, None, None),
            Err(Error::WrongMediaKind { .. })
        ));

        let upload = QueryInput::new("song.mid", vec![0; 16]);
        assert!(matches!(
            retriever.predict_input(&upload, None, None),
            Err(Error::NotFitted)
        ));
    }
}
