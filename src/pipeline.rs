//! Decklist-to-PDF pipeline.
//!
//! ```text
//! ensure dirs → load dataset → parse + resolve → render each card → compose → emit
//! ```
//!
//! Every stage runs sequentially on the calling thread, and every network
//! fetch blocks until it completes. [`spawn`] moves a run onto a worker
//! thread and hands back a [`GenerationHandle`] that streams
//! [`ProgressEvent`]s, can request cancellation, and yields the final
//! [`GenerationReport`].
//!
//! Cancellation is checked between decklist lines, between cards, and before
//! the document is written. A fetch already in flight runs to completion.
//!
//! The [`Catalog`] owns the dataset loader and the card index. The index is
//! built on first use and then only read, so one catalog serves any number of
//! runs.

use crate::cache::{CacheStats, ImageCache};
use crate::card::Card;
use crate::config::LorcyConfig;
use crate::dataset::{DatasetError, DatasetLoader};
use crate::deck::{DeckLine, ResolveError, parse_decklist, resolve};
use crate::document::{DocumentError, document_path, write_pdf};
use crate::imaging::{DPI, FetchError, HttpFetcher, ImageOrigin, Quality, RenderMode};
use crate::index::CardIndex;
use crate::layout;
use crate::render::{ImageSource, RenderError};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, OnceLock};
use std::thread::JoinHandle;
use thiserror::Error;

/// Card names logged at debug level after a load.
const SAMPLE_NAMES: usize = 5;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("Generation cancelled")]
    Cancelled,
    #[error("Generation worker panicked")]
    WorkerPanicked,
}

/// Progress of one generation run, in order of occurrence.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Dataset load (or cache read) is starting.
    Loading { source: PathBuf },
    /// Decklist line `processed` of `total` is being resolved.
    LineParsed { processed: usize, total: usize },
    /// Card `index` (1-based) of `total` has an image.
    CardRendered {
        index: usize,
        total: usize,
        name: String,
        origin: ImageOrigin,
    },
    /// All cards are laid out.
    PagesComposed { pages: usize },
    /// The document is on disk.
    Emitted { path: PathBuf },
}

impl ProgressEvent {
    /// Resolution progress in `0.0..=1.0`, for `LineParsed` events.
    pub fn fraction(&self) -> Option<f64> {
        match self {
            ProgressEvent::LineParsed { processed, total } if *total > 0 => {
                Some(*processed as f64 / *total as f64)
            }
            _ => None,
        }
    }
}

/// What to generate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    pub decklist: String,
    /// Document base name; `.pdf` is appended when missing.
    pub name: String,
    pub mode: RenderMode,
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub path: PathBuf,
    /// Resolved copies, after quantity expansion.
    pub cards: usize,
    pub pages: usize,
    /// Decklist lines that matched nothing.
    pub unresolved: Vec<DeckLine>,
    pub stats: CacheStats,
}

// ============================================================================
// Catalog
// ============================================================================

/// Dataset loader plus the lazily built card index.
pub struct Catalog {
    loader: DatasetLoader,
    index: OnceLock<CardIndex>,
}

impl Catalog {
    pub fn new(loader: DatasetLoader) -> Self {
        Self {
            loader,
            index: OnceLock::new(),
        }
    }

    pub fn loader(&self) -> &DatasetLoader {
        &self.loader
    }

    pub fn is_loaded(&self) -> bool {
        self.index.get().is_some()
    }

    /// The card index, loading the dataset on first call.
    ///
    /// A failed load leaves the catalog unloaded; the next call retries.
    pub fn index(&self) -> Result<&CardIndex, DatasetError> {
        if let Some(index) = self.index.get() {
            return Ok(index);
        }
        let cards = self.loader.load()?;
        for card in cards.iter().take(SAMPLE_NAMES) {
            tracing::debug!(name = %card.name(), "sample card");
        }
        let index = CardIndex::build(cards);
        tracing::debug!(entries = index.len(), "card index built");
        Ok(self.index.get_or_init(|| index))
    }

    pub fn search(&self, query: &str) -> Result<Vec<&Card>, DatasetError> {
        Ok(self.index()?.search(query))
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Everything one run needs: cards, images, and where output goes.
pub struct Pipeline {
    catalog: Catalog,
    images: ImageSource,
    output_dir: PathBuf,
    jpeg_quality: Quality,
}

impl Pipeline {
    pub fn new(catalog: Catalog, images: ImageSource, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            catalog,
            images,
            output_dir: output_dir.into(),
            jpeg_quality: Quality::default(),
        }
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = Quality::new(quality.into());
        self
    }

    /// Build the production pipeline: HTTP fetcher, configured cache and
    /// output directories, configured fonts.
    pub fn from_config(config: &LorcyConfig) -> Result<Self, PipelineError> {
        let cache_dir = config.paths.resolve_cache_dir();
        let loader = DatasetLoader::new(
            &config.paths.dataset,
            &cache_dir,
            config.dataset.cache_policy,
        );
        let fetcher = HttpFetcher::new(config.fetch.timeout(), &config.fetch.user_agent)?;
        let images = ImageSource::new(
            Box::new(fetcher),
            ImageCache::new(&cache_dir, config.output.jpeg_quality),
            config.fonts.to_font_paths(),
        );
        Ok(Self::new(Catalog::new(loader), images, config.paths.resolve_output_dir())
            .with_jpeg_quality(config.output.jpeg_quality))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.catalog.loader().cache_dir())?;
        std::fs::create_dir_all(self.images.cache().dir())?;
        std::fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }

    /// Run the whole pipeline on the calling thread.
    pub fn generate(
        &self,
        request: &GenerateRequest,
        progress: &mut dyn FnMut(ProgressEvent),
        cancel: &AtomicBool,
    ) -> Result<GenerationReport, PipelineError> {
        let check = || {
            if cancel.load(Ordering::Relaxed) {
                Err(PipelineError::Cancelled)
            } else {
                Ok(())
            }
        };

        self.ensure_dirs()?;

        progress(ProgressEvent::Loading {
            source: self.catalog.loader().source().to_path_buf(),
        });
        let index = self.catalog.index()?;

        let lines = parse_decklist(&request.decklist);
        let mut cancelled = false;
        let resolution = resolve(index, &lines, |processed, total| {
            cancelled |= cancel.load(Ordering::Relaxed);
            if !cancelled {
                progress(ProgressEvent::LineParsed { processed, total });
            }
        })?;
        if cancelled {
            return Err(PipelineError::Cancelled);
        }
        tracing::info!(
            lines = lines.len(),
            cards = resolution.cards.len(),
            unresolved = resolution.unresolved.len(),
            "decklist resolved"
        );

        let total = resolution.cards.len();
        let mut stats = CacheStats::default();
        let mut rendered = Vec::with_capacity(total);
        for (i, card) in resolution.cards.iter().enumerate() {
            check()?;
            let out = self.images.render(card, request.mode)?;
            match out.origin {
                ImageOrigin::Cached => stats.hit(),
                ImageOrigin::Fetched => stats.fetch(),
                ImageOrigin::Synthesized => stats.synthesize(),
            }
            progress(ProgressEvent::CardRendered {
                index: i + 1,
                total,
                name: card.full_title(),
                origin: out.origin,
            });
            rendered.push(out.image);
        }

        let pages = layout::compose(&rendered);
        drop(rendered);
        progress(ProgressEvent::PagesComposed { pages: pages.len() });

        check()?;
        let path = document_path(&self.output_dir, &request.name);
        write_pdf(&pages, &path, DPI, self.jpeg_quality.value())?;
        tracing::info!(path = %path.display(), pages = pages.len(), "document written");
        progress(ProgressEvent::Emitted { path: path.clone() });

        Ok(GenerationReport {
            path,
            cards: total,
            pages: pages.len(),
            unresolved: resolution.unresolved,
            stats,
        })
    }

    /// Run the pipeline, reporting only resolution progress as a fraction.
    pub fn generate_with_callback(
        &self,
        decklist: &str,
        name: &str,
        mode: RenderMode,
        mut callback: impl FnMut(f64),
    ) -> Result<PathBuf, PipelineError> {
        let request = GenerateRequest {
            decklist: decklist.to_string(),
            name: name.to_string(),
            mode,
        };
        let never = AtomicBool::new(false);
        let report = self.generate(
            &request,
            &mut |event| {
                if let Some(f) = event.fraction() {
                    callback(f);
                }
            },
            &never,
        )?;
        Ok(report.path)
    }
}

// ============================================================================
// Background execution
// ============================================================================

/// A run in progress on a worker thread.
pub struct GenerationHandle {
    events: Receiver<ProgressEvent>,
    cancel: Arc<AtomicBool>,
    worker: JoinHandle<Result<GenerationReport, PipelineError>>,
}

impl GenerationHandle {
    /// Progress events. The stream ends when the worker finishes.
    pub fn events(&self) -> &Receiver<ProgressEvent> {
        &self.events
    }

    /// Ask the worker to stop at its next checkpoint.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Wait for the worker and return its result.
    pub fn wait(self) -> Result<GenerationReport, PipelineError> {
        drop(self.events);
        self.worker.join().map_err(|_| PipelineError::WorkerPanicked)?
    }
}

/// Start a run on a new worker thread.
pub fn spawn(pipeline: Arc<Pipeline>, request: GenerateRequest) -> GenerationHandle {
    let (tx, rx) = mpsc::channel();
    let cancel = Arc::new(AtomicBool::new(false));
    let worker_cancel = Arc::clone(&cancel);

    let worker = std::thread::spawn(move || {
        // A closed receiver only means nobody is listening any more.
        let mut send = |event: ProgressEvent| {
            let _ = tx.send(event);
        };
        pipeline.generate(&request, &mut send, &worker_cancel)
    });

    GenerationHandle {
        events: rx,
        cancel,
        worker,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CachePolicy;
    use crate::imaging::fetch::tests::MockFetcher;
    use crate::imaging::{FontPaths, PAGE_HEIGHT_PX, PAGE_WIDTH_PX};
    use crate::test_helpers::{encode_png, ids_of, solid_image, test_font_paths, write_dataset};
    use serde_json::json;
    use tempfile::TempDir;

    const ELSA_URL: &str = "https://cards.example/elsa.png";
    const STITCH_URL: &str = "https://cards.example/stitch.png";

    fn dataset() -> serde_json::Value {
        json!({"cards": [
            {"card_id": "1", "name": "Elsa", "subtitle": "Snow Queen", "ink_cost": 3,
             "ink_convertible": true, "variants": [{"detail_image_url": ELSA_URL}]},
            {"card_id": "2", "name": "Stitch", "subtitle": "Rock Star",
             "thumbnail_url": STITCH_URL},
            {"card_id": "3", "name": "Mickey Mouse", "subtitle": "Brave Little Tailor"}
        ]})
    }

    fn mock_fetcher() -> MockFetcher {
        MockFetcher::new()
            .with_response(ELSA_URL, encode_png(&solid_image(50, 70, [20, 60, 200])))
            .with_response(STITCH_URL, encode_png(&solid_image(70, 50, [200, 60, 20])))
    }

    fn fonts_or_missing() -> FontPaths {
        test_font_paths().unwrap_or(FontPaths {
            bold: PathBuf::from("/nonexistent/bold.ttf"),
            regular: PathBuf::from("/nonexistent/regular.ttf"),
        })
    }

    fn pipeline(tmp: &TempDir, fetcher: MockFetcher) -> Pipeline {
        let source = write_dataset(tmp.path(), &dataset());
        let cache_dir = tmp.path().join("cache");
        let loader = DatasetLoader::new(source, &cache_dir, CachePolicy::Trust);
        let images = ImageSource::new(
            Box::new(fetcher),
            ImageCache::new(&cache_dir, 90),
            fonts_or_missing(),
        );
        Pipeline::new(Catalog::new(loader), images, tmp.path().join("out"))
    }

    fn request(decklist: &str, mode: RenderMode) -> GenerateRequest {
        GenerateRequest {
            decklist: decklist.to_string(),
            name: "deck".to_string(),
            mode,
        }
    }

    fn run(p: &Pipeline, req: &GenerateRequest) -> (Result<GenerationReport, PipelineError>, Vec<ProgressEvent>) {
        let mut events = Vec::new();
        let result = p.generate(req, &mut |e| events.push(e), &AtomicBool::new(false));
        (result, events)
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    #[test]
    fn catalog_builds_index_once() {
        let tmp = TempDir::new().unwrap();
        let source = write_dataset(tmp.path(), &dataset());
        let catalog = Catalog::new(DatasetLoader::new(&source, tmp.path().join("cache"), CachePolicy::Trust));
        assert!(!catalog.is_loaded());

        assert_eq!(ids_of(&catalog.search("elsa").unwrap()), vec!["1"]);
        assert!(catalog.is_loaded());

        // Removing the source no longer matters once the index exists.
        std::fs::remove_file(&source).unwrap();
        assert_eq!(ids_of(&catalog.search("stitch").unwrap()), vec!["2"]);
    }

    #[test]
    fn catalog_missing_dataset_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let catalog = Catalog::new(DatasetLoader::new(
            tmp.path().join("nope.json"),
            tmp.path().join("cache"),
            CachePolicy::Trust,
        ));
        assert!(matches!(catalog.index(), Err(DatasetError::NotFound(_))));
        assert!(!catalog.is_loaded());
    }

    // =========================================================================
    // generate
    // =========================================================================

    #[test]
    fn color_run_writes_pdf_and_reports_events() {
        let tmp = TempDir::new().unwrap();
        let p = pipeline(&tmp, mock_fetcher());
        let (result, events) = run(&p, &request("2 Elsa\n1 stitch", RenderMode::Color));
        let report = result.unwrap();

        assert_eq!(report.path, tmp.path().join("out/deck.pdf"));
        assert!(report.path.exists());
        assert_eq!(report.cards, 3);
        assert_eq!(report.pages, 1);
        assert_eq!(report.stats.fetches, 2);
        assert_eq!(report.stats.hits, 1);

        assert!(matches!(events.first(), Some(ProgressEvent::Loading { .. })));
        assert_eq!(
            events.iter().filter_map(ProgressEvent::fraction).collect::<Vec<_>>(),
            vec![0.5, 1.0]
        );
        let rendered: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::CardRendered { index, origin, .. } => Some((*index, *origin)),
                _ => None,
            })
            .collect();
        assert_eq!(
            rendered,
            vec![
                (1, ImageOrigin::Fetched),
                (2, ImageOrigin::Cached),
                (3, ImageOrigin::Fetched)
            ]
        );
        assert_eq!(events.last(), Some(&ProgressEvent::Emitted { path: report.path.clone() }));
    }

    #[test]
    fn unmatched_only_decklist_fails() {
        let tmp = TempDir::new().unwrap();
        let p = pipeline(&tmp, mock_fetcher());
        let (result, _) = run(&p, &request("4 Maleficent", RenderMode::Color));
        assert!(matches!(result, Err(PipelineError::Resolve(ResolveError::NoCardsResolved))));
        assert!(!tmp.path().join("out/deck.pdf").exists());
    }

    #[test]
    fn unmatched_lines_are_reported_not_fatal() {
        let tmp = TempDir::new().unwrap();
        let p = pipeline(&tmp, mock_fetcher());
        let (result, _) = run(&p, &request("1 Elsa\n2 Maleficent", RenderMode::Bw));
        let report = result.unwrap();
        assert_eq!(report.cards, 1);
        assert_eq!(report.unresolved.len(), 1);
        assert_eq!(report.unresolved[0].fragment, "Maleficent");
    }

    #[test]
    fn fetch_failure_aborts_run() {
        let tmp = TempDir::new().unwrap();
        let p = pipeline(&tmp, MockFetcher::new());
        let (result, _) = run(&p, &request("1 Elsa", RenderMode::Color));
        assert!(matches!(result, Err(PipelineError::Render(RenderError::Fetch(_)))));
    }

    #[test]
    fn text_run_two_copies_one_page() {
        if test_font_paths().is_none() {
            eprintln!("skipping: no TrueType fonts available");
            return;
        }
        let tmp = TempDir::new().unwrap();
        let fetcher = MockFetcher::new();
        let p = pipeline(&tmp, fetcher);
        let (result, events) = run(&p, &request("2 Elsa", RenderMode::Text));
        let report = result.unwrap();
        assert_eq!(report.cards, 2);
        assert_eq!(report.pages, 1);
        assert_eq!(report.stats.synthesized, 2);
        assert!(events.contains(&ProgressEvent::PagesComposed { pages: 1 }));
    }

    #[test]
    fn cancelled_before_start_stops_at_first_checkpoint() {
        let tmp = TempDir::new().unwrap();
        let p = pipeline(&tmp, mock_fetcher());
        let mut events = Vec::new();
        let result = p.generate(
            &request("1 Elsa", RenderMode::Color),
            &mut |e| events.push(e),
            &AtomicBool::new(true),
        );
        assert!(matches!(result, Err(PipelineError::Cancelled)));
        assert!(!events.iter().any(|e| matches!(e, ProgressEvent::CardRendered { .. })));
    }

    #[test]
    fn generate_with_callback_returns_path() {
        let tmp = TempDir::new().unwrap();
        let p = pipeline(&tmp, mock_fetcher());
        let mut fractions = Vec::new();
        let path = p
            .generate_with_callback("1 Elsa\n\n1 Stitch\n1 Elsa", "my deck.pdf", RenderMode::Color, |f| {
                fractions.push(f)
            })
            .unwrap();
        assert_eq!(path, tmp.path().join("out/my deck.pdf"));
        assert_eq!(fractions.len(), 3);
        assert!(fractions.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(fractions.last(), Some(&1.0));
    }

    // =========================================================================
    // Background execution
    // =========================================================================

    #[test]
    fn spawn_streams_events_and_returns_report() {
        let tmp = TempDir::new().unwrap();
        let p = Arc::new(pipeline(&tmp, mock_fetcher()));
        let handle = spawn(Arc::clone(&p), request("3 Elsa", RenderMode::Color));

        let events: Vec<ProgressEvent> = handle.events().iter().collect();
        let report = handle.wait().unwrap();
        assert_eq!(report.cards, 3);
        assert!(matches!(events.last(), Some(ProgressEvent::Emitted { .. })));

        // The index survives for the next run.
        assert!(p.catalog().is_loaded());
    }

    #[test]
    fn spawned_run_can_be_cancelled() {
        let tmp = TempDir::new().unwrap();
        let p = Arc::new(pipeline(&tmp, mock_fetcher()));
        let handle = spawn(p, request("1 Elsa", RenderMode::Color));
        handle.cancel();
        // Either the cancel landed before a checkpoint or the run had already
        // finished; both are valid, a panic or another error is not.
        match handle.wait() {
            Ok(report) => assert!(report.path.exists()),
            Err(e) => assert!(matches!(e, PipelineError::Cancelled), "unexpected {e}"),
        }
    }

    #[test]
    fn composed_pages_are_a4() {
        let pages = layout::compose(&[solid_image(10, 10, [0, 0, 0])]);
        assert_eq!(pages[0].dimensions(), (PAGE_WIDTH_PX, PAGE_HEIGHT_PX));
    }
}
