use crate::asset::{AssetOutcome, AssetPipeline};
use crate::error::{Result, ScanError};
use crate::extractor::{Extractor, PageRecords};
use crate::fetcher::{Document, Fetcher};
use crate::result::{CrawlResults, ResultAggregator};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const DEFAULT_PAGE_WORKERS: usize = 10;
pub const DEFAULT_IMAGE_WORKERS: usize = 2;

pub type ProgressCallback = Arc<dyn Fn(usize, JobEvent) + Send + Sync>;

/// `Extracting` is reported each time a fetched page is handed to the
/// extractor, so a rejected page that is fetched again shows it more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Fetching,
    Extracting,
    AssetPending,
    Done,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Done | JobState::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobEvent {
    pub url: String,
    pub state: JobState,
    /// Jobs not yet Done or Failed, this one included until it terminates.
    pub remaining: usize,
}

/// One player page to crawl. `name` overrides the page title as the image
/// file name when set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlJob {
    pub url: String,
    pub name: Option<String>,
}

impl CrawlJob {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl From<String> for CrawlJob {
    fn from(url: String) -> Self {
        Self::new(url)
    }
}

struct ImageJob {
    document: Document,
    name: String,
    done: oneshot::Sender<Result<AssetOutcome>>,
}

/// Runs every seed through fetch, extract and image download on a fixed
/// pool of page workers, with image downloads handed to a smaller pool.
/// A job is finished once its image step has completed, so the run only
/// returns when nothing is left in flight.
pub struct Orchestrator {
    fetcher: Arc<Fetcher>,
    extractor: Arc<Extractor>,
    assets: Option<Arc<AssetPipeline>>,
    workers: usize,
    image_workers: usize,
    results: ResultAggregator,
    progress_callback: Option<ProgressCallback>,
}

impl Orchestrator {
    pub fn new(fetcher: Fetcher, extractor: Extractor) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            extractor: Arc::new(extractor),
            assets: None,
            workers: DEFAULT_PAGE_WORKERS,
            image_workers: DEFAULT_IMAGE_WORKERS,
            results: ResultAggregator::new(),
            progress_callback: None,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_assets(mut self, pipeline: AssetPipeline, image_workers: usize) -> Self {
        self.assets = Some(Arc::new(pipeline));
        self.image_workers = image_workers.max(1);
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn results(&self) -> ResultAggregator {
        self.results.clone()
    }

    pub async fn run(&self, seeds: Vec<CrawlJob>) -> Result<CrawlResults> {
        let total = seeds.len();
        if total == 0 {
            info!("No profiles to crawl");
            return Ok(self.results.snapshot().await);
        }

        let workers = self.workers.min(total);
        info!("Starting crawl of {} profiles with {} workers", total, workers);

        let remaining = Arc::new(AtomicUsize::new(total));
        if let Some(callback) = &self.progress_callback {
            for job in &seeds {
                callback(
                    0,
                    JobEvent {
                        url: job.url.clone(),
                        state: JobState::Queued,
                        remaining: total,
                    },
                );
            }
        }
        let queue = Arc::new(Mutex::new(VecDeque::from(seeds)));

        let (image_tx, image_handles) = match &self.assets {
            Some(pipeline) => {
                let (tx, handles) = self.spawn_image_workers(pipeline.clone());
                (Some(tx), handles)
            }
            None => (None, Vec::new()),
        };

        let context = WorkerContext {
            fetcher: self.fetcher.clone(),
            extractor: self.extractor.clone(),
            results: self.results.clone(),
            remaining,
            images: image_tx,
            progress: self.progress_callback.clone(),
        };

        let mut worker_handles = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let context = context.clone();
            let queue = queue.clone();

            let handle = tokio::spawn(async move {
                debug!("Worker {} started", worker_id);
                loop {
                    let job = queue.lock().await.pop_front();
                    let Some(job) = job else {
                        break;
                    };
                    context.process(worker_id, job).await;
                }
                debug!("Worker {} finished", worker_id);
            });
            worker_handles.push(handle);
        }
        // Image workers stop once every page worker has dropped its sender.
        drop(context);

        for handle in worker_handles.into_iter().chain(image_handles) {
            handle
                .await
                .map_err(|e| ScanError::Other(format!("Worker task failed: {}", e)))?;
        }

        let results = self.results.snapshot().await;
        info!(
            "Crawl complete. Crawled {} profiles, {} failed, {} images downloaded",
            results.crawled.len(),
            results.failed.len(),
            results.images.len()
        );
        Ok(results)
    }

    fn spawn_image_workers(
        &self,
        pipeline: Arc<AssetPipeline>,
    ) -> (mpsc::Sender<ImageJob>, Vec<JoinHandle<()>>) {
        let (tx, rx) = mpsc::channel::<ImageJob>(self.image_workers * 2);
        let rx = Arc::new(Mutex::new(rx));

        let handles = (0..self.image_workers)
            .map(|worker_id| {
                let pipeline = pipeline.clone();
                let rx = rx.clone();
                let results = self.results.clone();
                tokio::spawn(async move {
                    debug!("Image worker {} started", worker_id);
                    loop {
                        let job = rx.lock().await.recv().await;
                        let Some(job) = job else {
                            break;
                        };
                        let outcome = pipeline.ensure_image(&job.document, &job.name).await;
                        if let Ok(AssetOutcome::Downloaded(asset)) = &outcome {
                            results.record_image(asset.clone()).await;
                        }
                        // The page worker may have gone away; nothing to do then.
                        let _ = job.done.send(outcome);
                    }
                    debug!("Image worker {} finished", worker_id);
                })
            })
            .collect();

        (tx, handles)
    }
}

#[derive(Clone)]
struct WorkerContext {
    fetcher: Arc<Fetcher>,
    extractor: Arc<Extractor>,
    results: ResultAggregator,
    remaining: Arc<AtomicUsize>,
    images: Option<mpsc::Sender<ImageJob>>,
    progress: Option<ProgressCallback>,
}

impl WorkerContext {
    async fn process(&self, worker_id: usize, job: CrawlJob) {
        self.report(worker_id, &job.url, JobState::Fetching);

        let extractor = &self.extractor;
        let profile_url = job.url.as_str();
        let fetched = self
            .fetcher
            .fetch_until(&job.url, |document| {
                self.report(worker_id, profile_url, JobState::Extracting);
                extractor.extract(document, profile_url)
            })
            .await;

        let (document, records) = match fetched {
            Ok(page) => page,
            Err(e) => {
                warn!("Giving up on {}: {}", job.url, e);
                self.results.record_failure(&job.url, &e).await;
                self.remaining.fetch_sub(1, Ordering::SeqCst);
                self.report(worker_id, &job.url, JobState::Failed);
                return;
            }
        };

        let name = job.name.clone().unwrap_or_else(|| records.name().to_string());
        self.store(records).await;

        if let Some(images) = &self.images {
            self.report(worker_id, &job.url, JobState::AssetPending);
            self.await_image(images, document, name).await;
        }

        let left = self.remaining.fetch_sub(1, Ordering::SeqCst) - 1;
        let progress = self.results.mark_crawled(&job.url).await;
        info!(
            "Queue: {} | Crawled: {} | Downloaded images: {}",
            left, progress.crawled, progress.images
        );
        self.report(worker_id, &job.url, JobState::Done);
    }

    async fn store(&self, records: PageRecords) {
        debug!(
            "{}: {} fields, {} history rows, {} achievements",
            records.name(),
            records.profile.fields().len(),
            records.history.len(),
            records.achievements.len()
        );
        self.results.record_page(records).await;
    }

    async fn await_image(&self, images: &mpsc::Sender<ImageJob>, document: Document, name: String) {
        let (done, ack) = oneshot::channel();
        let job = ImageJob {
            document,
            name: name.clone(),
            done,
        };
        if images.send(job).await.is_err() {
            warn!("Image workers stopped before {} was queued", name);
            return;
        }

        match ack.await {
            Ok(Ok(AssetOutcome::Downloaded(asset))) => {
                debug!("Image for {} saved to {}", name, asset.path.display())
            }
            Ok(Ok(AssetOutcome::AlreadyPresent(_))) => debug!("Image for {} already present", name),
            Ok(Ok(AssetOutcome::NoImage)) => debug!("No image for {}", name),
            Ok(Err(e)) => warn!("Image for {} not downloaded: {}", name, e),
            Err(_) => warn!("Image worker dropped the job for {}", name),
        }
    }

    fn report(&self, worker_id: usize, url: &str, state: JobState) {
        if let Some(callback) = &self.progress {
            callback(
                worker_id,
                JobEvent {
                    url: url.to_string(),
                    state,
                    remaining: self.remaining.load(Ordering::SeqCst),
                },
            );
        }
    }
}
