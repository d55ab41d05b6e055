use super::pipeline::{PipelineOrchestrator, ProgressObserver};
use crate::domain::jobs::{FrameProgress, JobConfig, JobId, JobRecord};
use crate::error::RegistryError;
use crate::ports::repository::JobStore;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tracing::{error, info, warn};

/// Where a submitted job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Run to completion before `submit` returns (CLI).
    Inline,
    /// Run on its own task; `submit` returns immediately (served mode).
    Detached,
}

struct ChannelProgress {
    tx: mpsc::UnboundedSender<FrameProgress>,
    forward: Option<Arc<dyn ProgressObserver>>,
}

impl ProgressObserver for ChannelProgress {
    fn on_frame(&self, done: usize, total: usize) {
        let _ = self.tx.send(FrameProgress { done, total });
        if let Some(forward) = &self.forward {
            forward.on_frame(done, total);
        }
    }
}

/// Tracks submitted jobs through `queued -> processing -> completed | failed`.
#[derive(Clone)]
pub struct JobRegistry<S> {
    store: S,
    pipeline: Arc<PipelineOrchestrator>,
    permits: Arc<Semaphore>,
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl<S> JobRegistry<S>
where
    S: JobStore + Clone + 'static,
{
    /// At most `max_concurrent` jobs are `processing` at once; the rest stay
    /// `queued` until a slot frees up.
    pub fn new(store: S, pipeline: Arc<PipelineOrchestrator>, max_concurrent: usize) -> Self {
        Self {
            store,
            pipeline,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            observer: None,
        }
    }

    /// Also reports every job's frame progress to `observer`.
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn pipeline(&self) -> &PipelineOrchestrator {
        &self.pipeline
    }

    /// Records the job as `queued` and schedules it. Failures of the job
    /// itself never surface here; they end up in the record.
    pub async fn submit(
        &self,
        input: PathBuf,
        config: JobConfig,
        dispatch: Dispatch,
    ) -> Result<JobId, RegistryError> {
        let id = JobId::new();
        let record = JobRecord::queued(id, input, config);
        self.store.create(record.clone()).await?;
        info!("[Job {}] Queued {:?} ({}x)", id, record.input_path, config.scale_factor);

        let runner = self.clone();
        match dispatch {
            Dispatch::Inline => runner.execute(record).await,
            Dispatch::Detached => {
                tokio::spawn(async move { runner.execute(record).await });
            }
        }
        Ok(id)
    }

    /// Snapshot of the job's current state.
    pub async fn get_status(&self, id: &JobId) -> Result<JobRecord, RegistryError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// The only writer of `record` once it is created.
    async fn execute(self, mut record: JobRecord) {
        let _permit = self.permits.clone().acquire_owned().await.ok();

        if let Err(e) = record.start() {
            warn!("[Job {}] {}", record.id, e);
            return;
        }
        self.save(&record).await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let observer = ChannelProgress {
            tx,
            forward: self.observer.clone(),
        };
        let id = record.id;
        let input = record.input_path.clone();
        let config = record.config;

        let work = AssertUnwindSafe(self.pipeline.process(&id, &input, &config, &observer))
            .catch_unwind();
        tokio::pin!(work);

        let outcome = loop {
            tokio::select! {
                outcome = &mut work => break outcome,
                Some(progress) = rx.recv() => {
                    record.progress = Some(progress);
                    self.save(&record).await;
                }
            }
        };

        let transition = match outcome {
            Ok(Ok(result)) => {
                info!(
                    "[Job {}] Completed: {:?} ({})",
                    record.id, result.output_path, result.new_resolution
                );
                record.progress = Some(FrameProgress {
                    done: result.frames,
                    total: result.frames,
                });
                record.complete(result)
            }
            Ok(Err(e)) => {
                error!("[Job {}] Failed: {}", record.id, e);
                record.fail(e.to_string())
            }
            Err(panic) => {
                let message = format!("job panicked: {}", panic_message(panic.as_ref()));
                error!("[Job {}] {}", record.id, message);
                record.fail(message)
            }
        };
        if let Err(e) = transition {
            warn!("[Job {}] {}", record.id, e);
        }
        self.save(&record).await;
    }

    async fn save(&self, record: &JobRecord) {
        if let Err(e) = self.store.set(record.clone()).await {
            error!("[Job {}] Could not persist status: {}", record.id, e);
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::local::memory::MemoryJobStore;
    use crate::application::pipeline::PipelineSettings;
    use crate::domain::jobs::{JobStatus, ScaleFactor};
    use crate::error::ModelLoadError;
    use crate::ports::model::MockModelLoader;
    use crate::testing::{FakeMediaTool, FakeVideo};
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    fn registry(
        media: FakeMediaTool,
        max_concurrent: usize,
    ) -> (TempDir, JobRegistry<MemoryJobStore>) {
        let root = tempdir().unwrap();
        let mut loader = MockModelLoader::new();
        loader
            .expect_load()
            .returning(|| Err(ModelLoadError::NotFound(PathBuf::from("models/x4.bin"))));
        let settings = PipelineSettings {
            temp_dir: root.path().join("temp"),
            output_dir: root.path().join("outputs"),
            video_codec: "libx264".to_string(),
            pixel_format: "yuv420p".to_string(),
            frame_workers: 2,
        };
        let pipeline = Arc::new(PipelineOrchestrator::new(
            Arc::new(media),
            Arc::new(loader),
            settings,
        ));
        (root, JobRegistry::new(MemoryJobStore::new(), pipeline, max_concurrent))
    }

    fn config(scale: i64, use_ai: bool) -> JobConfig {
        JobConfig {
            scale_factor: ScaleFactor::new(scale).unwrap(),
            use_ai,
        }
    }

    async fn wait_terminal(registry: &JobRegistry<MemoryJobStore>, id: &JobId) -> JobRecord {
        for _ in 0..500 {
            let record = registry.get_status(id).await.unwrap();
            if record.status.is_terminal() {
                return record;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("job {} did not finish", id);
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let (_root, registry) = registry(FakeMediaTool::new(), 1);
        let err = registry.get_status(&JobId::new()).await.unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_inline_job_completes() {
        let (root, registry) = registry(FakeMediaTool::new(), 1);
        let input = FakeVideo::new(320, 240, 2, true).write(&root.path().join("clip.mp4"));

        let id = registry
            .submit(input, config(2, false), Dispatch::Inline)
            .await
            .unwrap();

        let record = registry.get_status(&id).await.unwrap();
        assert_eq!(record.status, JobStatus::Completed);
        let result = record.result.unwrap();
        assert_eq!(result.new_resolution.to_string(), "640x480");
        assert_eq!(record.progress, Some(FrameProgress { done: 2, total: 2 }));
        assert!(record.error.is_none());
    }

    #[derive(Default)]
    struct Recorder(std::sync::Mutex<Vec<(usize, usize)>>);

    impl ProgressObserver for Recorder {
        fn on_frame(&self, done: usize, total: usize) {
            self.0.lock().unwrap().push((done, total));
        }
    }

    #[tokio::test]
    async fn test_progress_forwarded_to_observer() {
        let recorder = Arc::new(Recorder::default());
        let (root, registry) = registry(FakeMediaTool::new(), 1);
        let registry = registry.with_observer(recorder.clone());
        let input = FakeVideo::new(8, 8, 4, false).write(&root.path().join("clip.mp4"));

        registry
            .submit(input, config(2, false), Dispatch::Inline)
            .await
            .unwrap();

        let calls = recorder.0.lock().unwrap().clone();
        assert_eq!(calls.len(), 4);
        assert!(calls.iter().all(|&(_, total)| total == 4));
        assert_eq!(calls.last(), Some(&(4, 4)));
    }

    #[tokio::test]
    async fn test_failed_job_records_message() {
        let (root, registry) = registry(FakeMediaTool::new(), 1);
        let input = FakeVideo::new(320, 240, 0, true).write(&root.path().join("empty.mp4"));

        let id = registry
            .submit(input, config(2, false), Dispatch::Inline)
            .await
            .unwrap();

        let record = registry.get_status(&id).await.unwrap();
        assert_eq!(record.status, JobStatus::Failed);
        assert!(record.result.is_none());
        assert!(record.error.unwrap().contains("frame I/O error"));
    }

    #[tokio::test]
    async fn test_missing_input_fails_without_escaping() {
        let (root, registry) = registry(FakeMediaTool::new(), 1);

        let id = registry
            .submit(root.path().join("nope.mp4"), config(2, true), Dispatch::Detached)
            .await
            .unwrap();

        let record = wait_terminal(&registry, &id).await;
        assert_eq!(record.status, JobStatus::Failed);
        assert!(record.error.unwrap().starts_with("media tool error"));
    }

    #[tokio::test]
    async fn test_detached_submit_returns_before_completion() {
        let media = FakeMediaTool {
            extract_delay: Some(Duration::from_millis(200)),
            ..FakeMediaTool::new()
        };
        let (root, registry) = registry(media, 1);
        let input = FakeVideo::new(8, 8, 1, false).write(&root.path().join("slow.mp4"));

        let id = registry
            .submit(input, config(2, false), Dispatch::Detached)
            .await
            .unwrap();

        let early = registry.get_status(&id).await.unwrap();
        assert!(!early.status.is_terminal());

        let done = wait_terminal(&registry, &id).await;
        assert_eq!(done.status, JobStatus::Completed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_jobs_are_isolated() {
        let (root, registry) = registry(FakeMediaTool::new(), 2);
        let a = FakeVideo::new(32, 16, 5, true).write(&root.path().join("first.mp4"));
        let b = FakeVideo::new(10, 10, 2, false).write(&root.path().join("second.mp4"));

        let id_a = registry
            .submit(a, config(2, false), Dispatch::Detached)
            .await
            .unwrap();
        let id_b = registry
            .submit(b, config(3, true), Dispatch::Detached)
            .await
            .unwrap();

        let rec_a = wait_terminal(&registry, &id_a).await;
        let rec_b = wait_terminal(&registry, &id_b).await;
        let res_a = rec_a.result.unwrap();
        let res_b = rec_b.result.unwrap();

        assert_eq!(res_a.frames, 5);
        assert_eq!(res_a.new_resolution.to_string(), "64x32");
        assert_eq!(res_b.frames, 2);
        assert_eq!(res_b.new_resolution.to_string(), "30x30");
        assert_ne!(res_a.output_path, res_b.output_path);
        assert!(FakeVideo::read(&res_a.output_path).has_audio);
        assert!(!FakeVideo::read(&res_b.output_path).has_audio);
        assert_eq!(std::fs::read_dir(root.path().join("temp")).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_jobs_wait_in_queue_for_a_slot() {
        let media = FakeMediaTool {
            extract_delay: Some(Duration::from_millis(300)),
            ..FakeMediaTool::new()
        };
        let (root, registry) = registry(media, 1);
        let a = FakeVideo::new(4, 4, 1, false).write(&root.path().join("a.mp4"));
        let b = FakeVideo::new(4, 4, 1, false).write(&root.path().join("b.mp4"));

        let id_a = registry.submit(a, config(2, false), Dispatch::Detached).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let id_b = registry.submit(b, config(2, false), Dispatch::Detached).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(registry.get_status(&id_a).await.unwrap().status, JobStatus::Processing);
        assert_eq!(registry.get_status(&id_b).await.unwrap().status, JobStatus::Queued);

        assert_eq!(wait_terminal(&registry, &id_b).await.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_panicking_job_is_recorded_as_failed() {
        let media = FakeMediaTool {
            panic_after_extract: true,
            ..FakeMediaTool::new()
        };
        let (root, registry) = registry(media, 1);
        let input = FakeVideo::new(8, 8, 3, true).write(&root.path().join("crash.mp4"));

        let submitted = registry
            .submit(input, config(2, false), Dispatch::Inline)
            .await;
        let id = submitted.unwrap();

        let record = registry.get_status(&id).await.unwrap();
        assert_eq!(record.status, JobStatus::Failed);
        let message = record.error.unwrap();
        assert!(message.starts_with("job panicked"), "{}", message);
        assert!(message.contains("decoder blew up"));
        assert!(record.result.is_none());
        assert_eq!(std::fs::read_dir(root.path().join("temp")).unwrap().count(), 0);

        // The registry keeps serving after a crashed job.
        let next = FakeVideo::new(8, 8, 1, false).write(&root.path().join("next.mp4"));
        let id = registry
            .submit(next, config(2, false), Dispatch::Detached)
            .await
            .unwrap();
        assert_eq!(wait_terminal(&registry, &id).await.status, JobStatus::Failed);
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn test_job_futures_can_run_on_spawned_tasks() {
        let (root, registry) = registry(FakeMediaTool::new(), 1);
        let record = JobRecord::queued(
            JobId::new(),
            root.path().join("clip.mp4"),
            config(2, false),
        );

        assert_send(&registry.clone().execute(record));
        let input = root.path().join("clip.mp4");
        assert_send(&registry.submit(input, config(2, false), Dispatch::Inline));
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("kaput");
        assert_eq!(panic_message(boxed.as_ref()), "kaput");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }
}
