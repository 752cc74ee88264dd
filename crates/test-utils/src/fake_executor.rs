use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::debug;

use dtm::exec::ExecutorBackend;
use dtm::types::{Outcome, Task};

/// What the fake does for one work directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeBehaviour {
    /// "Run" for `delay`, then exit with `code`. Times out if `delay` exceeds
    /// the timeout.
    Exit { code: i32, delay: Duration },
    /// Never finish on its own; only a timeout ends it.
    Hang,
    /// Fail to launch.
    LaunchError,
    /// Panic inside the executor.
    Panic,
}

impl FakeBehaviour {
    pub fn ok() -> Self {
        FakeBehaviour::Exit { code: 0, delay: Duration::ZERO }
    }

    pub fn ok_after(delay: Duration) -> Self {
        FakeBehaviour::Exit { code: 0, delay }
    }

    pub fn exit_after(code: i32, delay: Duration) -> Self {
        FakeBehaviour::Exit { code, delay }
    }
}

/// A fake executor that:
/// - follows a per-directory script instead of spawning processes,
/// - records the order in which tasks started,
/// - tracks how many executions were in flight at the same time.
#[derive(Debug)]
pub struct FakeExecutor {
    script: HashMap<PathBuf, FakeBehaviour>,
    default: FakeBehaviour,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    started: Arc<Mutex<Vec<PathBuf>>>,
}

impl FakeExecutor {
    pub fn new(default: FakeBehaviour) -> Self {
        Self {
            script: HashMap::new(),
            default,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
            started: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn script(mut self, dir: impl AsRef<Path>, behaviour: FakeBehaviour) -> Self {
        self.script.insert(dir.as_ref().to_path_buf(), behaviour);
        self
    }

    /// Highest number of simultaneous executions observed so far.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Work directories in the order their execution started.
    pub fn started(&self) -> Vec<PathBuf> {
        self.started.lock().unwrap().clone()
    }

    fn behaviour_for(&self, dir: &Path) -> FakeBehaviour {
        self.script.get(dir).copied().unwrap_or(self.default)
    }
}

/// Decrements the in-flight counter even if the execution panics.
struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ExecutorBackend for FakeExecutor {
    fn execute(
        &self,
        task: Arc<Task>,
        timeout: Option<Duration>,
    ) -> Pin<Box<dyn Future<Output = Outcome> + Send + '_>> {
        let behaviour = self.behaviour_for(task.work_dir());
        debug!(dir = %task.work_dir().display(), ?behaviour, ?timeout, "fake execution");

        Box::pin(async move {
            let started = Instant::now();
            self.started.lock().unwrap().push(task.work_dir().to_path_buf());

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            let _guard = InFlightGuard(Arc::clone(&self.in_flight));

            match behaviour {
                FakeBehaviour::Exit { code, delay } => match timeout {
                    Some(limit) if delay > limit => {
                        tokio::time::sleep(limit).await;
                        Outcome::timed_out(&task, Some(4242), limit)
                    }
                    _ => {
                        tokio::time::sleep(delay).await;
                        Outcome::exited(&task, Some(4242), code, started.elapsed())
                    }
                },
                FakeBehaviour::Hang => match timeout {
                    Some(limit) => {
                        tokio::time::sleep(limit).await;
                        Outcome::timed_out(&task, Some(4242), limit)
                    }
                    None => std::future::pending().await,
                },
                FakeBehaviour::LaunchError => {
                    Outcome::launch_failed(&task, started.elapsed(), "scripted launch error")
                }
                FakeBehaviour::Panic => panic!("scripted executor panic"),
            }
        })
    }
}
