use std::sync::Arc;
use std::time::Duration;

use log::{error, trace};
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::select;
use tokio::task::{spawn_blocking, JoinHandle};
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

use super::executor::poll;
use super::set::SamplerSet;
use crate::metrics::MetricsSink;

pub const POLL_PERIOD: Duration = Duration::from_secs(20);
pub const SAMPLER_METRIC: &str = "Supportability/Samplers";

const THREAD_NAME: &str = "Sampler Tasks";

/// Handle to the recurring task that polls the periodic samplers.
///
/// Runs on the caller's tokio runtime when there is one, otherwise on a
/// runtime owned by the handle. Dropping the handle stops the task.
pub struct BackgroundScheduler {
    task: JoinHandle<()>,
    cancel: CancellationToken,
    runtime: Option<Runtime>,
}

impl BackgroundScheduler {
    pub(crate) fn spawn(
        samplers: Arc<SamplerSet>,
        sink: Arc<dyn MetricsSink>,
    ) -> std::io::Result<Self> {
        let cancel = CancellationToken::new();
        let inner = SchedulerLoop {
            samplers,
            sink,
            cancel: cancel.clone(),
        };
        let fut = inner.run();

        let (task, runtime) = match Handle::try_current() {
            Ok(handle) => (handle.spawn(fut), None),
            Err(_) => {
                let runtime = Builder::new_multi_thread()
                    .worker_threads(1)
                    .thread_name(THREAD_NAME)
                    .enable_all()
                    .build()?;
                let task = runtime.spawn(fut);
                (task, Some(runtime))
            }
        };

        Ok(BackgroundScheduler {
            task,
            cancel,
            runtime,
        })
    }

    pub fn is_alive(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for BackgroundScheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

struct SchedulerLoop {
    samplers: Arc<SamplerSet>,
    sink: Arc<dyn MetricsSink>,
    cancel: CancellationToken,
}

impl SchedulerLoop {
    async fn run(self) {
        loop {
            let started = Instant::now();
            select! {
                _ = self.cancel.cancelled() => {
                    break;
                }
                _ = sleep(POLL_PERIOD) => {}
            }

            // Samplers are synchronous; keep them off the runtime's workers.
            let samplers = Arc::clone(&self.samplers);
            let pass = spawn_blocking(move || poll(&samplers)).await;

            let duration = started.elapsed();
            self.sink.record_metric(SAMPLER_METRIC, duration.as_secs_f64());
            match pass {
                Ok(report) => trace!(
                    "sampler pass polled {} samplers, removed {}, took {:?}",
                    report.polled,
                    report.removed.len(),
                    duration
                ),
                Err(err) => error!("sampler pass did not complete: {}", err),
            }
        }
    }
}
