//! Wires the admission poller and dispatch loops into cancelable tokio tasks.
//!
//! The two cycles share nothing but the delivery queue; neither holds a
//! handle to the other.

use std::sync::Arc;

use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::{DispatchConfig, SchedulerConfig};
use crate::core::poller::AdmissionSettings;
use crate::core::{
    AdmissionPoller, Deliver, DeliveryQueue, DispatchLoop, DispatchStats, SourceStore,
};
use crate::runtime::TokioSpawner;

/// The scheduled-delivery pipeline: one poller and N dispatch loops.
pub struct SchedulerService<Q: ?Sized, S: ?Sized> {
    queue: Arc<Q>,
    source: Arc<S>,
    deliverer: Arc<dyn Deliver>,
    spawner: TokioSpawner,
    poller: AdmissionSettings,
    dispatch: DispatchConfig,
    stats: Arc<DispatchStats>,
}

impl<Q, S> SchedulerService<Q, S>
where
    Q: DeliveryQueue + ?Sized + 'static,
    S: SourceStore + ?Sized + 'static,
{
    /// Assemble the pipeline from configuration and components.
    pub fn new(
        config: &SchedulerConfig,
        queue: Arc<Q>,
        source: Arc<S>,
        deliverer: Arc<dyn Deliver>,
        spawner: TokioSpawner,
    ) -> Self {
        Self {
            queue,
            source,
            deliverer,
            spawner,
            poller: config.poller.settings(),
            dispatch: config.dispatch.clone(),
            stats: Arc::new(DispatchStats::default()),
        }
    }

    /// Counters shared by all dispatch loops of this service.
    pub fn stats(&self) -> Arc<DispatchStats> {
        Arc::clone(&self.stats)
    }

    /// Start the admission cycle.
    pub fn start_poller(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let poller = AdmissionPoller::new(
            Arc::clone(&self.source),
            Arc::clone(&self.queue),
            self.poller.clone(),
        );
        info!(interval_secs = self.poller.interval.as_secs(), "starting admission poller");
        tokio::spawn(
            async move { poller.run(cancel).await }.instrument(info_span!("admission_poller")),
        )
    }

    /// Start the configured number of dispatch cycles.
    pub fn start_dispatchers(&self, cancel: CancellationToken) -> Vec<JoinHandle<()>> {
        (0..self.dispatch.dispatchers)
            .map(|_| {
                let name = format!("dispatcher-{}", Uuid::new_v4());
                let dispatcher = DispatchLoop::new(
                    Arc::clone(&self.queue),
                    Arc::clone(&self.deliverer),
                    self.spawner.clone(),
                )
                .with_name(name.clone())
                .with_policy(self.dispatch.retry_policy())
                .with_idle_wait(self.dispatch.idle_wait())
                .with_stats(Arc::clone(&self.stats));
                let cancel = cancel.clone();
                tokio::spawn(
                    async move { dispatcher.run(cancel).await }
                        .instrument(info_span!("dispatcher", dispatcher.name = %name)),
                )
            })
            .collect()
    }

    /// Start both cycles against one cancellation token.
    pub fn start(&self, cancel: &CancellationToken) -> ServiceHandle {
        let mut handles = vec![self.start_poller(cancel.clone())];
        handles.extend(self.start_dispatchers(cancel.clone()));
        ServiceHandle {
            handles,
            detached: self.spawner.tracker().clone(),
        }
    }
}

/// Handle to the running cycles.
#[derive(Debug)]
pub struct ServiceHandle {
    handles: Vec<JoinHandle<()>>,
    detached: TaskTracker,
}

impl ServiceHandle {
    /// Wait for every cycle to exit after cancellation, then for the
    /// re-admission timers they left behind.
    pub async fn wait_for_shutdown(self) {
        join_all(self.handles).await.into_iter().for_each(|result| {
            if let Err(error) = result {
                warn!(%error, "scheduler task panicked");
            }
        });
        self.detached.close();
        if !self.detached.is_empty() {
            info!(pending = self.detached.len(), "waiting for pending re-admissions");
        }
        self.detached.wait().await;
    }
}
