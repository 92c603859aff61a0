//! Recurring driver for scheduling passes.

use std::sync::Arc;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::Scheduler;

/// Runs a [`Scheduler`] pass every `tick_interval` until cancelled.
///
/// Each pass is awaited before the next tick is taken; ticks missed while a
/// pass overran are skipped rather than replayed.
pub struct SchedulerHost {
    scheduler: Arc<Scheduler>,
}

impl SchedulerHost {
    pub fn new(scheduler: Arc<Scheduler>) -> Self {
        Self { scheduler }
    }

    /// Drive passes until `cancel` fires. Returns the number of passes run.
    pub async fn run(&self, cancel: CancellationToken) -> u64 {
        let mut interval = tokio::time::interval(self.scheduler.config().tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut passes = 0;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            passes += 1;
            match self.scheduler.run_scheduling_pass(&cancel).await {
                Ok(report) => tracing::debug!(
                    coordinations = report.coordinations.len(),
                    "scheduling pass complete"
                ),
                Err(e) => tracing::error!("scheduling pass failed: {e}"),
            }
        }

        tracing::info!(
            environment = %self.scheduler.config().environment,
            passes,
            "scheduler host stopped"
        );
        passes
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::config::SchedulerConfig;
    use crate::defaults::InMemoryTriggerStore;
    use crate::errors::StoreError;
    use crate::traits::TriggerStore;
    use crate::types::Trigger;

    /// Trigger store counting how often it was listed.
    #[derive(Clone, Default)]
    struct CountingStore {
        inner: InMemoryTriggerStore,
        lists: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl TriggerStore for CountingStore {
        async fn list_enabled_triggers(&self) -> Result<Vec<Trigger>, StoreError> {
            self.lists.fetch_add(1, Ordering::SeqCst);
            self.inner.list_enabled_triggers().await
        }

        async fn update_trigger(&self, trigger: &Trigger) -> Result<(), StoreError> {
            self.inner.update_trigger(trigger).await
        }
    }

    #[tokio::test]
    async fn test_runs_pass_per_interval_until_cancelled() {
        tokio::time::pause();

        let store = CountingStore::default();
        let scheduler = Scheduler::builder()
            .config(SchedulerConfig {
                tick_interval: Duration::from_secs(20),
                ..SchedulerConfig::default()
            })
            .trigger_store(store.clone())
            .build();
        let host = SchedulerHost::new(Arc::new(scheduler));
        let cancel = CancellationToken::new();

        let handle = {
            let cancel = cancel.clone();
            tokio::spawn(async move { host.run(cancel).await })
        };

        // Ticks at 0s, 20s and 40s.
        tokio::time::sleep(Duration::from_secs(50)).await;
        cancel.cancel();
        let passes = handle.await.unwrap();

        assert_eq!(passes, 3);
        assert_eq!(store.lists.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_cancelled_host_runs_nothing() {
        let store = CountingStore::default();
        let scheduler = Scheduler::builder().trigger_store(store.clone()).build();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let passes = SchedulerHost::new(Arc::new(scheduler)).run(cancel).await;
        assert_eq!(passes, 0);
        assert_eq!(store.lists.load(Ordering::SeqCst), 0);
    }
}
