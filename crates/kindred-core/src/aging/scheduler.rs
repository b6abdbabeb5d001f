//! Periodic consolidation job with an explicit start/stop lifecycle.
//!
//! Each tick enumerates owner scopes from the store and calls
//! [`AgingEngine::consolidate_if_due`], so the interval is a minimum spacing
//! per scope rather than a precise schedule.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use kindred_types::error::ConsolidationError;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::engine::AgingEngine;
use crate::memory::store::MemoryRepository;

/// Handle to a running consolidation loop.
pub struct ConsolidationScheduler {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl ConsolidationScheduler {
    /// Spawn the loop on the current tokio runtime.
    ///
    /// The first tick fires immediately.
    pub fn start<M>(engine: Arc<AgingEngine<M>>, tick: Duration) -> Self
    where
        M: MemoryRepository + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::info!(tick_secs = tick.as_secs(), "consolidation scheduler started");

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => run_tick(&engine).await,
                }
            }

            tracing::info!("consolidation scheduler stopped");
        });

        Self {
            cancel,
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the loop and wait for an in-flight tick to finish.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "consolidation scheduler task ended abnormally");
            }
        }
    }
}

impl Drop for ConsolidationScheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_tick<M: MemoryRepository>(engine: &AgingEngine<M>) {
    let owners = match engine.repository().owner_scopes().await {
        Ok(owners) => owners,
        Err(e) => {
            tracing::warn!(error = %e, "failed to list memory owners");
            return;
        }
    };

    for owner in owners {
        match engine.consolidate_if_due(&owner, Utc::now()).await {
            Ok(_) => {}
            Err(ConsolidationError::AlreadyRunning { .. }) => {
                tracing::debug!(
                    user_id = %owner.user_id,
                    persona_id = %owner.persona_id,
                    "consolidation already running, skipping"
                );
            }
            Err(e) => {
                tracing::warn!(
                    user_id = %owner.user_id,
                    persona_id = %owner.persona_id,
                    error = %e,
                    "consolidation pass failed"
                );
            }
        }
    }
}
