//! Expiry sweeper: periodic cleanup of stale reservations and stale holders.
//!
//! Stale reservations are cancelled through the engine, never by writing the
//! ledger or catalog directly, so releasing capacity rides the same atomic
//! transition as a caller-initiated cancel.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use crate::{
    config::SweeperConfig,
    error::{AppError, AppResult},
    repository::InventoryStore,
};

use super::inventory::InventoryEngine;

/// Outcome of one sweep pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Stale reservations found by the scan.
    pub scanned: usize,
    /// Reservations cancelled and their copies released.
    pub cancelled: usize,
    /// Reservations that raced with a concurrent issue or cancel; the other
    /// transaction won, nothing to do.
    pub already_handled: usize,
    /// Cancellations that failed for any other reason (logged, not fatal).
    pub failed: usize,
    /// Holder accounts deactivated for missing their renewal.
    pub holders_deactivated: u64,
}

pub struct ExpirySweeper<S> {
    store: Arc<S>,
    engine: InventoryEngine<S>,
    config: SweeperConfig,
}

impl<S> Clone for ExpirySweeper<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            engine: self.engine.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S: InventoryStore> ExpirySweeper<S> {
    pub fn new(store: Arc<S>, engine: InventoryEngine<S>, config: SweeperConfig) -> Self {
        Self {
            store,
            engine,
            config,
        }
    }

    /// Run sweep passes forever on the configured interval.
    pub async fn run(&self) {
        let period = std::time::Duration::from_secs(self.config.interval_secs);
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            if let Err(e) = self.sweep_once(Utc::now()).await {
                tracing::error!("Sweep pass failed: {}", e);
            }
        }
    }

    /// One pass: cancel reservations older than the grace window, then
    /// deactivate holders past the renewal threshold. Idempotent; a rerun
    /// finds nothing left to do.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> AppResult<SweepReport> {
        let mut report = SweepReport::default();

        let cutoff = now - Duration::days(self.config.grace_days);
        let stale = self.store.expired_reservations(cutoff).await?;
        report.scanned = stale.len();

        for booking in stale {
            match self.engine.cancel(booking.id).await {
                Ok(_) => report.cancelled += 1,
                // Lost the race to an issue or an earlier cancel; the other
                // transaction committed first and that is the correct outcome.
                Err(AppError::InvalidTransition { from, .. }) => {
                    tracing::debug!(
                        "Booking {} already {} when the sweeper reached it",
                        booking.id,
                        from
                    );
                    report.already_handled += 1;
                }
                Err(AppError::NotFound(_)) => report.already_handled += 1,
                Err(e) => {
                    tracing::error!("Failed to cancel stale booking {}: {}", booking.id, e);
                    report.failed += 1;
                }
            }
        }

        let renewal_cutoff = now - Duration::days(self.config.holder_renewal_days);
        report.holders_deactivated = self.store.deactivate_stale_holders(renewal_cutoff).await?;

        tracing::info!(
            "Sweep pass: {} stale reservations ({} cancelled, {} already handled, {} failed), {} holders deactivated",
            report.scanned,
            report.cancelled,
            report.already_handled,
            report.failed,
            report.holders_deactivated
        );

        Ok(report)
    }
}
