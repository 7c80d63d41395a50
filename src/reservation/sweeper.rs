use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use tokio::task::JoinHandle;

use crate::entities::booking::{self, PaymentStatus};
use crate::error::{AppError, AppResult};
use crate::reservation::machine;

/// Spawn the background expiry loop. The first tick of the interval
/// completes immediately, giving one eager sweep at process start.
pub fn spawn(
    db: DatabaseConnection,
    grace: Duration,
    interval: StdDuration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match sweep(&db, grace).await {
                Ok(0) => tracing::debug!("expiry sweep: nothing stale"),
                Ok(released) => {
                    tracing::info!(bookings = released, "expiry sweep released stale bookings")
                }
                Err(e) => tracing::error!(error = %e, "expiry sweep failed"),
            }
        }
    })
}

/// One sweep over all stale pending bookings: everything pending whose
/// grace period has elapsed goes through the cancellation release
/// path, each in its own transaction. One booking failing does not
/// abort the rest; it stays pending and the next sweep retries it.
/// Re-running on an already-released booking is a no-op because it is
/// no longer pending and thus never selected.
pub async fn sweep(db: &DatabaseConnection, grace: Duration) -> AppResult<usize> {
    let cutoff = Utc::now() - grace;

    let stale = booking::Entity::find()
        .filter(booking::Column::PaymentStatus.eq(PaymentStatus::Pending))
        .filter(booking::Column::CreatedAt.lte(cutoff))
        .all(db)
        .await?;

    let mut released = 0;
    for b in stale {
        match machine::cancel(db, b.id).await {
            Ok(summary) => {
                tracing::info!(
                    booking_id = %b.id,
                    reference = %b.booking_reference,
                    seats = summary.seats_released,
                    "expired stale pending booking"
                );
                released += 1;
            }
            // Lost the race against a concurrent payment or cancel
            Err(AppError::NotCancellable(_)) | Err(AppError::NotFound(_)) => {}
            Err(e) => {
                tracing::warn!(
                    booking_id = %b.id,
                    error = %e,
                    "failed to expire booking, will retry next sweep"
                );
            }
        }
    }

    Ok(released)
}
