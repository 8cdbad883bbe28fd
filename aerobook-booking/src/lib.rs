pub mod inventory;
pub mod manager;
pub mod ratio;
pub mod reconciliation;
pub mod risk;
pub mod saga;

pub use inventory::InventoryLock;
pub use manager::BookingManager;
pub use ratio::{optimal_ratio, RatioTuner};
pub use reconciliation::{Compensation, ReconciliationReport, Reconciler, Upgrade};
pub use risk::{risk_score, RiskAssessor, RiskFactors};
pub use saga::RetryPolicy;

use tracing::warn;
use aerobook_core::repository::NotificationGateway;
use aerobook_shared::Booking;

/// Notifications are advisory; a failed send is logged and dropped.
pub(crate) async fn notify_passenger(notifier: &dyn NotificationGateway, booking: &Booking, message: &str) {
    if let Err(e) = notifier.notify(booking, message).await {
        warn!(booking_id = %booking.id, "Failed to notify passenger: {}", e);
    }
}
