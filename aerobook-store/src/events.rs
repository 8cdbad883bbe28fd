use async_trait::async_trait;
use tracing::info;

use aerobook_core::repository::NotificationGateway;
use aerobook_core::CoreResult;
use aerobook_shared::{Booking, BookingNotificationEvent};

/// Notification gateway that emits each message as a structured log event.
///
/// Delivery (mail, SMS, push) is not wired up; downstream log shippers can
/// pick the `passenger_notification` events up.
#[derive(Clone, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationGateway for LogNotifier {
    async fn notify(&self, booking: &Booking, message: &str) -> CoreResult<()> {
        let event = BookingNotificationEvent::for_booking(booking, message);
        info!(
            target: "passenger_notification",
            booking_id = %event.booking_id,
            passenger_id = %event.passenger_id,
            flight_id = %event.flight_id,
            timestamp = event.timestamp,
            "{}",
            event.message
        );
        Ok(())
    }
}
