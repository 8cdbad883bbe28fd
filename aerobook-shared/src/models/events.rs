use uuid::Uuid;

use super::booking::Booking;

/// Payload handed to the notification gateway for a single passenger message.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingNotificationEvent {
    pub booking_id: Uuid,
    pub passenger_id: Uuid,
    pub flight_id: Uuid,
    pub message: String,
    pub timestamp: i64,
}

impl BookingNotificationEvent {
    pub fn for_booking(booking: &Booking, message: &str) -> Self {
        Self {
            booking_id: booking.id,
            passenger_id: booking.passenger_id,
            flight_id: booking.flight_id,
            message: message.to_string(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}
