use std::time::Duration;
use async_trait::async_trait;
use uuid::Uuid;
use aerobook_catalog::Flight;
use aerobook_shared::{Booking, BookingTrend, HistoricalRouteStats, PassengerHistory};

use crate::search::SearchRequest;
use crate::CoreResult;

/// Source of truth for flights and their seat pools
#[async_trait]
pub trait FlightCatalog: Send + Sync {
    /// One page of flights for the route and day, ordered by departure time ascending.
    async fn search_flights(&self, request: &SearchRequest) -> CoreResult<Vec<Flight>>;

    async fn get_flight(&self, id: Uuid) -> CoreResult<Flight>;

    /// Overwrites the stored flight, seat pools included.
    async fn update_flight(&self, flight: &Flight) -> CoreResult<()>;

    async fn historical_stats(&self, route: &str, day_of_week: u32) -> CoreResult<HistoricalRouteStats>;
}

/// Booking persistence plus the passenger and trend lookups the engine needs
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Inserts the booking, or overwrites an existing record with the same id.
    async fn create_booking(&self, booking: &Booking) -> CoreResult<()>;

    async fn get_booking(&self, id: Uuid) -> CoreResult<Booking>;

    async fn update_booking(&self, booking: &Booking) -> CoreResult<()>;

    /// Deleting a booking that no longer exists succeeds.
    async fn delete_booking(&self, id: Uuid) -> CoreResult<()>;

    async fn list_by_passenger(&self, passenger_id: Uuid) -> CoreResult<Vec<Booking>>;

    async fn list_by_flight(&self, flight_id: Uuid) -> CoreResult<Vec<Booking>>;

    async fn passenger_history(&self, passenger_id: Uuid) -> CoreResult<PassengerHistory>;

    async fn booking_trend(&self, flight_id: Uuid) -> CoreResult<BookingTrend>;
}

/// Best-effort passenger messaging
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn notify(&self, booking: &Booking, message: &str) -> CoreResult<()>;
}

/// Byte-blob cache with per-entry expiry
#[async_trait]
pub trait SearchCache: Send + Sync {
    async fn get(&self, key: &str) -> CoreResult<Option<Vec<u8>>>;

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CoreResult<()>;
}
