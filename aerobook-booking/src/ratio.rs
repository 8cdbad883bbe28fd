use std::sync::Arc;

use tracing::{info, Instrument, Span};
use uuid::Uuid;
use aerobook_catalog::seat_pool::clamp_ratio;
use aerobook_catalog::Flight;
use aerobook_core::repository::{BookingStore, FlightCatalog};
use aerobook_core::CoreResult;
use aerobook_shared::{BookingTrend, CabinClass, HistoricalRouteStats};

use crate::inventory::InventoryLock;

const TREND_OFFSET: f64 = 0.02;

/// Extra allowance per class on top of the route's no-show rate
pub fn class_offset(class: CabinClass) -> f64 {
    match class {
        CabinClass::Economy => 0.05,
        CabinClass::Business => 0.02,
        CabinClass::First => 0.01,
    }
}

/// Strong demand overbooks less. A tie counts as weak demand.
pub fn trend_offset(stats: &HistoricalRouteStats, trend: &BookingTrend) -> f64 {
    if trend.booking_rate > stats.average_booking_rate {
        -TREND_OFFSET
    } else {
        TREND_OFFSET
    }
}

pub fn optimal_ratio(stats: &HistoricalRouteStats, trend: &BookingTrend, class: CabinClass) -> f64 {
    clamp_ratio(stats.average_no_show_rate + class_offset(class) + trend_offset(stats, trend))
}

/// Recomputes every seat pool's overbooking ratio for a flight.
pub struct RatioTuner {
    flights: Arc<dyn FlightCatalog>,
    bookings: Arc<dyn BookingStore>,
    inventory: InventoryLock,
    span: Span,
}

impl RatioTuner {
    pub fn new(
        flights: Arc<dyn FlightCatalog>,
        bookings: Arc<dyn BookingStore>,
        inventory: InventoryLock,
        span: Span,
    ) -> Self {
        Self { flights, bookings, inventory, span }
    }

    pub async fn tune(&self, flight_id: Uuid) -> CoreResult<Flight> {
        async move {
            let _guard = self.inventory.acquire().await;

            let mut flight = self.flights.get_flight(flight_id).await?;
            let stats = self
                .flights
                .historical_stats(&flight.route(), flight.departure_weekday())
                .await?;
            let trend = self.bookings.booking_trend(flight_id).await?;

            for class in CabinClass::ALL {
                flight.pool_mut(class).set_ratio(optimal_ratio(&stats, &trend, class));
            }
            self.flights.update_flight(&flight).await?;

            info!(
                flight_id = %flight.id,
                economy = flight.economy.overbooking_ratio,
                business = flight.business.overbooking_ratio,
                first = flight.first.overbooking_ratio,
                "Overbooking ratios tuned"
            );
            Ok(flight)
        }
        .instrument(self.span.clone())
        .await
    }
}
