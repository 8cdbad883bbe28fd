use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn, Span};
use aerobook_core::repository::BookingStore;
use aerobook_core::CoreResult;
use aerobook_shared::Booking;

const CHEAPEST_FARE_WEIGHT: f64 = 0.3;
const FREQUENT_FLYER_WEIGHT: f64 = -0.2;
const CHECKED_IN_WEIGHT: f64 = -0.5;
const IMMINENT_DEPARTURE_WEIGHT: f64 = -0.3;

/// Inputs of the bump-risk heuristic
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RiskFactors {
    pub cheapest_fare: bool,
    pub frequent_flyer: bool,
    pub checked_in: bool,
    /// Less than 24 hours until departure (or already departed)
    pub departs_within_a_day: bool,
}

impl RiskFactors {
    pub fn for_booking(
        booking: &Booking,
        frequent_flyer: bool,
        departure: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            cheapest_fare: booking.is_cheapest_fare,
            frequent_flyer,
            checked_in: booking.checked_in,
            departs_within_a_day: departure - now < Duration::hours(24),
        }
    }
}

/// Higher means a more acceptable bump target. Always within [0, 1].
pub fn risk_score(factors: &RiskFactors) -> f64 {
    let mut score = 0.0;
    if factors.cheapest_fare {
        score += CHEAPEST_FARE_WEIGHT;
    }
    if factors.frequent_flyer {
        score += FREQUENT_FLYER_WEIGHT;
    }
    if factors.checked_in {
        score += CHECKED_IN_WEIGHT;
    }
    if factors.departs_within_a_day {
        score += IMMINENT_DEPARTURE_WEIGHT;
    }
    score.clamp(0.0, 1.0)
}

/// Scores bookings against the passenger's history.
#[derive(Clone)]
pub struct RiskAssessor {
    bookings: Arc<dyn BookingStore>,
    span: Span,
}

impl RiskAssessor {
    pub fn new(bookings: Arc<dyn BookingStore>, span: Span) -> Self {
        Self { bookings, span }
    }

    pub async fn assess(&self, booking: &Booking, departure: DateTime<Utc>) -> CoreResult<f64> {
        self.assess_at(booking, departure, Utc::now()).await
    }

    pub async fn assess_at(
        &self,
        booking: &Booking,
        departure: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> CoreResult<f64> {
        let history = self.bookings.passenger_history(booking.passenger_id).await?;
        let factors = RiskFactors::for_booking(booking, history.is_frequent_flyer, departure, now);
        let score = risk_score(&factors);

        self.span
            .in_scope(|| debug!(booking_id = %booking.id, score, ?factors, "Risk assessed"));
        Ok(score)
    }

    /// Refreshes `booking.risk_score` in place. On failure the prior score is
    /// kept and `false` is returned.
    pub async fn rescore(&self, booking: &mut Booking, departure: DateTime<Utc>) -> bool {
        match self.assess(booking, departure).await {
            Ok(score) => {
                booking.risk_score = score;
                true
            }
            Err(e) => {
                self.span.in_scope(|| {
                    warn!(
                        booking_id = %booking.id,
                        prior_score = booking.risk_score,
                        "Failed to assess booking risk: {}",
                        e
                    )
                });
                false
            }
        }
    }
}
