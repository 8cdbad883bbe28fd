use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use super::booking::Booking;

/// Aggregated no-show and booking behaviour for a route on a given weekday.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoricalRouteStats {
    pub route: String,
    /// 0 = Sunday
    pub day_of_week: u32,
    pub average_no_show_rate: f64,
    pub average_booking_rate: f64,
}

/// Current booking velocity for one flight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingTrend {
    pub flight_id: Uuid,
    pub total_bookings: u32,
    pub confirmed_bookings: u32,
    pub booking_rate: f64,
}

impl BookingTrend {
    /// Confirmed bookings per day since the first booking was taken.
    pub fn from_bookings(flight_id: Uuid, bookings: &[Booking], now: DateTime<Utc>) -> Self {
        let confirmed = bookings.iter().filter(|b| b.is_confirmed()).count() as u32;
        let first_booked = bookings.iter().map(|b| b.booked_at).min();
        let days = first_booked
            .map(|first| (now - first).num_seconds() as f64 / 86_400.0)
            .unwrap_or(0.0)
            .max(1.0);

        Self {
            flight_id,
            total_bookings: bookings.len() as u32,
            confirmed_bookings: confirmed,
            booking_rate: confirmed as f64 / days,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PassengerHistory {
    pub passenger_id: Uuid,
    pub is_frequent_flyer: bool,
    pub total_flights: u32,
}

impl PassengerHistory {
    /// History for a passenger with no recorded flights
    pub fn first_time(passenger_id: Uuid) -> Self {
        Self {
            passenger_id,
            is_frequent_flyer: false,
            total_flights: 0,
        }
    }
}
