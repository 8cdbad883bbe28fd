use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use std::fmt;

/// Seat class on a flight. Every flight carries one seat pool per class.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CabinClass {
    Economy,
    Business,
    First,
}

impl CabinClass {
    pub const ALL: [CabinClass; 3] = [CabinClass::Economy, CabinClass::Business, CabinClass::First];

    pub fn as_str(&self) -> &'static str {
        match self {
            CabinClass::Economy => "economy",
            CabinClass::Business => "business",
            CabinClass::First => "first",
        }
    }
}

impl fmt::Display for CabinClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CabinClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "economy" => Ok(CabinClass::Economy),
            "business" => Ok(CabinClass::Business),
            "first" => Ok(CabinClass::First),
            other => Err(format!("unknown cabin class: {}", other)),
        }
    }
}

/// Amount in minor units (cents) plus ISO currency code
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Money {
    pub amount: i64,
    pub currency: String,
}

impl Money {
    pub fn new(amount: i64, currency: impl Into<String>) -> Self {
        Self { amount, currency: currency.into() }
    }

    /// `None` when the product does not fit in an `i64`
    pub fn checked_times(&self, factor: i64) -> Option<Money> {
        Some(Money {
            amount: self.amount.checked_mul(factor)?,
            currency: self.currency.clone(),
        })
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02} {}", self.amount / 100, (self.amount % 100).abs(), self.currency)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(format!("unknown booking status: {}", other)),
        }
    }
}

/// Input for a new reservation, before a seat has been admitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBooking {
    pub passenger_id: Uuid,
    pub flight_id: Uuid,
    pub class: CabinClass,
    #[serde(default)]
    pub seat_number: Option<String>,
    pub price: Money,
    #[serde(default)]
    pub is_cheapest_fare: bool,
}

/// A passenger's reservation on one flight
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub passenger_id: Uuid,
    pub flight_id: Uuid,
    pub class: CabinClass,
    pub seat_number: Option<String>,
    pub status: BookingStatus,
    pub booked_at: DateTime<Utc>,
    pub checked_in: bool,
    pub check_in_time: Option<DateTime<Utc>>,
    pub price: Money,
    pub compensation: Option<Money>,
    pub risk_score: f64,
    pub is_cheapest_fare: bool,
    /// Original class when the booking was moved up during reconciliation
    pub upgraded_from: Option<CabinClass>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Confirmed booking minted from a request; the id is fixed up front so
    /// that retried writes address the same record.
    pub fn confirmed(request: NewBooking) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            passenger_id: request.passenger_id,
            flight_id: request.flight_id,
            class: request.class,
            seat_number: request.seat_number,
            status: BookingStatus::Confirmed,
            booked_at: now,
            checked_in: false,
            check_in_time: None,
            price: request.price,
            compensation: None,
            risk_score: 0.0,
            is_cheapest_fare: request.is_cheapest_fare,
            upgraded_from: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == BookingStatus::Confirmed
    }

    pub fn check_in(&mut self) {
        let now = Utc::now();
        self.checked_in = true;
        self.check_in_time = Some(now);
        self.updated_at = now;
    }

    pub fn cancel(&mut self) {
        self.status = BookingStatus::Cancelled;
        self.updated_at = Utc::now();
    }

    /// Passenger-requested class change
    pub fn change_class(&mut self, class: CabinClass) {
        self.class = class;
        self.updated_at = Utc::now();
    }

    /// Move to another class. Status is untouched.
    pub fn upgrade_to(&mut self, class: CabinClass) {
        self.upgraded_from = Some(self.class);
        self.class = class;
        self.updated_at = Utc::now();
    }

    pub fn compensate(&mut self, amount: Money) {
        self.compensation = Some(amount);
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Booking {
        Booking::confirmed(NewBooking {
            passenger_id: Uuid::new_v4(),
            flight_id: Uuid::new_v4(),
            class: CabinClass::Economy,
            seat_number: None,
            price: Money::new(25000, "USD"),
            is_cheapest_fare: true,
        })
    }

    #[test]
    fn test_cabin_class_wire_format() {
        let json = serde_json::to_string(&CabinClass::Business).unwrap();
        assert_eq!(json, "\"business\"");
        let parsed: CabinClass = "first".parse().unwrap();
        assert_eq!(parsed, CabinClass::First);
        assert!("premium".parse::<CabinClass>().is_err());
    }

    #[test]
    fn test_upgrade_keeps_status() {
        let mut booking = sample();
        booking.upgrade_to(CabinClass::Business);
        assert_eq!(booking.class, CabinClass::Business);
        assert_eq!(booking.upgraded_from, Some(CabinClass::Economy));
        assert_eq!(booking.status, BookingStatus::Confirmed);
    }

    #[test]
    fn test_check_in_and_cancel() {
        let mut booking = sample();
        booking.check_in();
        assert!(booking.checked_in);
        assert!(booking.check_in_time.is_some());
        assert!(booking.is_confirmed());

        booking.cancel();
        assert_eq!(booking.status, BookingStatus::Cancelled);
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::new(12345, "EUR").to_string(), "123.45 EUR");
        assert_eq!(Money::new(500, "USD").checked_times(2), Some(Money::new(1000, "USD")));
        assert_eq!(Money::new(i64::MAX / 2 + 1, "USD").checked_times(2), None);
    }
}
