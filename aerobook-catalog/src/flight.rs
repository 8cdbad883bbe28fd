use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Datelike, Utc};
use aerobook_shared::{CabinClass, Money};

use crate::seat_pool::SeatPool;

/// A scheduled flight and its three seat pools.
///
/// The catalog owns flights; the overbooking engine reads them and writes
/// the seat pool fields back in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Flight {
    pub id: Uuid,
    pub flight_number: String,
    pub origin: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub base_fare: Money,
    pub economy: SeatPool,
    pub business: SeatPool,
    pub first: SeatPool,
}

impl Flight {
    /// Route identifier used for historical statistics
    pub fn route(&self) -> String {
        format!("{}-{}", self.origin, self.destination)
    }

    /// Weekday of departure, 0 = Sunday.
    pub fn departure_weekday(&self) -> u32 {
        self.departure_time.weekday().num_days_from_sunday()
    }

    pub fn pool(&self, class: CabinClass) -> &SeatPool {
        match class {
            CabinClass::Economy => &self.economy,
            CabinClass::Business => &self.business,
            CabinClass::First => &self.first,
        }
    }

    pub fn pool_mut(&mut self, class: CabinClass) -> &mut SeatPool {
        match class {
            CabinClass::Economy => &mut self.economy,
            CabinClass::Business => &mut self.business,
            CabinClass::First => &mut self.first,
        }
    }

    pub fn available(&self, class: CabinClass) -> i64 {
        self.pool(class).available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn flight() -> Flight {
        Flight {
            id: Uuid::new_v4(),
            flight_number: "AB100".to_string(),
            origin: "TPE".to_string(),
            destination: "NRT".to_string(),
            // 2024-12-25 was a Wednesday
            departure_time: Utc.with_ymd_and_hms(2024, 12, 25, 8, 30, 0).unwrap(),
            base_fare: Money::new(30000, "USD"),
            economy: SeatPool::new(150, 0.1),
            business: SeatPool::new(20, 0.0),
            first: SeatPool::new(8, 0.0),
        }
    }

    #[test]
    fn test_route_and_weekday() {
        let f = flight();
        assert_eq!(f.route(), "TPE-NRT");
        assert_eq!(f.departure_weekday(), 3);
    }

    #[test]
    fn test_pool_by_class() {
        let mut f = flight();
        f.pool_mut(CabinClass::Business).admit().unwrap();
        assert_eq!(f.business.booked, 1);
        assert_eq!(f.available(CabinClass::Business), 19);
        assert_eq!(f.available(CabinClass::Economy), 165);
    }
}
