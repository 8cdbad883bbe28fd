use serde::{Deserialize, Serialize};

/// Upper bound for any class's overbooking ratio.
pub const MAX_OVERBOOKING_RATIO: f64 = 0.20;

// Absorbs float noise such as 100 * 1.17 == 116.99999999999999.
const CAPACITY_EPSILON: f64 = 1e-9;

/// Capacity accounting for one cabin class on one flight.
///
/// `booked` may exceed the virtual capacity after the ratio is lowered;
/// admission is the only place the bound is enforced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SeatPool {
    pub total: u32,
    pub booked: u32,
    pub overbooking_ratio: f64,
}

impl SeatPool {
    pub fn new(total: u32, overbooking_ratio: f64) -> Self {
        Self {
            total,
            booked: 0,
            overbooking_ratio: clamp_ratio(overbooking_ratio),
        }
    }

    /// Physical seats plus the overbooking allowance, rounded down.
    pub fn virtual_capacity(&self) -> i64 {
        (self.total as f64 * (1.0 + self.overbooking_ratio) + CAPACITY_EPSILON).floor() as i64
    }

    /// Seats still sellable. Negative when the pool is retroactively overbooked.
    pub fn available(&self) -> i64 {
        self.virtual_capacity() - self.booked as i64
    }

    /// Physical seats nobody holds yet
    pub fn physical_free(&self) -> u32 {
        self.total.saturating_sub(self.booked)
    }

    /// Admit one reservation
    pub fn admit(&mut self) -> Result<(), InventoryError> {
        let available = self.available();
        if available <= 0 {
            return Err(InventoryError::NoSeatsAvailable { available });
        }
        self.booked += 1;
        Ok(())
    }

    /// Release one reservation (cancellation or class change)
    pub fn release(&mut self) {
        self.booked = self.booked.saturating_sub(1);
    }

    /// Existing bookings are not re-validated against the new ratio.
    pub fn set_ratio(&mut self, ratio: f64) {
        self.overbooking_ratio = clamp_ratio(ratio);
    }
}

pub fn clamp_ratio(ratio: f64) -> f64 {
    if ratio.is_nan() {
        return 0.0;
    }
    ratio.clamp(0.0, MAX_OVERBOOKING_RATIO)
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum InventoryError {
    #[error("No seats available in this class (available {available})")]
    NoSeatsAvailable {
        available: i64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_with_overbooking() {
        let pool = SeatPool { total: 100, booked: 95, overbooking_ratio: 0.10 };
        assert_eq!(pool.virtual_capacity(), 110);
        assert_eq!(pool.available(), 15);
    }

    #[test]
    fn test_virtual_capacity_rounds_down() {
        let pool = SeatPool { total: 7, booked: 0, overbooking_ratio: 0.2 };
        // 7 * 1.2 = 8.4
        assert_eq!(pool.virtual_capacity(), 8);

        let pool = SeatPool { total: 100, booked: 0, overbooking_ratio: 0.17 };
        assert_eq!(pool.virtual_capacity(), 117);
    }

    #[test]
    fn test_admit_until_full() {
        let mut pool = SeatPool::new(2, 0.0);
        pool.admit().unwrap();
        pool.admit().unwrap();
        assert_eq!(pool.booked, 2);
        assert_eq!(pool.admit(), Err(InventoryError::NoSeatsAvailable { available: 0 }));
        assert_eq!(pool.booked, 2);
    }

    #[test]
    fn test_shrinking_ratio_creates_retroactive_overbooking() {
        let mut pool = SeatPool { total: 10, booked: 12, overbooking_ratio: 0.2 };
        assert_eq!(pool.available(), 0);

        pool.set_ratio(0.0);
        assert_eq!(pool.booked, 12);
        assert_eq!(pool.available(), -2);
        assert_eq!(pool.physical_free(), 0);
        assert!(pool.admit().is_err());
    }

    #[test]
    fn test_release_saturates() {
        let mut pool = SeatPool::new(1, 0.0);
        pool.release();
        assert_eq!(pool.booked, 0);
    }

    #[test]
    fn test_ratio_is_clamped() {
        let mut pool = SeatPool::new(10, 0.5);
        assert_eq!(pool.overbooking_ratio, MAX_OVERBOOKING_RATIO);
        pool.set_ratio(-0.1);
        assert_eq!(pool.overbooking_ratio, 0.0);
        pool.set_ratio(f64::NAN);
        assert_eq!(pool.overbooking_ratio, 0.0);
    }

    #[test]
    fn test_physical_free() {
        let pool = SeatPool { total: 4, booked: 5, overbooking_ratio: 0.2 };
        assert_eq!(pool.physical_free(), 0);
        let pool = SeatPool { total: 4, booked: 1, overbooking_ratio: 0.0 };
        assert_eq!(pool.physical_free(), 3);
    }
}
