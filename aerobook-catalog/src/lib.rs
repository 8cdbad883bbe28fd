pub mod flight;
pub mod seat_pool;

pub use flight::Flight;
pub use seat_pool::{InventoryError, SeatPool, MAX_OVERBOOKING_RATIO};
