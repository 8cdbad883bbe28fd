pub mod booking;
pub mod events;
pub mod stats;
