pub mod models;

pub use models::booking::{Booking, BookingStatus, CabinClass, Money, NewBooking};
pub use models::events::BookingNotificationEvent;
pub use models::stats::{BookingTrend, HistoricalRouteStats, PassengerHistory};
