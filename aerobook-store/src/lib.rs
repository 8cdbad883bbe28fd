pub mod app_config;
pub mod booking_repo;
pub mod database;
pub mod events;
pub mod flight_repo;
pub mod memory;
pub mod redis_repo;

pub use booking_repo::PostgresBookingStore;
pub use database::DbClient;
pub use events::LogNotifier;
pub use flight_repo::PostgresFlightCatalog;
pub use redis_repo::RedisClient;
