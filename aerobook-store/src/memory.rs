//! In-memory collaborators for tests and local runs without Postgres/Redis.
//!
//! Each store exposes a few switches to simulate collaborator outages.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use aerobook_catalog::Flight;
use aerobook_core::repository::{BookingStore, FlightCatalog, NotificationGateway, SearchCache};
use aerobook_core::search::SearchRequest;
use aerobook_core::{CoreError, CoreResult};
use aerobook_shared::{Booking, BookingTrend, HistoricalRouteStats, PassengerHistory};

#[derive(Default)]
pub struct InMemoryFlightCatalog {
    flights: RwLock<HashMap<Uuid, Flight>>,
    stats: RwLock<HashMap<(String, u32), HistoricalRouteStats>>,
    search_calls: AtomicUsize,
    fail_searches: AtomicBool,
    failing_updates: AtomicUsize,
}

impl InMemoryFlightCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_flight(&self, flight: Flight) {
        self.flights.write().await.insert(flight.id, flight);
    }

    pub async fn insert_stats(&self, stats: HistoricalRouteStats) {
        self.stats
            .write()
            .await
            .insert((stats.route.clone(), stats.day_of_week), stats);
    }

    /// Number of `search_flights` calls served so far
    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn set_search_failure(&self, fail: bool) {
        self.fail_searches.store(fail, Ordering::SeqCst);
    }

    /// The next `count` calls to `update_flight` fail
    pub fn fail_next_updates(&self, count: usize) {
        self.failing_updates.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl FlightCatalog for InMemoryFlightCatalog {
    async fn search_flights(&self, request: &SearchRequest) -> CoreResult<Vec<Flight>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_searches.load(Ordering::SeqCst) {
            return Err(CoreError::StorageError("catalog offline".to_string()));
        }

        let flights = self.flights.read().await;
        let mut matching: Vec<Flight> = flights
            .values()
            .filter(|f| {
                f.origin == request.origin
                    && f.destination == request.destination
                    && f.departure_time.date_naive() == request.date
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.departure_time.cmp(&b.departure_time).then(a.id.cmp(&b.id)));

        Ok(matching
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.limit() as usize)
            .collect())
    }

    async fn get_flight(&self, id: Uuid) -> CoreResult<Flight> {
        self.flights
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("flight {}", id)))
    }

    async fn update_flight(&self, flight: &Flight) -> CoreResult<()> {
        let should_fail = self
            .failing_updates
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(CoreError::StorageError("flight update rejected".to_string()));
        }

        let mut flights = self.flights.write().await;
        match flights.get_mut(&flight.id) {
            Some(existing) => {
                *existing = flight.clone();
                Ok(())
            }
            None => Err(CoreError::NotFound(format!("flight {}", flight.id))),
        }
    }

    async fn historical_stats(&self, route: &str, day_of_week: u32) -> CoreResult<HistoricalRouteStats> {
        self.stats
            .read()
            .await
            .get(&(route.to_string(), day_of_week))
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("statistics for {} on day {}", route, day_of_week)))
    }
}

#[derive(Default)]
pub struct InMemoryBookingStore {
    bookings: RwLock<HashMap<Uuid, Booking>>,
    histories: RwLock<HashMap<Uuid, PassengerHistory>>,
    trends: RwLock<HashMap<Uuid, BookingTrend>>,
    fail_history: AtomicBool,
    failing_updates: AtomicUsize,
    failing_deletes: AtomicUsize,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_booking(&self, booking: Booking) {
        self.bookings.write().await.insert(booking.id, booking);
    }

    pub async fn insert_history(&self, history: PassengerHistory) {
        self.histories.write().await.insert(history.passenger_id, history);
    }

    /// Pins the trend for a flight instead of deriving it from stored bookings
    pub async fn insert_trend(&self, trend: BookingTrend) {
        self.trends.write().await.insert(trend.flight_id, trend);
    }

    pub async fn len(&self) -> usize {
        self.bookings.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.bookings.read().await.is_empty()
    }

    pub fn set_history_failure(&self, fail: bool) {
        self.fail_history.store(fail, Ordering::SeqCst);
    }

    pub fn fail_next_updates(&self, count: usize) {
        self.failing_updates.store(count, Ordering::SeqCst);
    }

    pub fn fail_next_deletes(&self, count: usize) {
        self.failing_deletes.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn create_booking(&self, booking: &Booking) -> CoreResult<()> {
        self.bookings.write().await.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn get_booking(&self, id: Uuid) -> CoreResult<Booking> {
        self.bookings
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("booking {}", id)))
    }

    async fn update_booking(&self, booking: &Booking) -> CoreResult<()> {
        let should_fail = self
            .failing_updates
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(CoreError::StorageError("booking update rejected".to_string()));
        }

        let mut bookings = self.bookings.write().await;
        match bookings.get_mut(&booking.id) {
            Some(existing) => {
                *existing = booking.clone();
                Ok(())
            }
            None => Err(CoreError::NotFound(format!("booking {}", booking.id))),
        }
    }

    async fn delete_booking(&self, id: Uuid) -> CoreResult<()> {
        let should_fail = self
            .failing_deletes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(CoreError::StorageError("delete rejected".to_string()));
        }
        self.bookings.write().await.remove(&id);
        Ok(())
    }

    async fn list_by_passenger(&self, passenger_id: Uuid) -> CoreResult<Vec<Booking>> {
        let mut found: Vec<Booking> = self
            .bookings
            .read()
            .await
            .values()
            .filter(|b| b.passenger_id == passenger_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.booked_at.cmp(&b.booked_at).then(a.id.cmp(&b.id)));
        Ok(found)
    }

    async fn list_by_flight(&self, flight_id: Uuid) -> CoreResult<Vec<Booking>> {
        Ok(self
            .bookings
            .read()
            .await
            .values()
            .filter(|b| b.flight_id == flight_id)
            .cloned()
            .collect())
    }

    async fn passenger_history(&self, passenger_id: Uuid) -> CoreResult<PassengerHistory> {
        if self.fail_history.load(Ordering::SeqCst) {
            return Err(CoreError::StorageError("passenger history unavailable".to_string()));
        }
        Ok(self
            .histories
            .read()
            .await
            .get(&passenger_id)
            .cloned()
            .unwrap_or_else(|| PassengerHistory::first_time(passenger_id)))
    }

    async fn booking_trend(&self, flight_id: Uuid) -> CoreResult<BookingTrend> {
        if let Some(trend) = self.trends.read().await.get(&flight_id) {
            return Ok(trend.clone());
        }
        let bookings = self.list_by_flight(flight_id).await?;
        Ok(BookingTrend::from_bookings(flight_id, &bookings, Utc::now()))
    }
}

/// Records every message instead of delivering it
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(Uuid, String)>>,
    fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failure(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub async fn messages_for(&self, booking_id: Uuid) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|(id, _)| *id == booking_id)
            .map(|(_, msg)| msg.clone())
            .collect()
    }

    pub async fn count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

#[async_trait]
impl NotificationGateway for RecordingNotifier {
    async fn notify(&self, booking: &Booking, message: &str) -> CoreResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CoreError::Unavailable("notification channel down".to_string()));
        }
        self.sent.lock().await.push((booking.id, message.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, (Vec<u8>, Instant)>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a raw payload with no expiry concerns, e.g. a corrupt blob
    pub async fn insert_raw(&self, key: &str, value: Vec<u8>) {
        self.entries
            .write()
            .await
            .insert(key.to_string(), (value, Instant::now() + Duration::from_secs(3600)));
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.get(key).await.ok().flatten().is_some()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn set_read_failure(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_write_failure(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SearchCache for InMemoryCache {
    async fn get(&self, key: &str) -> CoreResult<Option<Vec<u8>>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(CoreError::CacheError("cache read timed out".to_string()));
        }
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|(_, expires_at)| *expires_at > Instant::now())
            .map(|(value, _)| value.clone()))
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CoreError::CacheError("cache write rejected".to_string()));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.entries
            .write()
            .await
            .insert(key.to_string(), (value.to_vec(), Instant::now() + ttl));
        Ok(())
    }
}
