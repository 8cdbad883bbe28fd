use std::sync::Arc;

use tracing::{error, info, warn, Instrument, Span};
use uuid::Uuid;
use aerobook_catalog::Flight;
use aerobook_core::repository::{BookingStore, FlightCatalog, NotificationGateway};
use aerobook_core::{CoreError, CoreResult};
use aerobook_shared::{Booking, CabinClass, NewBooking};

use crate::inventory::InventoryLock;
use crate::notify_passenger;
use crate::risk::RiskAssessor;
use crate::saga::RetryPolicy;

/// Booking lifecycle: create, change class, cancel, check in.
///
/// Bookings and seat pools live in different stores, so every mutation is a
/// short saga of idempotent, retried writes with an explicit undo step when a
/// later write fails. Each saga runs under the shared inventory lock, from the
/// first read to the last write; passengers are notified after it is released.
pub struct BookingManager {
    flights: Arc<dyn FlightCatalog>,
    bookings: Arc<dyn BookingStore>,
    notifier: Arc<dyn NotificationGateway>,
    risk: RiskAssessor,
    retry: RetryPolicy,
    inventory: InventoryLock,
    span: Span,
}

impl BookingManager {
    pub fn new(
        flights: Arc<dyn FlightCatalog>,
        bookings: Arc<dyn BookingStore>,
        notifier: Arc<dyn NotificationGateway>,
        risk: RiskAssessor,
        retry: RetryPolicy,
        inventory: InventoryLock,
        span: Span,
    ) -> Self {
        Self {
            flights,
            bookings,
            notifier,
            risk,
            retry,
            inventory,
            span,
        }
    }

    /// Admit a seat and record the booking as confirmed.
    pub async fn create(&self, request: NewBooking) -> CoreResult<Booking> {
        self.create_saga(request).instrument(self.span.clone()).await
    }

    async fn create_saga(&self, request: NewBooking) -> CoreResult<Booking> {
        validate_new_booking(&request)?;
        let mut booking = Booking::confirmed(request);

        {
            let _guard = self.inventory.acquire().await;

            let mut flight = self.flights.get_flight(booking.flight_id).await?;
            flight
                .pool_mut(booking.class)
                .admit()
                .map_err(|_| CoreError::NoSeatsAvailable { class: booking.class })?;

            self.persist_booking("reserve_booking", &booking, true).await?;

            if let Err(e) = self.persist_flight("admit_seat", &flight).await {
                self.rollback_reservation(booking.id).await;
                return Err(e);
            }

            if self.risk.rescore(&mut booking, flight.departure_time).await {
                self.persist_best_effort(&booking).await;
            }
        }

        info!(
            booking_id = %booking.id,
            flight_id = %booking.flight_id,
            class = %booking.class,
            "Booking confirmed"
        );
        notify_passenger(self.notifier.as_ref(), &booking, "Your booking has been confirmed.").await;
        Ok(booking)
    }

    pub async fn get(&self, id: Uuid) -> CoreResult<Booking> {
        self.bookings.get_booking(id).await
    }

    pub async fn list_by_passenger(&self, passenger_id: Uuid) -> CoreResult<Vec<Booking>> {
        self.bookings.list_by_passenger(passenger_id).await
    }

    /// Move a confirmed booking to another class, seat availability permitting.
    pub async fn change_class(&self, id: Uuid, class: CabinClass) -> CoreResult<Booking> {
        async move {
            let booking = {
                let _guard = self.inventory.acquire().await;

                let mut booking = self.bookings.get_booking(id).await?;
                ensure_confirmed(&booking, "change class of")?;

                let flight = if booking.class == class {
                    self.flights.get_flight(booking.flight_id).await?
                } else {
                    let original = self.flights.get_flight(booking.flight_id).await?;
                    let mut flight = original.clone();
                    flight
                        .pool_mut(class)
                        .admit()
                        .map_err(|_| CoreError::NoSeatsAvailable { class })?;
                    flight.pool_mut(booking.class).release();

                    self.persist_flight("move_seat", &flight).await?;

                    let from = booking.class;
                    booking.change_class(class);
                    if let Err(e) = self.persist_booking("change_class", &booking, false).await {
                        self.restore_flight(&original).await;
                        return Err(e);
                    }
                    info!(booking_id = %id, from = %from, to = %class, "Booking class changed");
                    flight
                };

                self.risk.rescore(&mut booking, flight.departure_time).await;
                self.persist_booking("rescore", &booking, false).await?;
                booking
            };

            notify_passenger(self.notifier.as_ref(), &booking, "Your booking has been updated.").await;
            Ok(booking)
        }
        .instrument(self.span.clone())
        .await
    }

    /// Release the seat and mark the booking cancelled.
    pub async fn cancel(&self, id: Uuid) -> CoreResult<Booking> {
        async move {
            let booking = {
                let _guard = self.inventory.acquire().await;

                let mut booking = self.bookings.get_booking(id).await?;
                ensure_confirmed(&booking, "cancel")?;

                let original = self.flights.get_flight(booking.flight_id).await?;
                let mut flight = original.clone();
                flight.pool_mut(booking.class).release();
                self.persist_flight("release_seat", &flight).await?;

                booking.cancel();
                if let Err(e) = self.persist_booking("cancel_booking", &booking, false).await {
                    self.restore_flight(&original).await;
                    return Err(e);
                }
                booking
            };

            info!(booking_id = %id, "Booking cancelled");
            notify_passenger(self.notifier.as_ref(), &booking, "Your booking has been cancelled.").await;
            Ok(booking)
        }
        .instrument(self.span.clone())
        .await
    }

    pub async fn check_in(&self, id: Uuid) -> CoreResult<Booking> {
        async move {
            let booking = {
                let _guard = self.inventory.acquire().await;

                let mut booking = self.bookings.get_booking(id).await?;
                ensure_confirmed(&booking, "check in")?;
                if booking.checked_in {
                    return Err(CoreError::InvalidState(format!("booking {} is already checked in", id)));
                }

                booking.check_in();
                self.persist_booking("check_in", &booking, false).await?;

                match self.flights.get_flight(booking.flight_id).await {
                    Ok(flight) => {
                        if self.risk.rescore(&mut booking, flight.departure_time).await {
                            self.persist_best_effort(&booking).await;
                        }
                    }
                    Err(e) => warn!(booking_id = %id, "Skipping risk reassessment, flight lookup failed: {}", e),
                }
                booking
            };

            info!(booking_id = %id, "Passenger checked in");
            notify_passenger(
                self.notifier.as_ref(),
                &booking,
                "You have successfully checked in. Here is your boarding pass.",
            )
            .await;
            Ok(booking)
        }
        .instrument(self.span.clone())
        .await
    }

    async fn persist_booking(&self, step: &str, booking: &Booking, insert: bool) -> CoreResult<()> {
        let bookings = &self.bookings;
        if insert {
            self.retry.run(step, move || bookings.create_booking(booking)).await
        } else {
            self.retry.run(step, move || bookings.update_booking(booking)).await
        }
    }

    async fn persist_flight(&self, step: &str, flight: &Flight) -> CoreResult<()> {
        let flights = &self.flights;
        self.retry.run(step, move || flights.update_flight(flight)).await
    }

    async fn persist_best_effort(&self, booking: &Booking) {
        if let Err(e) = self.persist_booking("store_risk_score", booking, false).await {
            warn!(booking_id = %booking.id, "Failed to store risk score: {}", e);
        }
    }

    /// Undo step for a reservation whose seat could not be recorded.
    async fn rollback_reservation(&self, booking_id: Uuid) {
        let bookings = &self.bookings;
        match self
            .retry
            .run("rollback_reservation", move || bookings.delete_booking(booking_id))
            .await
        {
            Ok(()) => warn!(booking_id = %booking_id, "Reservation rolled back"),
            Err(e) => error!(
                booking_id = %booking_id,
                "Rollback failed, booking is orphaned without a seat: {}",
                e
            ),
        }
    }

    async fn restore_flight(&self, original: &Flight) {
        if let Err(e) = self.persist_flight("restore_seat_pools", original).await {
            error!(flight_id = %original.id, "Failed to restore seat pools: {}", e);
        }
    }
}

fn validate_new_booking(request: &NewBooking) -> CoreResult<()> {
    if request.price.amount <= 0 {
        return Err(CoreError::ValidationError("price must be positive".to_string()));
    }
    if request.price.currency.trim().is_empty() {
        return Err(CoreError::ValidationError("price currency is required".to_string()));
    }
    Ok(())
}

fn ensure_confirmed(booking: &Booking, action: &str) -> CoreResult<()> {
    if booking.is_confirmed() {
        Ok(())
    } else {
        Err(CoreError::InvalidState(format!(
            "cannot {} booking {}: it is {}",
            action,
            booking.id,
            booking.status.as_str()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aerobook_catalog::SeatPool;
    use aerobook_shared::{BookingStatus, Money, PassengerHistory};
    use aerobook_store::memory::{InMemoryBookingStore, InMemoryFlightCatalog, RecordingNotifier};
    use chrono::{Duration, Utc};
    use std::time::Duration as StdDuration;

    struct Fixture {
        flights: Arc<InMemoryFlightCatalog>,
        bookings: Arc<InMemoryBookingStore>,
        notifier: Arc<RecordingNotifier>,
        manager: BookingManager,
        flight: Flight,
    }

    async fn fixture() -> Fixture {
        let flights = Arc::new(InMemoryFlightCatalog::new());
        let bookings = Arc::new(InMemoryBookingStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let flight = Flight {
            id: Uuid::new_v4(),
            flight_number: "AB900".to_string(),
            origin: "HKG".to_string(),
            destination: "LAX".to_string(),
            departure_time: Utc::now() + Duration::days(5),
            base_fare: Money::new(80000, "USD"),
            economy: SeatPool::new(2, 0.0),
            business: SeatPool::new(1, 0.0),
            first: SeatPool::new(1, 0.0),
        };
        flights.insert_flight(flight.clone()).await;

        let manager = BookingManager::new(
            flights.clone(),
            bookings.clone(),
            notifier.clone(),
            RiskAssessor::new(bookings.clone(), Span::none()),
            RetryPolicy::new(2, StdDuration::from_millis(1)),
            InventoryLock::new(),
            Span::none(),
        );
        Fixture { flights, bookings, notifier, manager, flight }
    }

    fn request(flight_id: Uuid, class: CabinClass) -> NewBooking {
        NewBooking {
            passenger_id: Uuid::new_v4(),
            flight_id,
            class,
            seat_number: Some("12A".to_string()),
            price: Money::new(80000, "USD"),
            is_cheapest_fare: true,
        }
    }

    async fn booked(fx: &Fixture, class: CabinClass) -> u32 {
        fx.flights.get_flight(fx.flight.id).await.unwrap().pool(class).booked
    }

    #[tokio::test]
    async fn test_create_admits_seat_and_scores() {
        let fx = fixture().await;

        let booking = fx.manager.create(request(fx.flight.id, CabinClass::Economy)).await.unwrap();

        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert!((booking.risk_score - 0.3).abs() < 1e-9);
        let stored = fx.manager.get(booking.id).await.unwrap();
        assert_eq!(stored.risk_score, booking.risk_score);
        assert_eq!(booked(&fx, CabinClass::Economy).await, 1);
        assert_eq!(
            fx.notifier.messages_for(booking.id).await,
            vec!["Your booking has been confirmed.".to_string()]
        );
    }

    #[tokio::test]
    async fn test_create_rejects_full_class() {
        let fx = fixture().await;
        fx.manager.create(request(fx.flight.id, CabinClass::First)).await.unwrap();

        let err = fx.manager.create(request(fx.flight.id, CabinClass::First)).await.unwrap_err();

        assert!(matches!(err, CoreError::NoSeatsAvailable { class: CabinClass::First }));
        assert_eq!(fx.bookings.len().await, 1);
        assert_eq!(booked(&fx, CabinClass::First).await, 1);
    }

    #[tokio::test]
    async fn test_create_honours_overbooking_allowance() {
        let fx = fixture().await;
        let mut flight = fx.flight.clone();
        flight.economy = SeatPool::new(10, 0.2);
        fx.flights.insert_flight(flight).await;

        for _ in 0..12 {
            fx.manager.create(request(fx.flight.id, CabinClass::Economy)).await.unwrap();
        }
        assert!(fx.manager.create(request(fx.flight.id, CabinClass::Economy)).await.is_err());
        assert_eq!(booked(&fx, CabinClass::Economy).await, 12);
    }

    #[tokio::test]
    async fn test_create_rejects_non_positive_price() {
        let fx = fixture().await;
        for amount in [0, -500] {
            let mut bad = request(fx.flight.id, CabinClass::Economy);
            bad.price = Money::new(amount, "USD");

            let err = fx.manager.create(bad).await.unwrap_err();
            assert!(matches!(err, CoreError::ValidationError(_)));
        }
        assert!(fx.bookings.is_empty().await);
        assert_eq!(booked(&fx, CabinClass::Economy).await, 0);
    }

    #[tokio::test]
    async fn test_unknown_flight() {
        let fx = fixture().await;
        let err = fx.manager.create(request(Uuid::new_v4(), CabinClass::Economy)).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
        assert!(fx.bookings.is_empty().await);
    }

    #[tokio::test]
    async fn test_seat_write_failure_rolls_back_booking() {
        let fx = fixture().await;
        fx.flights.fail_next_updates(2);

        let err = fx.manager.create(request(fx.flight.id, CabinClass::Economy)).await.unwrap_err();

        assert!(matches!(err, CoreError::StorageError(_)));
        assert!(fx.bookings.is_empty().await);
        assert_eq!(booked(&fx, CabinClass::Economy).await, 0);
        assert_eq!(fx.notifier.count().await, 0);
    }

    #[tokio::test]
    async fn test_transient_seat_write_failure_is_retried() {
        let fx = fixture().await;
        fx.flights.fail_next_updates(1);

        fx.manager.create(request(fx.flight.id, CabinClass::Economy)).await.unwrap();

        assert_eq!(fx.bookings.len().await, 1);
        assert_eq!(booked(&fx, CabinClass::Economy).await, 1);
    }

    #[tokio::test]
    async fn test_failed_rollback_leaves_orphan_and_reports_original_error() {
        let fx = fixture().await;
        fx.flights.fail_next_updates(2);
        fx.bookings.fail_next_deletes(2);

        let err = fx.manager.create(request(fx.flight.id, CabinClass::Economy)).await.unwrap_err();

        assert!(matches!(err, CoreError::StorageError(ref m) if m.contains("flight update")));
        assert_eq!(fx.bookings.len().await, 1);
    }

    #[tokio::test]
    async fn test_risk_failure_does_not_block_booking() {
        let fx = fixture().await;
        fx.bookings.set_history_failure(true);

        let booking = fx.manager.create(request(fx.flight.id, CabinClass::Economy)).await.unwrap();

        assert_eq!(booking.risk_score, 0.0);
        assert_eq!(fx.bookings.len().await, 1);
    }

    #[tokio::test]
    async fn test_notification_failure_is_ignored() {
        let fx = fixture().await;
        fx.notifier.set_failure(true);

        assert!(fx.manager.create(request(fx.flight.id, CabinClass::Business)).await.is_ok());
    }

    #[tokio::test]
    async fn test_change_class_moves_seat() {
        let fx = fixture().await;
        let booking = fx.manager.create(request(fx.flight.id, CabinClass::Economy)).await.unwrap();

        let changed = fx.manager.change_class(booking.id, CabinClass::Business).await.unwrap();

        assert_eq!(changed.class, CabinClass::Business);
        assert!(changed.upgraded_from.is_none());
        assert_eq!(booked(&fx, CabinClass::Economy).await, 0);
        assert_eq!(booked(&fx, CabinClass::Business).await, 1);
        assert_eq!(fx.manager.get(booking.id).await.unwrap().class, CabinClass::Business);
    }

    #[tokio::test]
    async fn test_change_class_into_full_pool_fails() {
        let fx = fixture().await;
        fx.manager.create(request(fx.flight.id, CabinClass::Business)).await.unwrap();
        let booking = fx.manager.create(request(fx.flight.id, CabinClass::Economy)).await.unwrap();

        let err = fx.manager.change_class(booking.id, CabinClass::Business).await.unwrap_err();

        assert!(matches!(err, CoreError::NoSeatsAvailable { class: CabinClass::Business }));
        assert_eq!(booked(&fx, CabinClass::Economy).await, 1);
        assert_eq!(fx.manager.get(booking.id).await.unwrap().class, CabinClass::Economy);
    }

    #[tokio::test]
    async fn test_change_class_restores_pools_when_booking_write_fails() {
        let fx = fixture().await;
        let booking = fx.manager.create(request(fx.flight.id, CabinClass::Economy)).await.unwrap();
        fx.bookings.fail_next_updates(2);

        assert!(fx.manager.change_class(booking.id, CabinClass::First).await.is_err());

        assert_eq!(booked(&fx, CabinClass::Economy).await, 1);
        assert_eq!(booked(&fx, CabinClass::First).await, 0);
    }

    #[tokio::test]
    async fn test_same_class_change_only_rescores() {
        let fx = fixture().await;
        let booking = fx.manager.create(request(fx.flight.id, CabinClass::Economy)).await.unwrap();
        fx.bookings
            .insert_history(PassengerHistory {
                passenger_id: booking.passenger_id,
                is_frequent_flyer: true,
                total_flights: 12,
            })
            .await;

        let same = fx.manager.change_class(booking.id, CabinClass::Economy).await.unwrap();

        assert!((same.risk_score - 0.1).abs() < 1e-9);
        assert_eq!(booked(&fx, CabinClass::Economy).await, 1);
    }

    #[tokio::test]
    async fn test_cancel_releases_seat_once() {
        let fx = fixture().await;
        let booking = fx.manager.create(request(fx.flight.id, CabinClass::Economy)).await.unwrap();

        let cancelled = fx.manager.cancel(booking.id).await.unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(booked(&fx, CabinClass::Economy).await, 0);

        let again = fx.manager.cancel(booking.id).await.unwrap_err();
        assert!(matches!(again, CoreError::InvalidState(_)));
        assert_eq!(booked(&fx, CabinClass::Economy).await, 0);

        assert!(matches!(
            fx.manager.change_class(booking.id, CabinClass::First).await,
            Err(CoreError::InvalidState(_))
        ));
        assert_eq!(
            fx.notifier.messages_for(booking.id).await.last().map(String::as_str),
            Some("Your booking has been cancelled.")
        );
    }

    #[tokio::test]
    async fn test_concurrent_cancels_release_one_seat() {
        let fx = fixture().await;
        let booking = fx.manager.create(request(fx.flight.id, CabinClass::Economy)).await.unwrap();
        let other = fx.manager.create(request(fx.flight.id, CabinClass::Economy)).await.unwrap();
        // A retried seat write makes the first cancel yield mid-saga
        fx.flights.fail_next_updates(1);

        let (first, second) = tokio::join!(fx.manager.cancel(booking.id), fx.manager.cancel(booking.id));

        assert!(first.is_ok());
        assert!(matches!(second, Err(CoreError::InvalidState(_))));
        assert_eq!(booked(&fx, CabinClass::Economy).await, 1);
        assert!(fx.manager.get(other.id).await.unwrap().is_confirmed());
        assert_eq!(fx.notifier.messages_for(booking.id).await.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_cancel_and_class_change_move_one_seat() {
        let fx = fixture().await;
        let booking = fx.manager.create(request(fx.flight.id, CabinClass::Economy)).await.unwrap();
        fx.flights.fail_next_updates(1);

        let (cancelled, changed) = tokio::join!(
            fx.manager.cancel(booking.id),
            fx.manager.change_class(booking.id, CabinClass::Business)
        );

        assert!(cancelled.is_ok());
        assert!(matches!(changed, Err(CoreError::InvalidState(_))));
        assert_eq!(booked(&fx, CabinClass::Economy).await, 0);
        assert_eq!(booked(&fx, CabinClass::Business).await, 0);
    }

    #[tokio::test]
    async fn test_check_in_protects_booking() {
        let fx = fixture().await;
        let booking = fx.manager.create(request(fx.flight.id, CabinClass::Economy)).await.unwrap();

        let checked = fx.manager.check_in(booking.id).await.unwrap();

        assert!(checked.checked_in);
        assert!(checked.check_in_time.is_some());
        assert_eq!(checked.risk_score, 0.0);
        assert!(fx.manager.get(booking.id).await.unwrap().checked_in);
        assert!(matches!(fx.manager.check_in(booking.id).await, Err(CoreError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_check_in_of_cancelled_booking_is_rejected() {
        let fx = fixture().await;
        let booking = fx.manager.create(request(fx.flight.id, CabinClass::Economy)).await.unwrap();
        fx.manager.cancel(booking.id).await.unwrap();

        assert!(matches!(fx.manager.check_in(booking.id).await, Err(CoreError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_list_by_passenger() {
        let fx = fixture().await;
        let first = fx.manager.create(request(fx.flight.id, CabinClass::Economy)).await.unwrap();
        let mut second_request = request(fx.flight.id, CabinClass::Business);
        second_request.passenger_id = first.passenger_id;
        let second = fx.manager.create(second_request).await.unwrap();
        fx.manager.create(request(fx.flight.id, CabinClass::Economy)).await.unwrap();

        let listed = fx.manager.list_by_passenger(first.passenger_id).await.unwrap();
        let ids: Vec<Uuid> = listed.iter().map(|b| b.id).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&first.id) && ids.contains(&second.id));
    }
}
