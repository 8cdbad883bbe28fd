use std::cmp::Ordering;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn, Instrument, Span};
use uuid::Uuid;
use aerobook_catalog::Flight;
use aerobook_core::repository::{BookingStore, FlightCatalog, NotificationGateway};
use aerobook_core::CoreResult;
use aerobook_shared::{Booking, CabinClass, Money};

use crate::inventory::InventoryLock;
use crate::notify_passenger;
use crate::risk::RiskAssessor;
use crate::saga::RetryPolicy;

const COMPENSATION_MULTIPLIER: i64 = 2;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Upgrade {
    pub booking_id: Uuid,
    pub from: CabinClass,
    pub to: CabinClass,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Compensation {
    pub booking_id: Uuid,
    pub amount: Money,
}

/// Outcome of one reconciliation run
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReconciliationReport {
    pub flight_id: Uuid,
    pub upgraded: Vec<Upgrade>,
    pub compensated: Vec<Compensation>,
    /// Candidates whose resolution could not be persisted
    pub unresolved: Vec<Uuid>,
}

impl ReconciliationReport {
    fn empty(flight_id: Uuid) -> Self {
        Self {
            flight_id,
            upgraded: Vec::new(),
            compensated: Vec::new(),
            unresolved: Vec::new(),
        }
    }

    pub fn resolved(&self) -> usize {
        self.upgraded.len() + self.compensated.len()
    }
}

/// Confirmed bookings beyond each class's physical seat count.
///
/// Bookings are ranked by `(booked_at, id)` within their class; everything
/// after the first `total` of them is a candidate. A booking that already
/// holds a compensation offer still takes its place in the ranking but is
/// not offered again.
pub fn overbooking_candidates(flight: &Flight, bookings: &[Booking]) -> Vec<Booking> {
    let mut confirmed: Vec<&Booking> = bookings
        .iter()
        .filter(|b| b.flight_id == flight.id && b.is_confirmed())
        .collect();
    confirmed.sort_by(|a, b| a.booked_at.cmp(&b.booked_at).then(a.id.cmp(&b.id)));

    let mut candidates = Vec::new();
    for class in CabinClass::ALL {
        let seats = flight.pool(class).total as usize;
        candidates.extend(
            confirmed
                .iter()
                .filter(|b| b.class == class)
                .skip(seats)
                .filter(|b| b.compensation.is_none())
                .map(|b| (*b).clone()),
        );
    }
    candidates
}

/// Highest risk first. Stable, so ties keep booking order.
fn rank_by_risk(candidates: &mut [Booking]) {
    candidates.sort_by(|a, b| b.risk_score.partial_cmp(&a.risk_score).unwrap_or(Ordering::Equal));
}

/// Resolves capacity overruns by upgrading or compensating the bookings most
/// suited to being moved.
pub struct Reconciler {
    flights: Arc<dyn FlightCatalog>,
    bookings: Arc<dyn BookingStore>,
    notifier: Arc<dyn NotificationGateway>,
    risk: RiskAssessor,
    retry: RetryPolicy,
    inventory: InventoryLock,
    span: Span,
}

impl Reconciler {
    pub fn new(
        flights: Arc<dyn FlightCatalog>,
        bookings: Arc<dyn BookingStore>,
        notifier: Arc<dyn NotificationGateway>,
        risk: RiskAssessor,
        retry: RetryPolicy,
        inventory: InventoryLock,
        span: Span,
    ) -> Self {
        Self { flights, bookings, notifier, risk, retry, inventory, span }
    }

    pub async fn reconcile(&self, flight_id: Uuid) -> CoreResult<ReconciliationReport> {
        self.run(flight_id).instrument(self.span.clone()).await
    }

    async fn run(&self, flight_id: Uuid) -> CoreResult<ReconciliationReport> {
        let _guard = self.inventory.acquire().await;

        let mut flight = self.flights.get_flight(flight_id).await?;
        let bookings = self.bookings.list_by_flight(flight_id).await?;

        let mut candidates = overbooking_candidates(&flight, &bookings);
        let mut report = ReconciliationReport::empty(flight_id);
        if candidates.is_empty() {
            info!(flight_id = %flight_id, "No capacity overrun");
            return Ok(report);
        }

        for candidate in candidates.iter_mut() {
            self.risk.rescore(candidate, flight.departure_time).await;
        }
        rank_by_risk(&mut candidates);

        let mut pools_changed = false;
        for candidate in candidates {
            let candidate = match self.try_upgrade(&mut flight, candidate).await {
                Ok(upgrade) => {
                    pools_changed = true;
                    report.upgraded.push(upgrade);
                    continue;
                }
                Err(candidate) => candidate,
            };
            self.compensate(candidate, &mut report).await;
        }

        if pools_changed {
            let flights = &self.flights;
            let snapshot = &flight;
            self.retry
                .run("persist_seat_pools", move || flights.update_flight(snapshot))
                .await
                .inspect_err(|e| error!(flight_id = %flight_id, "Failed to persist seat pools after upgrades: {}", e))?;
        }

        info!(
            flight_id = %flight_id,
            upgraded = report.upgraded.len(),
            compensated = report.compensated.len(),
            unresolved = report.unresolved.len(),
            "Reconciliation finished"
        );
        Ok(report)
    }

    /// Moves an economy candidate into a physically free business seat.
    /// Hands the booking back untouched when that is not possible.
    async fn try_upgrade(&self, flight: &mut Flight, mut candidate: Booking) -> Result<Upgrade, Booking> {
        if candidate.class != CabinClass::Economy || flight.business.physical_free() == 0 {
            return Err(candidate);
        }

        let original = candidate.clone();
        let pools = (flight.economy, flight.business);
        if flight.business.admit().is_err() {
            return Err(candidate);
        }
        flight.economy.release();
        candidate.upgrade_to(CabinClass::Business);

        let bookings = &self.bookings;
        let upgraded = &candidate;
        if let Err(e) = self
            .retry
            .run("persist_upgrade", move || bookings.update_booking(upgraded))
            .await
        {
            warn!(booking_id = %candidate.id, "Upgrade could not be persisted, compensating instead: {}", e);
            (flight.economy, flight.business) = pools;
            return Err(original);
        }

        notify_passenger(
            self.notifier.as_ref(),
            &candidate,
            "You have been upgraded to business class due to overbooking.",
        )
        .await;

        Ok(Upgrade {
            booking_id: candidate.id,
            from: CabinClass::Economy,
            to: CabinClass::Business,
        })
    }

    async fn compensate(&self, mut candidate: Booking, report: &mut ReconciliationReport) {
        let Some(amount) = candidate.price.checked_times(COMPENSATION_MULTIPLIER) else {
            error!(booking_id = %candidate.id, price = %candidate.price, "Compensation amount overflows");
            report.unresolved.push(candidate.id);
            return;
        };
        candidate.compensate(amount.clone());

        let bookings = &self.bookings;
        let compensated = &candidate;
        match self
            .retry
            .run("persist_compensation", move || bookings.update_booking(compensated))
            .await
        {
            Ok(()) => {
                notify_passenger(
                    self.notifier.as_ref(),
                    &candidate,
                    &format!("Due to overbooking, we are offering you compensation of {}", amount),
                )
                .await;
                report.compensated.push(Compensation {
                    booking_id: candidate.id,
                    amount,
                });
            }
            Err(e) => {
                error!(booking_id = %candidate.id, "Failed to record compensation: {}", e);
                report.unresolved.push(candidate.id);
            }
        }
    }
}
