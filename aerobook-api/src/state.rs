use std::sync::Arc;

use tracing::{info_span, Span};
use aerobook_booking::{BookingManager, InventoryLock, RatioTuner, Reconciler, RetryPolicy, RiskAssessor};
use aerobook_core::repository::{BookingStore, FlightCatalog, NotificationGateway, SearchCache};
use aerobook_search::{IntakeGateway, PipelineConfig, PollPolicy, ResultStore, SearchPipeline, SearchWorker};

/// The external systems the service talks to
#[derive(Clone)]
pub struct Collaborators {
    pub flights: Arc<dyn FlightCatalog>,
    pub bookings: Arc<dyn BookingStore>,
    pub notifier: Arc<dyn NotificationGateway>,
    pub cache: Arc<dyn SearchCache>,
}

#[derive(Clone)]
pub struct AppState {
    pub search: IntakeGateway,
    pub results: Arc<ResultStore>,
    pub poll: PollPolicy,
    pub bookings: Arc<BookingManager>,
    pub tuner: Arc<RatioTuner>,
    pub reconciler: Arc<Reconciler>,
}

impl AppState {
    /// Wires every component under `root`. The search worker is handed back
    /// unstarted.
    pub fn assemble(
        collaborators: Collaborators,
        pipeline: &PipelineConfig,
        retry: RetryPolicy,
        root: &Span,
    ) -> (Self, SearchWorker) {
        let Collaborators { flights, bookings, notifier, cache } = collaborators;

        let search = SearchPipeline::build(flights.clone(), cache, pipeline, &info_span!(parent: root, "search"));

        // One lock for every component that writes seat pools or bookings back
        let inventory = InventoryLock::new();
        let overbooking = info_span!(parent: root, "overbooking");
        let risk = RiskAssessor::new(bookings.clone(), info_span!(parent: &overbooking, "risk"));
        let tuner = RatioTuner::new(
            flights.clone(),
            bookings.clone(),
            inventory.clone(),
            info_span!(parent: &overbooking, "ratio_tuner"),
        );
        let reconciler = Reconciler::new(
            flights.clone(),
            bookings.clone(),
            notifier.clone(),
            risk.clone(),
            retry,
            inventory.clone(),
            info_span!(parent: &overbooking, "reconciliation"),
        );
        let manager = BookingManager::new(
            flights,
            bookings,
            notifier,
            risk,
            retry,
            inventory,
            info_span!(parent: root, "booking"),
        );

        let state = Self {
            search: search.gateway,
            results: search.results,
            poll: pipeline.poll,
            bookings: Arc::new(manager),
            tuner: Arc::new(tuner),
            reconciler: Arc::new(reconciler),
        };
        (state, search.worker)
    }
}
