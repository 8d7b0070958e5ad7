use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use handicap_engine::{
    event::{EventBus, EventDispatcher, HandicapEvent},
    handicap::{
        CourseDirectory, HandicapService, InMemoryCourseDirectory, InMemoryHandicapStore,
        InMemoryRoundSource, RecalculationSubscriber, RoundRecord, TeeRating,
    },
};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub event_bus: EventBus,
    pub rounds: Arc<InMemoryRoundSource>,
    pub store: Arc<InMemoryHandicapStore>,
    pub service: Arc<HandicapService>,
    pub events: broadcast::Receiver<HandicapEvent>,
    pub _dispatcher_handle: JoinHandle<()>,
}

impl TestSetup {
    /// Emits `RoundCompleted` for a round that is already stored
    pub fn complete_round(&self, round: &RoundRecord) {
        self.event_bus.emit(HandicapEvent::RoundCompleted {
            golfer_id: round.golfer_id.clone(),
            round_id: round.id.clone(),
            society_id: round.society_id.clone(),
        });
    }

    /// Waits for the next `HandicapUpdated`/`HandicapNotEstablished`, skipping round events
    pub async fn next_outcome(&mut self) -> HandicapEvent {
        loop {
            let event = tokio::time::timeout(Duration::from_secs(2), self.events.recv())
                .await
                .expect("timed out waiting for a handicap event")
                .expect("event bus closed");
            match event {
                HandicapEvent::RoundCompleted { .. } | HandicapEvent::RoundCorrected { .. } => {
                    continue
                }
                other => return other,
            }
        }
    }
}

pub struct TestSetupBuilder {
    courses: HashMap<String, Vec<TeeRating>>,
    rounds: Vec<RoundRecord>,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            courses: HashMap::new(),
            rounds: vec![],
        }
    }

    pub fn with_course(mut self, course_id: &str, tee: &str, rating: f64, slope: i32) -> Self {
        self.courses
            .entry(course_id.to_string())
            .or_default()
            .push(TeeRating {
                name: Some(tee.to_string()),
                rating: Some(rating),
                slope: Some(slope),
                par: Some(72),
            });
        self
    }

    /// The standard course: white tees rated 72.0 / 113
    pub fn with_standard_course(self) -> Self {
        self.with_course("royal", "white", 72.0, 113)
    }

    pub fn with_rounds(mut self, rounds: Vec<RoundRecord>) -> Self {
        self.rounds.extend(rounds);
        self
    }

    pub async fn build(self) -> TestSetup {
        let event_bus = EventBus::with_default_capacity();
        let courses: Arc<dyn CourseDirectory> =
            Arc::new(InMemoryCourseDirectory::with_courses(self.courses));
        let rounds = Arc::new(InMemoryRoundSource::with_rounds(courses, self.rounds));
        let store = Arc::new(InMemoryHandicapStore::new());
        let service = Arc::new(HandicapService::builder(rounds.clone(), store.clone()).build());

        let mut dispatcher = EventDispatcher::new(event_bus.clone());
        dispatcher.add_handler(Arc::new(RecalculationSubscriber::new(
            service.clone(),
            event_bus.clone(),
        )));

        // subscribe before anything is emitted
        let events = event_bus.subscribe();
        let _dispatcher_handle = dispatcher.start_listening();

        TestSetup {
            event_bus,
            rounds,
            store,
            service,
            events,
            _dispatcher_handle,
        }
    }
}
