use handicap_engine::{
    config::EngineConfig,
    event::{EventBus, EventDispatcher},
    handicap::{
        CourseDirectory, HandicapService, HandicapStore, InMemoryCourseDirectory,
        InMemoryHandicapStore, InMemoryRoundSource, PostgresCourseDirectory,
        PostgresHandicapStore, PostgresRoundSource, RecalculationSubscriber, RoundSource,
    },
    sweep::start_sweep_task,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "handicap_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting handicap engine");

    let config = EngineConfig::from_env();

    let (round_source, store): (Arc<dyn RoundSource>, Arc<dyn HandicapStore>) =
        match config.database_url.as_deref() {
            Some(database_url) => {
                let pool = sqlx::PgPool::connect(database_url).await?;
                info!("Connected to database");
                let courses: Arc<dyn CourseDirectory> =
                    Arc::new(PostgresCourseDirectory::new(pool.clone()));
                (
                    Arc::new(PostgresRoundSource::new(pool.clone(), courses)),
                    Arc::new(PostgresHandicapStore::new(pool)),
                )
            }
            None => {
                info!("DATABASE_URL not set, using in-memory stores");
                let courses: Arc<dyn CourseDirectory> = Arc::new(InMemoryCourseDirectory::new());
                (
                    Arc::new(InMemoryRoundSource::new(courses)),
                    Arc::new(InMemoryHandicapStore::new()),
                )
            }
        };

    let service = Arc::new(
        HandicapService::builder(round_source, store)
            .with_recalc_concurrency(config.recalc_concurrency)
            .build(),
    );

    // Recalculate on round events
    let event_bus = EventBus::with_default_capacity();
    let mut dispatcher = EventDispatcher::new(event_bus.clone());
    dispatcher.add_handler(Arc::new(RecalculationSubscriber::new(
        service.clone(),
        event_bus.clone(),
    )));
    let _dispatcher_handle = dispatcher.start_listening();

    start_sweep_task(service, config.sweep).await;

    info!("Handicap engine stopped");
    Ok(())
}
