pub mod allocation;
pub mod calculator;
pub mod differential;
pub mod postgres;
pub mod repository;
pub mod selector;
pub mod service;
pub mod subscriber;

mod errors;
pub mod models;

pub use allocation::{
    allocate_scorecard, course_handicap, playing_handicap, strokes_for_hole, PlayFormat,
};
pub use calculator::{calculate_from_rounds, calculate_handicap_index};
pub use differential::compute_differential;
pub use errors::HandicapError;
pub use models::*;
pub use postgres::{PostgresCourseDirectory, PostgresHandicapStore, PostgresRoundSource};
pub use repository::{
    CourseDirectory, HandicapStore, InMemoryCourseDirectory, InMemoryHandicapStore,
    InMemoryRoundSource, RoundSource, UpsertOutcome,
};
pub use selector::{select_rounds, RoundSelection};
pub use service::{HandicapService, RecalculationSummary};
pub use subscriber::RecalculationSubscriber;

/// Slope of a course of standard difficulty
pub const STANDARD_SLOPE: i32 = 113;
/// Rating used when a tee cannot be resolved
pub const DEFAULT_COURSE_RATING: f64 = 72.0;
pub const DEFAULT_PAR: i32 = 72;

/// Most recent rounds considered for one index
pub const MAX_ROUNDS: usize = 20;
pub const INDEX_MULTIPLIER: f64 = 0.96;
pub const MIN_INDEX: f64 = -10.0;
pub const MAX_INDEX: f64 = 54.0;

pub const HOLES: u8 = 18;
