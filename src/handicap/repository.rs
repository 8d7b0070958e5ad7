use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::{
    CourseRating, HandicapError, HandicapHistoryEntry, HandicapRecord, HandicapScope, Round,
    RoundRecord, TeeRating,
};

/// Supplies the rounds a handicap is computed from
#[async_trait]
pub trait RoundSource: Send + Sync {
    /// Up to `limit` eligible rounds for the golfer in `scope`, most recent first.
    ///
    /// Rounds without a gross score or tee marker are never returned. Ratings are
    /// already resolved.
    async fn fetch_eligible_rounds(
        &self,
        golfer_id: &str,
        scope: &HandicapScope,
        limit: usize,
    ) -> Result<Vec<Round>, HandicapError>;

    /// Every (golfer, scope) pair that has at least one round
    async fn list_golfer_scopes(&self) -> Result<Vec<(String, HandicapScope)>, HandicapError>;
}

/// Looks up tee ratings. Unknown tees resolve to [`CourseRating::default`].
#[async_trait]
pub trait CourseDirectory: Send + Sync {
    async fn resolve_course_rating_slope(
        &self,
        course_id: &str,
        tee_marker: &str,
    ) -> Result<CourseRating, HandicapError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Written,
    /// A record with a later `last_calculated_at` is already stored
    Stale,
}

/// Sink for computed indices and their change history
#[async_trait]
pub trait HandicapStore: Send + Sync {
    async fn get_handicap(
        &self,
        golfer_id: &str,
        scope: &HandicapScope,
    ) -> Result<Option<HandicapRecord>, HandicapError>;

    /// Last writer wins by `last_calculated_at`
    async fn upsert_handicap(&self, record: &HandicapRecord)
        -> Result<UpsertOutcome, HandicapError>;

    async fn list_handicaps(&self, golfer_id: &str) -> Result<Vec<HandicapRecord>, HandicapError>;

    async fn record_history(&self, entry: &HandicapHistoryEntry) -> Result<(), HandicapError>;

    /// Most recent first
    async fn history(
        &self,
        golfer_id: &str,
        scope: &HandicapScope,
        limit: usize,
    ) -> Result<Vec<HandicapHistoryEntry>, HandicapError>;
}

#[derive(Debug, Default)]
pub struct InMemoryCourseDirectory {
    courses: RwLock<HashMap<String, Vec<TeeRating>>>,
}

impl InMemoryCourseDirectory {
    pub fn new() -> Self {
        Self {
            courses: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_courses(courses: HashMap<String, Vec<TeeRating>>) -> Self {
        Self {
            courses: RwLock::new(courses),
        }
    }

    pub async fn add_course(&self, course_id: &str, tees: Vec<TeeRating>) {
        self.courses
            .write()
            .await
            .insert(course_id.to_string(), tees);
    }
}

#[async_trait]
impl CourseDirectory for InMemoryCourseDirectory {
    async fn resolve_course_rating_slope(
        &self,
        course_id: &str,
        tee_marker: &str,
    ) -> Result<CourseRating, HandicapError> {
        let courses = self.courses.read().await;
        let tee = courses
            .get(course_id)
            .and_then(|tees| tees.iter().find(|tee| tee.matches(tee_marker)));

        match tee {
            Some(tee) => Ok(tee.course_rating()),
            None => {
                debug!(
                    course_id = %course_id,
                    tee_marker = %tee_marker,
                    "Tee not found, using standard rating"
                );
                Ok(CourseRating::default())
            }
        }
    }
}

/// Round source over an in-memory list of round records
pub struct InMemoryRoundSource {
    rounds: RwLock<Vec<RoundRecord>>,
    courses: Arc<dyn CourseDirectory>,
}

impl InMemoryRoundSource {
    pub fn new(courses: Arc<dyn CourseDirectory>) -> Self {
        Self::with_rounds(courses, Vec::new())
    }

    pub fn with_rounds(courses: Arc<dyn CourseDirectory>, rounds: Vec<RoundRecord>) -> Self {
        Self {
            rounds: RwLock::new(rounds),
            courses,
        }
    }

    pub async fn record_round(&self, round: RoundRecord) {
        debug!(round_id = %round.id, golfer_id = %round.golfer_id, "Recording round in memory");
        self.rounds.write().await.push(round);
    }

    /// Late correction of tee marker or gross score
    pub async fn correct_round(
        &self,
        round_id: &str,
        gross_score: Option<i32>,
        tee_marker: Option<String>,
    ) -> Result<(), HandicapError> {
        let mut rounds = self.rounds.write().await;
        let round = rounds
            .iter_mut()
            .find(|round| round.id == round_id)
            .ok_or_else(|| {
                warn!(round_id = %round_id, "Round not found for correction");
                HandicapError::Repository(format!("round {} not found", round_id))
            })?;

        if gross_score.is_some() {
            round.gross_score = gross_score;
        }
        if tee_marker.is_some() {
            round.tee_marker = tee_marker;
        }
        Ok(())
    }
}

#[async_trait]
impl RoundSource for InMemoryRoundSource {
    #[instrument(skip(self))]
    async fn fetch_eligible_rounds(
        &self,
        golfer_id: &str,
        scope: &HandicapScope,
        limit: usize,
    ) -> Result<Vec<Round>, HandicapError> {
        let mut candidates: Vec<RoundRecord> = {
            let rounds = self.rounds.read().await;
            rounds
                .iter()
                .filter(|round| round.golfer_id == golfer_id)
                .filter(|round| scope.includes(round.society_id.as_deref()))
                .filter(|round| round.is_complete())
                .cloned()
                .collect()
        };

        // stable, so same-timestamp rounds keep insertion order
        candidates.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        candidates.truncate(limit);

        let mut eligible = Vec::with_capacity(candidates.len());
        for record in &candidates {
            let Some(tee_marker) = record.tee_marker.as_deref() else {
                continue;
            };
            let course = self
                .courses
                .resolve_course_rating_slope(&record.course_id, tee_marker)
                .await?;
            if let Some(round) = record.resolve(course) {
                eligible.push(round);
            }
        }

        debug!(
            golfer_id = %golfer_id,
            scope = %scope,
            eligible = eligible.len(),
            "Fetched rounds from memory"
        );
        Ok(eligible)
    }

    async fn list_golfer_scopes(&self) -> Result<Vec<(String, HandicapScope)>, HandicapError> {
        let rounds = self.rounds.read().await;
        let mut keys = BTreeSet::new();
        for round in rounds.iter() {
            keys.insert((round.golfer_id.clone(), HandicapScope::Universal));
            if let Some(society_id) = &round.society_id {
                keys.insert((
                    round.golfer_id.clone(),
                    HandicapScope::Society(society_id.clone()),
                ));
            }
        }
        Ok(keys.into_iter().collect())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryHandicapStore {
    records: RwLock<HashMap<(String, HandicapScope), HandicapRecord>>,
    history: RwLock<Vec<HandicapHistoryEntry>>,
}

impl InMemoryHandicapStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            history: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl HandicapStore for InMemoryHandicapStore {
    async fn get_handicap(
        &self,
        golfer_id: &str,
        scope: &HandicapScope,
    ) -> Result<Option<HandicapRecord>, HandicapError> {
        let records = self.records.read().await;
        Ok(records
            .get(&(golfer_id.to_string(), scope.clone()))
            .cloned())
    }

    #[instrument(skip(self, record), fields(golfer_id = %record.golfer_id, scope = %record.scope))]
    async fn upsert_handicap(
        &self,
        record: &HandicapRecord,
    ) -> Result<UpsertOutcome, HandicapError> {
        let mut records = self.records.write().await;
        let key = (record.golfer_id.clone(), record.scope.clone());

        if let Some(existing) = records.get(&key) {
            if existing.last_calculated_at > record.last_calculated_at {
                warn!(
                    stored_at = %existing.last_calculated_at,
                    incoming_at = %record.last_calculated_at,
                    "Dropping stale handicap write"
                );
                return Ok(UpsertOutcome::Stale);
            }
        }

        records.insert(key, record.clone());
        debug!(index = record.index, "Handicap stored in memory");
        Ok(UpsertOutcome::Written)
    }

    async fn list_handicaps(&self, golfer_id: &str) -> Result<Vec<HandicapRecord>, HandicapError> {
        let records = self.records.read().await;
        let mut found: Vec<HandicapRecord> = records
            .values()
            .filter(|record| record.golfer_id == golfer_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.scope.cmp(&b.scope));
        Ok(found)
    }

    async fn record_history(&self, entry: &HandicapHistoryEntry) -> Result<(), HandicapError> {
        self.history.write().await.push(entry.clone());
        Ok(())
    }

    async fn history(
        &self,
        golfer_id: &str,
        scope: &HandicapScope,
        limit: usize,
    ) -> Result<Vec<HandicapHistoryEntry>, HandicapError> {
        let history = self.history.read().await;
        Ok(history
            .iter()
            .rev()
            .filter(|entry| entry.golfer_id == golfer_id && &entry.scope == scope)
            .take(limit)
            .cloned()
            .collect())
    }
}
