use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, RwLock};
use tracing::{error, info, instrument, warn};

use super::{
    calculate_handicap_index,
    repository::{HandicapStore, RoundSource, UpsertOutcome},
    HandicapCalculation, HandicapError, HandicapHistoryEntry, HandicapRecord, HandicapScope,
    HandicapStatus, RecalculationOutcome, MAX_INDEX, MIN_INDEX,
};

type KeyLocks = Arc<RwLock<HashMap<(String, HandicapScope), Arc<AsyncMutex<()>>>>>;

/// Result of one key in a bulk recalculation
#[derive(Debug)]
pub struct RecalculationSummary {
    pub golfer_id: String,
    pub scope: HandicapScope,
    pub result: Result<RecalculationOutcome, HandicapError>,
}

pub struct HandicapService {
    round_source: Arc<dyn RoundSource>,
    store: Arc<dyn HandicapStore>,
    recalc_concurrency: usize,
    key_locks: KeyLocks,
}

impl HandicapService {
    pub fn builder(
        round_source: Arc<dyn RoundSource>,
        store: Arc<dyn HandicapStore>,
    ) -> HandicapServiceBuilder {
        HandicapServiceBuilder::new(round_source, store)
    }

    /// Computes the index from the current round set without storing it
    pub async fn calculate(
        &self,
        golfer_id: &str,
        scope: &HandicapScope,
    ) -> Result<HandicapCalculation, HandicapError> {
        calculate_handicap_index(golfer_id, scope, self.round_source.as_ref()).await
    }

    /// Recomputes the index for `(golfer_id, scope)` from scratch and stores it.
    ///
    /// With no eligible rounds the stored index is left as it is.
    #[instrument(skip(self))]
    pub async fn recalculate(
        &self,
        golfer_id: &str,
        scope: &HandicapScope,
    ) -> Result<RecalculationOutcome, HandicapError> {
        let key_lock = self.key_lock(golfer_id, scope).await;
        let result = {
            let _guard = key_lock.lock().await;
            self.recalculate_locked(golfer_id, scope).await
        };
        self.release_key_lock(golfer_id, scope, key_lock).await;
        result
    }

    async fn recalculate_locked(
        &self,
        golfer_id: &str,
        scope: &HandicapScope,
    ) -> Result<RecalculationOutcome, HandicapError> {
        let calculation = match self.calculate(golfer_id, scope).await {
            Ok(calculation) => calculation,
            Err(err) if err.keeps_existing_index() => {
                let existing = self.store.get_handicap(golfer_id, scope).await?;
                info!(
                    golfer_id = %golfer_id,
                    scope = %scope,
                    kept_existing = existing.is_some(),
                    "No eligible rounds, handicap left unchanged"
                );
                return Ok(RecalculationOutcome::NotYetEstablished { existing });
            }
            Err(err) => return Err(err),
        };

        let record =
            HandicapRecord::from_calculation(golfer_id, scope, &calculation, chrono::Utc::now());
        self.store_record(record).await
    }

    /// Stores a hand-set index, bypassing the calculation
    #[instrument(skip(self))]
    pub async fn set_manual_index(
        &self,
        golfer_id: &str,
        scope: &HandicapScope,
        index: f64,
    ) -> Result<RecalculationOutcome, HandicapError> {
        if !index.is_finite() || !(MIN_INDEX..=MAX_INDEX).contains(&index) {
            return Err(HandicapError::InvalidHandicap(format!(
                "manual index {} is outside {}..={}",
                index, MIN_INDEX, MAX_INDEX
            )));
        }

        let key_lock = self.key_lock(golfer_id, scope).await;
        let result = {
            let _guard = key_lock.lock().await;
            self.store_record(HandicapRecord::manual(golfer_id, scope, index))
                .await
        };
        self.release_key_lock(golfer_id, scope, key_lock).await;
        result
    }

    pub async fn status(
        &self,
        golfer_id: &str,
        scope: &HandicapScope,
    ) -> Result<HandicapStatus, HandicapError> {
        Ok(match self.store.get_handicap(golfer_id, scope).await? {
            Some(record) => HandicapStatus::Established(record),
            None => HandicapStatus::NotYetEstablished,
        })
    }

    pub async fn handicaps_for(
        &self,
        golfer_id: &str,
    ) -> Result<Vec<HandicapRecord>, HandicapError> {
        self.store.list_handicaps(golfer_id).await
    }

    pub async fn history(
        &self,
        golfer_id: &str,
        scope: &HandicapScope,
        limit: usize,
    ) -> Result<Vec<HandicapHistoryEntry>, HandicapError> {
        self.store.history(golfer_id, scope, limit).await
    }

    /// Recalculates every (golfer, scope) the round source knows about
    #[instrument(skip(self))]
    pub async fn recalculate_all(&self) -> Result<Vec<RecalculationSummary>, HandicapError> {
        let keys = self.round_source.list_golfer_scopes().await?;
        info!(
            keys = keys.len(),
            concurrency = self.recalc_concurrency,
            "Recalculating all handicaps"
        );

        let mut summaries: Vec<RecalculationSummary> = stream::iter(keys)
            .map(|(golfer_id, scope)| async move {
                let result = self.recalculate(&golfer_id, &scope).await;
                if let Err(err) = &result {
                    error!(
                        golfer_id = %golfer_id,
                        scope = %scope,
                        error = %err,
                        "Handicap recalculation failed"
                    );
                }
                RecalculationSummary {
                    golfer_id,
                    scope,
                    result,
                }
            })
            .buffer_unordered(self.recalc_concurrency)
            .collect()
            .await;

        summaries.sort_by(|a, b| (&a.golfer_id, &a.scope).cmp(&(&b.golfer_id, &b.scope)));
        Ok(summaries)
    }

    async fn store_record(
        &self,
        record: HandicapRecord,
    ) -> Result<RecalculationOutcome, HandicapError> {
        let previous = self
            .store
            .get_handicap(&record.golfer_id, &record.scope)
            .await?;

        match self.store.upsert_handicap(&record).await? {
            UpsertOutcome::Stale => {
                warn!(
                    golfer_id = %record.golfer_id,
                    scope = %record.scope,
                    "Newer handicap already stored"
                );
                Ok(RecalculationOutcome::Stale { record })
            }
            UpsertOutcome::Written => {
                let changed = previous
                    .as_ref()
                    .map_or(true, |p| p.index != record.index);
                if changed {
                    let entry = HandicapHistoryEntry::new(previous.as_ref(), &record);
                    self.store.record_history(&entry).await?;
                }

                info!(
                    golfer_id = %record.golfer_id,
                    scope = %record.scope,
                    old_index = ?previous.as_ref().map(|p| p.index),
                    new_index = record.index,
                    rounds_used = record.rounds_used,
                    method = %record.calculation_method,
                    "Handicap stored"
                );
                Ok(RecalculationOutcome::Updated { previous, record })
            }
        }
    }

    async fn key_lock(&self, golfer_id: &str, scope: &HandicapScope) -> Arc<AsyncMutex<()>> {
        let key = (golfer_id.to_string(), scope.clone());
        {
            let guard = self.key_locks.read().await;
            if let Some(lock) = guard.get(&key) {
                return lock.clone();
            }
        }

        let mut guard = self.key_locks.write().await;
        guard
            .entry(key)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Drops the map entry once no other caller holds or waits on the lock
    async fn release_key_lock(
        &self,
        golfer_id: &str,
        scope: &HandicapScope,
        key_lock: Arc<AsyncMutex<()>>,
    ) {
        let key = (golfer_id.to_string(), scope.clone());
        let mut guard = self.key_locks.write().await;
        drop(key_lock);
        if guard
            .get(&key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            guard.remove(&key);
        }
    }
}

pub struct HandicapServiceBuilder {
    round_source: Arc<dyn RoundSource>,
    store: Arc<dyn HandicapStore>,
    recalc_concurrency: usize,
}

impl HandicapServiceBuilder {
    fn new(round_source: Arc<dyn RoundSource>, store: Arc<dyn HandicapStore>) -> Self {
        Self {
            round_source,
            store,
            recalc_concurrency: 4,
        }
    }

    pub fn with_recalc_concurrency(mut self, concurrency: usize) -> Self {
        self.recalc_concurrency = concurrency.max(1);
        self
    }

    pub fn build(self) -> HandicapService {
        HandicapService {
            round_source: self.round_source,
            store: self.store,
            recalc_concurrency: self.recalc_concurrency,
            key_locks: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}
