use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use super::{
    repository::{CourseDirectory, HandicapStore, RoundSource, UpsertOutcome},
    CalculationMethod, CourseRating, HandicapError, HandicapHistoryEntry, HandicapRecord,
    HandicapScope, Round, RoundRecord, TeeRating,
};

fn database_error(context: &'static str) -> impl Fn(sqlx::Error) -> HandicapError {
    move |e| {
        warn!(error = %e, "{}", context);
        HandicapError::Repository(e.to_string())
    }
}

/// Completed rounds from the `rounds` table, rated through a [`CourseDirectory`]
pub struct PostgresRoundSource {
    pool: PgPool,
    courses: Arc<dyn CourseDirectory>,
}

impl PostgresRoundSource {
    pub fn new(pool: PgPool, courses: Arc<dyn CourseDirectory>) -> Self {
        Self { pool, courses }
    }
}

fn round_record_from_row(row: &PgRow) -> Result<RoundRecord, HandicapError> {
    Ok(RoundRecord {
        id: row.try_get("id")?,
        golfer_id: row.try_get("golfer_id")?,
        society_id: row.try_get("society_id")?,
        course_id: row.try_get("course_id")?,
        gross_score: row.try_get("total_gross")?,
        tee_marker: row.try_get("tee_marker")?,
        completed_at: row.try_get("completed_at")?,
    })
}

#[async_trait]
impl RoundSource for PostgresRoundSource {
    #[instrument(skip(self))]
    async fn fetch_eligible_rounds(
        &self,
        golfer_id: &str,
        scope: &HandicapScope,
        limit: usize,
    ) -> Result<Vec<Round>, HandicapError> {
        let rows = sqlx::query(
            "SELECT id::text AS id, golfer_id, society_id, course_id::text AS course_id, total_gross, tee_marker, completed_at \
             FROM rounds \
             WHERE golfer_id = $1 AND status = 'completed' \
               AND total_gross IS NOT NULL AND tee_marker IS NOT NULL AND tee_marker <> '' \
               AND ($2::text IS NULL OR society_id = $2) \
             ORDER BY completed_at DESC \
             LIMIT $3",
        )
        .bind(golfer_id)
        .bind(scope.society_id())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(database_error("Failed to fetch rounds from database"))?;

        let mut eligible = Vec::with_capacity(rows.len());
        for row in &rows {
            let record = round_record_from_row(row)?;
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
            "Fetched rounds from database"
        );
        Ok(eligible)
    }

    #[instrument(skip(self))]
    async fn list_golfer_scopes(&self) -> Result<Vec<(String, HandicapScope)>, HandicapError> {
        let rows = sqlx::query(
            "SELECT DISTINCT golfer_id, society_id FROM rounds WHERE status = 'completed'",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(database_error("Failed to list golfers from database"))?;

        let mut keys = BTreeSet::new();
        for row in &rows {
            let golfer_id: String = row.try_get("golfer_id")?;
            let society_id: Option<String> = row.try_get("society_id")?;
            keys.insert((golfer_id.clone(), HandicapScope::Universal));
            if let Some(society_id) = society_id {
                keys.insert((golfer_id, HandicapScope::Society(society_id)));
            }
        }

        Ok(keys.into_iter().collect())
    }
}

/// Tee ratings from the `tees` JSON column of `courses`
pub struct PostgresCourseDirectory {
    pool: PgPool,
}

impl PostgresCourseDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CourseDirectory for PostgresCourseDirectory {
    #[instrument(skip(self))]
    async fn resolve_course_rating_slope(
        &self,
        course_id: &str,
        tee_marker: &str,
    ) -> Result<CourseRating, HandicapError> {
        let row = sqlx::query("SELECT tees FROM courses WHERE id::text = $1")
            .bind(course_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(database_error("Failed to fetch course tees from database"))?;

        let tees: Option<serde_json::Value> = match row {
            Some(row) => row.try_get("tees")?,
            None => None,
        };

        let tees: Vec<TeeRating> = match tees {
            Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
                warn!(course_id = %course_id, error = %e, "Course tees are malformed");
                Vec::new()
            }),
            None => Vec::new(),
        };

        match tees.iter().find(|tee| tee.matches(tee_marker)) {
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

/// Indices in `society_handicaps` (universal rows have a NULL society) and
/// changes in `handicap_history`
pub struct PostgresHandicapStore {
    pool: PgPool,
}

impl PostgresHandicapStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn handicap_record_from_row(row: &PgRow) -> Result<HandicapRecord, HandicapError> {
    let method: String = row.try_get("calculation_method")?;
    let calculation_method = method.parse::<CalculationMethod>().map_err(|_| {
        warn!(calculation_method = %method, "Unknown calculation method in database");
        HandicapError::Repository(format!("unknown calculation method {}", method))
    })?;
    let rounds_used: i32 = row.try_get("rounds_used")?;

    Ok(HandicapRecord {
        golfer_id: row.try_get("golfer_id")?,
        scope: HandicapScope::from_society_id(row.try_get("society_id")?),
        index: row.try_get("handicap_index")?,
        rounds_used: rounds_used.max(0) as u32,
        calculation_method,
        last_calculated_at: row.try_get("last_calculated_at")?,
    })
}

#[async_trait]
impl HandicapStore for PostgresHandicapStore {
    #[instrument(skip(self))]
    async fn get_handicap(
        &self,
        golfer_id: &str,
        scope: &HandicapScope,
    ) -> Result<Option<HandicapRecord>, HandicapError> {
        let row = sqlx::query(
            "SELECT golfer_id, society_id, handicap_index, rounds_used, calculation_method, last_calculated_at \
             FROM society_handicaps \
             WHERE golfer_id = $1 AND society_id IS NOT DISTINCT FROM $2",
        )
        .bind(golfer_id)
        .bind(scope.society_id())
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error("Failed to fetch handicap from database"))?;

        row.as_ref().map(handicap_record_from_row).transpose()
    }

    #[instrument(skip(self, record), fields(golfer_id = %record.golfer_id, scope = %record.scope))]
    async fn upsert_handicap(
        &self,
        record: &HandicapRecord,
    ) -> Result<UpsertOutcome, HandicapError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(database_error("Failed to start handicap transaction"))?;

        let existing = sqlx::query(
            "SELECT last_calculated_at FROM society_handicaps \
             WHERE golfer_id = $1 AND society_id IS NOT DISTINCT FROM $2 \
             FOR UPDATE",
        )
        .bind(&record.golfer_id)
        .bind(record.scope.society_id())
        .fetch_optional(&mut *tx)
        .await
        .map_err(database_error("Failed to lock handicap row"))?;

        match existing {
            Some(row) => {
                let stored_at: DateTime<Utc> = row.try_get("last_calculated_at")?;
                if stored_at > record.last_calculated_at {
                    warn!(
                        stored_at = %stored_at,
                        incoming_at = %record.last_calculated_at,
                        "Dropping stale handicap write"
                    );
                    return Ok(UpsertOutcome::Stale);
                }

                sqlx::query(
                    "UPDATE society_handicaps \
                     SET handicap_index = $3, rounds_used = $4, calculation_method = $5, last_calculated_at = $6, updated_at = NOW() \
                     WHERE golfer_id = $1 AND society_id IS NOT DISTINCT FROM $2",
                )
                .bind(&record.golfer_id)
                .bind(record.scope.society_id())
                .bind(record.index)
                .bind(record.rounds_used as i32)
                .bind(record.calculation_method.as_ref())
                .bind(record.last_calculated_at)
                .execute(&mut *tx)
                .await
                .map_err(database_error("Failed to update handicap in database"))?;
            }
            None => {
                sqlx::query(
                    "INSERT INTO society_handicaps (golfer_id, society_id, handicap_index, rounds_used, calculation_method, last_calculated_at) \
                     VALUES ($1, $2, $3, $4, $5, $6)",
                )
                .bind(&record.golfer_id)
                .bind(record.scope.society_id())
                .bind(record.index)
                .bind(record.rounds_used as i32)
                .bind(record.calculation_method.as_ref())
                .bind(record.last_calculated_at)
                .execute(&mut *tx)
                .await
                .map_err(database_error("Failed to insert handicap in database"))?;
            }
        }

        tx.commit()
            .await
            .map_err(database_error("Failed to commit handicap transaction"))?;

        debug!(index = record.index, "Handicap stored in database");
        Ok(UpsertOutcome::Written)
    }

    #[instrument(skip(self))]
    async fn list_handicaps(&self, golfer_id: &str) -> Result<Vec<HandicapRecord>, HandicapError> {
        let rows = sqlx::query(
            "SELECT golfer_id, society_id, handicap_index, rounds_used, calculation_method, last_calculated_at \
             FROM society_handicaps \
             WHERE golfer_id = $1 \
             ORDER BY society_id NULLS FIRST",
        )
        .bind(golfer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(database_error("Failed to list handicaps from database"))?;

        rows.iter().map(handicap_record_from_row).collect()
    }

    #[instrument(skip(self, entry), fields(golfer_id = %entry.golfer_id))]
    async fn record_history(&self, entry: &HandicapHistoryEntry) -> Result<(), HandicapError> {
        sqlx::query(
            "INSERT INTO handicap_history (id, golfer_id, society_id, old_handicap, new_handicap, change, rounds_used, calculated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(entry.id)
        .bind(&entry.golfer_id)
        .bind(entry.scope.society_id())
        .bind(entry.old_index)
        .bind(entry.new_index)
        .bind(entry.change)
        .bind(entry.rounds_used as i32)
        .bind(entry.calculated_at)
        .execute(&self.pool)
        .await
        .map_err(database_error("Failed to record handicap history"))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn history(
        &self,
        golfer_id: &str,
        scope: &HandicapScope,
        limit: usize,
    ) -> Result<Vec<HandicapHistoryEntry>, HandicapError> {
        let rows = sqlx::query(
            "SELECT id, golfer_id, society_id, old_handicap, new_handicap, change, rounds_used, calculated_at \
             FROM handicap_history \
             WHERE golfer_id = $1 AND society_id IS NOT DISTINCT FROM $2 \
             ORDER BY calculated_at DESC \
             LIMIT $3",
        )
        .bind(golfer_id)
        .bind(scope.society_id())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(database_error("Failed to fetch handicap history"))?;

        rows.iter()
            .map(|row| -> Result<HandicapHistoryEntry, HandicapError> {
                let rounds_used: i32 = row.try_get("rounds_used")?;
                Ok(HandicapHistoryEntry {
                    id: row.try_get("id")?,
                    golfer_id: row.try_get("golfer_id")?,
                    scope: HandicapScope::from_society_id(row.try_get("society_id")?),
                    old_index: row.try_get("old_handicap")?,
                    new_index: row.try_get("new_handicap")?,
                    change: row.try_get("change")?,
                    rounds_used: rounds_used.max(0) as u32,
                    calculated_at: row.try_get("calculated_at")?,
                })
            })
            .collect()
    }
}
