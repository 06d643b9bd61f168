//! PostgreSQL repository for car number listings
//!
//! One round trip per upsert. Every row read back goes through
//! `CarNumber::from_parts`, so the store can never hand out an invalid
//! listing.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::debug;

use crate::domain::{
    CarNumber, CarNumberRepository, PersistenceError, RecentListingsQuery, UpsertOutcome,
};
use crate::infrastructure::config::defaults;

const UPSERT_SQL: &str = r"
    INSERT INTO car_numbers (number, price, posted_at)
    VALUES ($1, $2, $3)
    ON CONFLICT (number)
    DO UPDATE SET
        price = EXCLUDED.price,
        posted_at = EXCLUDED.posted_at,
        updated_at = CURRENT_TIMESTAMP
    RETURNING number, price, posted_at, (xmax = 0) AS inserted
";

const FIND_BY_NUMBER_SQL: &str =
    "SELECT number, price, posted_at FROM car_numbers WHERE number = $1";

const FIND_RECENT_SQL: &str = r"
    SELECT number, price, posted_at
    FROM car_numbers
    WHERE posted_at >= CURRENT_DATE - $1::int
      AND price > $2 AND price < $3
    ORDER BY posted_at DESC, number ASC
    LIMIT $4
";

#[derive(Clone)]
pub struct PostgresCarNumberRepository {
    pool: PgPool,
}

impl PostgresCarNumberRepository {
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Day count bound to `CURRENT_DATE - $1`, kept inside the date range
    fn days_back_param(days_back: u32) -> i32 {
        let clamped = days_back.min(defaults::RECENT_MAX_DAYS_BACK);
        i32::try_from(clamped).unwrap_or(i32::MAX)
    }

    fn car_number_from_row(row: &PgRow) -> Result<CarNumber, PersistenceError> {
        let number: Option<String> = row.try_get("number")?;
        let price: Option<f32> = row.try_get("price")?;
        let posted_at: Option<NaiveDate> = row.try_get("posted_at")?;

        CarNumber::from_parts(number.clone(), price, posted_at).map_err(|source| {
            PersistenceError::InvalidRow {
                number: number.unwrap_or_default(),
                source,
            }
        })
    }
}

#[async_trait]
impl CarNumberRepository for PostgresCarNumberRepository {
    async fn upsert(&self, car_number: &CarNumber) -> Result<UpsertOutcome, PersistenceError> {
        let row = sqlx::query(UPSERT_SQL)
            .bind(car_number.number())
            .bind(car_number.price())
            .bind(car_number.posted_at())
            .fetch_one(&self.pool)
            .await?;

        let record = Self::car_number_from_row(&row)?;
        let inserted: bool = row.try_get("inserted")?;

        debug!(
            "{} {}",
            if inserted { "Inserted" } else { "Updated" },
            record
        );
        Ok(UpsertOutcome { record, inserted })
    }

    async fn find_by_number(&self, number: &str) -> Result<Option<CarNumber>, PersistenceError> {
        let row = sqlx::query(FIND_BY_NUMBER_SQL)
            .bind(number)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::car_number_from_row).transpose()
    }

    async fn find_recent(
        &self,
        query: &RecentListingsQuery,
    ) -> Result<Vec<CarNumber>, PersistenceError> {
        let rows = sqlx::query(FIND_RECENT_SQL)
            .bind(Self::days_back_param(query.days_back))
            .bind(query.min_price)
            .bind(query.max_price)
            .bind(query.limit.map(i64::from))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::car_number_from_row).collect()
    }

    async fn count(&self) -> Result<i64, PersistenceError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM car_numbers")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
