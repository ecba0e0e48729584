use crate::errors::Result;
use crate::filter::ReadingFilter;
use crate::metrics::{QUERY_LATENCY_SECONDS, READINGS_WRITTEN_TOTAL};
use crate::model::{NewReading, Number, Reading, READING_COLUMNS};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

pub async fn make_pool(
    database_url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> Result<SqlitePool> {
    info!("Connecting to database...");
    // WAL plus a busy timeout lets pooled connections write concurrently
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(acquire_timeout);
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .connect_with(options)
        .await?;

    info!("Database connection established");
    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Migrations completed");

    Ok(pool)
}

/// Round-trip used by the health endpoint.
pub async fn ping(pool: &SqlitePool) -> Result<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Appends one reading. `now` fills in a missing `date_created`.
pub async fn insert_reading(
    pool: &SqlitePool,
    device_uuid: &str,
    new: &NewReading,
    now: i64,
) -> Result<Reading> {
    let date_created = new.date_created.unwrap_or(now);

    sqlx::query(
        "INSERT INTO readings (device_uuid, type, value, date_created) VALUES (?, ?, ?, ?)",
    )
    .bind(device_uuid)
    .bind(&new.sensor_type)
    .bind(new.value)
    .bind(date_created)
    .execute(pool)
    .await?;

    READINGS_WRITTEN_TOTAL.inc();
    debug!("Stored {} reading for device {}", new.sensor_type, device_uuid);

    Ok(Reading {
        device_uuid: device_uuid.to_string(),
        sensor_type: Some(new.sensor_type.clone()),
        value: Some(Number::Integer(new.value)),
        date_created: Some(date_created),
    })
}

/// Matching readings in the store's natural order.
pub async fn list_readings(pool: &SqlitePool, filter: &ReadingFilter) -> Result<Vec<Reading>> {
    let mut qb = filtered(&format!("SELECT {} FROM readings", READING_COLUMNS), filter);
    debug!("Running query: {}", qb.sql());

    let _timer = QUERY_LATENCY_SECONDS.start_timer();
    let readings = qb.build_query_as::<Reading>().fetch_all(pool).await?;
    Ok(readings)
}

/// Aggregates the store computes natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Max,
    Min,
    Avg,
}

impl Aggregate {
    fn sql_function(&self) -> &'static str {
        match self {
            Aggregate::Max => "MAX",
            Aggregate::Min => "MIN",
            Aggregate::Avg => "AVG",
        }
    }
}

/// `MAX`/`MIN`/`AVG` over the matching values; `None` when nothing matches.
///
/// Values are read as REAL so rows holding a non-integer `value` still
/// aggregate; NULL values are skipped by the store.
pub async fn scalar_aggregate(
    pool: &SqlitePool,
    filter: &ReadingFilter,
    aggregate: Aggregate,
) -> Result<Option<f64>> {
    let select = format!(
        "SELECT {}(CAST(value AS REAL)) FROM readings",
        aggregate.sql_function()
    );
    let mut qb = filtered(&select, filter);
    debug!("Running query: {}", qb.sql());

    let _timer = QUERY_LATENCY_SECONDS.start_timer();
    let value = qb
        .build_query_scalar::<Option<f64>>()
        .fetch_one(pool)
        .await?;
    Ok(value)
}

/// All non-NULL matching values, ascending.
pub async fn sorted_values(pool: &SqlitePool, filter: &ReadingFilter) -> Result<Vec<f64>> {
    let mut qb = filtered("SELECT CAST(value AS REAL) AS v FROM readings", filter);
    qb.push(" AND value IS NOT NULL ORDER BY v");
    debug!("Running query: {}", qb.sql());

    let _timer = QUERY_LATENCY_SECONDS.start_timer();
    let values = qb.build_query_scalar::<f64>().fetch_all(pool).await?;
    Ok(values)
}

fn filtered<'a>(select: &str, filter: &ReadingFilter) -> QueryBuilder<'a, Sqlite> {
    let mut qb = QueryBuilder::new(select);
    filter.push_predicates(&mut qb);
    qb
}
