use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

/// A numeric reading or statistic. Integers stay integers on the wire
/// (`50`, not `50.0`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Number {
    Integer(i64),
    Float(f64),
}

impl Number {
    /// Whole values that fit in an `i64` come back as `Integer`.
    pub fn from_real(v: f64) -> Self {
        if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
            Number::Integer(v as i64)
        } else {
            Number::Float(v)
        }
    }
}

/// One stored sensor reading. Rows are append-only and never mutated.
///
/// Rows written by older clients may carry a NULL or REAL `value`, or a
/// NULL `type`/`date_created`; those decode as-is instead of failing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    pub device_uuid: String,
    #[serde(rename = "type")]
    pub sensor_type: Option<String>,
    pub value: Option<Number>,
    pub date_created: Option<i64>,
}

/// Columns [`Reading`] decodes from; see `db::list_readings`.
pub(crate) const READING_COLUMNS: &str = "device_uuid, type, \
     CASE WHEN typeof(value) = 'integer' THEN value END AS value_integer, \
     CAST(value AS REAL) AS value_real, \
     CAST(date_created AS INTEGER) AS created";

impl<'r> FromRow<'r, SqliteRow> for Reading {
    fn from_row(row: &'r SqliteRow) -> sqlx::Result<Self> {
        let integer: Option<i64> = row.try_get("value_integer")?;
        let real: Option<f64> = row.try_get("value_real")?;

        Ok(Self {
            device_uuid: row.try_get("device_uuid")?,
            sensor_type: row.try_get("type")?,
            value: integer.map(Number::Integer).or(real.map(Number::Float)),
            date_created: row.try_get("created")?,
        })
    }
}

/// POST body for a new reading.
///
/// `type` is stored as given: the write path accepts sensor types the
/// read-path filters do not know about yet.
#[derive(Debug, Clone, Deserialize)]
pub struct NewReading {
    #[serde(rename = "type")]
    pub sensor_type: String,
    pub value: i64,
    #[serde(default)]
    pub date_created: Option<i64>,
}

/// Sensor types accepted by the read-path filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorType {
    Temperature,
    Humidity,
}

impl SensorType {
    const ALL: [SensorType; 2] = [SensorType::Temperature, SensorType::Humidity];

    pub fn as_str(&self) -> &'static str {
        match self {
            SensorType::Temperature => "temperature",
            SensorType::Humidity => "humidity",
        }
    }

    /// Case-insensitive lookup.
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(raw))
    }
}
