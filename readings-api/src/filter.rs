//! Translates request parameters into the predicate set applied to the
//! `readings` table.
//!
//! Every caller-supplied value is bound as a query parameter; the SQL text
//! produced here only ever contains column names and placeholders.

use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite};
use tracing::warn;

use crate::errors::{Error, Result};
use crate::model::SensorType;

/// Raw filter parameters as they arrive on the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterParams {
    #[serde(rename = "type")]
    pub sensor_type: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

/// Whether the calling endpoint insists on a `type` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeRequirement {
    Required,
    Optional,
}

/// Inclusive `date_created` bounds, in epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
}

/// Conjunction of predicates for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadingFilter {
    pub device_uuid: String,
    /// Caller's original casing; it is validated case-insensitively but
    /// compared as given.
    pub sensor_type: Option<String>,
    pub range: Option<TimeRange>,
}

impl ReadingFilter {
    pub fn build(
        device_uuid: impl Into<String>,
        params: &FilterParams,
        requirement: TypeRequirement,
    ) -> Result<Self> {
        let sensor_type = match params.sensor_type.as_deref() {
            None if requirement == TypeRequirement::Required => {
                return Err(Error::MissingParameter("type"));
            }
            None => None,
            Some(raw) => {
                if SensorType::parse(raw).is_none() {
                    warn!("Rejecting unknown sensor type {:?}", raw);
                    return Err(Error::InvalidParameter {
                        name: "type",
                        value: raw.to_string(),
                    });
                }
                Some(raw.to_string())
            }
        };

        Ok(Self {
            device_uuid: device_uuid.into(),
            sensor_type,
            range: time_range(params)?,
        })
    }

    /// Appends ` WHERE ...` for this filter to `qb`.
    pub fn push_predicates(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        qb.push(" WHERE device_uuid = ")
            .push_bind(self.device_uuid.clone());

        if let Some(sensor_type) = &self.sensor_type {
            qb.push(" AND type = ").push_bind(sensor_type.clone());
        }

        if let Some(range) = self.range {
            qb.push(" AND date_created BETWEEN ")
                .push_bind(range.start)
                .push(" AND ")
                .push_bind(range.end);
        }
    }
}

/// A range applies only when both bounds are present; a lone bound is
/// ignored rather than rejected.
fn time_range(params: &FilterParams) -> Result<Option<TimeRange>> {
    let start = non_empty(params.start.as_deref());
    let end = non_empty(params.end.as_deref());

    match (start, end) {
        (Some(start), Some(end)) => Ok(Some(TimeRange {
            start: parse_epoch("start", start)?,
            end: parse_epoch("end", end)?,
        })),
        _ => Ok(None),
    }
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_epoch(name: &'static str, raw: &str) -> Result<i64> {
    raw.parse::<i64>().map_err(|_| Error::InvalidParameter {
        name,
        value: raw.to_string(),
    })
}
