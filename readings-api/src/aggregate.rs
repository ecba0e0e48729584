//! Reduces a filtered set of readings to a single statistic.
//!
//! Max, min and mean are pushed down to the store. Median and mode fetch the
//! matching values in ascending order and reduce them here.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use sqlx::SqlitePool;

use crate::db::{self, Aggregate};
use crate::errors::Result;
use crate::filter::ReadingFilter;
use crate::model::Number;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statistic {
    Max,
    Min,
    Mean,
    Median,
    Mode,
}

impl Statistic {
    pub fn name(&self) -> &'static str {
        match self {
            Statistic::Max => "max",
            Statistic::Min => "min",
            Statistic::Mean => "mean",
            Statistic::Median => "median",
            Statistic::Mode => "mode",
        }
    }

    /// The store-native aggregate behind this statistic, if there is one.
    pub fn pushdown(&self) -> Option<Aggregate> {
        match self {
            Statistic::Max => Some(Aggregate::Max),
            Statistic::Min => Some(Aggregate::Min),
            Statistic::Mean => Some(Aggregate::Avg),
            Statistic::Median | Statistic::Mode => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    /// `{"value": <n>}`, or `{"value": null}` when the store had nothing.
    Value(Option<Number>),
    /// `{}`; the median of an empty set.
    Empty,
}

impl IntoResponse for Outcome {
    fn into_response(self) -> Response {
        let body = match self {
            Outcome::Value(value) => json!({ "value": value }),
            Outcome::Empty => json!({}),
        };
        (StatusCode::OK, Json(body)).into_response()
    }
}

pub async fn compute(
    pool: &SqlitePool,
    filter: &ReadingFilter,
    statistic: Statistic,
) -> Result<Outcome> {
    if let Some(aggregate) = statistic.pushdown() {
        let value = db::scalar_aggregate(pool, filter, aggregate).await?;
        let value = match aggregate {
            Aggregate::Avg => value.map(Number::Float),
            Aggregate::Max | Aggregate::Min => value.map(Number::from_real),
        };
        return Ok(Outcome::Value(value));
    }

    let values = db::sorted_values(pool, filter).await?;
    let outcome = match statistic {
        Statistic::Median => median(&values).map_or(Outcome::Empty, |m| Outcome::Value(Some(m))),
        _ => Outcome::Value(mode(&values).map(Number::from_real)),
    };
    Ok(outcome)
}

/// Median of ascending `sorted`. Even lengths average the two central
/// elements and always yield a float.
pub fn median(sorted: &[f64]) -> Option<Number> {
    let len = sorted.len();
    if len == 0 {
        return None;
    }
    let mid = len / 2;
    if len % 2 == 1 {
        Some(Number::from_real(sorted[mid]))
    } else {
        Some(Number::Float((sorted[mid - 1] + sorted[mid]) / 2.0))
    }
}

/// Most frequent value of ascending `sorted`; ties go to the smallest value.
pub fn mode(sorted: &[f64]) -> Option<f64> {
    let mut best: Option<(f64, usize)> = None;
    let mut idx = 0;

    while idx < sorted.len() {
        let value = sorted[idx];
        let run = sorted[idx..].iter().take_while(|v| **v == value).count();
        // strict > keeps the earlier (smaller) value on a tie
        if best.map_or(true, |(_, count)| run > count) {
            best = Some((value, run));
        }
        idx += run;
    }

    best.map(|(value, _)| value)
}
