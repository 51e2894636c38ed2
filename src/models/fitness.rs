// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fitness aggregate request/response shapes and the snapshot derived from them.

use crate::time_utils::QueryWindow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Step count data type name.
pub const STEP_COUNT_DELTA: &str = "com.google.step_count.delta";
/// Calories burned data type name.
pub const CALORIES_EXPENDED: &str = "com.google.calories.expended";
/// One bucket per day.
pub const DAY_BUCKET_MILLIS: i64 = 86_400_000;

/// Body of a `dataset:aggregate` query.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateRequest {
    pub aggregate_by: Vec<AggregateBy>,
    pub bucket_by_time: BucketByTime,
    pub start_time_millis: i64,
    pub end_time_millis: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateBy {
    pub data_type_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketByTime {
    pub duration_millis: i64,
}

impl AggregateRequest {
    pub fn new(data_type_name: &str, window: QueryWindow) -> Self {
        Self {
            aggregate_by: vec![AggregateBy {
                data_type_name: data_type_name.to_string(),
            }],
            bucket_by_time: BucketByTime {
                duration_millis: DAY_BUCKET_MILLIS,
            },
            start_time_millis: window.start_millis,
            end_time_millis: window.end_millis,
        }
    }
}

// ─── Aggregate Response ──────────────────────────────────────────
//
// bucket[] -> dataset[] -> point[] -> value[] -> { intVal | fpVal }
//
// Every level may be missing or null; missing levels contribute nothing.

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AggregateResponse {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub bucket: Vec<AggregateBucket>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AggregateBucket {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub dataset: Vec<Dataset>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Dataset {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub point: Vec<DataPoint>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataPoint {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub value: Vec<PointValue>,
}

/// Kept as raw JSON so that non-numeric values can be ignored instead of
/// failing the whole response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PointValue {
    #[serde(rename = "intVal", default)]
    pub int_val: Option<serde_json::Value>,
    #[serde(rename = "fpVal", default)]
    pub fp_val: Option<serde_json::Value>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl AggregateResponse {
    fn values(&self) -> impl Iterator<Item = &PointValue> {
        self.bucket
            .iter()
            .flat_map(|b| &b.dataset)
            .flat_map(|d| &d.point)
            .flat_map(|p| &p.value)
    }

    /// Sum of all integer values. Non-integers contribute zero.
    pub fn total_int(&self) -> i64 {
        self.values()
            .filter_map(|v| v.int_val.as_ref().and_then(|n| n.as_i64()))
            .fold(0i64, |acc, n| acc.saturating_add(n))
    }

    /// Sum of all floating-point values. Non-numbers contribute zero.
    pub fn total_fp(&self) -> f64 {
        self.values()
            .filter_map(|v| v.fp_val.as_ref().and_then(|n| n.as_f64()))
            .filter(|n| n.is_finite())
            .sum()
    }
}

// ─── Derived Values ──────────────────────────────────────────────

/// Raw sums for one query window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitnessTotals {
    pub steps: u64,
    pub calories: f64,
}

impl FitnessTotals {
    pub fn from_responses(steps: &AggregateResponse, calories: &AggregateResponse) -> Self {
        Self {
            steps: steps.total_int().max(0) as u64,
            calories: calories.total_fp().max(0.0),
        }
    }

    /// Zero steps and zero calories means the tracker has not synced yet,
    /// not that the user did nothing.
    pub fn is_empty(&self) -> bool {
        self.steps == 0 && self.calories == 0.0
    }
}

/// What the dashboard shows. Replaced wholesale on every successful poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FitnessSnapshot {
    pub steps: u64,
    /// Whole kilocalories, rounded up.
    pub calories: u64,
    pub captured_at: DateTime<Utc>,
}

impl FitnessSnapshot {
    pub fn from_totals(totals: FitnessTotals, captured_at: DateTime<Utc>) -> Self {
        Self {
            steps: totals.steps,
            calories: totals.calories.ceil() as u64,
            captured_at,
        }
    }
}

/// Body of `POST /save-fitness-data`.
#[derive(Debug, Clone, Serialize)]
pub struct FitnessRecord {
    pub email: String,
    pub steps: u64,
    pub calories: f64,
    pub name: String,
}
