//! Converts raw yr.no JSON into an internal per-row timeseries.
//!
//! Represented as `Vec<Row>` rather than column vectors (array-of-structs
//! instead of struct-of-arrays): every field lives on its row, so there's no
//! way for one column to end up a different length than the rest of the
//! table.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::classifier::strip_day_night;

#[derive(Debug, Clone, PartialEq)]
pub struct NowcastRow {
    pub time: DateTime<Utc>,
    pub prec_now: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRow {
    pub time: DateTime<Utc>,
    pub prec_fore: Option<f64>,
    pub prob_of_prec: Option<f64>,
    pub symbol: Option<String>,
    pub wind_speed: Option<f64>,
    pub wind_gust: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawResponse {
    properties: RawProperties,
}

#[derive(Debug, Deserialize)]
struct RawProperties {
    timeseries: Vec<RawEntry>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    time: String,
    data: RawData,
}

#[derive(Debug, Deserialize)]
struct RawData {
    instant: RawInstant,
    next_1_hours: Option<RawPeriod>,
    next_6_hours: Option<RawPeriod>,
}

#[derive(Debug, Deserialize)]
struct RawInstant {
    details: RawInstantDetails,
}

#[derive(Debug, Deserialize, Default)]
struct RawInstantDetails {
    precipitation_rate: Option<f64>,
    wind_speed: Option<f64>,
    wind_speed_of_gust: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawPeriod {
    summary: Option<RawSummary>,
    details: Option<RawPeriodDetails>,
}

#[derive(Debug, Deserialize)]
struct RawSummary {
    symbol_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPeriodDetails {
    precipitation_amount: Option<f64>,
    probability_of_precipitation: Option<f64>,
}

/// Defense-in-depth shape check: the body must parse as JSON (already true
/// by the time this is called) and contain a non-empty `properties.timeseries`.
/// Used both by the Upstream Client on a fresh fetch and by the Cache Store
/// when re-validating a stale entry before serving it.
pub fn is_valid_response(json: &serde_json::Value) -> bool {
    json.get("properties")
        .and_then(|p| p.get("timeseries"))
        .and_then(|t| t.as_array())
        .is_some_and(|arr| !arr.is_empty())
}

fn parse_entry_time(entry: &RawEntry) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(&entry.time) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(e) => {
            tracing::error!(
                "dropping timeseries entry with unparseable time '{}': {}",
                entry.time,
                e
            );
            None
        }
    }
}

/// Parse a nowcast JSON blob into one row per timeseries entry.
pub fn parse_nowcast(raw_json: &serde_json::Value) -> Vec<NowcastRow> {
    let parsed: RawResponse = match serde_json::from_value(raw_json.clone()) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("failed to parse nowcast response structure: {}", e);
            return Vec::new();
        }
    };

    parsed
        .properties
        .timeseries
        .iter()
        .filter_map(|entry| {
            let time = parse_entry_time(entry)?;
            let prec_now = entry.data.instant.details.precipitation_rate;
            if prec_now.is_none() {
                tracing::warn!("nowcast entry at {} missing precipitation_rate", entry.time);
            }
            Some(NowcastRow { time, prec_now })
        })
        .collect()
}

/// Parse a locationforecast JSON blob into hourly rows, expanding any
/// `next_6_hours`-only entries into six hourly rows each.
pub fn parse_forecast(raw_json: &serde_json::Value) -> Vec<ForecastRow> {
    let parsed: RawResponse = match serde_json::from_value(raw_json.clone()) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("failed to parse forecast response structure: {}", e);
            return Vec::new();
        }
    };

    let mut rows = Vec::new();
    for entry in &parsed.properties.timeseries {
        let Some(time) = parse_entry_time(entry) else {
            continue;
        };

        if let Some(period) = &entry.data.next_1_hours {
            rows.push(build_hourly_row(time, &entry.data, period));
        } else if let Some(period) = &entry.data.next_6_hours {
            let amount = period
                .details
                .as_ref()
                .and_then(|d| d.precipitation_amount);
            let prob = period
                .details
                .as_ref()
                .and_then(|d| d.probability_of_precipitation);
            let symbol = period
                .summary
                .as_ref()
                .and_then(|s| s.symbol_code.as_deref())
                .map(|s| strip_day_night(s).to_string());
            let wind_speed = entry.data.instant.details.wind_speed;
            let wind_gust = entry.data.instant.details.wind_speed_of_gust;

            for i in 0..6 {
                rows.push(ForecastRow {
                    time: time + chrono::Duration::hours(i),
                    prec_fore: amount.map(|a| a / 6.0),
                    prob_of_prec: prob,
                    symbol: symbol.clone(),
                    wind_speed,
                    wind_gust,
                });
            }
        }
        // Else: neither period block present — skip.
    }
    rows
}

fn build_hourly_row(time: DateTime<Utc>, data: &RawData, period: &RawPeriod) -> ForecastRow {
    let prec_fore = period.details.as_ref().and_then(|d| d.precipitation_amount);
    let prob_of_prec = period
        .details
        .as_ref()
        .and_then(|d| d.probability_of_precipitation);
    let symbol = period
        .summary
        .as_ref()
        .and_then(|s| s.symbol_code.as_deref())
        .map(|s| strip_day_night(s).to_string());

    ForecastRow {
        time,
        prec_fore,
        prob_of_prec,
        symbol,
        wind_speed: data.instant.details.wind_speed,
        wind_gust: data.instant.details.wind_speed_of_gust,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_valid_response_true() {
        let json = json!({"properties": {"timeseries": [{"time": "2026-01-01T00:00:00Z"}]}});
        assert!(is_valid_response(&json));
    }

    #[test]
    fn test_is_valid_response_empty_list() {
        let json = json!({"properties": {"timeseries": []}});
        assert!(!is_valid_response(&json));
    }

    #[test]
    fn test_is_valid_response_missing_key() {
        assert!(!is_valid_response(&json!({"properties": {}})));
        assert!(!is_valid_response(&json!({})));
    }

    #[test]
    fn test_parse_nowcast_basic() {
        let raw = json!({
            "properties": {
                "timeseries": [
                    {
                        "time": "2026-03-01T07:00:00Z",
                        "data": {"instant": {"details": {"precipitation_rate": 1.2}}}
                    },
                    {
                        "time": "2026-03-01T07:05:00Z",
                        "data": {"instant": {"details": {}}}
                    }
                ]
            }
        });
        let rows = parse_nowcast(&raw);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].prec_now, Some(1.2));
        assert_eq!(rows[1].prec_now, None);
    }

    #[test]
    fn test_parse_forecast_hourly_entry() {
        let raw = json!({
            "properties": {
                "timeseries": [{
                    "time": "2026-03-01T07:00:00Z",
                    "data": {
                        "instant": {"details": {"wind_speed": 3.2, "wind_speed_of_gust": 5.1}},
                        "next_1_hours": {
                            "summary": {"symbol_code": "lightrain_day"},
                            "details": {"precipitation_amount": 0.4, "probability_of_precipitation": 60.0}
                        }
                    }
                }]
            }
        });
        let rows = parse_forecast(&raw);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].symbol.as_deref(), Some("lightrain"));
        assert_eq!(rows[0].prec_fore, Some(0.4));
        assert_eq!(rows[0].prob_of_prec, Some(60.0));
        assert_eq!(rows[0].wind_gust, Some(5.1));
    }

    #[test]
    fn test_parse_forecast_six_hour_entry_expands_to_six_rows() {
        let raw = json!({
            "properties": {
                "timeseries": [{
                    "time": "2026-03-05T12:00:00Z",
                    "data": {
                        "instant": {"details": {}},
                        "next_6_hours": {
                            "summary": {"symbol_code": "partlycloudy_day"},
                            "details": {"precipitation_amount": 6.0}
                        }
                    }
                }]
            }
        });
        let rows = parse_forecast(&raw);
        assert_eq!(rows.len(), 6);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.prec_fore, Some(1.0), "row {i} should divide amount by 6");
            assert_eq!(row.symbol.as_deref(), Some("partlycloudy"));
        }
        assert_eq!(
            rows[5].time,
            "2026-03-05T17:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
    }

    #[test]
    fn test_parse_forecast_entry_with_neither_period_is_skipped() {
        let raw = json!({
            "properties": {
                "timeseries": [{
                    "time": "2026-03-05T12:00:00Z",
                    "data": {"instant": {"details": {}}}
                }]
            }
        });
        assert!(parse_forecast(&raw).is_empty());
    }

    #[test]
    fn test_parse_forecast_unparseable_time_is_dropped() {
        let raw = json!({
            "properties": {
                "timeseries": [{
                    "time": "not-a-time",
                    "data": {
                        "instant": {"details": {}},
                        "next_1_hours": {"summary": {"symbol_code": "fog"}, "details": {}}
                    }
                }]
            }
        });
        assert!(parse_forecast(&raw).is_empty());
    }
}
