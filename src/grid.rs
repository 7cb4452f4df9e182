//! Slot Grid Builder: resamples nowcast/forecast rows into a fixed-width,
//! time-indexed grid anchored on a wall-clock slot boundary.

use chrono::{DateTime, Duration, Timelike, Utc};

use crate::timeseries::{ForecastRow, NowcastRow};

/// One LED's worth of data after nowcast/forecast combination.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotRow {
    pub time: DateTime<Utc>,
    pub prec_now: Option<f64>,
    pub prec_fore: Option<f64>,
    pub prob_of_prec: Option<f64>,
    pub symbol: Option<String>,
    pub wind_gust: Option<f64>,
}

/// Compute `(T0, T_end)`: floor `now` to the top of the hour, then step by
/// `slot_minutes` until the window `[T0, T0 + slot_minutes)` contains `now`.
pub fn slot_boundary(
    now: DateTime<Utc>,
    slot_minutes: u32,
    slot_count: u32,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let mut t0 = now
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now);

    let step = Duration::minutes(slot_minutes as i64);
    while t0 + step <= now {
        t0 += step;
    }

    let t_end = t0 + Duration::minutes(slot_minutes as i64 * slot_count as i64);
    (t0, t_end)
}

fn bucket_index(time: DateTime<Utc>, t0: DateTime<Utc>, slot_minutes: u32) -> Option<usize> {
    if time < t0 {
        return None;
    }
    let delta_minutes = (time - t0).num_minutes();
    let idx = delta_minutes / slot_minutes as i64;
    Some(idx as usize)
}

/// Resample nowcast rows into `slot_count` buckets, aggregating `max` within
/// each bucket. Empty buckets stay `None` — nowcast is never forward-filled,
/// unlike the forecast series below.
fn resample_nowcast(
    rows: &[NowcastRow],
    t0: DateTime<Utc>,
    slot_minutes: u32,
    slot_count: u32,
) -> Vec<Option<f64>> {
    let mut buckets: Vec<Option<f64>> = vec![None; slot_count as usize];
    for row in rows {
        let Some(idx) = bucket_index(row.time, t0, slot_minutes) else {
            continue;
        };
        if idx >= slot_count as usize {
            continue;
        }
        if let Some(v) = row.prec_now {
            buckets[idx] = Some(buckets[idx].map_or(v, |cur| cur.max(v)));
        }
    }
    buckets
}

struct ForecastBuckets {
    prec_fore: Vec<Option<f64>>,
    prob_of_prec: Vec<Option<f64>>,
    symbol: Vec<Option<String>>,
    wind_gust: Vec<Option<f64>>,
}

/// Resample forecast rows into `slot_count` buckets: numeric columns by
/// `max`, `symbol` by `first`, then forward-fill every column across gaps.
fn resample_forecast(
    rows: &[ForecastRow],
    t0: DateTime<Utc>,
    slot_minutes: u32,
    slot_count: u32,
) -> ForecastBuckets {
    let n = slot_count as usize;
    let mut prec_fore: Vec<Option<f64>> = vec![None; n];
    let mut prob_of_prec: Vec<Option<f64>> = vec![None; n];
    let mut symbol: Vec<Option<String>> = vec![None; n];
    let mut wind_gust: Vec<Option<f64>> = vec![None; n];

    for row in rows {
        let Some(idx) = bucket_index(row.time, t0, slot_minutes) else {
            continue;
        };
        if idx >= n {
            continue;
        }
        if let Some(v) = row.prec_fore {
            prec_fore[idx] = Some(prec_fore[idx].map_or(v, |cur| cur.max(v)));
        }
        if let Some(v) = row.prob_of_prec {
            prob_of_prec[idx] = Some(prob_of_prec[idx].map_or(v, |cur| cur.max(v)));
        }
        if symbol[idx].is_none() {
            symbol[idx] = row.symbol.clone();
        }
        if let Some(v) = row.wind_gust {
            wind_gust[idx] = Some(wind_gust[idx].map_or(v, |cur| cur.max(v)));
        }
    }

    forward_fill(&mut prec_fore);
    forward_fill(&mut prob_of_prec);
    forward_fill(&mut symbol);
    forward_fill(&mut wind_gust);

    ForecastBuckets {
        prec_fore,
        prob_of_prec,
        symbol,
        wind_gust,
    }
}

fn forward_fill<T: Clone>(values: &mut [Option<T>]) {
    let mut last: Option<T> = None;
    for v in values.iter_mut() {
        if v.is_some() {
            last = v.clone();
        } else {
            *v = last.clone();
        }
    }
}

/// Build the combined grid. `nowcast`/`forecast` are `None` when the source
/// parsed empty or wasn't fetched at all — both synthesize all-null rows for
/// that branch.
pub fn combine(
    nowcast: Option<&[NowcastRow]>,
    forecast: Option<&[ForecastRow]>,
    slot_minutes: u32,
    slot_count: u32,
    now: DateTime<Utc>,
) -> Vec<SlotRow> {
    let (t0, _t_end) = slot_boundary(now, slot_minutes, slot_count);

    let prec_now = match nowcast {
        Some(rows) if !rows.is_empty() => resample_nowcast(rows, t0, slot_minutes, slot_count),
        _ => vec![None; slot_count as usize],
    };

    let forecast_buckets = match forecast {
        Some(rows) if !rows.is_empty() => resample_forecast(rows, t0, slot_minutes, slot_count),
        _ => ForecastBuckets {
            prec_fore: vec![None; slot_count as usize],
            prob_of_prec: vec![None; slot_count as usize],
            symbol: vec![None; slot_count as usize],
            wind_gust: vec![None; slot_count as usize],
        },
    };

    let mut grid: Vec<SlotRow> = (0..slot_count as usize)
        .map(|i| SlotRow {
            time: t0 + Duration::minutes(slot_minutes as i64 * i as i64),
            prec_now: prec_now[i],
            prec_fore: forecast_buckets.prec_fore[i],
            prob_of_prec: forecast_buckets.prob_of_prec[i],
            symbol: forecast_buckets.symbol[i].clone(),
            wind_gust: forecast_buckets.wind_gust[i],
        })
        .collect();

    // Last-resort safety net: the construction above always yields exactly
    // slot_count rows, but truncate defensively should that ever change.
    if grid.len() != slot_count as usize {
        tracing::warn!(
            "grid length {} != slot_count {}, truncating",
            grid.len(),
            slot_count
        );
        grid.truncate(slot_count as usize);
    }

    grid
}
