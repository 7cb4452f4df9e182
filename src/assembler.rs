//! Segment Assembler: turns a Segment Spec plus its fetch results into the
//! final ordered list of LED slots, grounded on `app_v2.py`'s
//! `_get_segment_data` / `_build_error_pattern` / `_create_colormap_preview`.

use chrono::{DateTime, Utc};

use crate::classifier::classify_row;
use crate::colormap::{Bucket, Colormap, Rgb};
use crate::grid::{combine, SlotRow};
use crate::segment_spec::SegmentSpec;
use crate::services::coordinator::{FetchResult, Source};

/// Slots older than this are downgraded to `stale`.
pub const STALE_WARNING_THRESHOLD_S: u64 = 1800;
/// Slots older than this (or with no forecast data at all) are `error`.
pub const ERROR_THRESHOLD_S: u64 = 10_800;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataStatus {
    Fresh,
    Stale,
    Error,
}

/// One LED's final, display-ready state.
#[derive(Debug, Clone, PartialEq)]
pub struct LedSlot {
    pub time: Option<DateTime<Utc>>,
    pub yr_symbol: Option<String>,
    pub wl_symbol: String,
    pub prec_now: Option<f64>,
    pub prec_fore: Option<f64>,
    pub precipitation: Option<f64>,
    pub prob_of_prec: Option<f64>,
    pub wind_gust: Option<f64>,
    pub rgb: Rgb,
    pub hex: String,
}

impl LedSlot {
    fn from_rgb(rgb: Rgb, wl_symbol: impl Into<String>) -> Self {
        Self {
            time: None,
            yr_symbol: None,
            wl_symbol: wl_symbol.into(),
            prec_now: None,
            prec_fore: None,
            precipitation: None,
            prob_of_prec: None,
            wind_gust: None,
            rgb,
            hex: rgb.hex(),
        }
    }
}

/// Output of assembling one segment: its ordered slots plus the data
/// freshness that drove them (used only for observability on weather
/// segments; `Fresh` for dark/preview).
#[derive(Debug, Clone)]
pub struct SegmentOutcome {
    pub slots: Vec<LedSlot>,
    pub data_status: DataStatus,
}

pub fn build_dark_segment(spec: &SegmentSpec) -> SegmentOutcome {
    let mut slots: Vec<LedSlot> = (0..spec.led_count)
        .map(|_| LedSlot::from_rgb(Rgb::BLACK, "dark"))
        .collect();
    apply_reversal(&mut slots, spec.reversed);
    SegmentOutcome {
        slots,
        data_status: DataStatus::Fresh,
    }
}

/// `color_index = floor(i / led_count * N_buckets)`, clamped to the last
/// bucket — an even stride through the colormap's canonical ordering.
pub fn build_preview_segment(spec: &SegmentSpec, colormap: &Colormap) -> SegmentOutcome {
    let buckets = colormap.ordered_buckets();
    let n = buckets.len().max(1);
    let mut slots: Vec<LedSlot> = (0..spec.led_count)
        .map(|i| {
            let idx = ((i as f64 / spec.led_count as f64) * n as f64).floor() as usize;
            let idx = idx.min(n.saturating_sub(1));
            let bucket = buckets.get(idx).copied().unwrap_or(Bucket::Cloudy);
            let rgb = colormap.get(bucket);
            LedSlot::from_rgb(rgb, format!("colormap_preview_{}", bucket.name()))
        })
        .collect();
    apply_reversal(&mut slots, spec.reversed);
    SegmentOutcome {
        slots,
        data_status: DataStatus::Fresh,
    }
}

/// Alternating hot-pink / black pattern filling the whole segment, used when
/// a weather segment has no usable data at all.
fn build_error_pattern(led_count: u32) -> Vec<LedSlot> {
    (0..led_count)
        .map(|i| {
            if i % 2 == 0 {
                LedSlot::from_rgb(Rgb::HOT_PINK, "error")
            } else {
                LedSlot::from_rgb(Rgb::BLACK, "error")
            }
        })
        .collect()
}

fn compute_data_status(has_data: bool, max_cache_age_seconds: Option<u64>) -> DataStatus {
    let too_old = match max_cache_age_seconds {
        Some(age) => age > ERROR_THRESHOLD_S,
        None => true,
    };
    if !has_data || too_old {
        return DataStatus::Error;
    }
    if max_cache_age_seconds.is_some_and(|age| age > STALE_WARNING_THRESHOLD_S) {
        return DataStatus::Stale;
    }
    DataStatus::Fresh
}

/// Build the weather segment from its two already-fetched results.
/// `has_data` depends only on the forecast source: nowcast alone is never
/// enough to render a slot.
pub fn build_weather_segment(
    spec: &SegmentSpec,
    nowcast: &FetchResult,
    forecast: &FetchResult,
    colormap: &Colormap,
    now: DateTime<Utc>,
) -> SegmentOutcome {
    let has_data = forecast.source != Source::None;
    let max_cache_age_seconds = [nowcast.age_seconds, forecast.age_seconds]
        .into_iter()
        .flatten()
        .max();
    let data_status = compute_data_status(has_data, max_cache_age_seconds);

    if data_status == DataStatus::Error {
        let mut slots = build_error_pattern(spec.led_count);
        apply_reversal(&mut slots, spec.reversed);
        return SegmentOutcome { slots, data_status };
    }

    let nowcast_rows = nowcast
        .data
        .as_ref()
        .map(|json| crate::timeseries::parse_nowcast(json));
    let forecast_rows = forecast
        .data
        .as_ref()
        .map(|json| crate::timeseries::parse_forecast(json));

    let grid = combine(
        nowcast_rows.as_deref(),
        forecast_rows.as_deref(),
        spec.slot_minutes,
        spec.led_count,
        now,
    );

    let mut slots: Vec<LedSlot> = grid.iter().map(|row| render_slot(row, colormap)).collect();

    if data_status == DataStatus::Stale {
        if let Some(last) = slots.last_mut() {
            *last = LedSlot {
                time: last.time,
                yr_symbol: last.yr_symbol.clone(),
                wl_symbol: "stale_indicator".to_string(),
                prec_now: last.prec_now,
                prec_fore: last.prec_fore,
                precipitation: last.precipitation,
                prob_of_prec: last.prob_of_prec,
                wind_gust: last.wind_gust,
                rgb: Rgb::HOT_PINK,
                hex: Rgb::HOT_PINK.hex(),
            };
        }
    }

    apply_reversal(&mut slots, spec.reversed);
    SegmentOutcome { slots, data_status }
}

fn render_slot(row: &SlotRow, colormap: &Colormap) -> LedSlot {
    let bucket = classify_row(row.prec_now, row.symbol.as_deref(), row.prob_of_prec);
    let wl_symbol = bucket.map(|b| b.name().to_string()).unwrap_or_else(|| {
        tracing::warn!("slot at {} classified as UNKNOWN", row.time);
        "UNKNOWN".to_string()
    });
    let rgb = colormap.get(bucket.unwrap_or(Bucket::Cloudy));
    let precipitation = row.prec_now.or(row.prec_fore);

    LedSlot {
        time: Some(row.time),
        yr_symbol: row.symbol.clone(),
        wl_symbol,
        prec_now: row.prec_now,
        prec_fore: row.prec_fore,
        precipitation,
        prob_of_prec: row.prob_of_prec,
        wind_gust: row.wind_gust,
        rgb,
        hex: rgb.hex(),
    }
}

fn apply_reversal(slots: &mut [LedSlot], reversed: bool) {
    if reversed {
        slots.reverse();
    }
}
