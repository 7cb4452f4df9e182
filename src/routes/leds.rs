//! Thin HTTP boundary over the core pipeline.
//!
//! Response formatting (`json_wled`, `bin`, `html`) and most query-string
//! plumbing live outside this crate's scope — this handler only wires the
//! `json` format, enough to exercise the Orchestrator end to end.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::assembler::{DataStatus, LedSlot};
use crate::colormap::Colormap;
use crate::errors::AppError;
use crate::orchestrator::{resolve_preview_segments, resolve_segments, ResolvedSegment};
use crate::segment_spec::parse_segments;
use crate::services::coordinator::FetchCoordinator;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<FetchCoordinator>,
    pub colormap: Arc<Colormap>,
}

#[derive(Debug, Deserialize)]
pub struct LedsQuery {
    s: String,
    #[serde(default)]
    dev: Option<String>,
    #[serde(default)]
    cm_preview: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LedSlotResponse {
    hex: String,
    wl_symbol: String,
    prec_now: Option<f64>,
    prec_fore: Option<f64>,
    precipitation: Option<f64>,
    prob_of_prec: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct SegmentResponse {
    data_status: &'static str,
    data: Vec<LedSlotResponse>,
}

fn data_status_name(status: DataStatus) -> &'static str {
    match status {
        DataStatus::Fresh => "fresh",
        DataStatus::Stale => "stale",
        DataStatus::Error => "error",
    }
}

fn to_response(slot: &LedSlot) -> LedSlotResponse {
    LedSlotResponse {
        hex: slot.hex.clone(),
        wl_symbol: slot.wl_symbol.clone(),
        prec_now: slot.prec_now,
        prec_fore: slot.prec_fore,
        precipitation: slot.precipitation,
        prob_of_prec: slot.prob_of_prec,
    }
}

fn to_segment_response(resolved: &ResolvedSegment) -> SegmentResponse {
    SegmentResponse {
        data_status: data_status_name(resolved.data_status),
        data: resolved.slots.iter().map(to_response).collect(),
    }
}

pub async fn get_leds(
    State(state): State<AppState>,
    Query(query): Query<LedsQuery>,
) -> Result<Json<Vec<SegmentResponse>>, AppError> {
    let specs = parse_segments(&query.s)?;

    let resolved = if query.cm_preview.is_some() {
        resolve_preview_segments(&specs, &state.colormap)
    } else {
        let dev_mode = query.dev.is_some();
        resolve_segments(&specs, &state.coordinator, &state.colormap, dev_mode, Utc::now()).await
    };

    Ok(Json(resolved.iter().map(to_segment_response).collect()))
}
