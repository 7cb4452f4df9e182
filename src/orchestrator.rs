//! Concurrency Orchestrator: fans a request's Segment Specs out to the
//! Assembler, preserving input order, grounded on `app_v2.py`'s
//! `_process_segments` (`asyncio.gather` + `zip(async_indices, results)`).

use chrono::{DateTime, Utc};
use futures::future::join_all;

use crate::assembler::{
    build_dark_segment, build_preview_segment, build_weather_segment, DataStatus, LedSlot,
};
use crate::colormap::Colormap;
use crate::segment_spec::SegmentSpec;
use crate::services::coordinator::FetchCoordinator;
use crate::services::upstream::CastType;

pub struct ResolvedSegment {
    pub slots: Vec<LedSlot>,
    pub data_status: DataStatus,
}

/// Resolve every segment in `specs`, in order. Dark and preview segments are
/// computed inline (no suspension); weather segments launch their two
/// upstream fetches concurrently and are themselves scheduled concurrently
/// with every other weather segment in the request.
pub async fn resolve_segments(
    specs: &[SegmentSpec],
    coordinator: &FetchCoordinator,
    colormap: &Colormap,
    dev_mode: bool,
    now: DateTime<Utc>,
) -> Vec<ResolvedSegment> {
    let futures = specs.iter().map(|spec| {
        resolve_one(spec, coordinator, colormap, dev_mode, now)
    });

    join_all(futures).await
}

async fn resolve_one(
    spec: &SegmentSpec,
    coordinator: &FetchCoordinator,
    colormap: &Colormap,
    dev_mode: bool,
    now: DateTime<Utc>,
) -> ResolvedSegment {
    if spec.is_dark() {
        let outcome = build_dark_segment(spec);
        return ResolvedSegment {
            slots: outcome.slots,
            data_status: outcome.data_status,
        };
    }

    // Colormap preview is a synchronous, non-fetching branch; routing a
    // request to it is an HTTP-layer concern, so callers that want the
    // preview branch invoke `build_preview_segment` directly instead of
    // going through this fan-out. This function only ever sees dark or
    // weather specs.
    let (nowcast, forecast) = futures::join!(
        coordinator.get(CastType::Nowcast, spec.lat, spec.lon, dev_mode),
        coordinator.get(CastType::Locationforecast, spec.lat, spec.lon, dev_mode),
    );

    let outcome = build_weather_segment(spec, &nowcast, &forecast, colormap, now);
    ResolvedSegment {
        slots: outcome.slots,
        data_status: outcome.data_status,
    }
}

/// Entry point for a request carrying the colormap-preview flag: every
/// segment (dark or not) is resolved synchronously via the preview branch,
/// since no fetch is ever issued in preview mode.
pub fn resolve_preview_segments(specs: &[SegmentSpec], colormap: &Colormap) -> Vec<ResolvedSegment> {
    specs
        .iter()
        .map(|spec| {
            let outcome = if spec.is_dark() {
                build_dark_segment(spec)
            } else {
                build_preview_segment(spec, colormap)
            };
            ResolvedSegment {
                slots: outcome.slots,
                data_status: outcome.data_status,
            }
        })
        .collect()
}
