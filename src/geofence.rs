//! Nowcast coverage check.
//!
//! The nowcast API only has radar coverage over Fennoscandia and adjacent
//! seas. Outside that area every nowcast request would fail, so the client
//! skips the call entirely and reports `none` instead — see
//! [`crate::services::coordinator`].
//!
//! The polygon below is taken verbatim (vertex order and all) from the
//! upstream coverage file, simplified and shrunk with a negative buffer.
//! Vertices are `(lon, lat)` pairs, matching the coverage file's own axis
//! order.

/// Fennoscandia + adjacent seas, derived from
/// `https://api.met.no/weatherapi/nowcast/2.0/coverage.zip`.
const NOWCAST_COVERAGE: &[(f64, f64)] = &[
    (2.547779705832076, 53.30271492607023),
    (-2.905815348621908, 64.65327205671177),
    (-9.497201603182553, 71.32483641294951),
    (15.01761974015538, 72.85721223563839),
    (39.50028754686385, 71.32462086941165),
    (32.90812282213389, 64.65301564004723),
    (27.45389690417179, 53.30251807369419),
    (2.547779705832076, 53.30271492607023),
];

/// Ray-casting point-in-polygon test (even-odd rule).
///
/// `point` and the polygon vertices are `(lon, lat)` pairs. Works for any
/// simple polygon; the coverage polygon above is not self-intersecting.
fn point_in_polygon(point: (f64, f64), polygon: &[(f64, f64)]) -> bool {
    let (x, y) = point;
    let mut inside = false;
    let n = polygon.len();
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = polygon[i];
        let (xj, yj) = polygon[j];
        let crosses = (yi > y) != (yj > y);
        if crosses {
            let x_intersect = xi + (y - yi) / (yj - yi) * (xj - xi);
            if x < x_intersect {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Whether `(lat, lon)` falls inside the fixed nowcast coverage polygon.
pub fn in_nowcast_coverage(lat: f64, lon: f64) -> bool {
    point_in_polygon((lon, lat), NOWCAST_COVERAGE)
}
