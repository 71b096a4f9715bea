//! Planar projection of geo results for display.
//!
//! Points are projected equirectangularly around the middle latitude of the
//! bounding box, then scaled uniformly into the unit square with north up.
//! One scale for both axes keeps bearings and distance ratios intact at city
//! scale. The antimeridian is not handled.

use serde::Serialize;

use crate::models::{GeoPoint, RankedResult};

/// Smallest span, in degrees, the unit square is allowed to cover.
pub const MIN_SPAN_DEG: f64 = 0.002;

/// Minimap side length bounds, in cells.
pub const MIN_GRID: usize = 3;
pub const MAX_GRID: usize = 101;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedPoint {
    pub id: String,
    pub name: String,
    pub rank: usize,
    pub x: f64,
    pub y: f64,
}

/// Reference and result positions in `[0, 1]²`, `y` growing northwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Projection {
    pub reference: Point2,
    pub points: Vec<ProjectedPoint>,
}

/// Project `reference` and every located result into the unit square.
///
/// Results without coordinates are skipped. When everything coincides the
/// reference lands on `(0.5, 0.5)`.
pub fn project_for_visualization(reference: GeoPoint, results: &[RankedResult]) -> Projection {
    let located: Vec<(&RankedResult, GeoPoint)> = results
        .iter()
        .filter_map(|r| r.record.location.map(|p| (r, p)))
        .collect();

    let lats = located.iter().map(|(_, p)| p.lat()).chain([reference.lat()]);
    let (min_lat, max_lat) = min_max(lats);
    let kx = ((min_lat + max_lat) / 2.0).to_radians().cos().max(0.01);

    let plane = |p: GeoPoint| (p.lon() * kx, p.lat());
    let (min_x, max_x) = min_max(located.iter().map(|(_, p)| plane(*p).0).chain([plane(reference).0]));
    let (min_y, max_y) = (min_lat, max_lat);

    let span = (max_x - min_x).max(max_y - min_y).max(MIN_SPAN_DEG);
    let (cx, cy) = ((min_x + max_x) / 2.0, (min_y + max_y) / 2.0);
    let to_unit = |p: GeoPoint| {
        let (x, y) = plane(p);
        Point2 {
            x: (0.5 + (x - cx) / span).clamp(0.0, 1.0),
            y: (0.5 + (y - cy) / span).clamp(0.0, 1.0),
        }
    };

    Projection {
        reference: to_unit(reference),
        points: located
            .into_iter()
            .map(|(r, p)| {
                let Point2 { x, y } = to_unit(p);
                ProjectedPoint {
                    id: r.record.id.clone(),
                    name: r.record.name.clone(),
                    rank: r.rank,
                    x,
                    y,
                }
            })
            .collect(),
    }
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

/// Draw a projection as a `grid × grid` character map, north up.
///
/// `@` marks the reference and results are labelled by rank (`1`-`9`,
/// then `a`-`z`, then `+`). Better ranks win shared cells, and the
/// reference wins over everything. `grid` is clamped to
/// `MIN_GRID..=MAX_GRID`.
pub fn render_minimap(projection: &Projection, grid: usize) -> String {
    if projection.points.is_empty() {
        return "(no located results to display)".to_string();
    }
    let grid = grid.clamp(MIN_GRID, MAX_GRID);
    let cell = |x: f64, y: f64| {
        let col = (x * (grid - 1) as f64).round() as usize;
        let row = ((1.0 - y) * (grid - 1) as f64).round() as usize;
        (row.min(grid - 1), col.min(grid - 1))
    };

    let mut canvas = vec![vec!['.'; grid]; grid];
    let mut points: Vec<&ProjectedPoint> = projection.points.iter().collect();
    points.sort_by(|a, b| b.rank.cmp(&a.rank));
    for p in points {
        let (row, col) = cell(p.x, p.y);
        canvas[row][col] = rank_label(p.rank);
    }
    let (row, col) = cell(projection.reference.x, projection.reference.y);
    canvas[row][col] = '@';

    let mut out: Vec<String> = canvas.into_iter().map(|r| r.into_iter().collect()).collect();
    out.push(String::new());
    out.push("@ = origin, 1-9a-z = rank, north is up".to_string());
    out.join("\n")
}

fn rank_label(rank: usize) -> char {
    match rank {
        1..=9 => char::from(b'0' + rank as u8),
        10..=35 => char::from(b'a' + (rank - 10) as u8),
        _ => '+',
    }
}
