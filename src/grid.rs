use geo::{Coord, HaversineDistance, LineString, Point, Polygon};
use std::f64::consts::PI;

use crate::error::PipelineError;
use crate::types::{BoundingBox, Units};

/// Generates a flat-top hexagonal tiling covering `bbox`, with hexagon edge
/// length `cell_side` measured in `units`.
///
/// The cell side is converted to a degree span independently per axis, using
/// the haversine distance across the bbox midlines, so hexagons keep a
/// roughly constant ground size across the grid. Columns are spaced 3/4 of a
/// hexagon width apart and odd columns shift down half a hexagon height;
/// adjacent hexagons share edges and never overlap. Hexagons overhanging the
/// bbox edge are kept — the grid covers the bbox, no mask is applied.
pub fn hex_grid(
    bbox: &BoundingBox,
    cell_side: f64,
    units: Units,
) -> Result<Vec<Polygon<f64>>, PipelineError> {
    bbox.validate()?;
    if !(cell_side > 0.0) {
        return Err(PipelineError::InvalidCellSide(cell_side));
    }

    let center_x = (bbox.west + bbox.east) / 2.0;
    let center_y = (bbox.south + bbox.north) / 2.0;

    let span_x = units.from_meters(
        Point::new(bbox.west, center_y).haversine_distance(&Point::new(bbox.east, center_y)),
    );
    let span_y = units.from_meters(
        Point::new(center_x, bbox.south).haversine_distance(&Point::new(center_x, bbox.north)),
    );

    // Degree extent of one hexagon (vertex to vertex), per axis.
    let cell_width = (cell_side * 2.0 / span_x) * (bbox.east - bbox.west);
    let cell_height = (cell_side * 2.0 / span_y) * (bbox.north - bbox.south);

    let rx = cell_width / 2.0;
    let ry = cell_height / 2.0;

    let hex_width = cell_width;
    let hex_height = 3.0_f64.sqrt() / 2.0 * cell_height;

    let box_width = bbox.east - bbox.west;
    let box_height = bbox.north - bbox.south;

    let x_interval = 0.75 * hex_width;
    let y_interval = hex_height;

    let x_span = (box_width - hex_width) / (hex_width - rx / 2.0);
    let mut x_count = x_span.ceil() as i64;
    if x_span.round() as i64 == x_count {
        x_count += 1;
    }
    // A cell larger than the bbox still yields one column and one row.
    let x_count = x_count.max(1) as usize;

    let x_adjust = (x_count as f64 * x_interval - rx / 2.0 - box_width) / 2.0 - rx / 2.0
        + x_interval / 2.0;

    let y_count = ((box_height / hex_height).ceil() as i64).max(1) as usize;
    let mut y_adjust = (box_height - y_count as f64 * hex_height) / 2.0;

    let has_offset_y = y_count as f64 * hex_height - box_height > hex_height / 2.0;
    if has_offset_y {
        y_adjust -= hex_height / 4.0;
    }

    let mut grid = Vec::new();
    for col in 0..x_count {
        let odd = col % 2 == 1;
        for row in 0..=y_count {
            if row == 0 && (odd || has_offset_y) {
                continue;
            }

            let cx = col as f64 * x_interval + bbox.west - x_adjust;
            let mut cy = row as f64 * y_interval + bbox.south + y_adjust;
            if odd {
                cy -= hex_height / 2.0;
            }

            grid.push(hexagon(Coord { x: cx, y: cy }, rx, ry));
        }
    }

    Ok(grid)
}

/// Flat-top hexagon: first vertex due east of the center, closed ring.
fn hexagon(center: Coord<f64>, rx: f64, ry: f64) -> Polygon<f64> {
    let mut ring = Vec::with_capacity(7);
    for i in 0..6 {
        let angle = PI / 3.0 * i as f64;
        ring.push(Coord {
            x: center.x + rx * angle.cos(),
            y: center.y + ry * angle.sin(),
        });
    }
    ring.push(ring[0]);
    Polygon::new(LineString::from(ring), vec![])
}
