use geo::{Centroid, Coord, HaversineDestination, LineString, Point, Polygon};
use serde_json::{Map, Value};

use crate::error::PipelineError;
use crate::types::{BinnedCell, Units};

// Same polygonization resolution Turf uses for circles.
const CIRCLE_STEPS: usize = 64;

/// A circle polygon carrying a copy of its originating cell's properties.
#[derive(Debug, Clone)]
pub struct CircleFeature {
    pub polygon: Polygon<f64>,
    pub properties: Map<String, Value>,
}

/// Step-table lookup for the inner-circle radius fraction.
///
/// A count in `[breaks[j], breaks[j+1])` takes `multipliers[j]`; a count
/// equal to a breakpoint takes the bin that breakpoint opens. The last
/// interval is closed, so a count equal to the final breakpoint still takes
/// the last multiplier. Counts below the first breakpoint have no symbol
/// (`None`); counts above the last breakpoint are out of the table's range
/// and abort the run.
pub fn multiplier(
    count: u32,
    breaks: &[f64],
    multipliers: &[f64],
) -> Result<Option<f64>, PipelineError> {
    let value = count as f64;
    if breaks.is_empty() || value < breaks[0] {
        return Ok(None);
    }
    let last = multipliers.len().saturating_sub(1);
    for (j, &m) in multipliers.iter().enumerate() {
        if let Some(&upper) = breaks.get(j + 1) {
            if value < upper || (j == last && value == upper) {
                return Ok(Some(m));
            }
        }
    }
    Err(PipelineError::UnboundedCount {
        count,
        max_break: breaks[breaks.len() - 1],
    })
}

/// Builds the Wurman dot feature sets: a fixed-radius outer reference circle
/// per cell, and an inner circle scaled by the count's multiplier. Both are
/// centered on the hexagon centroid; the outer radius is
/// `sqrt(3)/2 × cell_side × shrink`, identical for every cell in a run, so
/// adjacent dots never overlap. Cells whose count falls below the first
/// breakpoint get an outer circle but no inner one.
pub fn wurman_dots(
    cells: &[BinnedCell],
    cell_side: f64,
    shrink: f64,
    breaks: &[f64],
    multipliers: &[f64],
    units: Units,
) -> Result<(Vec<CircleFeature>, Vec<CircleFeature>), PipelineError> {
    let outer_radius = 3.0_f64.sqrt() / 2.0 * cell_side * shrink;

    let mut outer = Vec::with_capacity(cells.len());
    let mut inner = Vec::with_capacity(cells.len());

    for cell in cells {
        let center = cell
            .polygon
            .centroid()
            .expect("hexagon ring is never degenerate");
        let properties = cell.properties();

        outer.push(CircleFeature {
            polygon: circle(center, outer_radius, units),
            properties: properties.clone(),
        });

        if let Some(m) = multiplier(cell.count, breaks, multipliers)? {
            inner.push(CircleFeature {
                polygon: circle(center, outer_radius * m, units),
                properties,
            });
        }
    }

    Ok((outer, inner))
}

/// Circle polygon around `center` with radius in `units`, traced with 64
/// haversine-destination steps (Turf's circle construction).
fn circle(center: Point<f64>, radius: f64, units: Units) -> Polygon<f64> {
    let meters = units.to_meters(radius);
    let mut ring = Vec::with_capacity(CIRCLE_STEPS + 1);
    for i in 0..CIRCLE_STEPS {
        let bearing = i as f64 * -360.0 / CIRCLE_STEPS as f64;
        let vertex = center.haversine_destination(bearing, meters);
        ring.push(Coord {
            x: vertex.x(),
            y: vertex.y(),
        });
    }
    ring.push(ring[0]);
    Polygon::new(LineString::from(ring), vec![])
}
