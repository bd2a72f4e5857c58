use geo::{BoundingRect, Contains, Polygon};
use rayon::prelude::*;
use rstar::{RTree, RTreeObject, AABB};
use serde_json::Value;

use crate::types::{JoinedCell, PointRecord};

// R-tree entry: a hexagon's grid index plus its bounding box.
struct CellIndex {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for CellIndex {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

#[derive(Debug, Clone, Copy)]
pub struct JoinStats {
    /// Points assigned to a hexagon.
    pub joined: usize,
    /// Points contained in no hexagon (out-of-region data, not an error).
    pub dropped: usize,
}

/// Assigns each point to at most one hexagon and collects its payload there.
///
/// Candidate hexagons come from an R-tree over hexagon bounding boxes; the
/// point-in-polygon test runs only against those. A point matching several
/// candidates goes to the hexagon with the lowest grid index. The candidate
/// search is parallel over read-only points; accumulation is a sequential
/// merge, so the result is deterministic. Hexagons that collect nothing are
/// pruned from the output.
pub fn spatial_join(
    polygons: Vec<Polygon<f64>>,
    points: &[PointRecord],
) -> (Vec<JoinedCell>, JoinStats) {
    let tree_items: Vec<CellIndex> = polygons
        .iter()
        .enumerate()
        .map(|(index, polygon)| {
            let rect = polygon.bounding_rect().unwrap();
            CellIndex {
                index,
                aabb: AABB::from_corners(
                    [rect.min().x, rect.min().y],
                    [rect.max().x, rect.max().y],
                ),
            }
        })
        .collect();
    let tree = RTree::bulk_load(tree_items);

    let assignments: Vec<Option<usize>> = points
        .par_iter()
        .map(|record| {
            let envelope = AABB::from_point([record.location.x(), record.location.y()]);
            let mut candidates: Vec<usize> = tree
                .locate_in_envelope_intersecting(&envelope)
                .map(|cell| cell.index)
                .collect();
            candidates.sort_unstable();
            candidates
                .into_iter()
                .find(|&index| polygons[index].contains(&record.location))
        })
        .collect();

    let mut collected: Vec<Vec<Value>> = vec![Vec::new(); polygons.len()];
    let mut joined = 0;
    for (record, assignment) in points.iter().zip(&assignments) {
        if let Some(index) = assignment {
            collected[*index].push(record.payload.clone());
            joined += 1;
        }
    }
    let dropped = points.len() - joined;

    let cells = polygons
        .into_iter()
        .zip(collected)
        .filter(|(_, values)| !values.is_empty())
        .map(|(polygon, values)| JoinedCell { polygon, values })
        .collect();

    (cells, JoinStats { joined, dropped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::hex_grid;
    use crate::types::{BoundingBox, Units};
    use geo::{Centroid, Point};
    use serde_json::json;

    fn record(x: f64, y: f64) -> PointRecord {
        PointRecord {
            location: Point::new(x, y),
            payload: json!(1),
        }
    }

    fn grid() -> Vec<Polygon<f64>> {
        hex_grid(
            &BoundingBox::from([0.0, 0.0, 1.0, 1.0]),
            5.0,
            Units::Miles,
        )
        .unwrap()
    }

    #[test]
    fn counts_add_up_and_outsiders_drop() {
        let polygons = grid();
        let inside = polygons[0].centroid().unwrap();
        let points = vec![
            record(inside.x(), inside.y()),
            record(inside.x(), inside.y()),
            record(inside.x(), inside.y()),
            record(50.0, 50.0),
            record(-50.0, -50.0),
        ];

        let (cells, stats) = spatial_join(polygons, &points);
        assert_eq!(stats.joined, 3);
        assert_eq!(stats.dropped, 2);
        let total: u32 = cells.iter().map(|c| c.count()).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn empty_cells_are_pruned() {
        let polygons = grid();
        assert!(polygons.len() > 1);
        let inside = polygons[0].centroid().unwrap();
        let points = vec![record(inside.x(), inside.y())];

        let (cells, _) = spatial_join(polygons, &points);
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].count(), 1);
    }

    #[test]
    fn point_in_overlapping_polygons_goes_to_the_first() {
        let polygons = grid();
        let duplicated = vec![polygons[0].clone(), polygons[0].clone()];
        let inside = duplicated[0].centroid().unwrap();
        let points = vec![record(inside.x(), inside.y())];

        let (cells, stats) = spatial_join(duplicated, &points);
        assert_eq!(stats.joined, 1);
        assert_eq!(cells.len(), 1, "the point must land in exactly one cell");
        assert_eq!(cells[0].count(), 1);
    }

    #[test]
    fn payloads_travel_with_their_cell() {
        let polygons = grid();
        let inside = polygons[0].centroid().unwrap();
        let points = vec![PointRecord {
            location: Point::new(inside.x(), inside.y()),
            payload: json!({"residences": 12}),
        }];

        let (cells, _) = spatial_join(polygons, &points);
        assert_eq!(cells[0].values, vec![json!({"residences": 12})]);
    }
}
