use geo::{Point, Polygon};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::PipelineError;

/// Geographic extent the hex grid is laid over. Deserialized from the
/// `[west, south, east, north]` array form used in the config file.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(from = "[f64; 4]")]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl From<[f64; 4]> for BoundingBox {
    fn from([west, south, east, north]: [f64; 4]) -> Self {
        BoundingBox {
            west,
            south,
            east,
            north,
        }
    }
}

impl BoundingBox {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.west >= self.east || self.south >= self.north {
            return Err(PipelineError::InvalidBoundingBox {
                west: self.west,
                south: self.south,
                east: self.east,
                north: self.north,
            });
        }
        Ok(())
    }
}

/// Linear unit for the hexagon edge length and circle radii.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    Miles,
    Kilometers,
}

impl Units {
    pub fn to_meters(self, distance: f64) -> f64 {
        match self {
            Units::Miles => distance * 1609.344,
            Units::Kilometers => distance * 1000.0,
        }
    }

    pub fn from_meters(self, meters: f64) -> f64 {
        match self {
            Units::Miles => meters / 1609.344,
            Units::Kilometers => meters / 1000.0,
        }
    }
}

/// One input observation: a location plus the attribute payload found under
/// the configured property key.
#[derive(Debug, Clone)]
pub struct PointRecord {
    pub location: Point<f64>,
    pub payload: Value,
}

/// A hexagon with the payloads of the points that fell inside it. Cells that
/// collected nothing are pruned before this type ever reaches the classifier.
#[derive(Debug, Clone)]
pub struct JoinedCell {
    pub polygon: Polygon<f64>,
    pub values: Vec<Value>,
}

impl JoinedCell {
    pub fn count(&self) -> u32 {
        self.values.len() as u32
    }
}

/// A classified hexagon, ready for output. The joined payloads are dropped
/// when this record is built; they are scratch data and never serialized.
#[derive(Debug, Clone)]
pub struct BinnedCell {
    pub polygon: Polygon<f64>,
    pub count: u32,
    pub bin: usize,
    pub bin_val: (u32, u32),
}

impl BinnedCell {
    pub fn properties(&self) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert("count".to_string(), json!(self.count));
        props.insert("bin".to_string(), json!(self.bin));
        props.insert(
            "binVal".to_string(),
            json!([self.bin_val.0, self.bin_val.1]),
        );
        props
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn bbox_rejects_flipped_axes() {
        let bbox = BoundingBox::from([1.0, 0.0, 0.0, 1.0]);
        assert!(matches!(
            bbox.validate(),
            Err(PipelineError::InvalidBoundingBox { .. })
        ));

        let bbox = BoundingBox::from([0.0, 1.0, 1.0, 1.0]);
        assert!(bbox.validate().is_err());

        let bbox = BoundingBox::from([0.0, 0.0, 1.0, 1.0]);
        assert!(bbox.validate().is_ok());
    }

    #[test]
    fn unit_conversions_round_trip() {
        let miles = Units::Miles;
        assert_eq!(miles.to_meters(1.0), 1609.344);
        assert_eq!(miles.from_meters(miles.to_meters(2.5)), 2.5);
        assert_eq!(Units::Kilometers.to_meters(3.0), 3000.0);
    }

    #[test]
    fn binned_cell_properties_have_output_shape() {
        let cell = BinnedCell {
            polygon: polygon![
                (x: 0.0, y: 0.0),
                (x: 1.0, y: 0.0),
                (x: 0.0, y: 1.0),
                (x: 0.0, y: 0.0),
            ],
            count: 5,
            bin: 2,
            bin_val: (4, 9),
        };
        let props = cell.properties();
        assert_eq!(props.get("count"), Some(&json!(5)));
        assert_eq!(props.get("bin"), Some(&json!(2)));
        assert_eq!(props.get("binVal"), Some(&json!([4, 9])));
        assert!(!props.contains_key("values"));
    }
}
