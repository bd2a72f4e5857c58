use anyhow::{Context, Result};
use geo::Point;
use geojson::{Feature, FeatureCollection, GeoJson, Geometry};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

use crate::error::PipelineError;
use crate::types::{BinnedCell, PointRecord};
use crate::wurman::CircleFeature;

pub struct LoadedPoints {
    pub points: Vec<PointRecord>,
    /// Features without point geometry or without the payload property.
    pub skipped: usize,
}

pub fn load_points(path: &Path, payload_key: &str) -> Result<LoadedPoints> {
    let file =
        File::open(path).with_context(|| format!("Failed to open input file: {:?}", path))?;
    let reader = BufReader::new(file);
    let geojson = GeoJson::from_reader(reader).context("Failed to parse input GeoJSON")?;
    points_from_geojson(geojson, payload_key)
}

/// Extracts point records from a parsed feature collection. Malformed
/// features are skipped and counted rather than aborting the run; the input
/// data is expected to be partially dirty.
pub fn points_from_geojson(geojson: GeoJson, payload_key: &str) -> Result<LoadedPoints> {
    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => {
            return Err(PipelineError::MalformedInput(
                "input must be a GeoJSON FeatureCollection".to_string(),
            )
            .into())
        }
    };

    let mut points = Vec::with_capacity(collection.features.len());
    let mut skipped = 0;

    for feature in collection.features {
        let coords = match feature.geometry.as_ref().map(|g| &g.value) {
            Some(geojson::Value::Point(coords)) if coords.len() >= 2 => coords,
            _ => {
                skipped += 1;
                continue;
            }
        };
        let payload = match feature
            .properties
            .as_ref()
            .and_then(|props| props.get(payload_key))
        {
            Some(value) => value.clone(),
            None => {
                skipped += 1;
                continue;
            }
        };
        points.push(PointRecord {
            location: Point::new(coords[0], coords[1]),
            payload,
        });
    }

    Ok(LoadedPoints { points, skipped })
}

pub fn hexbin_collection(cells: &[BinnedCell]) -> FeatureCollection {
    let features = cells
        .iter()
        .map(|cell| Feature {
            bbox: None,
            geometry: Some(Geometry::new(geojson::Value::from(&cell.polygon))),
            id: None,
            properties: Some(cell.properties()),
            foreign_members: None,
        })
        .collect();
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

pub fn circle_collection(circles: &[CircleFeature]) -> FeatureCollection {
    let features = circles
        .iter()
        .map(|circle| Feature {
            bbox: None,
            geometry: Some(Geometry::new(geojson::Value::from(&circle.polygon))),
            id: None,
            properties: Some(circle.properties.clone()),
            foreign_members: None,
        })
        .collect();
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

pub fn write_hexbins(path: &Path, cells: &[BinnedCell]) -> Result<()> {
    write_collection(path, &hexbin_collection(cells))
}

pub fn write_circles(path: &Path, circles: &[CircleFeature]) -> Result<()> {
    write_collection(path, &circle_collection(circles))
}

fn write_collection(path: &Path, collection: &FeatureCollection) -> Result<()> {
    // Serialize fully before touching the file; a failed run must not leave
    // partial output behind.
    let body =
        serde_json::to_string(collection).context("Failed to serialize feature collection")?;
    fs::write(path, body).with_context(|| format!("Failed to write output file: {:?}", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;
    use serde_json::json;

    fn feature_collection(features: &str) -> GeoJson {
        format!(r#"{{"type": "FeatureCollection", "features": [{}]}}"#, features)
            .parse()
            .unwrap()
    }

    fn point_feature(x: f64, y: f64, props: &str) -> String {
        format!(
            r#"{{"type": "Feature", "geometry": {{"type": "Point", "coordinates": [{}, {}]}}, "properties": {}}}"#,
            x, y, props
        )
    }

    #[test]
    fn loads_points_with_payloads() {
        let geojson = feature_collection(&[
            point_feature(-80.0, 35.0, r#"{"residences": 4}"#),
            point_feature(-81.0, 35.5, r#"{"residences": "multi-family"}"#),
        ]
        .join(","));

        let loaded = points_from_geojson(geojson, "residences").unwrap();
        assert_eq!(loaded.points.len(), 2);
        assert_eq!(loaded.skipped, 0);
        assert_eq!(loaded.points[0].location.x(), -80.0);
        assert_eq!(loaded.points[0].payload, json!(4));
        assert_eq!(loaded.points[1].payload, json!("multi-family"));
    }

    #[test]
    fn malformed_features_are_skipped_and_counted() {
        let polygon_feature = r#"{"type": "Feature", "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[0,1],[0,0]]]}, "properties": {"residences": 1}}"#;
        let no_geometry = r#"{"type": "Feature", "geometry": null, "properties": {"residences": 1}}"#;
        let missing_payload = point_feature(-80.0, 35.0, r#"{"other": 1}"#);
        let good = point_feature(-80.0, 35.0, r#"{"residences": 1}"#);

        let geojson = feature_collection(
            &[polygon_feature.to_string(), no_geometry.to_string(), missing_payload, good]
                .join(","),
        );
        let loaded = points_from_geojson(geojson, "residences").unwrap();
        assert_eq!(loaded.points.len(), 1);
        assert_eq!(loaded.skipped, 3);
    }

    #[test]
    fn non_collection_input_is_rejected() {
        let geojson: GeoJson = r#"{"type": "Point", "coordinates": [0, 0]}"#.parse().unwrap();
        assert!(points_from_geojson(geojson, "residences").is_err());
    }

    #[test]
    fn hexbin_features_expose_only_output_properties() {
        let cell = BinnedCell {
            polygon: polygon![
                (x: 0.0, y: 0.0),
                (x: 1.0, y: 0.0),
                (x: 0.0, y: 1.0),
                (x: 0.0, y: 0.0),
            ],
            count: 3,
            bin: 1,
            bin_val: (2, 4),
        };
        let collection = hexbin_collection(&[cell]);
        assert_eq!(collection.features.len(), 1);
        let props = collection.features[0].properties.as_ref().unwrap();
        assert_eq!(props.get("count"), Some(&json!(3)));
        assert_eq!(props.get("bin"), Some(&json!(1)));
        assert_eq!(props.get("binVal"), Some(&json!([2, 4])));
        assert!(!props.contains_key("values"));
    }
}
