//! GeoJSON output: a directory with one FeatureCollection file per layer.

use geo::{LineString, MultiLineString, Point};
use geojson::{FeatureCollection, GeoJson, Geometry, JsonObject, Value};
use std::path::{Path, PathBuf};

use super::{Dataset, Feature, FeatureGeometry, LayerDefinition, OutputError};

const DEFAULT_PRECISION: u32 = 7;

struct GeoJsonLayer {
    definition: LayerDefinition,
    features: Vec<geojson::Feature>,
}

pub struct GeoJsonDataset {
    directory: PathBuf,
    srs: u32,
    precision: u32,
    layers: Vec<GeoJsonLayer>,
    closed: bool,
}

fn round(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor
}

fn point_to_geojson(p: &Point<f64>, precision: u32) -> Value {
    Value::Point(vec![round(p.x(), precision), round(p.y(), precision)])
}

fn linestring_to_positions(line: &LineString<f64>, precision: u32) -> Vec<Vec<f64>> {
    line.0
        .iter()
        .map(|c| vec![round(c.x, precision), round(c.y, precision)])
        .collect()
}

fn linestring_to_geojson(line: &LineString<f64>, precision: u32) -> Value {
    Value::LineString(linestring_to_positions(line, precision))
}

fn multilinestring_to_geojson(ml: &MultiLineString<f64>, precision: u32) -> Value {
    Value::MultiLineString(ml.0.iter().map(|l| linestring_to_positions(l, precision)).collect())
}

/// Named CRS member for output that is not in WGS84.
fn crs_member(srs: u32) -> Option<JsonObject> {
    if srs == 4326 {
        return None;
    }
    let mut members = JsonObject::new();
    members.insert(
        "crs".to_string(),
        serde_json::json!({
            "type": "name",
            "properties": { "name": format!("urn:ogc:def:crs:EPSG::{}", srs) }
        }),
    );
    Some(members)
}

impl GeoJsonDataset {
    pub fn create(directory: &Path, srs: u32, creation_options: &[(String, String)]) -> Result<Self, OutputError> {
        let mut precision = DEFAULT_PRECISION;
        for (key, value) in creation_options {
            if key.eq_ignore_ascii_case("COORDINATE_PRECISION") {
                match value.parse() {
                    Ok(p) => precision = p,
                    Err(_) => log::warn!("invalid COORDINATE_PRECISION {}, using {}", value, precision),
                }
            } else {
                log::warn!("unknown dataset creation option {}={}", key, value);
            }
        }

        std::fs::create_dir_all(directory).map_err(|source| OutputError::Io {
            path: directory.to_path_buf(),
            source,
        })?;

        Ok(Self {
            directory: directory.to_path_buf(),
            srs,
            precision,
            layers: Vec::new(),
            closed: false,
        })
    }

    fn to_geojson_feature(&self, definition: &LayerDefinition, feature: Feature) -> geojson::Feature {
        let value = match &feature.geometry {
            FeatureGeometry::Point(p) => point_to_geojson(p, self.precision),
            FeatureGeometry::LineString(l) => linestring_to_geojson(l, self.precision),
            FeatureGeometry::MultiLineString(ml) => multilinestring_to_geojson(ml, self.precision),
        };

        let mut properties = serde_json::Map::new();
        for (name, value) in definition.fields.iter().zip(feature.fields) {
            if let Some(value) = value {
                properties.insert(name.clone(), serde_json::Value::String(value));
            }
        }

        geojson::Feature {
            bbox: None,
            geometry: Some(Geometry::new(value)),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        }
    }

    fn write_layer(&self, layer: GeoJsonLayer) -> Result<(), OutputError> {
        let path = self.directory.join(format!("{}.geojson", layer.definition.name));
        log::debug!("writing {} features to {}", layer.features.len(), path.display());

        let feature_collection = FeatureCollection {
            bbox: None,
            features: layer.features,
            foreign_members: crs_member(self.srs),
        };
        let geojson = GeoJson::from(feature_collection);
        let json_string = serde_json::to_string_pretty(&geojson)?;

        std::fs::write(&path, json_string).map_err(|source| OutputError::Io { path, source })
    }
}

impl Dataset for GeoJsonDataset {
    fn create_layer(&mut self, definition: LayerDefinition) -> Result<usize, OutputError> {
        if self.closed {
            return Err(OutputError::Closed);
        }
        if self.layers.iter().any(|l| l.definition.name == definition.name) {
            return Err(OutputError::LayerExists(definition.name));
        }
        self.layers.push(GeoJsonLayer {
            definition,
            features: Vec::new(),
        });
        Ok(self.layers.len() - 1)
    }

    fn add_feature(&mut self, layer: usize, feature: Feature) -> Result<(), OutputError> {
        if self.closed {
            return Err(OutputError::Closed);
        }
        let definition = &self.layers.get(layer).ok_or(OutputError::UnknownLayer(layer))?.definition;
        let converted = self.to_geojson_feature(definition, feature);
        self.layers[layer].features.push(converted);
        Ok(())
    }

    fn close(&mut self) -> Result<(), OutputError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        for layer in std::mem::take(&mut self.layers) {
            self.write_layer(layer)?;
        }
        Ok(())
    }
}
