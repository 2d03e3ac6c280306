//! Layered GIS output.
//!
//! A [`Dataset`] holds named layers of features with a fixed geometry type
//! and a list of string fields. Handlers of the different passes share one
//! dataset and write to it through [`Layer`] handles.

pub mod geojson;
pub mod sqlite;

use geo::{LineString, MultiLineString, Point};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;

use crate::options::OutputFormat;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to serialize GeoJSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("output {0} already exists")]
    Exists(PathBuf),

    #[error("layer {0} already exists")]
    LayerExists(String),

    #[error("no layer with index {0}")]
    UnknownLayer(usize),

    #[error("layer {layer} has no field {field}")]
    UnknownField { layer: String, field: String },

    #[error("layer {layer} expects {expected} geometries")]
    WrongGeometry { layer: String, expected: GeometryType },

    #[error("dataset is already closed")]
    Closed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
pub enum GeometryType {
    #[strum(to_string = "POINT")]
    Point,
    #[strum(to_string = "LINESTRING")]
    LineString,
    #[strum(to_string = "MULTILINESTRING")]
    MultiLineString,
}

impl GeometryType {
    /// OGC geometry type code.
    pub fn code(self) -> u32 {
        match self {
            GeometryType::Point => 1,
            GeometryType::LineString => 2,
            GeometryType::MultiLineString => 5,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum FeatureGeometry {
    Point(Point<f64>),
    LineString(LineString<f64>),
    MultiLineString(MultiLineString<f64>),
}

impl FeatureGeometry {
    pub fn geometry_type(&self) -> GeometryType {
        match self {
            FeatureGeometry::Point(_) => GeometryType::Point,
            FeatureGeometry::LineString(_) => GeometryType::LineString,
            FeatureGeometry::MultiLineString(_) => GeometryType::MultiLineString,
        }
    }
}

impl From<Point<f64>> for FeatureGeometry {
    fn from(p: Point<f64>) -> Self {
        FeatureGeometry::Point(p)
    }
}

impl From<LineString<f64>> for FeatureGeometry {
    fn from(l: LineString<f64>) -> Self {
        FeatureGeometry::LineString(l)
    }
}

impl From<MultiLineString<f64>> for FeatureGeometry {
    fn from(ml: MultiLineString<f64>) -> Self {
        FeatureGeometry::MultiLineString(ml)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayerDefinition {
    pub name: String,
    pub geometry_type: GeometryType,
    pub fields: Vec<String>,
}

/// A feature ready for writing. `fields` follows the order of the layer
/// definition; `None` is an unset field.
#[derive(Clone, Debug, PartialEq)]
pub struct Feature {
    pub geometry: FeatureGeometry,
    pub fields: Vec<Option<String>>,
}

pub trait Dataset {
    /// Create a layer and return its index.
    fn create_layer(&mut self, definition: LayerDefinition) -> Result<usize, OutputError>;

    fn add_feature(&mut self, layer: usize, feature: Feature) -> Result<(), OutputError>;

    /// Flush everything to disk. Further writes fail with
    /// [`OutputError::Closed`].
    fn close(&mut self) -> Result<(), OutputError>;
}

pub type SharedDataset = Rc<RefCell<dyn Dataset>>;

/// Create the dataset for `format` at `path`.
///
/// Fails if something already exists at `path`.
pub fn open_dataset(
    format: OutputFormat,
    path: &Path,
    srs: u32,
    creation_options: &[(String, String)],
) -> Result<SharedDataset, OutputError> {
    if path.exists() {
        return Err(OutputError::Exists(path.to_path_buf()));
    }
    let dataset: SharedDataset = match format {
        OutputFormat::Sqlite => Rc::new(RefCell::new(sqlite::SqliteDataset::create(path, srs, creation_options)?)),
        OutputFormat::GeoJson => Rc::new(RefCell::new(geojson::GeoJsonDataset::create(path, srs, creation_options)?)),
    };
    Ok(dataset)
}

/// Handle for writing features into one layer of a shared dataset.
#[derive(Clone)]
pub struct Layer {
    dataset: SharedDataset,
    index: usize,
    definition: Rc<LayerDefinition>,
}

impl Layer {
    pub fn create(
        dataset: &SharedDataset,
        name: &str,
        geometry_type: GeometryType,
        fields: &[&str],
    ) -> Result<Self, OutputError> {
        let definition = LayerDefinition {
            name: name.to_string(),
            geometry_type,
            fields: fields.iter().map(|f| f.to_string()).collect(),
        };
        let index = dataset.borrow_mut().create_layer(definition.clone())?;
        Ok(Self {
            dataset: Rc::clone(dataset),
            index,
            definition: Rc::new(definition),
        })
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn feature(&self, geometry: impl Into<FeatureGeometry>) -> FeatureBuilder<'_> {
        FeatureBuilder {
            layer: self,
            geometry: geometry.into(),
            fields: vec![None; self.definition.fields.len()],
            unknown_field: None,
        }
    }
}

pub struct FeatureBuilder<'l> {
    layer: &'l Layer,
    geometry: FeatureGeometry,
    fields: Vec<Option<String>>,
    unknown_field: Option<String>,
}

impl FeatureBuilder<'_> {
    /// Set a field by name. An unknown name is reported by
    /// [`FeatureBuilder::add_to_layer`].
    pub fn set_field(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        match self.layer.definition.fields.iter().position(|f| f == name) {
            Some(i) => self.fields[i] = Some(value.into()),
            None => self.unknown_field = Some(name.to_string()),
        }
        self
    }

    pub fn add_to_layer(self) -> Result<(), OutputError> {
        let definition = &self.layer.definition;
        if let Some(field) = self.unknown_field {
            return Err(OutputError::UnknownField {
                layer: definition.name.clone(),
                field,
            });
        }
        if self.geometry.geometry_type() != definition.geometry_type {
            return Err(OutputError::WrongGeometry {
                layer: definition.name.clone(),
                expected: definition.geometry_type,
            });
        }
        let feature = Feature {
            geometry: self.geometry,
            fields: self.fields,
        };
        self.layer.dataset.borrow_mut().add_feature(self.layer.index, feature)
    }
}

/// Cut a string to at most `max_chars` characters.
pub fn truncate(value: &str, max_chars: usize) -> &str {
    match value.char_indices().nth(max_chars) {
        Some((end, _)) => &value[..end],
        None => value,
    }
}
