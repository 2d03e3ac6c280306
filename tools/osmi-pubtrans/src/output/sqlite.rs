//! SQLite output with WKT geometries.
//!
//! The layout follows what the GDAL SQLite driver reads without SpatiaLite:
//! one table per layer and a `geometry_columns` table with
//! `geometry_format = 'WKT'`.

use rusqlite::{params, params_from_iter, Connection};
use std::path::Path;
use wkt::ToWkt;

use super::{Dataset, Feature, FeatureGeometry, LayerDefinition, OutputError};

/// Features per transaction.
const FEATURES_PER_TRANSACTION: usize = 10_000;

struct SqliteLayer {
    definition: LayerDefinition,
    insert_sql: String,
}

pub struct SqliteDataset {
    conn: Connection,
    srs: u32,
    layers: Vec<SqliteLayer>,
    in_transaction: bool,
    uncommitted: usize,
    closed: bool,
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn geometry_to_wkt(geometry: &FeatureGeometry) -> String {
    match geometry {
        FeatureGeometry::Point(p) => p.to_wkt().to_string(),
        FeatureGeometry::LineString(l) => l.to_wkt().to_string(),
        FeatureGeometry::MultiLineString(ml) => ml.to_wkt().to_string(),
    }
}

impl SqliteDataset {
    pub fn create(path: &Path, srs: u32, creation_options: &[(String, String)]) -> Result<Self, OutputError> {
        let conn = Connection::open(path)?;

        for (key, value) in creation_options {
            match key.to_ascii_uppercase().as_str() {
                "OGR_SQLITE_SYNCHRONOUS" => {
                    if value.eq_ignore_ascii_case("OFF") {
                        conn.execute_batch("PRAGMA synchronous = OFF;")?;
                    }
                }
                "FORMAT" => {
                    if !value.eq_ignore_ascii_case("WKT") {
                        log::warn!("SQLite output only supports FORMAT=WKT, ignoring FORMAT={}", value);
                    }
                }
                "SPATIAL_INDEX" => {
                    if !value.eq_ignore_ascii_case("NO") {
                        log::warn!("spatial indexes are not supported, ignoring SPATIAL_INDEX={}", value);
                    }
                }
                _ => log::warn!("unknown dataset creation option {}={}", key, value),
            }
        }

        conn.execute_batch(
            "CREATE TABLE geometry_columns (
                f_table_name VARCHAR,
                f_geometry_column VARCHAR,
                geometry_type INTEGER,
                coord_dimension INTEGER,
                srid INTEGER,
                geometry_format VARCHAR
            );
            CREATE TABLE spatial_ref_sys (
                srid INTEGER UNIQUE,
                auth_name TEXT,
                auth_srid TEXT,
                srtext TEXT
            );",
        )?;
        conn.execute(
            "INSERT INTO spatial_ref_sys (srid, auth_name, auth_srid, srtext) VALUES (?1, 'EPSG', ?2, NULL)",
            params![srs, srs.to_string()],
        )?;

        Ok(Self {
            conn,
            srs,
            layers: Vec::new(),
            in_transaction: false,
            uncommitted: 0,
            closed: false,
        })
    }

    fn commit(&mut self) -> Result<(), OutputError> {
        if self.in_transaction {
            self.conn.execute_batch("COMMIT;")?;
            self.in_transaction = false;
            self.uncommitted = 0;
        }
        Ok(())
    }
}

impl Dataset for SqliteDataset {
    fn create_layer(&mut self, definition: LayerDefinition) -> Result<usize, OutputError> {
        if self.closed {
            return Err(OutputError::Closed);
        }
        if self.layers.iter().any(|l| l.definition.name == definition.name) {
            return Err(OutputError::LayerExists(definition.name));
        }
        // DDL outside of the feature transactions.
        self.commit()?;

        let table = quote_identifier(&definition.name);
        let mut columns = vec!["ogc_fid INTEGER PRIMARY KEY".to_string(), "GEOMETRY TEXT".to_string()];
        columns.extend(definition.fields.iter().map(|f| format!("{} TEXT", quote_identifier(f))));
        self.conn
            .execute_batch(&format!("CREATE TABLE {} ({});", table, columns.join(", ")))?;
        self.conn.execute(
            "INSERT INTO geometry_columns
                (f_table_name, f_geometry_column, geometry_type, coord_dimension, srid, geometry_format)
             VALUES (?1, 'GEOMETRY', ?2, 2, ?3, 'WKT')",
            params![definition.name, definition.geometry_type.code(), self.srs],
        )?;

        let mut insert_columns = vec!["GEOMETRY".to_string()];
        insert_columns.extend(definition.fields.iter().map(|f| quote_identifier(f)));
        let placeholders: Vec<String> = (1..=insert_columns.len()).map(|i| format!("?{}", i)).collect();
        let insert_sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            insert_columns.join(", "),
            placeholders.join(", ")
        );

        log::debug!("created layer {}", definition.name);
        self.layers.push(SqliteLayer { definition, insert_sql });
        Ok(self.layers.len() - 1)
    }

    fn add_feature(&mut self, layer: usize, feature: Feature) -> Result<(), OutputError> {
        if self.closed {
            return Err(OutputError::Closed);
        }
        let insert_sql = &self.layers.get(layer).ok_or(OutputError::UnknownLayer(layer))?.insert_sql;

        if !self.in_transaction {
            self.conn.execute_batch("BEGIN;")?;
            self.in_transaction = true;
        }

        let mut values: Vec<Option<String>> = Vec::with_capacity(feature.fields.len() + 1);
        values.push(Some(geometry_to_wkt(&feature.geometry)));
        values.extend(feature.fields);
        self.conn.prepare_cached(insert_sql)?.execute(params_from_iter(values))?;

        self.uncommitted += 1;
        if self.uncommitted >= FEATURES_PER_TRANSACTION {
            self.commit()?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), OutputError> {
        if self.closed {
            return Ok(());
        }
        self.commit()?;
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::GeometryType;
    use geo::{line_string, Point};

    fn open(dir: &tempfile::TempDir) -> (std::path::PathBuf, SqliteDataset) {
        let path = dir.path().join("out.db");
        let options = vec![("OGR_SQLITE_SYNCHRONOUS".to_string(), "OFF".to_string())];
        let dataset = SqliteDataset::create(&path, 3857, &options).unwrap();
        (path, dataset)
    }

    fn definition(name: &str, geometry_type: GeometryType, fields: &[&str]) -> LayerDefinition {
        LayerDefinition {
            name: name.to_string(),
            geometry_type,
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }

    #[test]
    fn test_layer_table_and_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let (path, mut dataset) = open(&dir);

        let layer = dataset
            .create_layer(definition("ptv2_error_lines", GeometryType::LineString, &["rel_id", "from"]))
            .unwrap();
        dataset
            .add_feature(
                layer,
                Feature {
                    geometry: line_string![(x: 1.0, y: 2.0), (x: 3.0, y: 4.0)].into(),
                    fields: vec![Some("42".to_string()), None],
                },
            )
            .unwrap();
        dataset.close().unwrap();
        drop(dataset);

        let conn = Connection::open(&path).unwrap();
        let (wkt, rel_id, from): (String, String, Option<String>) = conn
            .query_row("SELECT GEOMETRY, rel_id, \"from\" FROM ptv2_error_lines", [], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .unwrap();
        assert!(wkt.starts_with("LINESTRING"), "{}", wkt);
        assert_eq!(rel_id, "42");
        assert_eq!(from, None);

        let (geometry_type, srid, format): (u32, u32, String) = conn
            .query_row(
                "SELECT geometry_type, srid, geometry_format FROM geometry_columns WHERE f_table_name = 'ptv2_error_lines'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!((geometry_type, srid, format.as_str()), (2, 3857, "WKT"));
    }

    #[test]
    fn test_many_features_span_transactions() {
        let dir = tempfile::tempdir().unwrap();
        let (path, mut dataset) = open(&dir);
        let layer = dataset
            .create_layer(definition("points", GeometryType::Point, &["node_id"]))
            .unwrap();

        for i in 0..(FEATURES_PER_TRANSACTION + 5) {
            let feature = Feature {
                geometry: Point::new(i as f64, 0.0).into(),
                fields: vec![Some(i.to_string())],
            };
            dataset.add_feature(layer, feature).unwrap();
        }
        dataset.close().unwrap();
        drop(dataset);

        let conn = Connection::open(&path).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM points", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count as usize, FEATURES_PER_TRANSACTION + 5);
    }

    #[test]
    fn test_write_after_close() {
        let dir = tempfile::tempdir().unwrap();
        let (_path, mut dataset) = open(&dir);
        let layer = dataset
            .create_layer(definition("points", GeometryType::Point, &[]))
            .unwrap();
        dataset.close().unwrap();

        let feature = Feature {
            geometry: Point::new(0.0, 0.0).into(),
            fields: Vec::new(),
        };
        assert!(matches!(dataset.add_feature(layer, feature), Err(OutputError::Closed)));
    }
}
