//! Run configuration shared by all passes.

use strum::{Display, EnumString};

/// Output driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum OutputFormat {
    #[strum(to_string = "SQlite")]
    Sqlite,
    #[strum(to_string = "GeoJSON")]
    GeoJson,
}

impl OutputFormat {
    /// Output name used if none was given on the command line.
    pub fn default_output(self) -> &'static str {
        match self {
            OutputFormat::Sqlite => "ptv2.db",
            OutputFormat::GeoJson => "ptv2",
        }
    }

    /// Dataset creation options applied unless the user set the same key.
    pub fn default_creation_options(self) -> &'static [(&'static str, &'static str)] {
        match self {
            OutputFormat::Sqlite => &[
                ("OGR_SQLITE_SYNCHRONOUS", "OFF"),
                ("SPATIAL_INDEX", "NO"),
                ("FORMAT", "WKT"),
            ],
            OutputFormat::GeoJson => &[("COORDINATE_PRECISION", "7")],
        }
    }
}

/// Storage for node locations during the second pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum IndexType {
    SparseMemArray,
    Hash,
}

#[derive(Clone, Debug)]
pub struct Options {
    pub index_type: IndexType,
    pub output_format: OutputFormat,
    pub srs: u32,
    pub verbose: bool,
    pub crossings: bool,
    pub platforms: bool,
    pub points: bool,
    pub railway_details: bool,
    pub stations: bool,
    pub stops: bool,
    /// User options followed by the driver defaults.
    pub creation_options: Vec<(String, String)>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            index_type: IndexType::SparseMemArray,
            output_format: OutputFormat::Sqlite,
            srs: 3857,
            verbose: false,
            crossings: true,
            platforms: true,
            points: true,
            railway_details: true,
            stations: true,
            stops: true,
            creation_options: Vec::new(),
        }
    }
}

/// Append the driver defaults for every key the user did not set.
pub fn merge_creation_options(format: OutputFormat, user: Vec<(String, String)>) -> Vec<(String, String)> {
    let mut merged = user;
    for (key, value) in format.default_creation_options() {
        if !merged.iter().any(|(k, _)| k.eq_ignore_ascii_case(key)) {
            merged.push((key.to_string(), value.to_string()));
        }
    }
    merged
}

/// Parse a `KEY=VALUE` command line argument.
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_output_format_names() {
        assert_eq!(OutputFormat::from_str("SQlite").ok(), Some(OutputFormat::Sqlite));
        assert_eq!(OutputFormat::from_str("SQLite").ok(), Some(OutputFormat::Sqlite));
        assert_eq!(OutputFormat::from_str("geojson").ok(), Some(OutputFormat::GeoJson));
        assert!(OutputFormat::from_str("ESRI Shapefile").is_err());
        assert_eq!(OutputFormat::Sqlite.to_string(), "SQlite");
    }

    #[test]
    fn test_index_type_names() {
        assert_eq!(IndexType::from_str("sparse_mem_array").ok(), Some(IndexType::SparseMemArray));
        assert_eq!(IndexType::from_str("hash").ok(), Some(IndexType::Hash));
        assert!(IndexType::from_str("dense_mmap_array").is_err());
    }

    #[test]
    fn test_defaults_do_not_override_user_options() {
        let user = vec![("spatial_index".to_string(), "YES".to_string())];
        let merged = merge_creation_options(OutputFormat::Sqlite, user);

        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0], ("spatial_index".to_string(), "YES".to_string()));
        assert!(merged.contains(&("OGR_SQLITE_SYNCHRONOUS".to_string(), "OFF".to_string())));
        assert!(merged.contains(&("FORMAT".to_string(), "WKT".to_string())));
    }

    #[test]
    fn test_geojson_defaults() {
        let merged = merge_creation_options(OutputFormat::GeoJson, Vec::new());
        assert_eq!(merged, vec![("COORDINATE_PRECISION".to_string(), "7".to_string())]);
    }

    #[test]
    fn test_parse_key_value() {
        assert_eq!(parse_key_value("A=B"), Ok(("A".to_string(), "B".to_string())));
        assert_eq!(parse_key_value("A="), Ok(("A".to_string(), String::new())));
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }
}
