//! Stations, platforms, stops and level crossings (second pass).

use chrono::{DateTime, Utc};
use osmi_ptv2::models::{Node, Tags, Way};

use crate::geometry::GeometryFactory;
use crate::on_track::MustOnTrack;
use crate::options::Options;
use crate::output::{FeatureBuilder, GeometryType, Layer, OutputError, SharedDataset};

/// Railway values of nodes that belong on a track.
const ON_TRACK_RAILWAY: &[&str] = &[
    "signal",
    "stop",
    "buffer_stop",
    "level_crossing",
    "milestone",
    "derail",
    "isolated_track_section",
    "switch",
    "railway_crossing",
];

const STATION_RAILWAY: &[&str] = &["station", "halt", "tram_stop"];
const CROSSING_BARRIERS: &[&str] = &["no", "yes", "half", "double_half", "full", "gates"];
const CROSSING_LIGHTS: &[&str] = &["yes", "no"];

const COMMON_FIELDS: [&str; 7] = [
    "lastchange",
    "name",
    "public_transport",
    "railway",
    "highway",
    "operator",
    "network",
];

/// ISO 8601 timestamp for `lastchange` fields.
pub fn format_timestamp(timestamp: Option<DateTime<Utc>>) -> String {
    timestamp
        .map(|t| t.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_default()
}

/// Keep `value` if it is one of `known`, otherwise `UNKNOWN`. A missing
/// tag is `NONE`.
fn normalize<'a>(value: Option<&'a str>, known: &[&str]) -> &'a str {
    match value {
        None => "NONE",
        Some(v) if known.contains(&v) => v,
        Some(_) => "UNKNOWN",
    }
}

#[derive(Clone, Copy)]
struct ExtraFields {
    refs: bool,
    amenity: bool,
}

fn stop_fields(id_field: &'static str, extra: ExtraFields) -> Vec<&'static str> {
    let mut fields = vec![id_field];
    fields.extend(COMMON_FIELDS);
    if extra.refs {
        fields.extend(["ref", "local_ref"]);
    }
    if extra.amenity {
        fields.push("amenity");
    }
    fields
}

fn set_tag_fields(feature: &mut FeatureBuilder<'_>, tags: &Tags, timestamp: Option<DateTime<Utc>>, extra: ExtraFields) {
    feature.set_field("lastchange", format_timestamp(timestamp));
    for key in ["railway", "public_transport", "highway", "name", "network", "operator"] {
        feature.set_field(key, tags.get(key).unwrap_or(""));
    }
    if extra.refs {
        feature.set_field("ref", tags.get("ref").unwrap_or(""));
        feature.set_field("local_ref", tags.get("local_ref").unwrap_or(""));
    }
    if extra.amenity {
        feature.set_field("amenity", tags.get("amenity").unwrap_or(""));
    }
}

#[derive(Clone, Copy)]
enum StopObject<'a> {
    Node(&'a Node),
    Way(&'a Way),
}

impl<'a> StopObject<'a> {
    fn tags(&self) -> &'a Tags {
        match self {
            StopObject::Node(n) => &n.tags,
            StopObject::Way(w) => &w.tags,
        }
    }
}

/// A point layer and its line counterpart for objects mapped as areas.
struct LayerPair {
    points: Layer,
    lines: Layer,
    extra: ExtraFields,
}

impl LayerPair {
    fn create(dataset: &SharedDataset, name: &str, extra: ExtraFields) -> Result<Self, OutputError> {
        Ok(Self {
            points: Layer::create(dataset, name, GeometryType::Point, &stop_fields("node_id", extra))?,
            lines: Layer::create(
                dataset,
                &format!("{}_l", name),
                GeometryType::LineString,
                &stop_fields("way_id", extra),
            )?,
            extra,
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RailwayStats {
    pub crossings: usize,
    pub stations: usize,
    pub platforms: usize,
    pub stops: usize,
    pub stops_only_highway: usize,
}

pub struct RailwayHandler {
    factory: GeometryFactory,
    railway_details: bool,
    crossings: Option<Layer>,
    stations: Option<LayerPair>,
    platforms: Option<LayerPair>,
    stops: Option<Layer>,
    stops_only_highway: Option<Layer>,
    stats: RailwayStats,
}

impl RailwayHandler {
    pub fn new(dataset: &SharedDataset, factory: GeometryFactory, options: &Options) -> Result<Self, OutputError> {
        let crossings = if options.crossings {
            Some(Layer::create(
                dataset,
                "crossings",
                GeometryType::Point,
                &["node_id", "lastchange", "barrier", "lights"],
            )?)
        } else {
            None
        };
        let stops = if options.stops {
            Some(Layer::create(
                dataset,
                "stops",
                GeometryType::Point,
                &stop_fields("node_id", ExtraFields { refs: true, amenity: false }),
            )?)
        } else {
            None
        };
        let platforms = if options.platforms {
            Some(LayerPair::create(dataset, "platforms", ExtraFields { refs: true, amenity: false })?)
        } else {
            None
        };
        let stations = if options.stations {
            Some(LayerPair::create(dataset, "stations", ExtraFields { refs: false, amenity: true })?)
        } else {
            None
        };
        let stops_only_highway = if options.stops || options.platforms {
            Some(Layer::create(
                dataset,
                "stops_only_highway",
                GeometryType::Point,
                &stop_fields("node_id", ExtraFields { refs: false, amenity: false }),
            )?)
        } else {
            None
        };

        Ok(Self {
            factory,
            railway_details: options.railway_details,
            crossings,
            stations,
            platforms,
            stops,
            stops_only_highway,
            stats: RailwayStats::default(),
        })
    }

    pub fn stats(&self) -> RailwayStats {
        self.stats
    }

    /// Write the node to its layers and register it in `on_track` if it
    /// must be part of a way.
    pub fn node(&mut self, node: &Node, on_track: &mut MustOnTrack) -> Result<(), OutputError> {
        if node.location.is_none() {
            return Ok(());
        }
        let railway = node.tags.get("railway");
        let public_transport = node.tags.get("public_transport");

        let on_track_railway = self.railway_details && railway.is_some_and(|r| ON_TRACK_RAILWAY.contains(&r));
        if on_track_railway || public_transport == Some("stop_position") {
            on_track.add(node.clone());
        }

        self.handle_stop(StopObject::Node(node))?;

        if matches!(railway, Some("level_crossing" | "crossing")) {
            self.handle_crossing(node)?;
        }
        Ok(())
    }

    pub fn way(&mut self, way: &Way) -> Result<(), OutputError> {
        if self.stations.is_some() || self.platforms.is_some() || self.stops.is_some() {
            self.handle_stop(StopObject::Way(way))?;
        }
        Ok(())
    }

    fn handle_crossing(&mut self, node: &Node) -> Result<(), OutputError> {
        let Some(layer) = &self.crossings else {
            return Ok(());
        };
        let barrier = normalize(node.tags.get("crossing:barrier"), CROSSING_BARRIERS);
        let lights = normalize(node.tags.get("crossing:light"), CROSSING_LIGHTS);
        let point = match self.factory.create_point(node.id, node.location) {
            Ok(point) => point,
            Err(err) => {
                log::debug!("{}", err);
                return Ok(());
            }
        };

        let mut feature = layer.feature(point);
        feature.set_field("node_id", node.id.to_string());
        feature.set_field("lastchange", format_timestamp(node.timestamp));
        feature.set_field("barrier", barrier);
        feature.set_field("lights", lights);
        feature.add_to_layer()?;
        self.stats.crossings += 1;
        Ok(())
    }

    fn handle_stop(&mut self, object: StopObject<'_>) -> Result<(), OutputError> {
        let tags = object.tags();
        let railway = tags.get("railway");
        let public_transport = tags.get("public_transport");

        if let Some(stations) = &self.stations {
            let is_station = public_transport == Some("station")
                || railway.is_some_and(|r| STATION_RAILWAY.contains(&r))
                || tags.has_tag("amenity", "bus_station");
            if is_station {
                if Self::add_to_pair(&self.factory, stations, &object)? {
                    self.stats.stations += 1;
                }
                return Ok(());
            }
        }

        if let Some(platforms) = &self.platforms {
            if public_transport == Some("platform") || railway == Some("platform") {
                if Self::add_to_pair(&self.factory, platforms, &object)? {
                    self.stats.platforms += 1;
                }
                return Ok(());
            }
        }

        let StopObject::Node(node) = object else {
            return Ok(());
        };

        if let Some(stops) = &self.stops {
            if public_transport == Some("stop_position") {
                if Self::add_node(&self.factory, stops, node, ExtraFields { refs: true, amenity: false })? {
                    self.stats.stops += 1;
                }
                return Ok(());
            }
        }

        if let Some(layer) = &self.stops_only_highway {
            if tags.has_tag("highway", "bus_stop") && public_transport.is_none() {
                let extra = ExtraFields { refs: false, amenity: false };
                if Self::add_node(&self.factory, layer, node, extra)? {
                    self.stats.stops_only_highway += 1;
                }
            }
        }
        Ok(())
    }

    fn add_to_pair(factory: &GeometryFactory, pair: &LayerPair, object: &StopObject<'_>) -> Result<bool, OutputError> {
        match object {
            StopObject::Node(node) => Self::add_node(factory, &pair.points, node, pair.extra),
            StopObject::Way(way) => Self::add_way(factory, &pair.lines, way, pair.extra),
        }
    }

    /// Returns whether a feature was written.
    fn add_node(factory: &GeometryFactory, layer: &Layer, node: &Node, extra: ExtraFields) -> Result<bool, OutputError> {
        let point = match factory.create_point(node.id, node.location) {
            Ok(point) => point,
            Err(err) => {
                log::debug!("{}", err);
                return Ok(false);
            }
        };
        let mut feature = layer.feature(point);
        feature.set_field("node_id", node.id.to_string());
        set_tag_fields(&mut feature, &node.tags, node.timestamp, extra);
        feature.add_to_layer()?;
        Ok(true)
    }

    fn add_way(factory: &GeometryFactory, layer: &Layer, way: &Way, extra: ExtraFields) -> Result<bool, OutputError> {
        let line = match factory.create_linestring(way) {
            Ok(line) => line,
            Err(err) => {
                log::debug!("skipping way {} in layer {}: {}", way.id, layer.name(), err);
                return Ok(false);
            }
        };
        let mut feature = layer.feature(line);
        feature.set_field("way_id", way.id.to_string());
        set_tag_fields(&mut feature, &way.tags, way.timestamp, extra);
        feature.add_to_layer()?;
        Ok(true)
    }
}
