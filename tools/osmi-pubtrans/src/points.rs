//! Railway switches and nodes missing from the track network (third pass).

use osmi_ptv2::models::{Node, Way};

use crate::geometry::GeometryFactory;
use crate::on_track::MustOnTrack;
use crate::options::Options;
use crate::output::{GeometryType, Layer, OutputError, SharedDataset};
use crate::railway::format_timestamp;
use crate::restrictions::ViaNodes;

const ON_TRACK_ERROR: &str = "not on a way";

/// `type` value of a switch.
fn switch_type(node: &Node, via_nodes: &ViaNodes) -> &'static str {
    match node.tags.get("railway:switch") {
        Some("default") => "default",
        Some("double_slip") => "double_slip",
        Some("single_slip") if via_nodes.contains(node.id) => "single_slip",
        Some("single_slip") => "single_slip_incomplete",
        Some(_) => "UNKNOWN_VALUE",
        None => "",
    }
}

pub struct PointsHandler {
    factory: GeometryFactory,
    points: Option<Layer>,
    on_track: Layer,
    written_points: usize,
}

impl PointsHandler {
    pub fn new(dataset: &SharedDataset, factory: GeometryFactory, options: &Options) -> Result<Self, OutputError> {
        let points = if options.points {
            Some(Layer::create(
                dataset,
                "points",
                GeometryType::Point,
                &["node_id", "lastchange", "type", "ref"],
            )?)
        } else {
            None
        };
        let on_track = Layer::create(
            dataset,
            "on_track",
            GeometryType::Point,
            &["node_id", "lastchange", "type", "error"],
        )?;
        Ok(Self {
            factory,
            points,
            on_track,
            written_points: 0,
        })
    }

    pub fn node(&mut self, node: &Node, via_nodes: &ViaNodes) -> Result<(), OutputError> {
        let Some(layer) = &self.points else {
            return Ok(());
        };
        if !node.tags.has_tag("railway", "switch") {
            return Ok(());
        }
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
        feature.set_field("type", switch_type(node, via_nodes));
        feature.set_field("ref", node.tags.get("ref").unwrap_or(""));
        feature.add_to_layer()?;
        self.written_points += 1;
        Ok(())
    }

    pub fn way(&mut self, way: &Way, on_track: &mut MustOnTrack) {
        on_track.remove_way_nodes(way);
    }

    /// Report every node left in `on_track`. Returns the number of
    /// features written.
    pub fn after_ways(&mut self, on_track: &MustOnTrack) -> Result<usize, OutputError> {
        let mut written = 0;
        for node in on_track.remaining() {
            let railway = node.tags.get("railway");
            let public_transport = node.tags.get("public_transport");
            let Some(kind) = public_transport.or(railway) else {
                continue;
            };
            // Railway-only nodes belong to the points output.
            if public_transport.is_none() && self.points.is_none() {
                continue;
            }
            let Ok(point) = self.factory.create_point(node.id, node.location) else {
                continue;
            };

            let mut feature = self.on_track.feature(point);
            feature.set_field("node_id", node.id.to_string());
            feature.set_field("lastchange", format_timestamp(node.timestamp));
            feature.set_field("type", kind);
            feature.set_field("error", ON_TRACK_ERROR);
            feature.add_to_layer()?;
            written += 1;
        }
        Ok(written)
    }

    pub fn written_points(&self) -> usize {
        self.written_points
    }
}
