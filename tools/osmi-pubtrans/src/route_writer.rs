//! Writes validated routes and their error features.

use geo::Coord;
use osmi_ptv2::models::{MemberObject, ObjectId, Relation, RouteError, Way};
use osmi_ptv2::sink::RouteSink;

use crate::geometry::GeometryFactory;
use crate::output::{truncate, FeatureBuilder, GeometryType, Layer, OutputError, SharedDataset};

/// Relation tags copied into every route and error feature.
const RELATION_FIELDS: [&str; 6] = ["from", "to", "via", "ref", "name", "route"];

const MAX_ERROR_LENGTH: usize = 50;

/// Roles of way members that make up the route geometry of a valid route.
const ROUTE_ROLES: [&str; 3] = ["", "forward", "backward"];

pub struct RouteWriter {
    factory: GeometryFactory,
    routes_valid: Layer,
    routes_invalid: Layer,
    error_lines: Layer,
    error_points: Layer,
    /// First write failure. The sink interface cannot fail, so it is kept
    /// for [`RouteWriter::finish`].
    failure: Option<OutputError>,
}

fn field_list(extra: &[&'static str]) -> Vec<&'static str> {
    let mut fields = vec!["rel_id"];
    fields.extend(RELATION_FIELDS);
    fields.extend_from_slice(extra);
    fields
}

fn set_relation_fields(feature: &mut FeatureBuilder<'_>, relation: &Relation) {
    feature.set_field("rel_id", relation.id.to_string());
    for key in RELATION_FIELDS {
        if let Some(value) = relation.tags.get(key) {
            feature.set_field(key, value);
        }
    }
}

impl RouteWriter {
    pub fn new(dataset: &SharedDataset, factory: GeometryFactory) -> Result<Self, OutputError> {
        let mut invalid_fields = field_list(&["operator"]);
        invalid_fields.extend(RouteError::FLAGS.iter().map(|(_, column)| *column));
        let error_fields = field_list(&["way_id", "node_id", "error"]);

        Ok(Self {
            factory,
            routes_valid: Layer::create(
                dataset,
                "ptv2_routes_valid",
                GeometryType::MultiLineString,
                &field_list(&["operator"]),
            )?,
            routes_invalid: Layer::create(dataset, "ptv2_routes_invalid", GeometryType::MultiLineString, &invalid_fields)?,
            error_lines: Layer::create(dataset, "ptv2_error_lines", GeometryType::LineString, &error_fields)?,
            error_points: Layer::create(dataset, "ptv2_error_points", GeometryType::Point, &error_fields)?,
            failure: None,
        })
    }

    /// Return the first error that occurred while writing.
    pub fn finish(&mut self) -> Result<(), OutputError> {
        match self.failure.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn record(&mut self, result: Result<(), OutputError>) {
        if let Err(err) = result {
            log::debug!("failed to write feature: {}", err);
            if self.failure.is_none() {
                self.failure = Some(err);
            }
        }
    }

    fn route_feature<'a>(
        layer: &'a Layer,
        factory: &GeometryFactory,
        relation: &Relation,
        ways: Vec<&Way>,
    ) -> FeatureBuilder<'a> {
        let mut feature = layer.feature(factory.create_multilinestring(ways));
        set_relation_fields(&mut feature, relation);
        if let Some(operator) = relation.tags.get("operator") {
            feature.set_field("operator", operator);
        }
        feature
    }
}

impl RouteSink for RouteWriter {
    fn write_error_point(
        &mut self,
        relation: &Relation,
        node_id: ObjectId,
        location: Option<Coord<f64>>,
        message: &str,
        way_id: ObjectId,
    ) {
        if self.failure.is_some() {
            return;
        }
        let point = match self.factory.create_point(node_id, location) {
            Ok(point) => point,
            Err(err) => {
                log::debug!("relation {}: skipping error point: {}", relation.id, err);
                return;
            }
        };
        let mut feature = self.error_points.feature(point);
        set_relation_fields(&mut feature, relation);
        feature.set_field("way_id", way_id.to_string());
        feature.set_field("node_id", node_id.to_string());
        feature.set_field("error", truncate(message, MAX_ERROR_LENGTH));
        let result = feature.add_to_layer();
        self.record(result);
    }

    fn write_error_way(&mut self, relation: &Relation, node_id: ObjectId, message: &str, way: &Way) {
        if self.failure.is_some() {
            return;
        }
        let line = match self.factory.create_linestring(way) {
            Ok(line) => line,
            Err(err) => {
                log::debug!("relation {}: skipping error line: {}", relation.id, err);
                return;
            }
        };
        let mut feature = self.error_lines.feature(line);
        set_relation_fields(&mut feature, relation);
        feature.set_field("way_id", way.id.to_string());
        feature.set_field("node_id", node_id.to_string());
        feature.set_field("error", truncate(message, MAX_ERROR_LENGTH));
        let result = feature.add_to_layer();
        self.record(result);
    }

    fn write_valid_route(&mut self, relation: &Relation, members: &[MemberObject<'_>]) {
        if self.failure.is_some() {
            return;
        }
        let ways: Vec<&Way> = relation
            .members
            .iter()
            .zip(members)
            .filter(|(member, _)| ROUTE_ROLES.contains(&member.role.as_str()))
            .filter_map(|(_, object)| object.as_way())
            .collect();
        let feature = Self::route_feature(&self.routes_valid, &self.factory, relation, ways);
        let result = feature.add_to_layer();
        self.record(result);
    }

    fn write_invalid_route(&mut self, relation: &Relation, members: &[MemberObject<'_>], error: RouteError) {
        if self.failure.is_some() {
            return;
        }
        let ways: Vec<&Way> = members.iter().filter_map(|object| object.as_way()).collect();
        let mut feature = Self::route_feature(&self.routes_invalid, &self.factory, relation, ways);
        for (_, column) in error.iter() {
            feature.set_field(column, "T");
        }
        let result = feature.add_to_layer();
        self.record(result);
    }
}
