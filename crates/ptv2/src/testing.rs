//! Object builders and a recording sink for unit tests.

use geo::Coord;

use crate::models::{
    MemberObject, MemberType, Node, NodeRef, ObjectId, Relation, RelationMember, RouteError, Tags, Way,
};
use crate::sink::RouteSink;

pub fn tags(pairs: &[(&str, &str)]) -> Tags {
    pairs.iter().copied().collect()
}

/// Deterministic location for a node id.
pub fn location(id: ObjectId) -> Coord<f64> {
    Coord {
        x: 9.0 + id as f64 * 0.001,
        y: 50.0,
    }
}

pub fn node(id: ObjectId, tags: Tags) -> Node {
    Node {
        id,
        location: Some(location(id)),
        tags,
        timestamp: None,
    }
}

pub fn way(id: ObjectId, node_ids: &[ObjectId], tags: Tags) -> Way {
    Way {
        id,
        nodes: node_ids
            .iter()
            .map(|&n| NodeRef::new(n, Some(location(n))))
            .collect(),
        tags,
        timestamp: None,
    }
}

pub fn relation(id: ObjectId, tags: Tags, members: &[(MemberType, ObjectId, &str)]) -> Relation {
    Relation {
        id,
        tags,
        members: members
            .iter()
            .map(|&(member_type, member_id, role)| RelationMember::new(member_type, member_id, role))
            .collect(),
        timestamp: None,
    }
}

fn route_tags(route: &str) -> Tags {
    tags(&[
        ("type", "route"),
        ("route", route),
        ("public_transport:version", "2"),
        ("name", "Test line"),
        ("ref", "1"),
    ])
}

pub fn bus_route_tags() -> Tags {
    route_tags("bus")
}

pub fn train_route_tags() -> Tags {
    route_tags("train")
}

pub fn light_rail_route_tags() -> Tags {
    route_tags("light_rail")
}

/// All-missing member list matching a relation's length.
pub fn missing_members(relation: &Relation) -> Vec<MemberObject<'static>> {
    vec![MemberObject::Missing; relation.members.len()]
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedError {
    pub relation: ObjectId,
    pub node_id: ObjectId,
    pub way_id: ObjectId,
    pub message: String,
}

/// Sink that keeps every call for later inspection.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub error_points: Vec<RecordedError>,
    pub error_ways: Vec<RecordedError>,
    pub valid_routes: Vec<ObjectId>,
    pub invalid_routes: Vec<(ObjectId, RouteError)>,
}

impl RecordingSink {
    pub fn error_count(&self) -> usize {
        self.error_points.len() + self.error_ways.len()
    }

    pub fn error_ways_with(&self, message: &str) -> Vec<&RecordedError> {
        self.error_ways.iter().filter(|e| e.message == message).collect()
    }
}

impl RouteSink for RecordingSink {
    fn write_error_point(
        &mut self,
        relation: &Relation,
        node_id: ObjectId,
        _location: Option<Coord<f64>>,
        message: &str,
        way_id: ObjectId,
    ) {
        self.error_points.push(RecordedError {
            relation: relation.id,
            node_id,
            way_id,
            message: message.to_string(),
        });
    }

    fn write_error_way(&mut self, relation: &Relation, node_id: ObjectId, message: &str, way: &Way) {
        self.error_ways.push(RecordedError {
            relation: relation.id,
            node_id,
            way_id: way.id,
            message: message.to_string(),
        });
    }

    fn write_valid_route(&mut self, relation: &Relation, _members: &[MemberObject<'_>]) {
        self.valid_routes.push(relation.id);
    }

    fn write_invalid_route(&mut self, relation: &Relation, _members: &[MemberObject<'_>], error: RouteError) {
        self.invalid_routes.push((relation.id, error));
    }
}
