//! OSM objects as seen by the route validator.
//!
//! These are owned copies of what the PBF reader produces, with node
//! locations already resolved into the way's node list where available.

use chrono::{DateTime, Utc};
use geo::Coord;

use super::tags::Tags;

/// OSM object id. Ids are unique per object type only.
pub type ObjectId = i64;

/// A node reference inside a way, with the location if it could be resolved.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeRef {
    pub id: ObjectId,
    pub location: Option<Coord<f64>>,
}

impl NodeRef {
    pub fn new(id: ObjectId, location: Option<Coord<f64>>) -> Self {
        Self { id, location }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub id: ObjectId,
    pub location: Option<Coord<f64>>,
    pub tags: Tags,
    pub timestamp: Option<DateTime<Utc>>,
}

/// One of the two open ends of a way.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WayEnd {
    Front,
    Back,
}

impl WayEnd {
    pub fn opposite(self) -> Self {
        match self {
            WayEnd::Front => WayEnd::Back,
            WayEnd::Back => WayEnd::Front,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Way {
    pub id: ObjectId,
    pub nodes: Vec<NodeRef>,
    pub tags: Tags,
    pub timestamp: Option<DateTime<Utc>>,
}

impl Way {
    pub fn front(&self) -> Option<&NodeRef> {
        self.nodes.first()
    }

    pub fn back(&self) -> Option<&NodeRef> {
        self.nodes.last()
    }

    pub fn front_id(&self) -> Option<ObjectId> {
        self.front().map(|n| n.id)
    }

    pub fn back_id(&self) -> Option<ObjectId> {
        self.back().map(|n| n.id)
    }

    pub fn node_at(&self, end: WayEnd) -> Option<&NodeRef> {
        match end {
            WayEnd::Front => self.front(),
            WayEnd::Back => self.back(),
        }
    }

    /// First and last node reference have the same id.
    ///
    /// Only compares ids, so a way whose ends sit on the same location but
    /// are different nodes is not closed.
    pub fn ends_have_same_id(&self) -> bool {
        self.nodes.len() > 1 && self.front_id() == self.back_id()
    }

    pub fn is_closed(&self) -> bool {
        self.ends_have_same_id()
    }

    /// Closed way tagged `junction=roundabout`.
    pub fn is_roundabout(&self) -> bool {
        self.tags.has_tag("junction", "roundabout") && self.is_closed()
    }

    pub fn contains_node(&self, id: ObjectId) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemberType {
    Node,
    Way,
    Relation,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelationMember {
    pub member_type: MemberType,
    pub id: ObjectId,
    pub role: String,
}

impl RelationMember {
    pub fn new(member_type: MemberType, id: ObjectId, role: impl Into<String>) -> Self {
        Self {
            member_type,
            id,
            role: role.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Relation {
    pub id: ObjectId,
    pub tags: Tags,
    pub members: Vec<RelationMember>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// The resolved object behind a relation member.
///
/// `Missing` stands for a member that was not present in the input.
#[derive(Clone, Copy, Debug)]
pub enum MemberObject<'a> {
    Node(&'a Node),
    Way(&'a Way),
    Relation(&'a Relation),
    Missing,
}

impl<'a> MemberObject<'a> {
    pub fn is_missing(&self) -> bool {
        matches!(self, MemberObject::Missing)
    }

    pub fn as_way(&self) -> Option<&'a Way> {
        match self {
            MemberObject::Way(way) => Some(way),
            _ => None,
        }
    }

    pub fn id(&self) -> Option<ObjectId> {
        match self {
            MemberObject::Node(n) => Some(n.id),
            MemberObject::Way(w) => Some(w.id),
            MemberObject::Relation(r) => Some(r.id),
            MemberObject::Missing => None,
        }
    }

    pub fn tags(&self) -> Option<&'a Tags> {
        match self {
            MemberObject::Node(n) => Some(&n.tags),
            MemberObject::Way(w) => Some(&w.tags),
            MemberObject::Relation(r) => Some(&r.tags),
            MemberObject::Missing => None,
        }
    }
}
