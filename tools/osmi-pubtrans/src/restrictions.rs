//! Via nodes of turn restrictions.
//!
//! Slip switches are modelled with turn restrictions on their via node, so
//! a `single_slip` switch without one is reported as incomplete.

use hashbrown::HashSet;
use osmi_ptv2::models::{MemberType, ObjectId, Relation};

#[derive(Debug, Default)]
pub struct ViaNodes {
    nodes: HashSet<ObjectId>,
}

impl ViaNodes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the `via` node members of a `type=restriction` relation.
    pub fn relation(&mut self, relation: &Relation) {
        if !relation.tags.has_tag("type", "restriction") {
            return;
        }
        self.nodes.extend(
            relation
                .members
                .iter()
                .filter(|m| m.member_type == MemberType::Node && m.role == "via")
                .map(|m| m.id),
        );
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.nodes.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}
