//! Output side of the validator.
//!
//! The checker reports every problem it finds to a [`RouteSink`] as soon as
//! it sees it, and the route manager hands over the final verdict.

use geo::Coord;

use crate::models::{MemberObject, ObjectId, Relation, RouteError, Way};

/// Receives error features and route geometries.
///
/// Implementations must accept any number of error reports per relation
/// and must not fail on degenerate geometries. Such features are skipped.
pub trait RouteSink {
    /// Error located at a single node.
    fn write_error_point(
        &mut self,
        relation: &Relation,
        node_id: ObjectId,
        location: Option<Coord<f64>>,
        message: &str,
        way_id: ObjectId,
    );

    /// Error located along a way. `node_id` is 0 if no node is involved.
    fn write_error_way(&mut self, relation: &Relation, node_id: ObjectId, message: &str, way: &Way);

    fn write_valid_route(&mut self, relation: &Relation, members: &[MemberObject<'_>]);

    fn write_invalid_route(&mut self, relation: &Relation, members: &[MemberObject<'_>], error: RouteError);

    /// Report an error on whatever kind of object a member is.
    ///
    /// Nodes become error points, ways become error lines. Relations and
    /// missing members have no geometry and are not written.
    fn write_error_object(&mut self, relation: &Relation, object: MemberObject<'_>, node_id: ObjectId, message: &str) {
        match object {
            MemberObject::Node(node) => {
                self.write_error_point(relation, node.id, node.location, message, 0);
            }
            MemberObject::Way(way) => self.write_error_way(relation, node_id, message, way),
            MemberObject::Relation(_) | MemberObject::Missing => {}
        }
    }
}
