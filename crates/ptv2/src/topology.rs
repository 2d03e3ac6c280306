//! Connectivity tests between consecutive ways of a route.
//!
//! All comparisons are done on node ids. Locations are never compared, so
//! two ways meeting at distinct but co-located nodes are not connected.

use crate::models::{ObjectId, Way, WayEnd};

/// Which end of `way` touches either end of `previous`?
///
/// The front of `way` is tested first. The returned end is the one that is
/// connected; the open end of the chain is its opposite.
pub fn shared_endpoint(way: &Way, previous: &Way) -> Option<WayEnd> {
    let (prev_front, prev_back) = (previous.front_id()?, previous.back_id()?);
    let touches = |id: Option<ObjectId>| id.is_some_and(|id| id == prev_front || id == prev_back);

    if touches(way.front_id()) {
        Some(WayEnd::Front)
    } else if touches(way.back_id()) {
        Some(WayEnd::Back)
    } else {
        None
    }
}

/// Does any node of `roundabout` match the open end of `previous`?
pub fn roundabout_connected_to_previous_way(open_end: WayEnd, previous: &Way, roundabout: &Way) -> bool {
    previous
        .node_at(open_end)
        .is_some_and(|node| roundabout.contains_node(node.id))
}

/// Does any node of `roundabout` match either end of `previous`?
///
/// Used when the roundabout is the second way of a chain and the open end
/// of `previous` is not known yet.
pub fn roundabout_as_second_after_gap(previous: &Way, roundabout: &Way) -> bool {
    roundabout.nodes.iter().any(|node| {
        Some(node.id) == previous.front_id() || Some(node.id) == previous.back_id()
    })
}

/// Which end of `way` stays open after leaving `roundabout`?
///
/// The roundabout nodes are walked in order and the first one matching the
/// front or the back of `way` decides. `None` if `way` does not touch the
/// roundabout at all.
pub fn roundabout_connected_to_next_way(roundabout: &Way, way: &Way) -> Option<WayEnd> {
    let (front, back) = (way.front_id()?, way.back_id()?);
    roundabout.nodes.iter().find_map(|node| {
        if node.id == front {
            Some(WayEnd::Back)
        } else if node.id == back {
            Some(WayEnd::Front)
        } else {
            None
        }
    })
}
