//! Role, member order and tagging checks.

use log::debug;

use super::PTv2Checker;
use crate::models::{MemberObject, MemberType, Node, Relation, RouteError, RouteType, Way};
use crate::predicates::{
    is_ferry, is_platform, is_stop, is_valid_railway_track, is_valid_road_way, is_valid_trolleybus_way,
    route_type_of, vehicle_tags_match_route_type,
};
use crate::sink::RouteSink;

impl<S: RouteSink + ?Sized> PTv2Checker<'_, S> {
    /// Check roles and their order without looking at any geometry.
    ///
    /// Stops and platforms have to come first, followed by the ways with an
    /// empty role. Role and order checks rely on the member types of the
    /// relation, so they work on missing members too. Tag checks are only
    /// done on members that were found in the input.
    pub fn check_roles_order_and_type(&mut self, relation: &Relation, members: &[MemberObject<'_>]) -> RouteError {
        let route_type = route_type_of(relation.tags.get("route").unwrap_or_default());
        let mut error = Self::flag_if(route_type == RouteType::None, RouteError::UNKNOWN_TYPE);

        let incomplete = members.iter().any(MemberObject::is_missing);
        let mut seen_road_member = false;
        let mut seen_stop_platform = false;

        for (member, object) in relation.members.iter().zip(members.iter().copied()) {
            let role = member.role.as_str();
            if role.is_empty() {
                if member.member_type != MemberType::Way {
                    error |= RouteError::EMPTY_ROLE_NON_WAY;
                    self.writer
                        .write_error_object(relation, object, 0, "empty role for non-way object");
                    continue;
                }
                if !seen_stop_platform {
                    error |= RouteError::NO_STOPPLTF_AT_FRONT;
                    self.writer
                        .write_error_object(relation, object, 0, "no stop/platform at the beginning");
                }
                seen_road_member = true;
                if let MemberObject::Way(way) = object {
                    error |= self.is_way_usable(relation, route_type, way);
                }
            } else if seen_road_member && (is_stop(role) || is_platform(role)) {
                error |= RouteError::STOPPLTF_AFTER_ROUTE;
                self.writer
                    .write_error_object(relation, object, 0, "stop/platform after route");
            } else if is_stop(role) {
                seen_stop_platform = true;
                if member.member_type != MemberType::Node {
                    error |= RouteError::STOP_IS_NOT_NODE;
                    self.writer.write_error_object(relation, object, 0, "stop is not a node");
                } else if let MemberObject::Node(node) = object {
                    // Reported, but tag problems do not make the route invalid.
                    self.check_stop_tags(relation, node, route_type);
                }
            } else if is_platform(role) {
                seen_stop_platform = true;
                if !object.is_missing() {
                    self.check_platform_tags(relation, route_type, object);
                }
            } else {
                error |= RouteError::UNKNOWN_ROLE;
                let message = format!("unknown role '{}'", role);
                self.writer.write_error_object(relation, object, 0, &message);
            }
        }

        if !seen_road_member && !incomplete {
            error |= RouteError::NO_ROUTE;
            for object in members.iter().copied() {
                self.writer.write_error_object(relation, object, 0, "no way members");
            }
        }

        if !error.is_clean() {
            debug!("relation {}: role check found {}", relation.id, error);
        }
        error
    }

    /// Is `way` usable by the vehicle type of the route?
    pub fn is_way_usable(&mut self, relation: &Relation, route_type: RouteType, way: &Way) -> RouteError {
        let (flag, message) = match route_type {
            RouteType::Train | RouteType::Tram | RouteType::Subway => (
                Self::flag_if(!is_valid_railway_track(route_type, &way.tags), RouteError::OVER_NON_RAIL),
                "rail route over non-rail way",
            ),
            RouteType::Bus => (
                Self::flag_if(!is_valid_road_way(&way.tags), RouteError::OVER_NON_ROAD),
                "road vehicle route over non-road way",
            ),
            RouteType::Trolleybus => (
                Self::flag_if(!is_valid_trolleybus_way(&way.tags), RouteError::NO_TROLLEY_WIRE),
                "trolleybus route without trolley wire",
            ),
            RouteType::Ferry => (
                Self::flag_if(!is_ferry(&way.tags, true), RouteError::NO_FERRY),
                "ferry route over non-ferry way",
            ),
            RouteType::Aerialway | RouteType::None => (RouteError::CLEAN, ""),
        };
        if !flag.is_clean() {
            self.writer.write_error_way(relation, 0, message, way);
        }
        flag
    }

    /// Is the stop node tagged as a stop position of this vehicle type?
    pub fn check_stop_tags(&mut self, relation: &Relation, node: &Node, route_type: RouteType) -> RouteError {
        let tags = &node.tags;
        if tags.has_tag("public_transport", "stop_position") && vehicle_tags_match_route_type(tags, route_type) {
            return RouteError::CLEAN;
        }
        let tagged = match route_type {
            RouteType::Bus | RouteType::Trolleybus => tags.has_tag("highway", "bus_stop"),
            RouteType::Train => tags.value_in("railway", &["station", "halt", "tram_stop"]),
            RouteType::Tram => tags.has_tag("railway", "tram_stop"),
            RouteType::Subway => tags.has_tag("railway", "station"),
            RouteType::Ferry => tags.has_tag("amenity", "ferry_terminal"),
            RouteType::Aerialway => tags.has_tag("aerialway", "station"),
            RouteType::None => false,
        };
        if tagged {
            return RouteError::CLEAN;
        }
        self.writer
            .write_error_point(relation, node.id, node.location, "stop without proper tags", 0);
        RouteError::STOP_TAG_MISSING
    }

    /// Is the platform (node, way or area) tagged as a platform?
    pub fn check_platform_tags(&mut self, relation: &Relation, route_type: RouteType, object: MemberObject<'_>) -> RouteError {
        let Some(tags) = object.tags() else {
            return RouteError::CLEAN;
        };
        if tags.has_tag("public_transport", "platform") {
            return RouteError::CLEAN;
        }
        let tagged = match route_type {
            RouteType::Bus | RouteType::Trolleybus => tags.value_in("highway", &["bus_stop", "platform"]),
            RouteType::Train | RouteType::Tram | RouteType::Subway => tags.has_tag("railway", "platform"),
            _ => false,
        };
        if tagged {
            return RouteError::CLEAN;
        }
        self.writer
            .write_error_object(relation, object, 0, "platform without proper tags");
        RouteError::PLTF_TAG_MISSING
    }
}
