//! Tag and role predicates.
//!
//! Pure functions over tags and role strings. They decide how a route is
//! classified and whether a way may be used by a given vehicle type.

use std::str::FromStr;

use crate::models::{RouteType, Tags};

const STOP_ROLES: &[&str] = &["stop", "stop_entry_only", "stop_exit_only"];
const PLATFORM_ROLES: &[&str] = &["platform", "platform_entry_only", "platform_exit_only"];

const RAIL_TRACKS: &[&str] = &[
    "rail",
    "light_rail",
    "tram",
    "subway",
    "funicular",
    "miniature",
    "narrow_gauge",
    "preserved",
];

const ROAD_CLASSES: &[&str] = &[
    "motorway",
    "motorway_link",
    "trunk",
    "trunk_link",
    "primary",
    "primary_link",
    "secondary",
    "secondary_link",
    "tertiary",
    "tertiary_link",
    "unclassified",
    "residential",
    "service",
    "track",
    "living_street",
    "pedestrian",
];

/// Vehicle type for a `route` tag value. Unknown values map to `None`.
pub fn route_type_of(route: &str) -> RouteType {
    RouteType::from_str(route).unwrap_or(RouteType::None)
}

pub fn is_stop(role: &str) -> bool {
    STOP_ROLES.contains(&role)
}

pub fn is_platform(role: &str) -> bool {
    PLATFORM_ROLES.contains(&role)
}

/// Does the object carry `<vehicle>=yes` for the route type?
pub fn vehicle_tags_match_route_type(tags: &Tags, route_type: RouteType) -> bool {
    match route_type {
        RouteType::None => false,
        other => tags.has_tag(&other.to_string(), "yes"),
    }
}

/// `route=ferry`, or no `route` tag at all if `permit_untagged` is set.
pub fn is_ferry(tags: &Tags, permit_untagged: bool) -> bool {
    match tags.get("route") {
        Some(route) => route == "ferry",
        None => permit_untagged,
    }
}

pub fn is_valid_railway_track(route_type: RouteType, tags: &Tags) -> bool {
    if !tags.has_key("railway") {
        return is_ferry(tags, false);
    }
    match route_type {
        // Train ferries carry a `railway` tag as well.
        RouteType::Train | RouteType::Tram => tags.value_in("railway", RAIL_TRACKS) || is_ferry(tags, false),
        // Subway networks use too many different track tags to check them.
        RouteType::Subway => true,
        _ => is_ferry(tags, false),
    }
}

pub fn is_valid_road_way(tags: &Tags) -> bool {
    if !tags.has_key("highway") {
        return is_ferry(tags, false);
    }
    tags.value_in("highway", ROAD_CLASSES)
}

/// Road way with a trolley wire.
///
/// Only checks that there is a wire, not that it runs in the direction
/// of travel.
pub fn is_valid_trolleybus_way(tags: &Tags) -> bool {
    if !is_valid_road_way(tags) {
        return false;
    }
    tags.value_in("trolley_wire", &["yes", "forward", "backward"])
        || tags.has_tag("trolley_wire:forward", "yes")
        || tags.has_tag("trolley_wire:backward", "yes")
}
