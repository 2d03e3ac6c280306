//! Route classification and error flags.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

use strum::{Display, EnumString};
use thiserror::Error;

use super::osm::ObjectId;

// ============================================================================
// Route type
// ============================================================================

/// Vehicle type of a route relation, taken from its `route` tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum RouteType {
    None,
    Bus,
    Trolleybus,
    Aerialway,
    Ferry,
    Train,
    Tram,
    Subway,
}

// ============================================================================
// Route error bitset
// ============================================================================

/// Set of problems found on one route relation.
///
/// Flags are independent and accumulate over both validation phases. An
/// empty set means the route is valid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RouteError(u32);

impl RouteError {
    pub const CLEAN: Self = Self(0);
    pub const OVER_NON_RAIL: Self = Self(1);
    pub const OVER_NON_ROAD: Self = Self(1 << 1);
    pub const NO_TROLLEY_WIRE: Self = Self(1 << 2);
    pub const UNORDERED_GAP: Self = Self(1 << 3);
    pub const WRONG_STRUCTURE: Self = Self(1 << 4);
    pub const NO_STOPPLTF_AT_FRONT: Self = Self(1 << 5);
    pub const EMPTY_ROLE_NON_WAY: Self = Self(1 << 6);
    pub const STOPPLTF_AFTER_ROUTE: Self = Self(1 << 7);
    pub const STOP_NOT_ON_WAY: Self = Self(1 << 8);
    pub const NO_ROUTE: Self = Self(1 << 9);
    pub const UNKNOWN_ROLE: Self = Self(1 << 10);
    pub const UNKNOWN_TYPE: Self = Self(1 << 11);
    pub const STOP_TAG_MISSING: Self = Self(1 << 12);
    pub const PLTF_TAG_MISSING: Self = Self(1 << 13);
    pub const STOP_IS_NOT_NODE: Self = Self(1 << 14);
    pub const NO_FERRY: Self = Self(1 << 15);

    /// Every flag with the name of its output column, in bit order.
    pub const FLAGS: [(RouteError, &'static str); 16] = [
        (Self::OVER_NON_RAIL, "error_over_non_rail"),
        (Self::OVER_NON_ROAD, "error_over_rail"),
        (Self::NO_TROLLEY_WIRE, "error_no_trolley_wire"),
        (Self::UNORDERED_GAP, "error_unordered_gap"),
        (Self::WRONG_STRUCTURE, "error_wrong_structure"),
        (Self::NO_STOPPLTF_AT_FRONT, "no_stops_pltf_at_begin"),
        (Self::EMPTY_ROLE_NON_WAY, "non_way_empty_role"),
        (Self::STOPPLTF_AFTER_ROUTE, "stoppltf_after_route"),
        (Self::STOP_NOT_ON_WAY, "stop_not_on_way"),
        (Self::NO_ROUTE, "no_way_members"),
        (Self::UNKNOWN_ROLE, "unknown_role"),
        (Self::UNKNOWN_TYPE, "unknown_route_type"),
        (Self::STOP_TAG_MISSING, "stop_tag_missing"),
        (Self::PLTF_TAG_MISSING, "pltf_tag_missing"),
        (Self::STOP_IS_NOT_NODE, "stop_is_not_node"),
        (Self::NO_FERRY, "error_over_non_ferry"),
    ];

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn is_clean(self) -> bool {
        self.0 == 0
    }

    /// All bits of `other` are set in `self`.
    pub fn contains(self, other: RouteError) -> bool {
        self.0 & other.0 == other.0
    }

    /// Set flags with their column names.
    pub fn iter(self) -> impl Iterator<Item = (RouteError, &'static str)> {
        Self::FLAGS
            .into_iter()
            .filter(move |(flag, _)| self.contains(*flag))
    }
}

impl BitOr for RouteError {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for RouteError {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for RouteError {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            return write!(f, "clean");
        }
        let names: Vec<&str> = self.iter().map(|(_, name)| name).collect();
        write!(f, "{}", names.join("|"))
    }
}

// ============================================================================
// Library errors
// ============================================================================

/// Misuse of the validator API. Route problems are `RouteError` flags, not
/// errors of this type.
#[derive(Debug, Error)]
pub enum Ptv2Error {
    #[error("relation {relation} has {expected} members but {actual} member objects were supplied")]
    MemberCountMismatch {
        relation: ObjectId,
        expected: usize,
        actual: usize,
    },
}

pub type Result<T> = std::result::Result<T, Ptv2Error>;
