//! Per-relation orchestration of the validator.

use log::debug;

use crate::checker::PTv2Checker;
use crate::models::{MemberObject, Ptv2Error, Relation, Result, RouteError};
use crate::sink::RouteSink;

const ROUTES_OF_INTEREST: &[&str] = &[
    "train",
    "light_rail",
    "subway",
    "tram",
    "bus",
    "trolleybus",
    "ferry",
    "share_taxi",
    "aerialway",
];

/// Counters for the end-of-run summary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RouteStats {
    /// Relations handed to [`RouteManager::process`].
    pub processed: usize,
    /// Relations skipped because they are not PTv2 routes.
    pub skipped: usize,
    pub valid: usize,
    pub invalid: usize,
}

/// Decides which relations are routes and runs the validator on them.
#[derive(Debug, Default)]
pub struct RouteManager {
    stats: RouteStats,
}

impl RouteManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// `type=route` with a public transport `route` value.
    pub fn is_route_of_interest(relation: &Relation) -> bool {
        relation.tags.has_tag("type", "route") && relation.tags.value_in("route", ROUTES_OF_INTEREST)
    }

    pub fn is_ptv2(relation: &Relation) -> bool {
        relation.tags.has_tag("public_transport:version", "2")
    }

    /// Run both validator phases and combine their flags.
    pub fn validate<S: RouteSink + ?Sized>(relation: &Relation, members: &[MemberObject<'_>], sink: &mut S) -> RouteError {
        let mut checker = PTv2Checker::new(sink);
        let mut error = checker.check_roles_order_and_type(relation, members);
        error |= checker.find_gaps(relation, members);
        error
    }

    /// Validate a completed relation and write it as a valid or invalid
    /// route.
    ///
    /// `members` holds one object per relation member, in member order.
    /// Returns `None` for relations that are not PTv2 routes; nothing is
    /// written for them.
    pub fn process<S: RouteSink + ?Sized>(
        &mut self,
        relation: &Relation,
        members: &[MemberObject<'_>],
        sink: &mut S,
    ) -> Result<Option<RouteError>> {
        if members.len() != relation.members.len() {
            return Err(Ptv2Error::MemberCountMismatch {
                relation: relation.id,
                expected: relation.members.len(),
                actual: members.len(),
            });
        }
        self.stats.processed += 1;
        if !Self::is_ptv2(relation) {
            self.stats.skipped += 1;
            return Ok(None);
        }

        let error = Self::validate(relation, members, sink);
        if error.is_clean() {
            self.stats.valid += 1;
            sink.write_valid_route(relation, members);
        } else {
            debug!("relation {} is invalid: {}", relation.id, error);
            self.stats.invalid += 1;
            sink.write_invalid_route(relation, members, error);
        }
        Ok(Some(error))
    }

    pub fn stats(&self) -> RouteStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MemberType::{Node as N, Way as W};
    use crate::testing::*;

    #[test]
    fn test_route_of_interest() {
        let bus = relation(1, bus_route_tags(), &[]);
        let light_rail = relation(2, light_rail_route_tags(), &[]);
        let hiking = relation(3, tags(&[("type", "route"), ("route", "hiking")]), &[]);
        let multipolygon = relation(4, tags(&[("type", "multipolygon"), ("route", "bus")]), &[]);

        assert!(RouteManager::is_route_of_interest(&bus));
        assert!(RouteManager::is_route_of_interest(&light_rail));
        assert!(!RouteManager::is_route_of_interest(&hiking));
        assert!(!RouteManager::is_route_of_interest(&multipolygon));
    }

    #[test]
    fn test_valid_route_written_once() {
        let s1 = node(1, tags(&[("highway", "bus_stop")]));
        let s2 = node(9, tags(&[("public_transport", "platform")]));
        let road = tags(&[("highway", "secondary")]);
        let (w1, w2, w3) = (way(1, &[1, 2, 3, 4], road.clone()), way(2, &[4, 5, 6, 7], road.clone()), way(3, &[7, 8, 9], road));
        let relation = relation(
            7,
            bus_route_tags(),
            &[(N, 1, "stop"), (N, 9, "platform"), (W, 1, ""), (W, 2, ""), (W, 3, "")],
        );
        let members = [
            MemberObject::Node(&s1),
            MemberObject::Node(&s2),
            MemberObject::Way(&w1),
            MemberObject::Way(&w2),
            MemberObject::Way(&w3),
        ];
        let mut manager = RouteManager::new();
        let mut sink = RecordingSink::default();

        let result = manager.process(&relation, &members, &mut sink).unwrap();

        assert_eq!(result, Some(RouteError::CLEAN));
        assert_eq!(sink.valid_routes, vec![7]);
        assert!(sink.invalid_routes.is_empty());
        assert_eq!(manager.stats().valid, 1);
    }

    #[test]
    fn test_invalid_route_combines_both_phases() {
        let road = tags(&[("highway", "secondary")]);
        let (w1, w2) = (way(1, &[1, 2], road.clone()), way(2, &[5, 6], tags(&[("railway", "rail")])));
        let relation = relation(8, bus_route_tags(), &[(W, 1, ""), (W, 2, "")]);
        let members = [MemberObject::Way(&w1), MemberObject::Way(&w2)];
        let mut manager = RouteManager::new();
        let mut sink = RecordingSink::default();

        let result = manager.process(&relation, &members, &mut sink).unwrap();
        let expected = RouteError::NO_STOPPLTF_AT_FRONT | RouteError::OVER_NON_ROAD | RouteError::UNORDERED_GAP;

        assert_eq!(result, Some(expected));
        assert!(sink.valid_routes.is_empty());
        assert_eq!(sink.invalid_routes, vec![(8, expected)]);
        assert_eq!(manager.stats().invalid, 1);
    }

    #[test]
    fn test_non_ptv2_route_is_skipped() {
        let mut route_tags = bus_route_tags();
        route_tags.insert("public_transport:version", "1");
        let relation = relation(9, route_tags, &[(W, 1, "")]);
        let mut manager = RouteManager::new();
        let mut sink = RecordingSink::default();

        let result = manager.process(&relation, &missing_members(&relation), &mut sink).unwrap();

        assert_eq!(result, None);
        assert!(sink.valid_routes.is_empty());
        assert!(sink.invalid_routes.is_empty());
        assert_eq!(manager.stats().skipped, 1);
    }

    #[test]
    fn test_member_count_mismatch() {
        let relation = relation(10, bus_route_tags(), &[(W, 1, ""), (W, 2, "")]);
        let mut manager = RouteManager::new();
        let mut sink = RecordingSink::default();

        let result = manager.process(&relation, &[MemberObject::Missing], &mut sink);

        assert!(matches!(result, Err(Ptv2Error::MemberCountMismatch { expected: 2, actual: 1, .. })));
    }
}
