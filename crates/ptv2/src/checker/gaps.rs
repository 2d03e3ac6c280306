//! Gap detection along the way members of a route.

use log::debug;

use super::PTv2Checker;
use crate::models::{MemberObject, Relation, RouteError, Way, WayEnd};
use crate::sink::RouteSink;
use crate::topology::{
    roundabout_as_second_after_gap, roundabout_connected_to_next_way, roundabout_connected_to_previous_way,
    shared_endpoint,
};

/// Position of the walk relative to the previous way members.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemberStatus {
    /// Still in the leading stop/platform section.
    BeforeFirst,
    First,
    /// The next way is compared with the previous one without knowing the
    /// open end of the chain.
    Second,
    /// Open end of the chain is known.
    Normal,
    AfterGap,
    AfterMissing,
    /// Roundabout reached from a chain with a known open end.
    Roundabout,
    /// Roundabout is the second way of a chain.
    SecondRoundabout,
    /// The previous way was a roundabout.
    AfterRoundabout,
}

impl<S: RouteSink + ?Sized> PTv2Checker<'_, S> {
    /// Check that the way members form a connected chain.
    ///
    /// Returns [`RouteError::UNORDERED_GAP`] if at least one break was found.
    pub fn find_gaps(&mut self, relation: &Relation, members: &[MemberObject<'_>]) -> RouteError {
        let gaps = self.count_gaps(relation, members);
        if gaps > 0 {
            debug!("relation {}: {} gaps", relation.id, gaps);
            RouteError::UNORDERED_GAP
        } else {
            RouteError::CLEAN
        }
    }

    /// Walk the members in relation order and count the breaks in the chain.
    ///
    /// Each break is written to the sink when it is found. A member that is
    /// not a way with an empty role starts a new chain. So does a missing
    /// member, which therefore never counts as a gap on its own.
    pub fn count_gaps(&mut self, relation: &Relation, members: &[MemberObject<'_>]) -> usize {
        let mut status = MemberStatus::BeforeFirst;
        let mut previous: Option<&Way> = None;
        // Open end of `previous`. Only meaningful in `Normal` and `Roundabout`.
        let mut open_end: Option<WayEnd> = None;
        let mut gaps = 0;

        for (member, object) in relation.members.iter().zip(members.iter().copied()) {
            let way = match object {
                MemberObject::Missing => {
                    if status != MemberStatus::BeforeFirst {
                        status = MemberStatus::AfterMissing;
                    }
                    continue;
                }
                MemberObject::Way(way) if member.role.is_empty() => way,
                _ => {
                    if status != MemberStatus::BeforeFirst {
                        status = MemberStatus::AfterGap;
                    }
                    continue;
                }
            };

            if status == MemberStatus::BeforeFirst {
                status = MemberStatus::First;
            }

            if way.is_roundabout() {
                match status {
                    MemberStatus::AfterRoundabout => {
                        self.writer
                            .write_error_way(relation, 0, "roundabout after roundabout", way);
                        gaps += 1;
                        previous = Some(way);
                        continue;
                    }
                    MemberStatus::First | MemberStatus::AfterGap | MemberStatus::AfterMissing => {
                        status = MemberStatus::AfterRoundabout;
                        previous = Some(way);
                        continue;
                    }
                    MemberStatus::Second => status = MemberStatus::SecondRoundabout,
                    _ => status = MemberStatus::Roundabout,
                }
            }

            let prev = match (status, previous) {
                (MemberStatus::First | MemberStatus::AfterGap | MemberStatus::AfterMissing, _) | (_, None) => {
                    status = MemberStatus::Second;
                    previous = Some(way);
                    continue;
                }
                (_, Some(prev)) => prev,
            };

            match status {
                MemberStatus::AfterRoundabout => match roundabout_connected_to_next_way(prev, way) {
                    Some(end) => {
                        open_end = Some(end);
                        status = MemberStatus::Normal;
                    }
                    None => {
                        self.writer.write_error_way(relation, 0, "gap", way);
                        gaps += 1;
                        status = MemberStatus::AfterGap;
                    }
                },
                MemberStatus::Roundabout => {
                    let connected =
                        open_end.is_some_and(|end| roundabout_connected_to_previous_way(end, prev, way));
                    if !connected {
                        self.writer.write_error_way(relation, 0, "gap", way);
                        if let Some(node) = open_end.and_then(|end| prev.node_at(end)) {
                            self.writer
                                .write_error_point(relation, node.id, node.location, "gap at this location", way.id);
                        }
                        gaps += 1;
                    }
                    status = MemberStatus::AfterRoundabout;
                }
                MemberStatus::SecondRoundabout => {
                    if !roundabout_as_second_after_gap(prev, way) {
                        self.writer.write_error_way(relation, 0, "gap", way);
                        gaps += 1;
                    }
                    status = MemberStatus::AfterRoundabout;
                }
                MemberStatus::Second => match shared_endpoint(way, prev) {
                    Some(connected) => {
                        open_end = Some(connected.opposite());
                        status = MemberStatus::Normal;
                    }
                    None => {
                        self.writer.write_error_way(relation, 0, "gap", prev);
                        gaps += 1;
                        status = MemberStatus::AfterGap;
                    }
                },
                MemberStatus::Normal => {
                    let expected = open_end.and_then(|end| prev.node_at(end));
                    let expected_id = expected.map(|node| node.id);
                    if expected_id.is_some() && way.front_id() == expected_id {
                        open_end = Some(WayEnd::Back);
                    } else if expected_id.is_some() && way.back_id() == expected_id {
                        open_end = Some(WayEnd::Front);
                    } else {
                        let node_id = expected_id.unwrap_or(0);
                        self.writer.write_error_way(relation, node_id, "gap", prev);
                        if let Some(node) = expected {
                            self.writer
                                .write_error_point(relation, node.id, node.location, "gap at this location", way.id);
                        }
                        gaps += 1;
                        status = MemberStatus::Second;
                    }
                }
                // Resolved before reaching the comparisons.
                MemberStatus::BeforeFirst
                | MemberStatus::First
                | MemberStatus::AfterGap
                | MemberStatus::AfterMissing => {}
            }
            previous = Some(way);
        }
        gaps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MemberType::{Node as N, Way as W};
    use crate::models::{Node, Relation};
    use crate::testing::*;

    fn road(id: i64, nodes: &[i64]) -> Way {
        way(id, nodes, tags(&[("highway", "secondary")]))
    }

    fn roundabout(id: i64, nodes: &[i64]) -> Way {
        way(id, nodes, tags(&[("highway", "secondary"), ("junction", "roundabout")]))
    }

    fn stop(id: i64) -> Node {
        node(id, tags(&[("highway", "bus_stop")]))
    }

    /// Relation with two platforms followed by the given ways.
    fn route_with_ways(ways: &[&Way]) -> Relation {
        let mut members = vec![(N, 1, "platform"), (N, 2, "platform")];
        members.extend(ways.iter().map(|w| (W, w.id, "")));
        relation(1, bus_route_tags(), &members)
    }

    fn objects<'a>(stops: &'a [Node], ways: &[&'a Way]) -> Vec<MemberObject<'a>> {
        stops
            .iter()
            .map(MemberObject::Node)
            .chain(ways.iter().map(|w| MemberObject::Way(*w)))
            .collect()
    }

    fn gaps(relation: &Relation, members: &[MemberObject<'_>]) -> (usize, RecordingSink) {
        let mut sink = RecordingSink::default();
        let count = PTv2Checker::new(&mut sink).count_gaps(relation, members);
        (count, sink)
    }

    #[test]
    fn test_no_gaps() {
        let stops = [stop(1), stop(9)];
        let (w1, w2, w3) = (road(1, &[1, 2, 3, 4]), road(2, &[4, 5, 6, 7]), road(3, &[7, 8, 9]));
        let ways = [&w1, &w2, &w3];
        let relation = route_with_ways(&ways);
        let (count, sink) = gaps(&relation, &objects(&stops, &ways));

        assert_eq!(count, 0);
        assert_eq!(sink.error_count(), 0);

        let mut sink = RecordingSink::default();
        assert_eq!(
            PTv2Checker::new(&mut sink).find_gaps(&relation, &objects(&stops, &ways)),
            RouteError::CLEAN
        );
    }

    #[test]
    fn test_reversed_ways_have_no_gaps() {
        let stops = [stop(1), stop(9)];
        let (w1, w2, w3) = (road(1, &[4, 3, 2, 1]), road(2, &[7, 6, 5, 4]), road(3, &[7, 8, 9]));
        let ways = [&w1, &w2, &w3];
        let relation = route_with_ways(&ways);
        let (count, _) = gaps(&relation, &objects(&stops, &ways));

        assert_eq!(count, 0);
    }

    #[test]
    fn test_gap_between_first_and_second() {
        let stops = [stop(1), stop(9)];
        let (w1, w2, w3) = (road(1, &[1, 2, 3, 4]), road(2, &[5, 6, 7]), road(3, &[7, 8, 9]));
        let ways = [&w1, &w2, &w3];
        let relation = route_with_ways(&ways);
        let (count, sink) = gaps(&relation, &objects(&stops, &ways));

        assert_eq!(count, 1);
        assert_eq!(sink.error_ways.len(), 1);
        assert_eq!(sink.error_ways[0].message, "gap");

        let mut sink = RecordingSink::default();
        assert_eq!(
            PTv2Checker::new(&mut sink).find_gaps(&relation, &objects(&stops, &ways)),
            RouteError::UNORDERED_GAP
        );
    }

    #[test]
    fn test_gap_in_the_middle() {
        let stops = [stop(1), stop(12)];
        let w1 = road(1, &[1, 2, 3, 4]);
        let w2 = road(2, &[4, 5, 6, 7]);
        let w3 = road(3, &[8, 9, 10]);
        let w4 = road(4, &[10, 11, 12]);
        let ways = [&w1, &w2, &w3, &w4];
        let relation = route_with_ways(&ways);
        let (count, sink) = gaps(&relation, &objects(&stops, &ways));

        assert_eq!(count, 1);
        assert_eq!(sink.error_ways.len(), 1);
        assert_eq!(sink.error_ways[0].way_id, 2);
        assert_eq!(sink.error_ways[0].node_id, 7);
        assert_eq!(sink.error_points.len(), 1);
        assert_eq!(sink.error_points[0].node_id, 7);
        assert_eq!(sink.error_points[0].way_id, 3);
        assert_eq!(sink.error_points[0].message, "gap at this location");
    }

    #[test]
    fn test_chain_must_continue_at_open_end() {
        // w3 touches w2 at the end that is already connected to w1.
        let stops = [stop(1), stop(9)];
        let (w1, w2, w3) = (road(1, &[1, 2, 3, 4]), road(2, &[4, 5, 6, 7]), road(3, &[4, 8, 9]));
        let ways = [&w1, &w2, &w3];
        let relation = route_with_ways(&ways);
        let (count, _) = gaps(&relation, &objects(&stops, &ways));

        assert_eq!(count, 1);
    }

    #[test]
    fn test_roundabout_as_second_way() {
        let stops = [stop(1), stop(9)];
        let w1 = road(1, &[1, 2, 3, 4]);
        let w2 = roundabout(2, &[4, 5, 6, 7, 4]);
        let w3 = road(3, &[7, 8, 9]);
        let ways = [&w1, &w2, &w3];
        let relation = route_with_ways(&ways);
        let (count, sink) = gaps(&relation, &objects(&stops, &ways));

        assert_eq!(count, 0);
        assert_eq!(sink.error_count(), 0);
    }

    #[test]
    fn test_roundabout_in_the_middle() {
        let stops = [stop(1), stop(12)];
        let w1 = road(1, &[1, 2, 3]);
        let w2 = road(2, &[3, 4]);
        let w3 = roundabout(3, &[4, 5, 6, 7, 4]);
        let w4 = road(4, &[12, 11, 6]);
        let ways = [&w1, &w2, &w3, &w4];
        let relation = route_with_ways(&ways);
        let (count, _) = gaps(&relation, &objects(&stops, &ways));

        assert_eq!(count, 0);
    }

    #[test]
    fn test_roundabout_in_the_middle_disconnected() {
        let stops = [stop(1), stop(12)];
        let w1 = road(1, &[1, 2, 3]);
        let w2 = road(2, &[3, 4]);
        let w3 = roundabout(3, &[20, 21, 22, 20]);
        let w4 = road(4, &[12, 11, 21]);
        let ways = [&w1, &w2, &w3, &w4];
        let relation = route_with_ways(&ways);
        let (count, sink) = gaps(&relation, &objects(&stops, &ways));

        assert_eq!(count, 1);
        assert_eq!(sink.error_ways[0].way_id, 3);
        assert_eq!(sink.error_points.len(), 1);
        assert_eq!(sink.error_points[0].node_id, 4);
    }

    #[test]
    fn test_roundabout_disconnected_on_both_sides() {
        let stops = [stop(1), stop(9)];
        let w1 = road(1, &[1, 2, 3, 4]);
        let w2 = roundabout(2, &[10, 11, 12, 10]);
        let w3 = road(3, &[7, 8, 9]);
        let ways = [&w1, &w2, &w3];
        let relation = route_with_ways(&ways);
        let (count, sink) = gaps(&relation, &objects(&stops, &ways));

        assert_eq!(count, 2);
        assert_eq!(sink.error_ways_with("gap").len(), 2);
    }

    #[test]
    fn test_roundabout_after_roundabout() {
        let stops = [stop(1), stop(9)];
        let w1 = road(1, &[1, 2, 3, 4]);
        let w2 = roundabout(2, &[4, 5, 6, 4]);
        let w3 = roundabout(3, &[6, 7, 8, 6]);
        let ways = [&w1, &w2, &w3];
        let relation = route_with_ways(&ways);
        let (count, sink) = gaps(&relation, &objects(&stops, &ways));

        assert_eq!(count, 1);
        assert_eq!(sink.error_ways_with("roundabout after roundabout").len(), 1);
    }

    #[test]
    fn test_roundabout_as_first_way() {
        let stops = [stop(1), stop(13)];
        let w1 = roundabout(1, &[1, 2, 3, 1]);
        let w2 = road(2, &[3, 4]);
        let w3 = road(3, &[4, 5]);
        let w4 = road(4, &[10, 11]);
        let ways = [&w1, &w2, &w3, &w4];
        let relation = route_with_ways(&ways);
        let (count, sink) = gaps(&relation, &objects(&stops, &ways));

        assert_eq!(count, 1);
        assert_eq!(sink.error_ways.len(), 1);
        assert_eq!(sink.error_ways[0].way_id, 3);
        assert_eq!(sink.error_ways[0].node_id, 5);
        assert_eq!(sink.error_points[0].node_id, 5);
    }

    #[test]
    fn test_roundabout_after_gap() {
        let stops = [stop(1), stop(9)];
        let w1 = road(1, &[1, 2]);
        let w2 = road(2, &[5, 6]);
        let w3 = roundabout(3, &[6, 7, 8, 6]);
        let w4 = road(4, &[8, 9]);
        let ways = [&w1, &w2, &w3, &w4];
        let relation = route_with_ways(&ways);
        let (count, sink) = gaps(&relation, &objects(&stops, &ways));

        // Only the break between w1 and w2, the roundabout re-anchors the chain.
        assert_eq!(count, 1);
        assert_eq!(sink.error_ways.len(), 1);
        assert_eq!(sink.error_ways[0].way_id, 1);
    }

    #[test]
    fn test_roundabout_after_missing_member() {
        let stops = [stop(1), stop(9)];
        let w1 = road(1, &[1, 2]);
        let w3 = roundabout(3, &[20, 21, 22, 20]);
        let w4 = road(4, &[22, 23]);
        let relation = relation(
            1,
            bus_route_tags(),
            &[(N, 1, "platform"), (N, 2, "platform"), (W, 1, ""), (W, 2, ""), (W, 3, ""), (W, 4, "")],
        );
        let members = [
            MemberObject::Node(&stops[0]),
            MemberObject::Node(&stops[1]),
            MemberObject::Way(&w1),
            MemberObject::Missing,
            MemberObject::Way(&w3),
            MemberObject::Way(&w4),
        ];
        let (count, sink) = gaps(&relation, &members);

        assert_eq!(count, 0);
        assert_eq!(sink.error_count(), 0);
    }

    #[test]
    fn test_way_detached_from_connected_roundabout() {
        let stops = [stop(1), stop(13)];
        let w1 = road(1, &[1, 2, 3, 4]);
        let w2 = roundabout(2, &[4, 5, 6, 4]);
        let w3 = road(3, &[10, 11]);
        let w4 = road(4, &[11, 12]);
        let w5 = road(5, &[12, 13]);
        let ways = [&w1, &w2, &w3, &w4, &w5];
        let relation = route_with_ways(&ways);
        let (count, sink) = gaps(&relation, &objects(&stops, &ways));

        // The chain starts over at w3 and w4, w5 continue it.
        assert_eq!(count, 1);
        assert_eq!(sink.error_ways.len(), 1);
        assert_eq!(sink.error_ways[0].way_id, 3);
        assert!(sink.error_points.is_empty());
    }

    #[test]
    fn test_missing_member_defers_check() {
        let stops = [stop(1), stop(9)];
        let w1 = road(1, &[1, 2, 3, 4]);
        let w3 = road(3, &[20, 21]);
        let w4 = road(4, &[21, 22]);
        let relation = relation(
            1,
            bus_route_tags(),
            &[(N, 1, "platform"), (N, 2, "platform"), (W, 1, ""), (W, 2, ""), (W, 3, ""), (W, 4, "")],
        );
        let members = [
            MemberObject::Node(&stops[0]),
            MemberObject::Node(&stops[1]),
            MemberObject::Way(&w1),
            MemberObject::Missing,
            MemberObject::Way(&w3),
            MemberObject::Way(&w4),
        ];
        let (count, _) = gaps(&relation, &members);

        assert_eq!(count, 0);
    }

    #[test]
    fn test_missing_stops_are_ignored() {
        let (w1, w2) = (road(1, &[1, 2]), road(2, &[2, 3]));
        let relation = relation(1, bus_route_tags(), &[(N, 1, "stop"), (W, 1, ""), (W, 2, "")]);
        let members = [MemberObject::Missing, MemberObject::Way(&w1), MemberObject::Way(&w2)];
        let (count, _) = gaps(&relation, &members);

        assert_eq!(count, 0);
    }

    #[test]
    fn test_idempotent() {
        let stops = [stop(1), stop(9)];
        let w1 = road(1, &[1, 2, 3, 4]);
        let w2 = roundabout(2, &[10, 11, 12, 10]);
        let w3 = road(3, &[7, 8, 9]);
        let ways = [&w1, &w2, &w3];
        let relation = route_with_ways(&ways);
        let members = objects(&stops, &ways);

        let mut sink = RecordingSink::default();
        let mut checker = PTv2Checker::new(&mut sink);
        let first = checker.find_gaps(&relation, &members) | checker.check_roles_order_and_type(&relation, &members);
        let second = checker.find_gaps(&relation, &members) | checker.check_roles_order_and_type(&relation, &members);

        assert_eq!(first, second);
        assert_eq!(first, RouteError::UNORDERED_GAP);
    }
}
