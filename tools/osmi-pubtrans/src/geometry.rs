//! Geometry construction and projection to the output SRS.

use geo::{Coord, LineString, MultiLineString, Point};
use osmi_ptv2::models::{ObjectId, Way};
use std::f64::consts::PI;
use thiserror::Error;

const EARTH_RADIUS: f64 = 6_378_137.0;
const MAX_MERCATOR_LATITUDE: f64 = 85.051_128_779_8;

#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("node {0} has no valid location")]
    MissingLocation(ObjectId),

    #[error("way {0} has fewer than two distinct points")]
    TooFewPoints(ObjectId),

    #[error("unsupported output SRS EPSG:{0}, use 4326 or 3857")]
    UnsupportedSrs(u32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Projection {
    /// EPSG:4326, coordinates are written as read.
    Wgs84,
    /// EPSG:3857, spherical web mercator.
    WebMercator,
}

impl Projection {
    pub fn from_epsg(code: u32) -> Result<Self, GeometryError> {
        match code {
            4326 => Ok(Projection::Wgs84),
            3857 => Ok(Projection::WebMercator),
            other => Err(GeometryError::UnsupportedSrs(other)),
        }
    }

    pub fn epsg(self) -> u32 {
        match self {
            Projection::Wgs84 => 4326,
            Projection::WebMercator => 3857,
        }
    }

    pub fn project(self, c: Coord<f64>) -> Coord<f64> {
        match self {
            Projection::Wgs84 => c,
            Projection::WebMercator => {
                let lat = c.y.clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE);
                Coord {
                    x: EARTH_RADIUS * c.x.to_radians(),
                    y: EARTH_RADIUS * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln(),
                }
            }
        }
    }
}

/// Builds projected geometries from OSM objects.
#[derive(Clone, Copy, Debug)]
pub struct GeometryFactory {
    projection: Projection,
}

impl GeometryFactory {
    pub fn new(projection: Projection) -> Self {
        Self { projection }
    }

    pub fn create_point(&self, node_id: ObjectId, location: Option<Coord<f64>>) -> Result<Point<f64>, GeometryError> {
        let location = location.ok_or(GeometryError::MissingLocation(node_id))?;
        Ok(Point(self.projection.project(location)))
    }

    /// Line along the nodes of a way.
    ///
    /// Consecutive nodes at the same location are collapsed into one point.
    pub fn create_linestring(&self, way: &Way) -> Result<LineString<f64>, GeometryError> {
        let mut coords: Vec<Coord<f64>> = Vec::with_capacity(way.nodes.len());
        for node in &way.nodes {
            let location = node.location.ok_or(GeometryError::MissingLocation(node.id))?;
            if coords.last() != Some(&location) {
                coords.push(location);
            }
        }
        if coords.len() < 2 {
            return Err(GeometryError::TooFewPoints(way.id));
        }
        Ok(coords.into_iter().map(|c| self.projection.project(c)).collect())
    }

    /// Lines of all ways that have a valid geometry. Other ways are skipped.
    pub fn create_multilinestring<'a>(&self, ways: impl IntoIterator<Item = &'a Way>) -> MultiLineString<f64> {
        let lines = ways
            .into_iter()
            .filter_map(|way| match self.create_linestring(way) {
                Ok(line) => Some(line),
                Err(err) => {
                    log::debug!("skipping way {} in multilinestring: {}", way.id, err);
                    None
                }
            })
            .collect();
        MultiLineString::new(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use osmi_ptv2::models::{NodeRef, Tags};

    fn make_way(id: ObjectId, coords: &[(ObjectId, Option<(f64, f64)>)]) -> Way {
        Way {
            id,
            nodes: coords
                .iter()
                .map(|&(node_id, c)| NodeRef::new(node_id, c.map(|(x, y)| Coord { x, y })))
                .collect(),
            tags: Tags::new(),
            timestamp: None,
        }
    }

    #[test]
    fn test_web_mercator() {
        let origin = Projection::WebMercator.project(Coord { x: 0.0, y: 0.0 });
        assert_relative_eq!(origin.x, 0.0);
        assert_relative_eq!(origin.y, 0.0, epsilon = 1e-9);

        let corner = Projection::WebMercator.project(Coord { x: 180.0, y: 85.0511287798 });
        assert_relative_eq!(corner.x, 20_037_508.342_789_244, epsilon = 1e-6);
        assert_relative_eq!(corner.y, 20_037_508.342_789_244, epsilon = 1.0);
    }

    #[test]
    fn test_web_mercator_clamps_latitude() {
        let pole = Projection::WebMercator.project(Coord { x: 0.0, y: 90.0 });
        let edge = Projection::WebMercator.project(Coord { x: 0.0, y: MAX_MERCATOR_LATITUDE });
        assert_relative_eq!(pole.y, edge.y);
        assert!(pole.y.is_finite());
    }

    #[test]
    fn test_from_epsg() {
        assert_eq!(Projection::from_epsg(4326), Ok(Projection::Wgs84));
        assert_eq!(Projection::from_epsg(3857), Ok(Projection::WebMercator));
        assert_eq!(Projection::from_epsg(25832), Err(GeometryError::UnsupportedSrs(25832)));
    }

    #[test]
    fn test_linestring_removes_duplicate_points() {
        let factory = GeometryFactory::new(Projection::Wgs84);
        let way = make_way(1, &[(1, Some((9.0, 50.0))), (2, Some((9.0, 50.0))), (3, Some((9.1, 50.0)))]);

        let line = factory.create_linestring(&way).unwrap();
        assert_eq!(line.0.len(), 2);
    }

    #[test]
    fn test_degenerate_linestring() {
        let factory = GeometryFactory::new(Projection::Wgs84);
        let single = make_way(1, &[(1, Some((9.0, 50.0))), (2, Some((9.0, 50.0)))]);
        let unlocated = make_way(2, &[(1, Some((9.0, 50.0))), (2, None)]);

        assert_eq!(factory.create_linestring(&single), Err(GeometryError::TooFewPoints(1)));
        assert_eq!(factory.create_linestring(&unlocated), Err(GeometryError::MissingLocation(2)));
    }

    #[test]
    fn test_multilinestring_skips_broken_ways() {
        let factory = GeometryFactory::new(Projection::Wgs84);
        let good = make_way(1, &[(1, Some((9.0, 50.0))), (2, Some((9.1, 50.0)))]);
        let bad = make_way(2, &[(3, None), (4, None)]);

        let multi = factory.create_multilinestring([&good, &bad]);
        assert_eq!(multi.0.len(), 1);
    }

    #[test]
    fn test_point() {
        let factory = GeometryFactory::new(Projection::Wgs84);
        let point = factory.create_point(5, Some(Coord { x: 9.5, y: 50.5 })).unwrap();

        assert_relative_eq!(point.x(), 9.5);
        assert_eq!(factory.create_point(5, None), Err(GeometryError::MissingLocation(5)));
    }
}
