//! # osmi-ptv2
//!
//! Validation of OpenStreetMap public transport (PTv2) route relations.
//!
//! ## Features
//!
//! - **Role checks**: stops and platforms first, then the ways, with tags
//!   matching the vehicle type of the route
//! - **Gap detection**: the way members must form a connected chain, with
//!   special handling for roundabouts
//! - **Eager error reporting**: every problem is handed to a [`RouteSink`]
//!   as it is found
//!
//! ## Example
//!
//! ```
//! use osmi_ptv2::prelude::*;
//!
//! struct Collect(Vec<String>);
//!
//! impl RouteSink for Collect {
//!     fn write_error_point(&mut self, _: &Relation, _: ObjectId, _: Option<geo::Coord<f64>>, msg: &str, _: ObjectId) {
//!         self.0.push(msg.to_string());
//!     }
//!     fn write_error_way(&mut self, _: &Relation, _: ObjectId, msg: &str, _: &Way) {
//!         self.0.push(msg.to_string());
//!     }
//!     fn write_valid_route(&mut self, _: &Relation, _: &[MemberObject<'_>]) {}
//!     fn write_invalid_route(&mut self, _: &Relation, _: &[MemberObject<'_>], _: RouteError) {}
//! }
//!
//! let tags: Tags = [("type", "route"), ("route", "bus"), ("public_transport:version", "2")]
//!     .into_iter()
//!     .collect();
//! let relation = Relation {
//!     id: 1,
//!     tags,
//!     members: vec![RelationMember::new(MemberType::Node, 1, "stop")],
//!     timestamp: None,
//! };
//!
//! let mut sink = Collect(Vec::new());
//! let mut manager = RouteManager::new();
//! let error = manager.process(&relation, &[MemberObject::Missing], &mut sink).unwrap();
//!
//! // A lone stop that could not be found: nothing to complain about yet.
//! assert_eq!(error, Some(RouteError::CLEAN));
//! ```

pub mod checker;
pub mod manager;
pub mod models;
pub mod predicates;
pub mod sink;
pub mod topology;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience
pub mod prelude {
    pub use crate::checker::PTv2Checker;
    pub use crate::manager::{RouteManager, RouteStats};
    pub use crate::models::*;
    pub use crate::sink::RouteSink;
}

pub use prelude::*;
